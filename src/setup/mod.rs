/// Primitive setup: coefficient math, span scan conversion and the triangle,
/// line and point drivers
pub mod coef;
pub mod context;
pub mod line;
pub mod offload;
pub mod parallel;
pub mod point;
pub mod quad;
pub mod span;
pub mod state;
pub mod triangle;

pub use coef::{Edge, InterpCoef, Interpolants, TriangleSetup, Vertex};
pub use context::{PrimOutcome, PrimitiveStats, SetupContext};
pub use offload::{RasterPath, TriangleRouter};
pub use parallel::{setup_triangles_parallel, TriangleRef};
pub use quad::{NullStage, Quad, QuadBatch, QuadCollector, QuadHeader, QuadStage, MAX_QUADS};
pub use state::{
    CullFace, Facing, FillMode, FragmentInput, FramebufferState, Interp, PipelineState,
    RasterizerState, Scissor, Semantic, ShaderLinkage, SurfaceLayers, VertexLayout,
};
