pub mod error;
pub mod hw;
pub mod perf;
/// Quad setup - primitive setup and 2x2 quad scan conversion
/// Triangles, lines and points become batches of quads for a fragment stage,
/// in software or through a tile rasterizer coprocessor
pub mod setup;
pub mod transport;

pub use error::{RasterError, Result, TransportError};
pub use hw::{RasterJob, RasterModel, Tile};
pub use perf::{CounterSnapshot, PerfTimer, RasterCounters, RASTER_COUNTERS};
pub use setup::{
    setup_triangles_parallel, CullFace, Facing, FillMode, FragmentInput, FramebufferState,
    Interp, InterpCoef, Interpolants, PipelineState, PrimOutcome, PrimitiveStats, Quad,
    QuadCollector, QuadStage, RasterPath, RasterizerState, Scissor, Semantic, SetupContext,
    ShaderLinkage, TriangleRouter, Vertex, VertexLayout,
};
pub use transport::{Coprocessor, RegisterBus, SimulatedCoprocessor, TransportConfig};
