/// Clock-level reference model of the tile rasterizer coprocessor
///
/// The model walks a triangle's clip rectangle in 64x64 tiles. Per tile, a
/// controller state machine drives quad generation, three edge tests, a
/// depth plane evaluation and a quad store, one half clock cycle at a time.
/// It serves both as the executable definition of the coprocessor's
/// sequencing and as a software stand-in when no device is present.
pub mod control;
pub mod model;
pub mod types;
pub mod units;

pub use control::{ControlState, RasterControl};
pub use model::{RasterJob, RasterModel};
pub use types::{
    ClipBox, Command, DepthCoef, DepthQuad, HwEdge, HwQuad, QuadBuffer, QuadBufferCell, Tile,
    DEPTH_SCALE, QUAD_BUFFER_CAPACITY, TILE_SIZE,
};
pub use units::Wires;
