/// Datapath types shared by the tile model units and the register protocol
use glam::Vec3;

use crate::error::{RasterError, Result};
use crate::setup::state::Scissor;

/// Tiles are 64x64 pixels. A tile's inclusive end coordinate is
/// `x0 + TILE_SPAN`, the top-left pixel of its last quad.
pub const TILE_SIZE: u16 = 64;
pub const TILE_SPAN: u16 = TILE_SIZE - 2;

/// One cell per quad of a fully covered tile.
pub const QUAD_BUFFER_CAPACITY: usize = (TILE_SIZE as usize / 2) * (TILE_SIZE as usize / 2);

/// Fixed-point scale of depth plane coefficients.
pub const DEPTH_SCALE: i32 = (1 << 30) - 1;

/// Command register values.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    #[default]
    Nop = 0x00,
    Prepare = 0xA5,
    Raster = 0xAA,
}

impl Command {
    pub fn from_register(value: u32) -> Self {
        match value & 0xFF {
            0xA5 => Command::Prepare,
            0xAA => Command::Raster,
            _ => Command::Nop,
        }
    }
}

/// Directed edge between two truncated vertex positions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HwEdge {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl HwEdge {
    pub fn between(from: Vec3, to: Vec3) -> Self {
        Self {
            x0: from.x as u32,
            y0: from.y as u32,
            x1: to.x as u32,
            y1: to.y as u32,
        }
    }

    /// Half-plane test `(x-x0)(y1-y0) - (x1-x0)(y-y0) >= 0` in wrapping
    /// 32-bit arithmetic.
    #[inline]
    pub fn test(&self, x: u32, y: u32) -> bool {
        let (x, y) = (x as i32, y as i32);
        let (x0, y0, x1, y1) = (self.x0 as i32, self.y0 as i32, self.x1 as i32, self.y1 as i32);
        let lhs = x.wrapping_sub(x0).wrapping_mul(y1.wrapping_sub(y0));
        let rhs = x1.wrapping_sub(x0).wrapping_mul(y.wrapping_sub(y0));
        lhs.wrapping_sub(rhs) >= 0
    }
}

/// Bounding box the quad generator clips tiles against. Float bounds, the
/// right and bottom bound are the clip rectangle's exclusive maximum.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ClipBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl From<&Scissor> for ClipBox {
    fn from(clip: &Scissor) -> Self {
        Self {
            x0: clip.minx as f32,
            y0: clip.miny as f32,
            x1: clip.maxx as f32,
            y1: clip.maxy as f32,
        }
    }
}

#[inline]
fn to_u16(v: i32) -> u16 {
    v.clamp(0, u16::MAX as i32) as u16
}

/// A 64x64 tile; both corners inclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Tile {
    pub x0: u16,
    pub y0: u16,
    pub x1: u16,
    pub y1: u16,
}

impl Tile {
    pub fn at(x0: u16, y0: u16) -> Self {
        Self {
            x0,
            y0,
            x1: x0.saturating_add(TILE_SPAN),
            y1: y0.saturating_add(TILE_SPAN),
        }
    }

    /// The tile holding the top-left corner of `clip`.
    pub fn first(clip: &Scissor) -> Self {
        Self::at(to_u16(clip.minx), to_u16(clip.miny))
    }

    /// Next tile in row-major order, wrapping at the clip rectangle's right
    /// edge. `None` once the walk leaves the clip rectangle.
    pub fn next(&self, clip: &Scissor) -> Option<Self> {
        let step = TILE_SIZE as i32;
        let (mut x0, mut y0) = (self.x0 as i32 + step, self.y0 as i32);
        if x0 >= clip.maxx {
            x0 = clip.minx.max(0);
            y0 += step;
        }
        if y0 >= clip.maxy || y0 > u16::MAX as i32 || x0 > u16::MAX as i32 {
            return None;
        }
        Some(Self::at(x0 as u16, y0 as u16))
    }

    /// Overlap test against the generator's bounding box.
    pub fn intersects(&self, bbox: &ClipBox) -> bool {
        let (x0, y0, x1, y1) = (self.x0 as f32, self.y0 as f32, self.x1 as f32, self.y1 as f32);
        !(x1 < bbox.x0 || x0 > bbox.x1 || y1 < bbox.y0 || y0 > bbox.y1)
    }

    /// `TILE0` register word: `x0 << 16 | y0`.
    #[inline]
    pub fn pack0(&self) -> u32 {
        (self.x0 as u32) << 16 | self.y0 as u32
    }

    /// `TILE1` register word: `x1 << 16 | y1`.
    #[inline]
    pub fn pack1(&self) -> u32 {
        (self.x1 as u32) << 16 | self.y1 as u32
    }

    pub fn unpack(tile0: u32, tile1: u32) -> Self {
        Self {
            x0: (tile0 >> 16) as u16,
            y0: tile0 as u16,
            x1: (tile1 >> 16) as u16,
            y1: tile1 as u16,
        }
    }
}

/// Pixel coordinates of the four lanes of a 2x2 quad.
///
/// ```text
/// +---+---+
/// | 0 | 1 |
/// +---+---+
/// | 2 | 3 |
/// +---+---+
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HwQuad {
    pub x: u32,
    pub y: u32,
}

impl HwQuad {
    #[inline]
    pub fn lane(&self, lane: usize) -> (u32, u32) {
        (self.x + (lane as u32 & 1), self.y + (lane as u32 >> 1))
    }

    /// Bit `i` set when `test` holds for lane `i`.
    #[inline]
    pub fn lane_mask(&self, mut test: impl FnMut(u32, u32) -> bool) -> u8 {
        (0..4).fold(0u8, |mask, lane| {
            let (x, y) = self.lane(lane);
            mask | ((test(x, y) as u8) << lane)
        })
    }
}

/// Depth plane `z = a*x + b*y + c` in fixed point.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DepthCoef {
    pub a: i32,
    pub b: i32,
    pub c: i32,
}

impl DepthCoef {
    /// Plane through three window-space positions. A plane seen edge-on has
    /// no finite solution and collapses to zero coefficients.
    pub fn from_triangle(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let n = (v1 - v0).cross(v2 - v0);
        let scale = DEPTH_SCALE as f32;
        let (ac, bc) = (n.x / n.z, n.y / n.z);
        Self {
            a: (-ac * scale) as i32,
            b: (-bc * scale) as i32,
            c: ((v0.z + ac * v0.x + bc * v0.y) * scale) as i32,
        }
    }

    #[inline]
    pub fn eval(&self, x: u32, y: u32) -> i32 {
        self.a
            .wrapping_mul(x as i32)
            .wrapping_add(self.b.wrapping_mul(y as i32))
            .wrapping_add(self.c)
    }
}

/// Fixed-point depth of each lane.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DepthQuad(pub [i32; 4]);

impl DepthQuad {
    pub fn eval(coef: &DepthCoef, quad: &HwQuad) -> Self {
        Self(std::array::from_fn(|lane| {
            let (x, y) = quad.lane(lane);
            coef.eval(x, y)
        }))
    }

    pub fn to_float(self) -> [f32; 4] {
        self.0.map(|d| d as f32 / DEPTH_SCALE as f32)
    }
}

/// One stored quad.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct QuadBufferCell {
    /// Top-left pixel.
    pub x: u16,
    pub y: u16,
    /// Lane mask, bit per lane in [`HwQuad`] order.
    pub mask: u8,
    pub stencil: [u8; 4],
    pub depth: [f32; 4],
}

impl QuadBufferCell {
    /// `DATA_HIGH` word.
    #[inline]
    pub fn pack_position(&self) -> u32 {
        (self.x as u32) << 16 | self.y as u32
    }

    /// `DATA_LOW` word.
    #[inline]
    pub fn pack_mask(&self) -> u32 {
        (self.mask & 0xF) as u32
    }

    pub fn unpack(data_high: u32, data_low: u32) -> Self {
        Self {
            x: (data_high >> 16) as u16,
            y: data_high as u16,
            mask: (data_low & 0xF) as u8,
            ..Default::default()
        }
    }
}

/// Quads stored for one tile.
#[derive(Clone, Debug)]
pub struct QuadBuffer {
    cells: Vec<QuadBufferCell>,
    pub tile: Tile,
}

impl QuadBuffer {
    pub fn new() -> Self {
        Self {
            cells: Vec::with_capacity(QUAD_BUFFER_CAPACITY),
            tile: Tile::default(),
        }
    }

    pub fn reset(&mut self, tile: Tile) {
        self.cells.clear();
        self.tile = tile;
    }

    pub(crate) fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn push(&mut self, cell: QuadBufferCell) -> Result<()> {
        if self.cells.len() >= QUAD_BUFFER_CAPACITY {
            return Err(RasterError::QuadBufferOverflow {
                x0: self.tile.x0,
                y0: self.tile.y0,
                capacity: QUAD_BUFFER_CAPACITY,
            });
        }
        self.cells.push(cell);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn cells(&self) -> &[QuadBufferCell] {
        &self.cells
    }
}

impl Default for QuadBuffer {
    fn default() -> Self {
        Self::new()
    }
}
