/// Datapath units of the tile model
///
/// Every unit is evaluated once per half clock cycle. Sequential units act
/// only on a rising clock edge; combinational ones recompute their outputs
/// on every evaluation. All signals live in [`Wires`]; a unit's private
/// registers live in the unit.
use glam::Vec3;

use super::types::{
    ClipBox, Command, DepthCoef, DepthQuad, HwEdge, HwQuad, QuadBuffer, QuadBufferCell, Tile,
};
use crate::error::Result;

/// Every signal and datapath value driven between units.
#[derive(Clone, Debug, Default)]
pub struct Wires {
    pub cmd: Command,

    // Controller outputs
    pub start_raster: bool,
    pub next_quad: bool,
    pub edge_test: bool,
    pub depth_test: bool,
    pub store_quad: bool,
    pub busy: bool,
    pub done: bool,

    // Unit outputs
    pub setup_done: bool,
    pub edges: [HwEdge; 3],
    pub quad_ready: bool,
    pub end_tile: bool,
    pub quad: HwQuad,
    pub edge_ready: [bool; 3],
    pub edge_mask: [u8; 3],
    pub draw_quad: bool,
    pub discard_quad: bool,
    pub quad_mask: u8,
    pub depth_ready: bool,
    pub depth_quad: DepthQuad,
    pub quad_stored: bool,
}

/// Rising-edge detector holding the clock level seen at the previous
/// evaluation.
#[derive(Copy, Clone, Debug, Default)]
pub struct ClockEdge {
    last: bool,
}

impl ClockEdge {
    #[inline]
    pub fn rising(&mut self, clock: bool) -> bool {
        let rose = clock && !self.last;
        self.last = clock;
        rose
    }
}

/// Latches the three triangle edges and acknowledges `start_raster`.
#[derive(Clone, Debug, Default)]
pub struct SetupUnit {
    clock: ClockEdge,
}

impl SetupUnit {
    pub fn eval(&mut self, clock: bool, vertices: &[Vec3; 3], w: &mut Wires) {
        let [v0, v1, v2] = *vertices;
        w.edges = [
            HwEdge::between(v0, v1),
            HwEdge::between(v1, v2),
            HwEdge::between(v2, v0),
        ];

        if self.clock.rising(clock) {
            w.setup_done = w.start_raster;
        }
    }
}

/// Walks the part of the tile inside the bounding box in 2x2 steps, one
/// quad per `next_quad` request.
#[derive(Clone, Debug, Default)]
pub struct QuadGenerator {
    clock: ClockEdge,
    generating: bool,
    // Wider than the tile coordinates so stepping past 65535 cannot wrap.
    i: u32,
    j: u32,
    x0: u32,
    x1: u32,
    y1: u32,
}

impl QuadGenerator {
    pub fn eval(&mut self, clock: bool, bbox: &ClipBox, tile: &Tile, w: &mut Wires) {
        if !self.clock.rising(clock) {
            return;
        }
        if !w.next_quad {
            w.quad_ready = false;
            return;
        }

        if !self.generating {
            w.end_tile = false;
            if !tile.intersects(bbox) {
                w.quad_ready = false;
                w.end_tile = true;
                return;
            }
            self.generating = true;

            let y0 = if tile.y0 as f32 <= bbox.y0 { bbox.y0 as u32 } else { tile.y0 as u32 };
            let x0 = if tile.x0 as f32 <= bbox.x0 { bbox.x0 as u32 } else { tile.x0 as u32 };
            self.x1 = if tile.x1 as f32 >= bbox.x1 { bbox.x1 as u32 } else { tile.x1 as u32 };
            self.y1 = if tile.y1 as f32 >= bbox.y1 { bbox.y1 as u32 } else { tile.y1 as u32 };
            // Even origins keep quads aligned however the tile was clipped.
            self.i = y0 & !1;
            self.x0 = x0 & !1;
            self.j = self.x0;
        }

        w.quad = HwQuad { x: self.j, y: self.i };
        self.j += 2;
        if self.j > self.x1 {
            self.j = self.x0;
            self.i += 2;
            if self.i > self.y1 {
                w.end_tile = true;
                self.generating = false;
            }
        }
        w.quad_ready = true;
    }
}

/// Per-lane half-plane test against one edge. Purely combinational.
#[derive(Copy, Clone, Debug)]
pub struct EdgeTestUnit {
    pub edge: usize,
}

impl EdgeTestUnit {
    pub fn eval(&self, w: &mut Wires) {
        let edge = w.edges[self.edge];
        w.edge_mask[self.edge] = w.quad.lane_mask(|x, y| edge.test(x, y));
        w.edge_ready[self.edge] = w.edge_test;
    }
}

/// Combines the three edge masks. A lane survives when all three tests
/// agree, either all passing or all failing, so both windings rasterize.
#[derive(Clone, Debug, Default)]
pub struct TriangleEdgeTest {
    clock: ClockEdge,
}

impl TriangleEdgeTest {
    #[inline]
    pub fn combine(masks: [u8; 3]) -> u8 {
        let all_in = masks[0] & masks[1] & masks[2];
        let all_out = !(masks[0] | masks[1] | masks[2]) & 0xF;
        all_in | all_out
    }

    pub fn eval(&mut self, clock: bool, w: &mut Wires) {
        let mask = Self::combine(w.edge_mask);
        if !self.clock.rising(clock) {
            return;
        }

        if w.edge_ready.iter().all(|&ready| ready) {
            if mask != 0 {
                w.draw_quad = true;
                w.discard_quad = false;
                w.quad_mask = mask;
            } else {
                w.draw_quad = false;
                w.discard_quad = true;
            }
        } else {
            w.draw_quad = false;
            w.discard_quad = false;
        }
    }
}

/// Evaluates the depth plane at the four lanes when `depth_test` rises.
#[derive(Clone, Debug, Default)]
pub struct DepthTestUnit {
    clock: ClockEdge,
    last_request: bool,
}

impl DepthTestUnit {
    pub fn eval(&mut self, clock: bool, coef: &DepthCoef, w: &mut Wires) {
        if !self.clock.rising(clock) || w.depth_test == self.last_request {
            return;
        }
        self.last_request = w.depth_test;
        if w.depth_test {
            w.depth_quad = DepthQuad::eval(coef, &w.quad);
            w.depth_ready = true;
        } else {
            w.depth_ready = false;
        }
    }
}

/// Appends accepted quads to the tile's buffer.
#[derive(Clone, Debug, Default)]
pub struct QuadStoreUnit {
    clock: ClockEdge,
    last_start: bool,
    last_store: bool,
    pub buffer: QuadBuffer,
}

impl QuadStoreUnit {
    pub fn eval(&mut self, clock: bool, tile: &Tile, w: &mut Wires) -> Result<()> {
        // The buffer restarts with each raster command, independent of the
        // clock.
        if w.start_raster != self.last_start {
            self.last_start = w.start_raster;
            if w.start_raster {
                self.buffer.clear();
            }
        }

        if !self.clock.rising(clock) || w.store_quad == self.last_store {
            return Ok(());
        }
        self.last_store = w.store_quad;
        if w.store_quad {
            self.buffer.tile = *tile;
            self.buffer.push(QuadBufferCell {
                x: w.quad.x as u16,
                y: w.quad.y as u16,
                mask: w.quad_mask,
                stencil: [0; 4],
                depth: w.depth_quad.to_float(),
            })?;
            w.quad_stored = true;
        } else {
            w.quad_stored = false;
        }
        Ok(())
    }
}
