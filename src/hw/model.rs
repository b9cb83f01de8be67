/// Cycle-stepped tile rasterizer
use glam::Vec3;
use log::debug;

use super::control::{ControlState, RasterControl};
use super::types::{ClipBox, Command, DepthCoef, QuadBuffer, Tile};
use super::units::{
    DepthTestUnit, EdgeTestUnit, QuadGenerator, QuadStoreUnit, SetupUnit, TriangleEdgeTest, Wires,
};
use crate::error::Result;
use crate::perf::PerfTimer;
use crate::setup::state::Scissor;

/// Inputs for rasterizing one triangle: window-space vertices, the clip
/// bounding box and the depth plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RasterJob {
    pub vertices: [Vec3; 3],
    pub bbox: ClipBox,
    pub depth: DepthCoef,
}

impl RasterJob {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, clip: &Scissor) -> Self {
        Self {
            vertices: [v0, v1, v2],
            bbox: ClipBox::from(clip),
            depth: DepthCoef::from_triangle(v0, v1, v2),
        }
    }
}

/// The complete tile rasterizer: controller, datapath units and the wires
/// between them. All state is held here, so independent models never
/// interfere.
#[derive(Clone, Debug, Default)]
pub struct RasterModel {
    wires: Wires,
    clock: bool,
    control: RasterControl,
    setup: SetupUnit,
    quad_gen: QuadGenerator,
    depth_test: DepthTestUnit,
    triangle_test: TriangleEdgeTest,
    store: QuadStoreUnit,
    half_cycles: u64,
}

const EDGE_UNITS: [EdgeTestUnit; 3] = [
    EdgeTestUnit { edge: 0 },
    EdgeTestUnit { edge: 1 },
    EdgeTestUnit { edge: 2 },
];

impl RasterModel {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn wires(&self) -> &Wires {
        &self.wires
    }

    #[inline]
    pub fn state(&self) -> ControlState {
        self.control.state()
    }

    #[inline]
    pub fn done(&self) -> bool {
        self.wires.done
    }

    /// Half clock cycles simulated since construction.
    #[inline]
    pub fn half_cycles(&self) -> u64 {
        self.half_cycles
    }

    #[inline]
    pub fn quad_buffer(&self) -> &QuadBuffer {
        &self.store.buffer
    }

    /// Return every unit to its power-on state. The half-cycle count is
    /// kept.
    pub fn reset(&mut self) {
        *self = Self {
            half_cycles: self.half_cycles,
            ..Self::default()
        };
    }

    pub fn set_command(&mut self, cmd: Command) {
        self.wires.cmd = cmd;
    }

    /// Evaluate every unit once at the current clock level, then toggle the
    /// clock.
    pub fn step(&mut self, job: &RasterJob, tile: &Tile) -> Result<()> {
        let clock = self.clock;
        let w = &mut self.wires;

        self.control.eval(clock, w);
        self.setup.eval(clock, &job.vertices, w);
        self.quad_gen.eval(clock, &job.bbox, tile, w);
        for unit in &EDGE_UNITS {
            unit.eval(w);
        }
        self.triangle_test.eval(clock, w);
        self.depth_test.eval(clock, &job.depth, w);
        self.store.eval(clock, tile, w)?;

        self.clock = !clock;
        self.half_cycles += 1;
        Ok(())
    }

    /// Rasterize `tile` to completion.
    ///
    /// A model still holding `done` from the previous tile is sent PREPARE
    /// first; RASTER follows once `done` drops.
    pub fn run_tile(&mut self, job: &RasterJob, tile: Tile) -> Result<&QuadBuffer> {
        self.clock = false;
        self.store.buffer.reset(tile);
        let start = self.half_cycles;

        let mut next_raster = true;
        loop {
            if next_raster {
                if self.wires.done {
                    self.wires.cmd = Command::Prepare;
                } else {
                    self.wires.cmd = Command::Raster;
                    next_raster = false;
                }
            }
            self.step(job, &tile)?;
            if self.wires.done && !next_raster {
                break;
            }
        }

        crate::count_call!(model_tiles);
        crate::count_add!(model_half_cycles, self.half_cycles - start);
        debug!(
            "tile ({}, {}): {} quads in {} half cycles",
            tile.x0,
            tile.y0,
            self.store.buffer.len(),
            self.half_cycles - start
        );
        Ok(&self.store.buffer)
    }

    /// Walk every tile of `clip` in row-major order, handing each tile's
    /// quad buffer to `on_tile`. Returns the number of tiles visited; the
    /// first tile is always visited. A failed tile resets the model.
    pub fn raster_triangle<F>(&mut self, job: &RasterJob, clip: &Scissor, mut on_tile: F) -> Result<usize>
    where
        F: FnMut(&QuadBuffer),
    {
        let mut timer = PerfTimer::new("model triangle");
        let mut tile = Tile::first(clip);
        let mut visited = 0;
        loop {
            let stored = self.run_tile(job, tile).map(|buffer| {
                on_tile(buffer);
                buffer.len()
            });
            match stored {
                Ok(quads) => timer.add_items(quads),
                Err(err) => {
                    self.reset();
                    return Err(err);
                }
            }
            visited += 1;
            match tile.next(clip) {
                Some(next) => tile = next,
                None => break,
            }
        }
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    #[test]
    fn test_small_triangle_in_one_tile() {
        let clip = Scissor::new(0, 0, 8, 8);
        let job = RasterJob::new(vec3(0.0, 0.0, 0.0), vec3(8.0, 0.0, 0.0), vec3(0.0, 8.0, 0.0), &clip);
        let mut model = RasterModel::new();

        let buffer = model.run_tile(&job, Tile::first(&clip)).unwrap();
        assert_eq!(buffer.len(), 10);
        let mask_at = |x, y| buffer.cells().iter().find(|c| (c.x, c.y) == (x, y)).map(|c| c.mask);
        assert_eq!(mask_at(2, 2), Some(0xF));
        // Lanes on the edges themselves pass one test and fail another.
        assert_eq!(mask_at(0, 0), Some(0b1000));
        assert!(model.done());
        assert_eq!(model.state(), ControlState::Done);
    }

    #[test]
    fn test_model_reruns_after_done() {
        let clip = Scissor::new(0, 0, 16, 16);
        let job = RasterJob::new(vec3(0.0, 0.0, 0.0), vec3(100.0, 0.0, 0.0), vec3(0.0, 100.0, 0.0), &clip);
        let mut model = RasterModel::new();

        let first = model.run_tile(&job, Tile::first(&clip)).unwrap().len();
        let second = model.run_tile(&job, Tile::first(&clip)).unwrap().len();
        // The generator walks up to and including the box's right and
        // bottom bound: 9x9 quads.
        assert_eq!(first, 81);
        assert_eq!(first, second);
    }

    #[test]
    fn test_tile_outside_box_is_empty() {
        let clip = Scissor::new(0, 0, 16, 16);
        let job = RasterJob::new(vec3(0.0, 0.0, 0.0), vec3(100.0, 0.0, 0.0), vec3(0.0, 100.0, 0.0), &clip);
        let mut model = RasterModel::new();
        let buffer = model.run_tile(&job, Tile::at(128, 128)).unwrap();
        assert!(buffer.is_empty());
    }
}
