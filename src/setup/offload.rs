/// Triangle rasterization through the tile model or the coprocessor
use log::{debug, warn};

use super::coef::{Interpolants, Vertex};
use super::context::{PrimOutcome, SetupContext};
use super::quad::{Quad, QuadBatch, QuadHeader, QuadStage};
use super::state::Scissor;
use crate::error::Result;
use crate::hw::{QuadBuffer, RasterJob, RasterModel};
use crate::transport::{Coprocessor, DevMemWindow, RegisterBus, TransportConfig};

/// Back end that turns set-up triangles into quads.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RasterPath {
    /// Span scan conversion.
    #[default]
    Software,
    /// Clock-stepped tile model.
    Model,
    /// Coprocessor behind a register window.
    Coprocessor,
}

/// Collect a tile's stored quads, clipped and stamped with the primitive's
/// header.
fn gather_tile(buffer: &QuadBuffer, header: &QuadHeader, clip: &Scissor, out: &mut Vec<Quad>) {
    for cell in buffer.cells() {
        let mut quad = Quad::new(cell.x as i32, cell.y as i32, cell.mask, header);
        quad.clip(clip);
        if quad.mask != 0 {
            out.push(quad);
        }
    }
}

/// Hand quads to the consumer in batches of at most `MAX_QUADS`.
fn emit_batched<C: QuadStage>(quads: &[Quad], interp: &Interpolants, consumer: &mut C) {
    let mut batch = QuadBatch::new();
    let mut emit = |full: &[Quad]| consumer.run(full, interp);
    for &quad in quads {
        batch.push_flushing(quad, &mut emit);
    }
    if !batch.is_empty() {
        consumer.run(batch.as_slice(), interp);
    }
    crate::count_add!(quads_emitted, quads.len());
}

fn raster_job(v0: Vertex<'_>, v1: Vertex<'_>, v2: Vertex<'_>, clip: &Scissor) -> RasterJob {
    RasterJob::new(v0[0].truncate(), v1[0].truncate(), v2[0].truncate(), clip)
}

impl SetupContext {
    /// Set up a triangle and rasterize it with the tile model.
    ///
    /// Quads reach `consumer` only once every tile has completed, so a
    /// failed triangle emits nothing.
    pub fn raster_tri_model<C: QuadStage>(
        &mut self,
        model: &mut RasterModel,
        consumer: &mut C,
        v0: Vertex<'_>,
        v1: Vertex<'_>,
        v2: Vertex<'_>,
    ) -> Result<PrimOutcome> {
        let (_, header) = match self.begin_triangle(v0, v1, v2) {
            Ok(setup) => setup,
            Err(outcome) => return Ok(outcome),
        };

        let clip = self.state.framebuffer.cliprect(header.viewport_index);
        let job = raster_job(v0, v1, v2, &clip);
        let mut quads = Vec::new();
        let tiles = model.raster_triangle(&job, &clip, |buffer| {
            gather_tile(buffer, &header, &clip, &mut quads)
        })?;
        debug!("model rasterized {} quads over {tiles} tiles", quads.len());

        emit_batched(&quads, &self.interp, consumer);
        self.count_primitive();
        Ok(PrimOutcome::Rasterized)
    }

    /// Set up a triangle and rasterize it on the coprocessor.
    pub fn raster_tri_coprocessor<B: RegisterBus, C: QuadStage>(
        &mut self,
        hw: &mut Coprocessor<B>,
        consumer: &mut C,
        v0: Vertex<'_>,
        v1: Vertex<'_>,
        v2: Vertex<'_>,
    ) -> Result<PrimOutcome> {
        let (_, header) = match self.begin_triangle(v0, v1, v2) {
            Ok(setup) => setup,
            Err(outcome) => return Ok(outcome),
        };

        let clip = self.state.framebuffer.cliprect(header.viewport_index);
        let job = raster_job(v0, v1, v2, &clip);
        let mut quads = Vec::new();
        let tiles = hw.raster_triangle(&job, &clip, |buffer| {
            gather_tile(buffer, &header, &clip, &mut quads)
        })?;
        debug!("coprocessor rasterized {} quads over {tiles} tiles", quads.len());

        emit_batched(&quads, &self.interp, consumer);
        self.count_primitive();
        Ok(PrimOutcome::Rasterized)
    }
}

/// Sends triangles down the selected [`RasterPath`], falling back to the
/// software scan converter whenever a hardware path fails.
pub struct TriangleRouter<B = DevMemWindow> {
    path: RasterPath,
    model: RasterModel,
    coprocessor: Option<Coprocessor<B>>,
}

impl TriangleRouter<DevMemWindow> {
    /// Router for `path`. The coprocessor path maps the register window now;
    /// if that fails every triangle goes to software.
    pub fn open(path: RasterPath, config: &TransportConfig) -> Self {
        let coprocessor = if path == RasterPath::Coprocessor {
            match Coprocessor::open(config) {
                Ok(hw) => Some(hw),
                Err(err) => {
                    warn!("coprocessor unavailable, using software rasterization: {err}");
                    None
                }
            }
        } else {
            None
        };
        Self {
            path,
            model: RasterModel::new(),
            coprocessor,
        }
    }
}

impl<B: RegisterBus> TriangleRouter<B> {
    pub fn new(path: RasterPath) -> Self {
        Self {
            path,
            model: RasterModel::new(),
            coprocessor: None,
        }
    }

    pub fn with_coprocessor(hw: Coprocessor<B>) -> Self {
        Self {
            path: RasterPath::Coprocessor,
            model: RasterModel::new(),
            coprocessor: Some(hw),
        }
    }

    #[inline]
    pub fn path(&self) -> RasterPath {
        self.path
    }

    /// Whether triangles will actually reach the coprocessor.
    #[inline]
    pub fn has_coprocessor(&self) -> bool {
        self.coprocessor.is_some()
    }

    pub fn coprocessor(&self) -> Option<&Coprocessor<B>> {
        self.coprocessor.as_ref()
    }

    pub fn setup_tri<C: QuadStage>(
        &mut self,
        ctx: &mut SetupContext,
        consumer: &mut C,
        v0: Vertex<'_>,
        v1: Vertex<'_>,
        v2: Vertex<'_>,
    ) -> PrimOutcome {
        let result = match (self.path, self.coprocessor.as_mut()) {
            (RasterPath::Software, _) | (RasterPath::Coprocessor, None) => {
                return ctx.setup_tri(consumer, v0, v1, v2);
            }
            (RasterPath::Model, _) => ctx.raster_tri_model(&mut self.model, consumer, v0, v1, v2),
            (RasterPath::Coprocessor, Some(hw)) => ctx.raster_tri_coprocessor(hw, consumer, v0, v1, v2),
        };

        result.unwrap_or_else(|err| {
            warn!("{:?} rasterization failed, falling back to software: {err}", self.path);
            ctx.setup_tri(consumer, v0, v1, v2)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::quad::QuadCollector;
    use crate::setup::state::{FramebufferState, PipelineState};
    use crate::transport::SimulatedCoprocessor;
    use glam::{vec4, Vec4};

    fn vtx(x: f32, y: f32) -> [Vec4; 1] {
        [vec4(x, y, 0.0, 1.0)]
    }

    fn context(clip: Scissor) -> SetupContext {
        SetupContext::new(PipelineState::new(FramebufferState::with_size(256, 256).with_cliprect(clip)))
    }

    #[test]
    fn test_model_quads_are_clipped_and_batched() {
        let clip = Scissor::new(0, 0, 16, 16);
        let mut ctx = context(clip);
        let mut model = RasterModel::new();
        let mut sink = QuadCollector::new();

        let (a, b, c) = (vtx(0.0, 0.0), vtx(100.0, 0.0), vtx(0.0, 100.0));
        let outcome = ctx.raster_tri_model(&mut model, &mut sink, &a, &b, &c).unwrap();
        assert_eq!(outcome, PrimOutcome::Rasterized);

        // Quads the generator emits on the box's far edge are clipped away.
        assert_eq!(sink.quads.len(), 64);
        assert!(sink.quads.iter().all(|q| q.x0 < 16 && q.y0 < 16));
        assert_eq!(sink.batches, 4);
    }

    #[test]
    fn test_model_path_reports_culling() {
        let mut ctx = context(Scissor::new(0, 0, 16, 16));
        ctx.state.rasterizer.cull_face = crate::setup::state::CullFace::FrontAndBack;
        ctx.prepare(&mut QuadCollector::new());
        let mut model = RasterModel::new();
        let mut sink = QuadCollector::new();

        let (a, b, c) = (vtx(0.0, 0.0), vtx(8.0, 0.0), vtx(0.0, 8.0));
        let outcome = ctx.raster_tri_model(&mut model, &mut sink, &a, &b, &c).unwrap();
        assert_eq!(outcome, PrimOutcome::Culled);
        assert!(sink.quads.is_empty());
    }

    #[test]
    fn test_router_without_device_uses_software() {
        let mut router: TriangleRouter<SimulatedCoprocessor> = TriangleRouter::new(RasterPath::Coprocessor);
        assert!(!router.has_coprocessor());

        let mut ctx = context(Scissor::new(0, 0, 8, 8));
        let mut sink = QuadCollector::new();
        let (a, b, c) = (vtx(0.0, 0.0), vtx(4.0, 0.0), vtx(0.0, 4.0));
        assert_eq!(router.setup_tri(&mut ctx, &mut sink, &a, &b, &c), PrimOutcome::Rasterized);
        assert_eq!(sink.covered_pixels().len(), 10);
    }
}
