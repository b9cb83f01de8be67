/// Per-pipeline setup context
///
/// Owns the interpolants of the primitive in flight, the span accumulator and
/// the decisions derived from state at `prepare` time. One context serves one
/// thread; use one context per worker for parallel setup.
use log::debug;

use super::coef::{Interpolants, Vertex};
use super::quad::{QuadHeader, QuadStage};
use super::span::ScanConverter;
use super::state::{attr, live_slot, CullFace, Facing, FillMode, PipelineState, MAX_VIEWPORTS};

/// Result of handing one primitive to setup.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrimOutcome {
    /// Quads (possibly none, if fully clipped) went to the consumer.
    Rasterized,
    /// Zero or non-finite area, or zero length.
    Degenerate,
    Culled,
    /// Rasterization is disabled by state.
    Discarded,
}

/// Pipeline statistics maintained by setup.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimitiveStats {
    /// Primitives that reached scan conversion.
    pub c_primitives: u64,
}

pub struct SetupContext {
    pub(crate) state: PipelineState,
    pub(crate) interp: Interpolants,
    pub(crate) scan: ScanConverter,
    cull_face: CullFace,
    max_layer: u32,
    stats: PrimitiveStats,
}

impl SetupContext {
    pub fn new(state: PipelineState) -> Self {
        let mut ctx = Self {
            state,
            interp: Interpolants::default(),
            scan: ScanConverter::new(),
            cull_face: CullFace::None,
            max_layer: 0,
            stats: PrimitiveStats::default(),
        };
        ctx.derive_state();
        ctx
    }

    #[inline]
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Replace the pipeline state. Call [`prepare`](Self::prepare) before the
    /// next primitive.
    pub fn set_state(&mut self, state: PipelineState) {
        self.state = state;
    }

    /// Re-derive cull mode and layer clamp from state and start the consumer.
    pub fn prepare<C: QuadStage>(&mut self, consumer: &mut C) {
        self.derive_state();
        consumer.begin();
        debug!(
            "setup prepared: cull={:?} max_layer={} inputs={}",
            self.cull_face,
            self.max_layer,
            self.state.linkage.inputs.len()
        );
    }

    fn derive_state(&mut self) {
        let rast = &self.state.rasterizer;
        // Unfilled polygons arrive here already decomposed and were culled
        // before decomposition.
        self.cull_face = if rast.fill_front == FillMode::Fill && rast.fill_back == FillMode::Fill {
            rast.cull_face
        } else {
            CullFace::None
        };
        self.max_layer = self.state.framebuffer.max_layer();
        self.interp.inputs.clear();
    }

    #[inline]
    pub fn cull_face(&self) -> CullFace {
        self.cull_face
    }

    #[inline]
    pub fn max_layer(&self) -> u32 {
        self.max_layer
    }

    #[inline]
    pub fn stats(&self) -> PrimitiveStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = PrimitiveStats::default();
    }

    /// Interpolants of the most recently set up primitive.
    #[inline]
    pub fn interpolants(&self) -> &Interpolants {
        &self.interp
    }

    #[inline]
    pub(crate) fn discards(&self) -> bool {
        self.state.no_rast || self.state.rasterizer.rasterizer_discard
    }

    pub(crate) fn count_primitive(&mut self) {
        if self.state.statistics_enabled {
            self.stats.c_primitives += 1;
        }
    }

    /// Layer read from `layer_src`, viewport index from `viewport_src`. Both
    /// slots carry integers in the bit pattern of `x`.
    pub(crate) fn header(
        &self,
        layer_src: Vertex<'_>,
        viewport_src: Vertex<'_>,
        facing: Facing,
    ) -> QuadHeader {
        let layout = &self.state.layout;
        let layer = live_slot(layout.layer_slot)
            .map(|slot| attr(layer_src, slot).x.to_bits().min(self.max_layer))
            .unwrap_or(0);
        let viewport_index = live_slot(layout.viewport_index_slot)
            .map(|slot| clamp_viewport_index(attr(viewport_src, slot).x.to_bits()))
            .unwrap_or(0);
        QuadHeader {
            layer,
            viewport_index,
            facing,
        }
    }
}

/// Out-of-range viewport indices select viewport 0.
#[inline]
pub fn clamp_viewport_index(index: u32) -> usize {
    let index = index as usize;
    if index < MAX_VIEWPORTS {
        index
    } else {
        0
    }
}
