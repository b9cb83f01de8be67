/// Triangle setup and software scan conversion
use log::trace;

use super::coef::{calc_det, compute_interpolants, sort_vertices, Rejection, TriangleSetup, Vertex};
use super::context::{PrimOutcome, SetupContext};
use super::quad::{Quad, QuadHeader, QuadStage};
use super::span::setup_tri_edges;

impl From<Rejection> for PrimOutcome {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::Degenerate => PrimOutcome::Degenerate,
            Rejection::Culled => PrimOutcome::Culled,
        }
    }
}

impl SetupContext {
    /// Sort, cull and solve coefficients. Shared by every triangle path.
    pub(crate) fn begin_triangle<'v>(
        &mut self,
        v0: Vertex<'v>,
        v1: Vertex<'v>,
        v2: Vertex<'v>,
    ) -> Result<(TriangleSetup<'v>, QuadHeader), PrimOutcome> {
        crate::count_call!(triangles_setup);

        if self.discards() {
            return Err(PrimOutcome::Discarded);
        }

        let det = calc_det(v0, v1, v2);
        let tri = match sort_vertices(det, v0, v1, v2, &self.state.rasterizer, self.cull_face()) {
            Ok(tri) => tri,
            Err(rejection) => {
                if rejection == Rejection::Culled {
                    crate::count_call!(primitives_culled);
                } else {
                    crate::count_call!(primitives_degenerate);
                }
                trace!("triangle rejected: {rejection:?} (det {det})");
                return Err(rejection.into());
            }
        };

        compute_interpolants(
            &tri,
            &self.state.linkage,
            self.state.framebuffer.height,
            &mut self.interp,
        );

        // The viewport index comes from the first vertex, the layer from the
        // provoking one.
        let header = self.header(tri.vprovoke, v0, tri.facing);
        Ok((tri, header))
    }

    /// Set up and scan-convert one triangle in software.
    ///
    /// Each vertex is a slice of attribute slots with the window-space
    /// position in slot 0. Quads go to `consumer` in batches, bottom row pair
    /// first.
    pub fn setup_tri<C: QuadStage>(
        &mut self,
        consumer: &mut C,
        v0: Vertex<'_>,
        v1: Vertex<'_>,
        v2: Vertex<'_>,
    ) -> PrimOutcome {
        let (mut tri, header) = match self.begin_triangle(v0, v1, v2) {
            Ok(setup) => setup,
            Err(outcome) => return outcome,
        };

        setup_tri_edges(&mut tri);

        let clip = self.state.framebuffer.cliprect(header.viewport_index);
        let major_on_left = tri.oneoverarea < 0.0;
        let bot_lines = tri.ebot.lines;
        let top_lines = tri.etop.lines;

        let interp = &self.interp;
        let mut emit = |quads: &[Quad]| consumer.run(quads, interp);

        self.scan.begin_primitive();
        let TriangleSetup { ebot, etop, emaj, .. } = &mut tri;
        if major_on_left {
            self.scan.subtriangle(emaj, ebot, bot_lines, &clip, &header, &mut emit);
            self.scan.subtriangle(emaj, etop, top_lines, &clip, &header, &mut emit);
        } else {
            self.scan.subtriangle(ebot, emaj, bot_lines, &clip, &header, &mut emit);
            self.scan.subtriangle(etop, emaj, top_lines, &clip, &header, &mut emit);
        }
        self.scan.flush_spans(&header, &mut emit);

        self.count_primitive();
        PrimOutcome::Rasterized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::quad::{QuadCollector, MASK_ALL};
    use crate::setup::state::{CullFace, FramebufferState, PipelineState, Scissor};
    use glam::{vec4, Vec4};

    fn vtx(x: f32, y: f32) -> [Vec4; 1] {
        [vec4(x, y, 0.0, 1.0)]
    }

    #[test]
    fn test_small_right_triangle() {
        let mut ctx = SetupContext::new(PipelineState::new(FramebufferState::with_size(8, 8)));
        let mut sink = QuadCollector::new();
        ctx.prepare(&mut sink);

        let (a, b, c) = (vtx(0.0, 0.0), vtx(4.0, 0.0), vtx(0.0, 4.0));
        assert_eq!(ctx.setup_tri(&mut sink, &a, &b, &c), PrimOutcome::Rasterized);

        assert_eq!(sink.covered_pixels().len(), 10);
        assert_eq!(
            sink.quad_keys(),
            vec![(0, 0, MASK_ALL), (0, 2, 0b0111), (2, 0, 0b0111)]
        );
        assert_eq!(ctx.stats().c_primitives, 1);
    }

    #[test]
    fn test_scissor_limits_rows_and_columns() {
        let fb = FramebufferState::with_size(8, 8).with_cliprect(Scissor::new(1, 1, 3, 3));
        let mut ctx = SetupContext::new(PipelineState::new(fb));
        let mut sink = QuadCollector::new();

        let (a, b, c) = (vtx(0.0, 0.0), vtx(8.0, 0.0), vtx(0.0, 8.0));
        ctx.setup_tri(&mut sink, &a, &b, &c);
        assert_eq!(sink.covered_pixels(), vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn test_culled_triangle_emits_nothing() {
        let mut state = PipelineState::new(FramebufferState::with_size(8, 8));
        state.rasterizer.cull_face = CullFace::FrontAndBack;
        let mut ctx = SetupContext::new(state);
        let mut sink = QuadCollector::new();

        let (a, b, c) = (vtx(0.0, 0.0), vtx(4.0, 0.0), vtx(0.0, 4.0));
        assert_eq!(ctx.setup_tri(&mut sink, &a, &b, &c), PrimOutcome::Culled);
        assert!(sink.quads.is_empty());
        assert_eq!(ctx.stats().c_primitives, 0);
    }
}
