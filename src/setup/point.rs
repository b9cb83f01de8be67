/// Point setup: one-pixel, square and round (antialiased) points
use super::coef::{compute_interpolants, AttributeSetup, InterpCoef, Vertex};
use super::context::{PrimOutcome, SetupContext};
use super::quad::{
    clip_emit, Quad, QuadHeader, QuadStage, MASK_BOTTOM_LEFT, MASK_BOTTOM_RIGHT, MASK_TOP_LEFT,
    MASK_TOP_RIGHT,
};
use super::span::block;
use super::state::{attr, live_slot, Facing};

/// Half the diagonal of a pixel; width of the antialiased band of round
/// points on either side of the radius.
const HALF_DIAGONAL: f32 = 0.7071;

/// A point's attributes are constant across its footprint.
#[derive(Copy, Clone, Debug)]
pub struct PointSetup<'a> {
    pub vertex: Vertex<'a>,
}

impl AttributeSetup for PointSetup<'_> {
    #[inline]
    fn provoking(&self) -> Vertex<'_> {
        self.vertex
    }

    #[inline]
    fn facing(&self) -> Facing {
        Facing::Front
    }

    fn position_coeff(&self, coef: &mut InterpCoef) {
        coef.set_constant(2, self.vertex[0].z);
        coef.set_constant(3, self.vertex[0].w);
    }

    fn linear(&self, coef: &mut InterpCoef, src: usize, channel: usize, _wrap: bool) {
        coef.set_constant(channel, attr(self.vertex, src)[channel]);
    }

    fn perspective(&self, coef: &mut InterpCoef, src: usize, channel: usize, _wrap: bool) {
        coef.set_constant(channel, attr(self.vertex, src)[channel] * self.vertex[0].w);
    }
}

/// The single lane containing `(x, y)`.
pub fn single_pixel_quad(x: f32, y: f32, header: &QuadHeader) -> Quad {
    let (px, py) = (x as i32, y as i32);
    let ix = px & 1;
    let iy = py & 1;
    Quad::new(px - ix, py - iy, (1u8 << ix) << (2 * iy), header)
}

/// Quads of an antialiased disc. Lanes in the band
/// `[half_size - 0.7071, half_size + 0.7071]` get linearly falling coverage,
/// lanes inside it get 1.0, lanes beyond it are not emitted.
pub fn round_point_quads<F>(x: f32, y: f32, half_size: f32, header: &QuadHeader, mut emit: F)
where
    F: FnMut(Quad),
{
    let ixmin = block((x - half_size) as i32);
    let ixmax = block((x + half_size) as i32);
    let iymin = block((y - half_size) as i32);
    let iymax = block((y + half_size) as i32);

    let rmin = half_size - HALF_DIAGONAL;
    let rmax = half_size + HALF_DIAGONAL;
    let rmin2 = (rmin * rmin).max(0.0);
    let rmax2 = rmax * rmax;
    let cscale = 1.0 / (rmax2 - rmin2);

    for iy in (iymin..=iymax).step_by(2) {
        for ix in (ixmin..=ixmax).step_by(2) {
            let mut quad = Quad::new(ix, iy, 0, header);
            quad.coverage = [0.0; 4];

            for lane in 0..4 {
                let (lx, ly) = quad.lane_position(lane);
                let dx = lx as f32 + 0.5 - x;
                let dy = ly as f32 + 0.5 - y;
                let dist2 = dx * dx + dy * dy;
                if dist2 <= rmax2 {
                    let cover = 1.0 - (dist2 - rmin2) * cscale;
                    quad.coverage[lane] = cover.min(1.0);
                    quad.mask |= 1 << lane;
                }
            }

            if quad.mask != 0 {
                emit(quad);
            }
        }
    }
}

/// Quads of an axis-aligned square of side `size`. The box is half-open:
/// its right column and bottom row are excluded.
pub fn square_point_quads<F>(x: f32, y: f32, size: f32, header: &QuadHeader, mut emit: F)
where
    F: FnMut(Quad),
{
    let half_size = 0.5 * size;
    let xmin = (x as f64 + 0.75 - half_size as f64) as i32;
    let ymin = (y as f64 + 0.25 - half_size as f64) as i32;
    let xmax = xmin + size as i32;
    let ymax = ymin + size as i32;

    let ixmin = block(xmin);
    let ixmax = block(xmax - 1);
    let iymin = block(ymin);
    let iymax = block(ymax - 1);

    for iy in (iymin..=iymax).step_by(2) {
        let mut row_mask = MASK_TOP_LEFT | MASK_TOP_RIGHT | MASK_BOTTOM_LEFT | MASK_BOTTOM_RIGHT;
        if iy < ymin {
            row_mask &= MASK_BOTTOM_LEFT | MASK_BOTTOM_RIGHT;
        }
        if iy + 1 >= ymax {
            row_mask &= MASK_TOP_LEFT | MASK_TOP_RIGHT;
        }

        for ix in (ixmin..=ixmax).step_by(2) {
            let mut mask = row_mask;
            if ix < xmin {
                mask &= MASK_BOTTOM_RIGHT | MASK_TOP_RIGHT;
            }
            if ix + 1 >= xmax {
                mask &= MASK_BOTTOM_LEFT | MASK_TOP_LEFT;
            }
            if mask != 0 {
                emit(Quad::new(ix, iy, mask, header));
            }
        }
    }
}

impl SetupContext {
    /// Set up and rasterize one point. Size comes from the point-size
    /// vertex slot when the layout names one, otherwise from state.
    pub fn setup_point<C: QuadStage>(&mut self, consumer: &mut C, v0: Vertex<'_>) -> PrimOutcome {
        crate::count_call!(points_setup);

        if self.discards() {
            return PrimOutcome::Discarded;
        }

        let rast = &self.state.rasterizer;
        let size = live_slot(self.state.layout.psize_slot)
            .map(|slot| attr(v0, slot).x)
            .unwrap_or(rast.point_size);
        let half_size = 0.5 * size;
        let round = rast.point_smooth;
        let (x, y) = (v0[0].x, v0[0].y);

        let point = PointSetup { vertex: v0 };
        compute_interpolants(
            &point,
            &self.state.linkage,
            self.state.framebuffer.height,
            &mut self.interp,
        );

        let header = self.header(v0, v0, Facing::Front);
        let clip = self.state.framebuffer.cliprect(header.viewport_index);
        let interp = &self.interp;

        if half_size <= 0.5 && !round {
            clip_emit(single_pixel_quad(x, y, &header), &clip, interp, consumer);
        } else if round {
            round_point_quads(x, y, half_size, &header, |q| clip_emit(q, &clip, interp, consumer));
        } else {
            square_point_quads(x, y, size, &header, |q| clip_emit(q, &clip, interp, consumer));
        }

        self.count_primitive();
        PrimOutcome::Rasterized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(f: impl FnOnce(&mut dyn FnMut(Quad))) -> Vec<Quad> {
        let mut out = Vec::new();
        f(&mut |q| out.push(q));
        out
    }

    #[test]
    fn test_single_pixel_lane() {
        let q = single_pixel_quad(5.7, 2.2, &QuadHeader::default());
        assert_eq!((q.x0, q.y0), (4, 2));
        assert_eq!(q.mask, MASK_TOP_RIGHT);
    }

    #[test]
    fn test_square_point_covers_size_squared() {
        let quads = collect(|emit| square_point_quads(8.0, 8.0, 4.0, &QuadHeader::default(), emit));
        let pixels: u32 = quads.iter().map(|q| q.mask.count_ones()).sum();
        assert_eq!(pixels, 16);
    }

    #[test]
    fn test_round_point_coverage_falls_off() {
        let quads = collect(|emit| round_point_quads(8.0, 8.0, 3.0, &QuadHeader::default(), emit));
        let mut center = None;
        let mut rim = f32::MAX;
        for q in &quads {
            for lane in 0..4 {
                if q.mask & (1 << lane) == 0 {
                    continue;
                }
                let (x, y) = q.lane_position(lane);
                if (x, y) == (7, 7) {
                    center = Some(q.coverage[lane]);
                }
                rim = rim.min(q.coverage[lane]);
            }
        }
        assert_eq!(center, Some(1.0));
        assert!(rim < 1.0 && rim >= 0.0);
    }
}
