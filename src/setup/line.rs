/// Single-pixel lines: Bresenham stepping packed into rolling quads
use log::trace;

use super::coef::{compute_interpolants, line_cylindrical_wrap, AttributeSetup, Edge, InterpCoef, Vertex};
use super::context::{PrimOutcome, SetupContext};
use super::quad::{clip_emit, Quad, QuadHeader, QuadStage};
use super::state::{attr, Facing, RasterizerState, Scissor};

/// Line endpoints with the major-axis gradient solver.
#[derive(Copy, Clone, Debug)]
pub struct LineSetup<'a> {
    pub vmin: Vertex<'a>,
    pub vmax: Vertex<'a>,
    pub vprovoke: Vertex<'a>,
    pub emaj: Edge,
    /// Reciprocal of the squared length.
    pub oneoverarea: f32,
    pub pixel_offset: f32,
}

impl<'a> LineSetup<'a> {
    /// `None` for zero or non-finite length.
    pub fn new(v0: Vertex<'a>, v1: Vertex<'a>, rast: &RasterizerState) -> Option<Self> {
        let emaj = Edge {
            dx: v1[0].x - v0[0].x,
            dy: v1[0].y - v0[0].y,
            ..Edge::default()
        };
        let area = emaj.dx * emaj.dx + emaj.dy * emaj.dy;
        if area == 0.0 || !area.is_finite() {
            return None;
        }

        Some(Self {
            vmin: v0,
            vmax: v1,
            vprovoke: if rast.flatshade_first { v0 } else { v1 },
            emaj,
            oneoverarea: 1.0 / area,
            pixel_offset: rast.pixel_offset(),
        })
    }

    pub fn linear_coeff(&self, coef: &mut InterpCoef, channel: usize, v: [f32; 2]) {
        let da = v[1] - v[0];
        let dadx = da * self.emaj.dx * self.oneoverarea;
        let dady = da * self.emaj.dy * self.oneoverarea;
        let x = self.vmin[0].x - self.pixel_offset;
        let y = self.vmin[0].y - self.pixel_offset;
        coef.set(channel, v[0] - (dadx * x + dady * y), dadx, dady);
    }

    pub fn persp_coeff(&self, coef: &mut InterpCoef, channel: usize, v: [f32; 2]) {
        self.linear_coeff(coef, channel, [v[0] * self.vmin[0].w, v[1] * self.vmax[0].w]);
    }

    #[inline]
    fn samples(&self, src: usize, channel: usize, wrap: bool) -> [f32; 2] {
        let v = [attr(self.vmin, src)[channel], attr(self.vmax, src)[channel]];
        if wrap {
            line_cylindrical_wrap(v)
        } else {
            v
        }
    }
}

impl AttributeSetup for LineSetup<'_> {
    #[inline]
    fn provoking(&self) -> Vertex<'_> {
        self.vprovoke
    }

    #[inline]
    fn facing(&self) -> Facing {
        Facing::Front
    }

    fn position_coeff(&self, coef: &mut InterpCoef) {
        self.linear_coeff(coef, 2, [self.vmin[0].z, self.vmax[0].z]);
        self.linear_coeff(coef, 3, [self.vmin[0].w, self.vmax[0].w]);
    }

    fn linear(&self, coef: &mut InterpCoef, src: usize, channel: usize, wrap: bool) {
        self.linear_coeff(coef, channel, self.samples(src, channel, wrap));
    }

    fn perspective(&self, coef: &mut InterpCoef, src: usize, channel: usize, wrap: bool) {
        self.persp_coeff(coef, channel, self.samples(src, channel, wrap));
    }
}

/// Integer Bresenham walk from `(x0, y0)` towards `(x1, y1)`.
///
/// Without `include_last` the walk yields `max(|dx|, |dy|)` pixels and stops
/// one short of the end point, so connected strips do not touch the shared
/// vertex twice. Deltas are held in `i64`, so endpoints anywhere in the `i32`
/// range are walked without overflow.
#[derive(Clone, Debug)]
pub struct Bresenham {
    start: (i64, i64),
    xstep: i64,
    ystep: i64,
    x_major: bool,
    major: i64,
    minor: i64,
    /// Major and minor steps taken from `start`.
    step: i64,
    minor_taken: i64,
    error: i64,
    remaining: i64,
}

impl Bresenham {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32, include_last: bool) -> Self {
        let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();

        let x_major = dx > dy;
        let (major, minor) = if x_major { (dx, dy) } else { (dy, dx) };
        let remaining = if major == 0 {
            0
        } else {
            major + include_last as i64
        };

        Self {
            start: (x0, y0),
            xstep: if x1 < x0 { -1 } else { 1 },
            ystep: if y1 < y0 { -1 } else { 1 },
            x_major,
            major,
            minor,
            step: 0,
            minor_taken: 0,
            error: 2 * minor - major,
            remaining,
        }
    }

    /// Minor-axis steps taken after `step` major steps.
    #[inline]
    fn minor_steps(&self, step: i64) -> i64 {
        let num = 2 * step as i128 * self.minor as i128 + self.major as i128;
        (num / (2 * self.major as i128)) as i64
    }

    #[inline]
    fn position(&self, major_steps: i64, minor_steps: i64) -> (i64, i64) {
        let (x0, y0) = self.start;
        if self.x_major {
            (x0 + major_steps * self.xstep, y0 + minor_steps * self.ystep)
        } else {
            (x0 + minor_steps * self.xstep, y0 + major_steps * self.ystep)
        }
    }

    /// Jump `n` steps ahead without visiting the pixels in between.
    pub fn advance(&mut self, n: u64) {
        let n = (n.min(self.remaining as u64)) as i64;
        if n == 0 {
            return;
        }
        self.step += n;
        self.remaining -= n;
        self.minor_taken = self.minor_steps(self.step);
        let (step, minor, major) = (self.step as i128, self.minor as i128, self.major as i128);
        let error = 2 * minor * (step + 1) - major - 2 * self.minor_taken as i128 * major;
        self.error = error as i64;
    }

    /// Restrict the walk to pixels whose major-axis coordinate lies inside
    /// `clip`. Pixels outside on the minor axis are left to the quad clip.
    pub fn clipped(mut self, clip: &Scissor) -> Self {
        if self.remaining == 0 {
            return self;
        }
        let (lo, hi, origin, dir) = if self.x_major {
            (clip.minx as i64, clip.maxx as i64, self.start.0, self.xstep)
        } else {
            (clip.miny as i64, clip.maxy as i64, self.start.1, self.ystep)
        };
        // Steps k with origin + k * dir in [lo, hi).
        let (first, end) = if dir > 0 {
            (lo - origin, hi - origin)
        } else {
            (origin - hi + 1, origin - lo + 1)
        };
        let first = first.max(self.step);
        let end = end.min(self.step + self.remaining);
        if first >= end {
            self.remaining = 0;
            return self;
        }
        self.advance((first - self.step) as u64);
        self.remaining = end - first;
        self
    }
}

impl Iterator for Bresenham {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let (x, y) = Bresenham::position(self, self.step, self.minor_taken);
        if self.error >= 0 {
            self.error += 2 * (self.minor - self.major);
            self.minor_taken += 1;
        } else {
            self.error += 2 * self.minor;
        }
        self.step += 1;
        // Every visited pixel lies between two i32 endpoints.
        Some((x as i32, y as i32))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

/// Gathers consecutive pixels into one quad until a pixel lands in a
/// different 2x2 block.
#[derive(Clone, Debug)]
pub(crate) struct QuadPlotter {
    header: QuadHeader,
    current: Option<Quad>,
}

impl QuadPlotter {
    pub(crate) fn new(header: QuadHeader) -> Self {
        Self { header, current: None }
    }

    /// Add a pixel; returns the previous quad when the pixel starts a new one.
    pub(crate) fn plot(&mut self, x: i32, y: i32) -> Option<Quad> {
        let ix = x & 1;
        let iy = y & 1;
        let (qx, qy) = (x - ix, y - iy);
        let bit = (1u8 << ix) << (2 * iy);

        if let Some(quad) = self.current.as_mut() {
            if quad.x0 == qx && quad.y0 == qy {
                quad.mask |= bit;
                return None;
            }
        }
        self.current.replace(Quad::new(qx, qy, bit, &self.header))
    }

    pub(crate) fn finish(self) -> Option<Quad> {
        self.current.filter(|q| q.mask != 0)
    }
}

impl SetupContext {
    /// Set up and rasterize a one-pixel-wide line between the truncated
    /// endpoint positions.
    pub fn setup_line<C: QuadStage>(
        &mut self,
        consumer: &mut C,
        v0: Vertex<'_>,
        v1: Vertex<'_>,
    ) -> PrimOutcome {
        crate::count_call!(lines_setup);

        if self.discards() {
            return PrimOutcome::Discarded;
        }

        let (x0, y0) = (v0[0].x as i32, v0[0].y as i32);
        let (x1, y1) = (v1[0].x as i32, v1[0].y as i32);
        if x0 == x1 && y0 == y1 {
            crate::count_call!(primitives_degenerate);
            return PrimOutcome::Degenerate;
        }

        let Some(line) = LineSetup::new(v0, v1, &self.state.rasterizer) else {
            crate::count_call!(primitives_degenerate);
            return PrimOutcome::Degenerate;
        };

        compute_interpolants(
            &line,
            &self.state.linkage,
            self.state.framebuffer.height,
            &mut self.interp,
        );

        let header = self.header(line.vprovoke, line.vprovoke, Facing::Front);
        let clip = self.state.framebuffer.cliprect(header.viewport_index);
        let include_last = self.state.rasterizer.line_last_pixel;
        trace!("line ({x0}, {y0}) -> ({x1}, {y1}) last={include_last}");

        let mut plotter = QuadPlotter::new(header);
        for (x, y) in Bresenham::new(x0, y0, x1, y1, include_last).clipped(&clip) {
            if let Some(done) = plotter.plot(x, y) {
                clip_emit(done, &clip, &self.interp, consumer);
            }
        }
        if let Some(last) = plotter.finish() {
            clip_emit(last, &clip, &self.interp, consumer);
        }

        self.count_primitive();
        PrimOutcome::Rasterized
    }
}
