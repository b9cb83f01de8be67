/// Plane-equation coefficients for fragment inputs
///
/// Every fragment input `a` is described by `a(x, y) = a0 + dadx * x + dady * y`
/// in window coordinates, one plane per channel. Triangles solve the plane
/// from three samples, lines from two along the major axis, and points
/// collapse it to a constant.
use glam::Vec4;

use super::state::{attr, Facing, Interp, RasterizerState, Semantic, ShaderLinkage};

/// A vertex as consumed by setup: slot 0 is the window-space position with
/// `w` already holding `1/w`, the other slots are attributes.
pub type Vertex<'a> = &'a [Vec4];

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct InterpCoef {
    pub a0: Vec4,
    pub dadx: Vec4,
    pub dady: Vec4,
}

impl InterpCoef {
    /// Evaluate all four channels at window position `(x, y)`.
    #[inline]
    pub fn eval(&self, x: f32, y: f32) -> Vec4 {
        self.a0 + self.dadx * x + self.dady * y
    }

    #[inline]
    pub fn set(&mut self, channel: usize, a0: f32, dadx: f32, dady: f32) {
        self.a0[channel] = a0;
        self.dadx[channel] = dadx;
        self.dady[channel] = dady;
    }

    #[inline]
    pub fn set_constant(&mut self, channel: usize, value: f32) {
        self.set(channel, value, 0.0, 0.0);
    }
}

/// Coefficients of one primitive, shared by all of its quads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Interpolants {
    /// Window position; only `z` and `w` are solved.
    pub position: InterpCoef,
    /// One entry per linked fragment input.
    pub inputs: Vec<InterpCoef>,
}

impl Interpolants {
    fn reset(&mut self, count: usize) {
        self.position = InterpCoef::default();
        self.inputs.clear();
        self.inputs.resize(count, InterpCoef::default());
    }
}

/// One triangle edge walked from its lower to its upper vertex.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Edge {
    pub dx: f32,
    pub dy: f32,
    /// dx/dy, zero for horizontal edges.
    pub dxdy: f32,
    /// Start x at the first covered row, pixel offset applied.
    pub sx: f32,
    /// First covered row.
    pub sy: f32,
    pub lines: i32,
}

impl Edge {
    #[inline]
    fn between(from: Vec4, to: Vec4) -> Self {
        Self {
            dx: to.x - from.x,
            dy: to.y - from.y,
            ..Self::default()
        }
    }

    /// Position the edge at its first row center at or below `start_y` and
    /// count the rows down to `end_y`.
    #[inline]
    pub(crate) fn prime(&mut self, start_x: f32, start_y: f32, end_y: f32) {
        self.sy = start_y.ceil();
        self.lines = (end_y - self.sy).ceil() as i32;
        self.dxdy = if self.dy != 0.0 { self.dx / self.dy } else { 0.0 };
        self.sx = start_x + (self.sy - start_y) * self.dxdy;
    }
}

/// Signed double area of the screen-space triangle.
#[inline]
pub fn calc_det(v0: Vertex<'_>, v1: Vertex<'_>, v2: Vertex<'_>) -> f32 {
    let ex = v0[0].x - v2[0].x;
    let ey = v0[0].y - v2[0].y;
    let fx = v1[0].x - v2[0].x;
    let fy = v1[0].y - v2[0].y;
    ex * fy - ey * fx
}

/// Why a triangle produced no setup.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    Degenerate,
    Culled,
}

/// A triangle after vertex sorting, ready for coefficient solving and
/// scan conversion.
#[derive(Copy, Clone, Debug)]
pub struct TriangleSetup<'a> {
    pub vmin: Vertex<'a>,
    pub vmid: Vertex<'a>,
    pub vmax: Vertex<'a>,
    pub vprovoke: Vertex<'a>,
    /// vmin -> vmid
    pub ebot: Edge,
    /// vmid -> vmax
    pub etop: Edge,
    /// vmin -> vmax
    pub emaj: Edge,
    pub oneoverarea: f32,
    pub facing: Facing,
    pub pixel_offset: f32,
}

/// Order the vertices by ascending y, derive the three edges and decide
/// facing and culling.
///
/// The comparison chain keeps ties stable with respect to the original
/// vertex order, so a shared edge is always walked in the same direction by
/// both triangles that own it.
pub fn sort_vertices<'a>(
    det: f32,
    v0: Vertex<'a>,
    v1: Vertex<'a>,
    v2: Vertex<'a>,
    rast: &RasterizerState,
    cull: super::state::CullFace,
) -> Result<TriangleSetup<'a>, Rejection> {
    let y0 = v0[0].y;
    let y1 = v1[0].y;
    let y2 = v2[0].y;

    let (vmin, vmid, vmax) = if y0 <= y1 {
        if y1 <= y2 {
            (v0, v1, v2)
        } else if y2 <= y0 {
            (v2, v0, v1)
        } else {
            (v0, v2, v1)
        }
    } else if y0 <= y2 {
        (v1, v0, v2)
    } else if y2 <= y1 {
        (v2, v1, v0)
    } else {
        (v1, v2, v0)
    };

    let ebot = Edge::between(vmin[0], vmid[0]);
    let etop = Edge::between(vmid[0], vmax[0]);
    let emaj = Edge::between(vmin[0], vmax[0]);

    let area = emaj.dx * ebot.dy - ebot.dx * emaj.dy;
    let oneoverarea = 1.0 / area;

    // Zero area, or small enough that the reciprocal is unusable.
    if oneoverarea.is_nan() || oneoverarea.is_infinite() {
        return Err(Rejection::Degenerate);
    }

    let facing = Facing::from_determinant(det, rast.front_ccw);
    if cull.culls(facing) {
        return Err(Rejection::Culled);
    }

    let vprovoke = if rast.flatshade_first { v0 } else { v2 };

    Ok(TriangleSetup {
        vmin,
        vmid,
        vmax,
        vprovoke,
        ebot,
        etop,
        emaj,
        oneoverarea,
        facing,
        pixel_offset: rast.pixel_offset(),
    })
}

impl TriangleSetup<'_> {
    /// Gradient of the plane through `(vmin, v[0]) (vmid, v[1]) (vmax, v[2])`.
    #[inline]
    fn gradients(&self, v: [f32; 3]) -> (f32, f32) {
        let botda = v[1] - v[0];
        let majda = v[2] - v[0];
        let a = self.ebot.dy * majda - botda * self.emaj.dy;
        let b = self.emaj.dx * botda - majda * self.ebot.dx;
        (a * self.oneoverarea, b * self.oneoverarea)
    }

    #[inline]
    fn anchor(&self, coef: &mut InterpCoef, channel: usize, v0: f32, dadx: f32, dady: f32) {
        let x = self.vmin[0].x - self.pixel_offset;
        let y = self.vmin[0].y - self.pixel_offset;
        coef.set(channel, v0 - (dadx * x + dady * y), dadx, dady);
    }

    /// Solve `channel` of `coef` from samples at vmin, vmid and vmax.
    pub fn linear_coeff(&self, coef: &mut InterpCoef, channel: usize, v: [f32; 3]) {
        let (dadx, dady) = self.gradients(v);
        self.anchor(coef, channel, v[0], dadx, dady);
    }

    /// Like [`linear_coeff`](Self::linear_coeff) but each sample is first
    /// multiplied by its vertex's `1/w`, so the fragment stage divides by the
    /// interpolated `1/w`.
    pub fn persp_coeff(&self, coef: &mut InterpCoef, channel: usize, v: [f32; 3]) {
        let v = [
            v[0] * self.vmin[0].w,
            v[1] * self.vmid[0].w,
            v[2] * self.vmax[0].w,
        ];
        self.linear_coeff(coef, channel, v);
    }

    #[inline]
    fn samples(&self, src: usize, channel: usize) -> [f32; 3] {
        [
            attr(self.vmin, src)[channel],
            attr(self.vmid, src)[channel],
            attr(self.vmax, src)[channel],
        ]
    }
}

/// Shift samples on a unit cylinder so neighbouring pairs are at most half a
/// turn apart. Pairs are visited in order 0-1, 1-2, 2-0 and each step sees the
/// values shifted by the previous one.
pub fn tri_cylindrical_wrap(v: [f32; 3]) -> [f32; 3] {
    let [v0, v1, v2] = v;
    let [v0, v1] = line_cylindrical_wrap([v0, v1]);
    let [v1, v2] = line_cylindrical_wrap([v1, v2]);
    let [v2, v0] = line_cylindrical_wrap([v2, v0]);
    [v0, v1, v2]
}

/// Two-sample variant of [`tri_cylindrical_wrap`].
pub fn line_cylindrical_wrap(v: [f32; 2]) -> [f32; 2] {
    let [mut v0, mut v1] = v;
    let delta = v1 - v0;
    if delta.abs() > 0.5 {
        if delta > 0.0 {
            v0 += 1.0;
        } else {
            v1 += 1.0;
        }
    }
    [v0, v1]
}

/// Plane solvers shared by triangles, lines and points.
pub trait AttributeSetup {
    fn provoking(&self) -> Vertex<'_>;

    fn facing(&self) -> Facing;

    /// Window `z` and `1/w` planes.
    fn position_coeff(&self, coef: &mut InterpCoef);

    fn linear(&self, coef: &mut InterpCoef, src: usize, channel: usize, wrap: bool);

    fn perspective(&self, coef: &mut InterpCoef, src: usize, channel: usize, wrap: bool);
}

impl AttributeSetup for TriangleSetup<'_> {
    #[inline]
    fn provoking(&self) -> Vertex<'_> {
        self.vprovoke
    }

    #[inline]
    fn facing(&self) -> Facing {
        self.facing
    }

    fn position_coeff(&self, coef: &mut InterpCoef) {
        self.linear_coeff(coef, 2, [self.vmin[0].z, self.vmid[0].z, self.vmax[0].z]);
        self.linear_coeff(coef, 3, [self.vmin[0].w, self.vmid[0].w, self.vmax[0].w]);
    }

    fn linear(&self, coef: &mut InterpCoef, src: usize, channel: usize, wrap: bool) {
        let mut v = self.samples(src, channel);
        if wrap {
            v = tri_cylindrical_wrap(v);
        }
        self.linear_coeff(coef, channel, v);
    }

    fn perspective(&self, coef: &mut InterpCoef, src: usize, channel: usize, wrap: bool) {
        let mut v = self.samples(src, channel);
        if wrap {
            v = tri_cylindrical_wrap(v);
        }
        self.persp_coeff(coef, channel, v);
    }
}

/// Fragment-coordinate input: x and y follow the pixel grid, z and w copy the
/// position planes.
pub fn fragcoord_coeff(
    coef: &mut InterpCoef,
    position: &InterpCoef,
    linkage: &ShaderLinkage,
    fb_height: u32,
) {
    let center = if linkage.pixel_center_integer { 0.0 } else { 0.5 };

    coef.set(0, center, 1.0, 0.0);

    if linkage.coord_origin_lower_left {
        coef.set(1, fb_height as f32 - 1.0 + center, 0.0, -1.0);
    } else {
        coef.set(1, center, 0.0, 1.0);
    }

    coef.set(2, position.a0.z, position.dadx.z, position.dady.z);
    coef.set(3, position.a0.w, position.dadx.w, position.dady.w);
}

/// Flat value copied from the provoking vertex.
#[inline]
pub fn const_coeff(coef: &mut InterpCoef, vprovoke: Vertex<'_>, src: usize, channel: usize) {
    coef.set_constant(channel, attr(vprovoke, src)[channel]);
}

/// Solve every linked fragment input for one primitive.
pub fn compute_interpolants<S: AttributeSetup>(
    setup: &S,
    linkage: &ShaderLinkage,
    fb_height: u32,
    out: &mut Interpolants,
) {
    out.reset(linkage.inputs.len());
    setup.position_coeff(&mut out.position);

    for (coef, input) in out.inputs.iter_mut().zip(&linkage.inputs) {
        match input.interp {
            Interp::Constant => {
                for channel in 0..4 {
                    const_coeff(coef, setup.provoking(), input.src_index, channel);
                }
            }
            Interp::Linear => {
                for channel in 0..4 {
                    setup.linear(coef, input.src_index, channel, input.wraps(channel));
                }
            }
            Interp::Perspective => {
                for channel in 0..4 {
                    setup.perspective(coef, input.src_index, channel, input.wraps(channel));
                }
            }
            Interp::Position => fragcoord_coeff(coef, &out.position, linkage, fb_height),
        }

        if input.semantic == Semantic::Face {
            coef.set_constant(0, setup.facing().sign());
        }
    }
}
