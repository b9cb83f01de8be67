/// Pipeline state consumed by primitive setup
/// Rasterizer flags, framebuffer clip rectangles, fragment input linkage and vertex slot layout
use glam::Vec4;

/// Number of viewport / scissor slots addressable by a primitive.
pub const MAX_VIEWPORTS: usize = 16;

/// Which side of a primitive faces the viewer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Facing {
    Front,
    Back,
}

impl Facing {
    /// Facing from the signed screen-space determinant.
    ///
    /// A negative determinant is back-facing unless `front_ccw` flips the
    /// convention.
    #[inline]
    pub fn from_determinant(det: f32, front_ccw: bool) -> Self {
        if (det < 0.0) ^ front_ccw {
            Facing::Back
        } else {
            Facing::Front
        }
    }

    /// +1.0 for front, -1.0 for back. This is the value exposed to shaders
    /// through the face input.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Facing::Front => 1.0,
            Facing::Back => -1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CullFace {
    #[default]
    None,
    Front,
    Back,
    FrontAndBack,
}

impl CullFace {
    #[inline]
    pub fn culls(self, facing: Facing) -> bool {
        match self {
            CullFace::None => false,
            CullFace::Front => facing == Facing::Front,
            CullFace::Back => facing == Facing::Back,
            CullFace::FrontAndBack => true,
        }
    }
}

/// Polygon fill mode. Setup only culls in `Fill`; the other modes are
/// decomposed into lines and points upstream and must not be culled twice.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FillMode {
    #[default]
    Fill,
    Line,
    Point,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RasterizerState {
    pub front_ccw: bool,
    pub cull_face: CullFace,
    pub fill_front: FillMode,
    pub fill_back: FillMode,
    /// Pixel centers at +0.5 (true) or on integer coordinates (false).
    pub half_pixel_center: bool,
    /// Provoking vertex is the first vertex instead of the last.
    pub flatshade_first: bool,
    pub point_size: f32,
    pub point_smooth: bool,
    /// Bresenham lines include their end pixel.
    pub line_last_pixel: bool,
    pub rasterizer_discard: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            front_ccw: true,
            cull_face: CullFace::None,
            fill_front: FillMode::Fill,
            fill_back: FillMode::Fill,
            half_pixel_center: true,
            flatshade_first: false,
            point_size: 1.0,
            point_smooth: false,
            line_last_pixel: true,
            rasterizer_discard: false,
        }
    }
}

impl RasterizerState {
    /// Horizontal and vertical sample offset applied to vertex positions.
    #[inline]
    pub fn pixel_offset(&self) -> f32 {
        if self.half_pixel_center {
            0.5
        } else {
            0.0
        }
    }
}

/// Integer clip rectangle, inclusive min and exclusive max.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Scissor {
    pub minx: i32,
    pub miny: i32,
    pub maxx: i32,
    pub maxy: i32,
}

impl Scissor {
    pub const fn new(minx: i32, miny: i32, maxx: i32, maxy: i32) -> Self {
        Self { minx, miny, maxx, maxy }
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.minx && x < self.maxx && y >= self.miny && y < self.maxy
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.minx >= self.maxx || self.miny >= self.maxy
    }
}

/// Color or depth attachment with its array layer count.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SurfaceLayers {
    pub first_layer: u32,
    pub last_layer: u32,
}

impl SurfaceLayers {
    pub const fn single() -> Self {
        Self { first_layer: 0, last_layer: 0 }
    }

    #[inline]
    pub fn max_layer(&self) -> u32 {
        self.last_layer.saturating_sub(self.first_layer)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FramebufferState {
    pub width: u32,
    pub height: u32,
    /// Per-viewport clip rectangles. Missing entries fall back to the full
    /// framebuffer.
    pub cliprects: Vec<Scissor>,
    pub color_surfaces: Vec<SurfaceLayers>,
}

impl FramebufferState {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cliprects: vec![Scissor::new(0, 0, width as i32, height as i32)],
            color_surfaces: vec![SurfaceLayers::single()],
        }
    }

    pub fn with_cliprect(mut self, clip: Scissor) -> Self {
        self.cliprects = vec![clip];
        self
    }

    #[inline]
    pub fn bounds(&self) -> Scissor {
        Scissor::new(0, 0, self.width as i32, self.height as i32)
    }

    #[inline]
    pub fn cliprect(&self, viewport_index: usize) -> Scissor {
        self.cliprects
            .get(viewport_index)
            .copied()
            .unwrap_or_else(|| self.bounds())
    }

    /// Largest layer index every colour attachment can address. Unbounded
    /// without colour attachments.
    pub fn max_layer(&self) -> u32 {
        self.color_surfaces
            .iter()
            .map(SurfaceLayers::max_layer)
            .min()
            .unwrap_or(u32::MAX)
    }
}

/// How a fragment input varies across a primitive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interp {
    Constant,
    Linear,
    Perspective,
    /// Window-space fragment coordinate.
    Position,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Semantic {
    #[default]
    Generic,
    /// Front/back indicator; channel 0 is overwritten with +1 or -1.
    Face,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FragmentInput {
    /// Vertex slot the input reads from.
    pub src_index: usize,
    pub interp: Interp,
    /// Per-channel bitmask of cylindrical wrapping.
    pub cylindrical_wrap: u8,
    pub semantic: Semantic,
}

impl FragmentInput {
    pub const fn new(src_index: usize, interp: Interp) -> Self {
        Self {
            src_index,
            interp,
            cylindrical_wrap: 0,
            semantic: Semantic::Generic,
        }
    }

    pub const fn with_wrap(mut self, mask: u8) -> Self {
        self.cylindrical_wrap = mask;
        self
    }

    pub const fn with_semantic(mut self, semantic: Semantic) -> Self {
        self.semantic = semantic;
        self
    }

    #[inline]
    pub fn wraps(&self, channel: usize) -> bool {
        self.cylindrical_wrap & (1 << channel) != 0
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShaderLinkage {
    pub inputs: Vec<FragmentInput>,
    pub coord_origin_lower_left: bool,
    pub pixel_center_integer: bool,
}

impl ShaderLinkage {
    pub fn new(inputs: Vec<FragmentInput>) -> Self {
        Self {
            inputs,
            ..Default::default()
        }
    }
}

/// Optional vertex slots carrying per-primitive values. Slot 0 is always the
/// position, so a slot of 0 means absent as well.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub layer_slot: Option<usize>,
    pub viewport_index_slot: Option<usize>,
    pub psize_slot: Option<usize>,
}

#[inline]
pub(crate) fn live_slot(slot: Option<usize>) -> Option<usize> {
    slot.filter(|&s| s > 0)
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineState {
    pub rasterizer: RasterizerState,
    pub framebuffer: FramebufferState,
    pub linkage: ShaderLinkage,
    pub layout: VertexLayout,
    /// Rendering is switched off entirely (e.g. transform feedback only).
    pub no_rast: bool,
    pub statistics_enabled: bool,
}

impl PipelineState {
    pub fn new(framebuffer: FramebufferState) -> Self {
        Self {
            rasterizer: RasterizerState::default(),
            framebuffer,
            linkage: ShaderLinkage::default(),
            layout: VertexLayout::default(),
            no_rast: false,
            statistics_enabled: true,
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: RasterizerState) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_linkage(mut self, linkage: ShaderLinkage) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn with_layout(mut self, layout: VertexLayout) -> Self {
        self.layout = layout;
        self
    }
}

/// Attribute sample for `slot`, or zero when the vertex has no such slot.
#[inline]
pub(crate) fn attr(vertex: &[Vec4], slot: usize) -> Vec4 {
    debug_assert!(slot < vertex.len(), "vertex slot {slot} out of range");
    vertex.get(slot).copied().unwrap_or(Vec4::ZERO)
}
