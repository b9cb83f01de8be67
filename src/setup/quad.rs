/// 2x2 pixel quads and the consumer interface they are delivered through
use super::coef::Interpolants;
use super::state::{Facing, Scissor};

/// Lane bits of a quad coverage mask.
pub const MASK_TOP_LEFT: u8 = 0x1;
pub const MASK_TOP_RIGHT: u8 = 0x2;
pub const MASK_BOTTOM_LEFT: u8 = 0x4;
pub const MASK_BOTTOM_RIGHT: u8 = 0x8;
pub const MASK_ALL: u8 = 0xF;

/// Quads handed to a consumer per call.
pub const MAX_QUADS: usize = 16;

/// Per-primitive fields shared by every quad it produces.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QuadHeader {
    pub layer: u32,
    pub viewport_index: usize,
    pub facing: Facing,
}

impl Default for QuadHeader {
    fn default() -> Self {
        Self {
            layer: 0,
            viewport_index: 0,
            facing: Facing::Front,
        }
    }
}

/// A 2x2 pixel block at even coordinates. Lane `i` sits at
/// `(x0 + (i & 1), y0 + (i >> 1))`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quad {
    pub x0: i32,
    pub y0: i32,
    pub mask: u8,
    pub coverage: [f32; 4],
    pub layer: u32,
    pub viewport_index: usize,
    pub facing: Facing,
}

impl Quad {
    #[inline]
    pub fn new(x0: i32, y0: i32, mask: u8, header: &QuadHeader) -> Self {
        Self {
            x0,
            y0,
            mask,
            coverage: [1.0; 4],
            layer: header.layer,
            viewport_index: header.viewport_index,
            facing: header.facing,
        }
    }

    #[inline]
    pub fn lane_position(&self, lane: usize) -> (i32, i32) {
        (self.x0 + (lane & 1) as i32, self.y0 + (lane >> 1) as i32)
    }

    /// Pixel coordinates of every live lane.
    pub fn covered_pixels(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..4)
            .filter(move |lane| self.mask & (1 << lane) != 0)
            .map(move |lane| self.lane_position(lane))
    }

    /// Clear lanes that fall outside `clip`.
    ///
    /// Clearing a lane that is already outside is a no-op, so clipping twice
    /// against the same rectangle changes nothing.
    pub fn clip(&mut self, clip: &Scissor) {
        if self.x0 >= clip.maxx
            || self.y0 >= clip.maxy
            || self.x0 + 1 < clip.minx
            || self.y0 + 1 < clip.miny
        {
            self.mask = 0;
            return;
        }

        if self.x0 < clip.minx {
            self.mask &= MASK_BOTTOM_RIGHT | MASK_TOP_RIGHT;
        }
        if self.y0 < clip.miny {
            self.mask &= MASK_BOTTOM_LEFT | MASK_BOTTOM_RIGHT;
        }
        if self.x0 == clip.maxx - 1 {
            self.mask &= MASK_BOTTOM_LEFT | MASK_TOP_LEFT;
        }
        if self.y0 == clip.maxy - 1 {
            self.mask &= MASK_TOP_LEFT | MASK_TOP_RIGHT;
        }
    }
}

/// Fixed-capacity batch of quads.
#[derive(Clone, Debug)]
pub struct QuadBatch {
    quads: [Quad; MAX_QUADS],
    len: usize,
}

impl QuadBatch {
    pub fn new() -> Self {
        let blank = Quad::new(0, 0, 0, &QuadHeader::default());
        Self {
            quads: [blank; MAX_QUADS],
            len: 0,
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == MAX_QUADS
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Append `quad`, handing it back if the batch is full.
    #[inline]
    pub fn push(&mut self, quad: Quad) -> Result<(), Quad> {
        if self.is_full() {
            return Err(quad);
        }
        self.quads[self.len] = quad;
        self.len += 1;
        Ok(())
    }

    /// Append `quad`, first passing a full batch to `emit` and starting over.
    #[inline]
    pub fn push_flushing<F>(&mut self, quad: Quad, emit: &mut F)
    where
        F: FnMut(&[Quad]),
    {
        if let Err(quad) = self.push(quad) {
            emit(self.as_slice());
            self.quads[0] = quad;
            self.len = 1;
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[Quad] {
        &self.quads[..self.len]
    }
}

impl Default for QuadBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Downstream fragment pipeline.
///
/// `begin` runs once per state preparation; `run` receives at most
/// [`MAX_QUADS`] quads together with the interpolants of the primitive that
/// produced them.
pub trait QuadStage {
    fn begin(&mut self) {}

    fn run(&mut self, quads: &[Quad], interp: &Interpolants);
}

/// Stage that keeps every quad it is handed.
#[derive(Clone, Debug, Default)]
pub struct QuadCollector {
    pub quads: Vec<Quad>,
    pub batches: usize,
    pub begun: usize,
    /// Interpolants seen with the most recent batch.
    pub last_interp: Option<Interpolants>,
}

impl QuadCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.quads.clear();
        self.batches = 0;
        self.last_interp = None;
    }

    /// Covered pixels, sorted row-major.
    pub fn covered_pixels(&self) -> Vec<(i32, i32)> {
        let mut pixels: Vec<(i32, i32)> = self
            .quads
            .iter()
            .flat_map(Quad::covered_pixels)
            .map(|(x, y)| (y, x))
            .collect();
        pixels.sort_unstable();
        pixels.into_iter().map(|(y, x)| (x, y)).collect()
    }

    /// `(x0, y0, mask)` of every quad, sorted.
    pub fn quad_keys(&self) -> Vec<(i32, i32, u8)> {
        let mut keys: Vec<_> = self.quads.iter().map(|q| (q.x0, q.y0, q.mask)).collect();
        keys.sort_unstable();
        keys
    }
}

impl QuadStage for QuadCollector {
    fn begin(&mut self) {
        self.begun += 1;
    }

    fn run(&mut self, quads: &[Quad], interp: &Interpolants) {
        self.batches += 1;
        self.quads.extend_from_slice(quads);
        self.last_interp = Some(interp.clone());
    }
}

/// Stage that drops everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullStage;

impl QuadStage for NullStage {
    #[inline]
    fn run(&mut self, _quads: &[Quad], _interp: &Interpolants) {}
}

/// Clip a single quad and forward it if any lane survives.
#[inline]
pub(crate) fn clip_emit<C: QuadStage>(
    mut quad: Quad,
    clip: &Scissor,
    interp: &Interpolants,
    consumer: &mut C,
) {
    quad.clip(clip);
    if quad.mask != 0 {
        crate::count_add!(quads_emitted, 1);
        consumer.run(std::slice::from_ref(&quad), interp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_at(x0: i32, y0: i32) -> Quad {
        Quad::new(x0, y0, MASK_ALL, &QuadHeader::default())
    }

    #[test]
    fn test_clip_inside_keeps_mask() {
        let mut q = quad_at(4, 4);
        q.clip(&Scissor::new(0, 0, 16, 16));
        assert_eq!(q.mask, MASK_ALL);
    }

    #[test]
    fn test_clip_outside_clears_mask() {
        for (x, y) in [(16, 4), (4, 16), (-2, 4), (4, -2)] {
            let mut q = quad_at(x, y);
            q.clip(&Scissor::new(0, 0, 16, 16));
            assert_eq!(q.mask, 0, "quad at ({x}, {y})");
        }
    }

    #[test]
    fn test_clip_partial_edges() {
        let clip = Scissor::new(1, 1, 5, 5);

        let mut left = quad_at(0, 2);
        left.clip(&clip);
        assert_eq!(left.mask, MASK_TOP_RIGHT | MASK_BOTTOM_RIGHT);

        let mut top = quad_at(2, 0);
        top.clip(&clip);
        assert_eq!(top.mask, MASK_BOTTOM_LEFT | MASK_BOTTOM_RIGHT);

        let mut corner = quad_at(4, 4);
        corner.clip(&clip);
        assert_eq!(corner.mask, MASK_TOP_LEFT);
    }

    #[test]
    fn test_clip_is_idempotent() {
        let clip = Scissor::new(3, 1, 9, 6);
        for y0 in (-4..10).step_by(2) {
            for x0 in (-4..12).step_by(2) {
                let mut once = quad_at(x0, y0);
                once.clip(&clip);
                let mut twice = once;
                twice.clip(&clip);
                assert_eq!(once.mask, twice.mask);
                for (x, y) in once.covered_pixels() {
                    assert!(clip.contains(x, y));
                }
            }
        }
    }

    #[test]
    fn test_lane_positions() {
        let q = quad_at(6, 10);
        assert_eq!(q.lane_position(0), (6, 10));
        assert_eq!(q.lane_position(1), (7, 10));
        assert_eq!(q.lane_position(2), (6, 11));
        assert_eq!(q.lane_position(3), (7, 11));
    }

    #[test]
    fn test_batch_capacity() {
        let mut batch = QuadBatch::new();
        for i in 0..MAX_QUADS {
            assert_eq!(batch.push(quad_at(i as i32 * 2, 0)), Ok(()));
        }
        assert!(batch.is_full());
        assert_eq!(batch.as_slice().len(), MAX_QUADS);

        // A full batch refuses the quad and hands it back intact.
        let extra = quad_at(100, 4);
        assert_eq!(batch.push(extra), Err(extra));
        assert_eq!(batch.len(), MAX_QUADS);

        batch.clear();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_push_flushing_never_drops_quads() {
        let mut batch = QuadBatch::new();
        let mut flushed: Vec<Vec<Quad>> = Vec::new();
        let mut emit = |quads: &[Quad]| flushed.push(quads.to_vec());
        for i in 0..(2 * MAX_QUADS + 3) {
            batch.push_flushing(quad_at(i as i32 * 2, 0), &mut emit);
        }
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.as_slice()[0].x0, 4 * MAX_QUADS as i32);

        assert_eq!(flushed.len(), 2);
        assert!(flushed.iter().all(|b| b.len() == MAX_QUADS));
        assert_eq!(flushed[1][0].x0, 2 * MAX_QUADS as i32);
    }
}
