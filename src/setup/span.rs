/// Span-based triangle scan conversion
///
/// Rows are accumulated two at a time into a [`SpanAccumulator`]. When the
/// walk moves on to the next pair of rows, the pair is flushed as batches of
/// 2x2 quads, one batch per 16-pixel horizontal chunk.
use super::coef::{Edge, TriangleSetup};
use super::quad::{Quad, QuadBatch, QuadHeader, MAX_QUADS};
use super::state::Scissor;

/// Sentinel `left` marking a row with no span.
const EMPTY_LEFT: i32 = 1_000_000;

/// Chunk width walked per flush step, in pixels.
const CHUNK: i32 = MAX_QUADS as i32;

/// Round down to the quad grid.
#[inline]
pub fn block(x: i32) -> i32 {
    x & !1
}

#[inline]
fn block_x(x: i32) -> i32 {
    x & !(CHUNK - 1)
}

/// Bits `0..n` set. Shifts of 32 or more saturate instead of wrapping.
#[inline]
fn low_bits(n: u32) -> u32 {
    if n >= 32 {
        u32::MAX
    } else {
        (1u32 << n) - 1
    }
}

/// Bits `n..32` set.
#[inline]
fn bits_from(n: u32) -> u32 {
    if n >= 32 {
        0
    } else {
        u32::MAX << n
    }
}

/// Left/right extents of the two rows of the current quad row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpanAccumulator {
    pub left: [i32; 2],
    pub right: [i32; 2],
    /// Even row index the spans belong to.
    pub y: i32,
}

impl SpanAccumulator {
    pub const fn new() -> Self {
        Self {
            left: [EMPTY_LEFT; 2],
            right: [0; 2],
            y: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left[0] >= self.right[0] && self.left[1] >= self.right[1]
    }

    #[inline]
    fn clear_rows(&mut self) {
        self.left = [EMPTY_LEFT; 2];
        self.right = [0; 2];
    }
}

impl Default for SpanAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute start rows, row counts and start x of the three edges.
pub fn setup_tri_edges(tri: &mut TriangleSetup<'_>) {
    let off = tri.pixel_offset;
    let vmin_x = tri.vmin[0].x + off;
    let vmid_x = tri.vmid[0].x + off;

    let vmin_y = tri.vmin[0].y - off;
    let vmid_y = tri.vmid[0].y - off;
    let vmax_y = tri.vmax[0].y - off;

    tri.emaj.prime(vmin_x, vmin_y, vmax_y);
    tri.etop.prime(vmid_x, vmid_y, vmax_y);
    tri.ebot.prime(vmin_x, vmin_y, vmid_y);
}

#[derive(Clone, Debug, Default)]
pub struct ScanConverter {
    span: SpanAccumulator,
    batch: QuadBatch,
}

impl ScanConverter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn span(&self) -> &SpanAccumulator {
        &self.span
    }

    /// Reset the accumulator row for a new primitive.
    pub fn begin_primitive(&mut self) {
        self.span.y = 0;
        self.span.clear_rows();
    }

    /// Walk `lines` rows between `eleft` and `eright`, clipped to `clip`,
    /// then advance both edges past them.
    ///
    /// Both edges must start on the same row.
    pub fn subtriangle<F>(
        &mut self,
        eleft: &mut Edge,
        eright: &mut Edge,
        lines: i32,
        clip: &Scissor,
        header: &QuadHeader,
        emit: &mut F,
    ) where
        F: FnMut(&[Quad]),
    {
        let sy = eleft.sy as i32;
        debug_assert_eq!(sy, eright.sy as i32);
        debug_assert!(lines >= 0);

        // Clip rows against the scissor up front so the inner loop only
        // clamps x.
        let start_y = sy.max(clip.miny) - sy;
        let finish_y = (sy + lines).min(clip.maxy) - sy;

        for y in start_y..finish_y {
            // Truncation toward zero, matching the x rounding of the edges.
            let left = ((eleft.sx + y as f32 * eleft.dxdy) as i32).max(clip.minx);
            let right = ((eright.sx + y as f32 * eright.dxdy) as i32).min(clip.maxx);

            if left < right {
                let row = sy + y;
                if block(row) != self.span.y {
                    self.flush_spans(header, emit);
                    self.span.y = block(row);
                }
                let r = (row & 1) as usize;
                self.span.left[r] = left;
                self.span.right[r] = right;
            }
        }

        eleft.sx += lines as f32 * eleft.dxdy;
        eright.sx += lines as f32 * eright.dxdy;
        eleft.sy += lines as f32;
        eright.sy += lines as f32;
    }

    /// Emit the accumulated row pair as quads and clear it.
    ///
    /// Quads whose mask would be zero are never emitted. Every pixel inside
    /// `[left, right)` of either row is covered by exactly one emitted lane.
    pub fn flush_spans<F>(&mut self, header: &QuadHeader, emit: &mut F)
    where
        F: FnMut(&[Quad]),
    {
        let [xleft0, xleft1] = self.span.left;
        let [xright0, xright1] = self.span.right;

        let minleft = block_x(xleft0.min(xleft1));
        let maxright = xright0.max(xright1);

        crate::count_call!(span_flushes);

        let mut x = minleft;
        while x < maxright {
            let skip_left0 = (xleft0 - x).clamp(0, CHUNK) as u32;
            let skip_left1 = (xleft1 - x).clamp(0, CHUNK) as u32;
            let skip_right0 = (x + CHUNK - xright0).clamp(0, CHUNK) as u32;
            let skip_right1 = (x + CHUNK - xright1).clamp(0, CHUNK) as u32;

            let chunk = CHUNK as u32;
            let mut mask0 = !low_bits(skip_left0) & !bits_from(chunk - skip_right0);
            let mut mask1 = !low_bits(skip_left1) & !bits_from(chunk - skip_right1);

            if mask0 | mask1 != 0 {
                self.batch.clear();
                let mut lx = x;
                loop {
                    let quadmask = ((mask0 & 3) | ((mask1 & 3) << 2)) as u8;
                    if quadmask != 0 {
                        self.batch.push_flushing(Quad::new(lx, self.span.y, quadmask, header), emit);
                    }
                    mask0 >>= 2;
                    mask1 >>= 2;
                    lx += 2;
                    if mask0 | mask1 == 0 {
                        break;
                    }
                }

                crate::count_add!(quads_emitted, self.batch.len());
                emit(self.batch.as_slice());
            }

            x += CHUNK;
        }

        self.span.clear_rows();
    }
}
