/// Register map of the rasterizer coprocessor
///
/// Byte offsets from the start of the mapped window. Every register is a
/// 32-bit word on a 16-byte stride.
pub const RESET: usize = 0x000;
pub const COMMAND: usize = 0x010;
pub const STATUS: usize = 0x020;

pub const V0X: usize = 0x030;
pub const V0Y: usize = 0x040;
pub const V0Z: usize = 0x050;
pub const V1X: usize = 0x060;
pub const V1Y: usize = 0x070;
pub const V1Z: usize = 0x080;
pub const V2X: usize = 0x090;
pub const V2Y: usize = 0x0A0;
pub const V2Z: usize = 0x0B0;

pub const CLIP_RECT0: usize = 0x0C0;
pub const CLIP_RECT1: usize = 0x0D0;
pub const TILE0: usize = 0x0E0;
pub const TILE1: usize = 0x0F0;

pub const DEPTH_COEF_A: usize = 0x100;
pub const DEPTH_COEF_B: usize = 0x110;
pub const DEPTH_COEF_C: usize = 0x120;

pub const QB_ADDR_HIGH: usize = 0x130;
pub const QB_ADDR_LOW: usize = 0x140;

// Quad store handshake
pub const REQ: usize = 0x150;
pub const DATA_HIGH: usize = 0x160;
pub const DATA_LOW: usize = 0x170;
pub const ACK: usize = 0x180;

/// Bytes a window must map to reach every register.
pub const REGISTER_WINDOW: usize = ACK + 4;

/// Vertex registers in `[v0x, v0y, v0z, v1x, ...]` order.
pub const VERTEX: [[usize; 3]; 3] = [[V0X, V0Y, V0Z], [V1X, V1Y, V1Z], [V2X, V2Y, V2Z]];

/// STATUS bit 0.
pub const STATUS_DONE: u32 = 1;
/// STATUS bit 1: the tile stored more quads than the quad buffer holds and
/// its quads were discarded. Raised together with done; PREPARE clears it.
pub const STATUS_OVERFLOW: u32 = 1 << 1;

/// `RESET` is active low.
pub const RESET_ASSERT: u32 = 0;
pub const RESET_RELEASE: u32 = 1;

/// Pack a coordinate pair as `x << 16 | (y & 0xFFFF)`.
#[inline]
pub fn pack_xy(x: i32, y: i32) -> u32 {
    (x as u32) << 16 | (y as u32 & 0xFFFF)
}

#[inline]
pub fn unpack_xy(word: u32) -> (u16, u16) {
    ((word >> 16) as u16, word as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers_are_word_aligned_and_distinct() {
        let mut all = vec![
            RESET, COMMAND, STATUS, CLIP_RECT0, CLIP_RECT1, TILE0, TILE1, DEPTH_COEF_A,
            DEPTH_COEF_B, DEPTH_COEF_C, QB_ADDR_HIGH, QB_ADDR_LOW, REQ, DATA_HIGH, DATA_LOW, ACK,
        ];
        all.extend(VERTEX.iter().flatten());
        assert!(all.iter().all(|offset| offset % 4 == 0 && *offset < REGISTER_WINDOW));
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 25);
    }

    #[test]
    fn test_pack_xy() {
        assert_eq!(pack_xy(64, 128), 0x0040_0080);
        assert_eq!(unpack_xy(pack_xy(300, 7)), (300, 7));
    }
}
