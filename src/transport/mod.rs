/// Register-level protocol to the rasterizer coprocessor
///
/// The host writes the triangle, clip rectangle, tile and depth plane to
/// fixed registers, issues RASTER, and then drains stored quads one at a
/// time over a REQ/ACK handshake until STATUS reports done.
pub mod driver;
pub mod mmio;
pub mod registers;
pub mod sim;

use std::path::PathBuf;

pub use driver::Coprocessor;
pub use mmio::DevMemWindow;
pub use sim::SimulatedCoprocessor;

/// Word access to the coprocessor's registers.
pub trait RegisterBus {
    fn read(&mut self, offset: usize) -> u32;
    fn write(&mut self, offset: usize, value: u32);
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    #[inline]
    fn read(&mut self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    #[inline]
    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Default bound on consecutive idle register reads in one poll loop.
pub const DEFAULT_POLL_LIMIT: u64 = 10_000_000;

/// Where the coprocessor's register window lives, and how long to wait on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    /// Physical-memory device file.
    pub device: PathBuf,
    /// Physical base address of the window.
    pub base: u64,
    /// Bytes mapped.
    pub span: usize,
    /// Register reads a poll loop may spend waiting on the device before
    /// giving up. `None` waits forever.
    pub poll_limit: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/mem"),
            base: 0xC000_0000,
            span: 0x1000,
            poll_limit: Some(DEFAULT_POLL_LIMIT),
        }
    }
}
