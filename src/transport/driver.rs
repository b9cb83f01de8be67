/// Host side of the coprocessor protocol
use log::{debug, trace};

use super::registers::{self, pack_xy, STATUS_DONE, STATUS_OVERFLOW};
use super::{DevMemWindow, RegisterBus, TransportConfig, DEFAULT_POLL_LIMIT};
use crate::error::{RasterError, Result, TransportError};
use crate::hw::{Command, QuadBuffer, QuadBufferCell, RasterJob, Tile, QUAD_BUFFER_CAPACITY};
use crate::perf::PerfTimer;
use crate::setup::state::Scissor;

/// Drives a coprocessor through its register window.
///
/// Each poll loop gives up with [`TransportError::Timeout`] after
/// `poll_limit` consecutive reads without progress.
pub struct Coprocessor<B> {
    bus: B,
    buffer: QuadBuffer,
    handshakes: u64,
    poll_limit: Option<u64>,
}

impl Coprocessor<DevMemWindow> {
    /// Map the physical register window described by `config`.
    pub fn open(config: &TransportConfig) -> std::result::Result<Self, TransportError> {
        let window = DevMemWindow::open(config)?;
        Ok(Self::new(window).with_poll_limit(config.poll_limit))
    }
}

impl<B: RegisterBus> Coprocessor<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            buffer: QuadBuffer::new(),
            handshakes: 0,
            poll_limit: Some(DEFAULT_POLL_LIMIT),
        }
    }

    /// Bound every poll loop to `limit` idle reads, or wait forever on `None`.
    pub fn with_poll_limit(mut self, limit: Option<u64>) -> Self {
        self.poll_limit = limit;
        self
    }

    #[inline]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }

    /// Quads transferred since construction.
    #[inline]
    pub fn handshakes(&self) -> u64 {
        self.handshakes
    }

    /// Pulse reset, then program vertices, clip rectangle, first tile and
    /// depth plane. Vertex coordinates are truncated to 16 bits.
    pub fn load_triangle(&mut self, job: &RasterJob, clip: &Scissor, tile: Tile) {
        self.bus.write(registers::RESET, registers::RESET_ASSERT);
        self.bus.write(registers::RESET, registers::RESET_RELEASE);

        for (vertex, regs) in job.vertices.iter().zip(registers::VERTEX) {
            for (value, offset) in vertex.to_array().into_iter().zip(regs) {
                self.bus.write(offset, value as u32 as u16 as u32);
            }
        }

        self.bus.write(registers::CLIP_RECT0, pack_xy(clip.minx, clip.miny));
        self.bus.write(registers::CLIP_RECT1, pack_xy(clip.maxx, clip.maxy));
        self.write_tile(tile);

        self.bus.write(registers::DEPTH_COEF_A, job.depth.a as u32);
        self.bus.write(registers::DEPTH_COEF_B, job.depth.b as u32);
        self.bus.write(registers::DEPTH_COEF_C, job.depth.c as u32);
        self.bus.write(registers::QB_ADDR_HIGH, 0);
        self.bus.write(registers::QB_ADDR_LOW, 0);
    }

    pub fn write_tile(&mut self, tile: Tile) {
        self.bus.write(registers::TILE0, tile.pack0());
        self.bus.write(registers::TILE1, tile.pack1());
    }

    /// Count one idle read of `register`, failing once the limit is spent.
    #[inline]
    fn idle(&self, register: usize, polls: &mut u64) -> std::result::Result<(), TransportError> {
        *polls += 1;
        match self.poll_limit {
            Some(limit) if *polls >= limit => Err(TransportError::Timeout { register, polls: *polls }),
            _ => {
                std::hint::spin_loop();
                Ok(())
            }
        }
    }

    /// Read `register` until `ready` accepts its value.
    fn wait_for<F>(&mut self, register: usize, ready: F) -> std::result::Result<u32, TransportError>
    where
        F: Fn(u32) -> bool,
    {
        let mut polls = 0;
        loop {
            let value = self.bus.read(register);
            if ready(value) {
                return Ok(value);
            }
            self.idle(register, &mut polls)?;
        }
    }

    /// Rasterize the programmed tile and collect its quads.
    ///
    /// Fails if the device reports that the tile overflowed its own quad
    /// buffer, if it sends more quads than the host buffer holds, or if a
    /// poll loop runs out of reads.
    pub fn raster_tile(&mut self, tile: Tile) -> Result<&QuadBuffer> {
        self.buffer.reset(tile);
        self.bus.write(registers::COMMAND, Command::Raster as u32);

        let mut polls = 0;
        let status = loop {
            let status = self.bus.read(registers::STATUS);
            if self.bus.read(registers::REQ) == 0 {
                if status & STATUS_DONE != 0 {
                    break status;
                }
                self.idle(registers::STATUS, &mut polls)?;
                continue;
            }
            polls = 0;

            let high = self.bus.read(registers::DATA_HIGH);
            let low = self.bus.read(registers::DATA_LOW);
            self.bus.write(registers::ACK, 1);
            self.wait_for(registers::REQ, |req| req == 0)?;
            self.bus.write(registers::ACK, 0);

            let cell = QuadBufferCell::unpack(high, low);
            trace!("quad ({}, {}) mask {:#06b}", cell.x, cell.y, cell.mask);
            self.buffer.push(cell)?;
            self.handshakes += 1;
            crate::count_call!(quads_transferred);
        };

        self.bus.write(registers::COMMAND, Command::Prepare as u32);
        self.wait_for(registers::STATUS, |status| status & STATUS_DONE == 0)?;

        if status & STATUS_OVERFLOW != 0 {
            return Err(RasterError::QuadBufferOverflow {
                x0: tile.x0,
                y0: tile.y0,
                capacity: QUAD_BUFFER_CAPACITY,
            });
        }
        debug!("tile ({}, {}): {} quads from coprocessor", tile.x0, tile.y0, self.buffer.len());
        Ok(&self.buffer)
    }

    /// Program `job` and walk every tile of `clip`, handing each tile's
    /// quads to `on_tile`. Returns the number of tiles visited.
    pub fn raster_triangle<F>(&mut self, job: &RasterJob, clip: &Scissor, mut on_tile: F) -> Result<usize>
    where
        F: FnMut(&QuadBuffer),
    {
        let mut timer = PerfTimer::new("coprocessor triangle");
        let mut tile = Tile::first(clip);
        self.load_triangle(job, clip, tile);

        let mut visited = 0;
        loop {
            let buffer = self.raster_tile(tile)?;
            timer.add_items(buffer.len());
            on_tile(buffer);
            visited += 1;
            match tile.next(clip) {
                Some(next) => {
                    tile = next;
                    self.write_tile(tile);
                }
                None => break,
            }
        }
        Ok(visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SimulatedCoprocessor;
    use glam::vec3;

    #[test]
    fn test_load_triangle_truncates_vertices() {
        let clip = Scissor::new(0, 0, 64, 64);
        let job = RasterJob::new(vec3(70000.5, 3.9, 0.0), vec3(8.0, 0.0, 1.0), vec3(0.0, 8.0, 0.0), &clip);
        let mut hw = Coprocessor::new(SimulatedCoprocessor::new());
        hw.load_triangle(&job, &clip, Tile::first(&clip));

        let dev = hw.bus();
        let written = |offset| dev.writes.iter().rev().find(|(o, _)| *o == offset).map(|&(_, v)| v);
        assert_eq!(written(registers::V0X), Some(70000 & 0xFFFF));
        assert_eq!(written(registers::V0Y), Some(3));
        assert_eq!(written(registers::CLIP_RECT1), Some(64 << 16 | 64));
        assert_eq!(dev.writes[..2], [(registers::RESET, 0), (registers::RESET, 1)]);
    }

    #[test]
    fn test_raster_tile_drains_device() {
        let clip = Scissor::new(0, 0, 8, 8);
        let job = RasterJob::new(vec3(0.0, 0.0, 0.0), vec3(8.0, 0.0, 0.0), vec3(0.0, 8.0, 0.0), &clip);
        let mut hw = Coprocessor::new(SimulatedCoprocessor::new());

        let tiles = hw.raster_triangle(&job, &clip, |buffer| assert_eq!(buffer.len(), 10)).unwrap();
        assert_eq!(tiles, 1);
        assert_eq!(hw.handshakes(), 10);
    }

    /// Device whose STATUS and REQ never change.
    struct FrozenDevice {
        status: u32,
        reads: u64,
    }

    impl RegisterBus for FrozenDevice {
        fn read(&mut self, offset: usize) -> u32 {
            self.reads += 1;
            if offset == registers::STATUS {
                self.status
            } else {
                0
            }
        }

        fn write(&mut self, _offset: usize, _value: u32) {}
    }

    #[test]
    fn test_silent_device_times_out() {
        let clip = Scissor::new(0, 0, 8, 8);
        let job = RasterJob::new(vec3(0.0, 0.0, 0.0), vec3(8.0, 0.0, 0.0), vec3(0.0, 8.0, 0.0), &clip);
        let mut hw = Coprocessor::new(FrozenDevice { status: 0, reads: 0 }).with_poll_limit(Some(100));

        let err = hw.raster_triangle(&job, &clip, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            RasterError::Transport(TransportError::Timeout { register: registers::STATUS, polls: 100 })
        ));
        // One STATUS and one REQ read per idle poll.
        assert_eq!(hw.bus().reads, 200);
    }

    #[test]
    fn test_done_that_never_clears_times_out() {
        let clip = Scissor::new(0, 0, 8, 8);
        let job = RasterJob::new(vec3(0.0, 0.0, 0.0), vec3(8.0, 0.0, 0.0), vec3(0.0, 8.0, 0.0), &clip);
        let mut hw =
            Coprocessor::new(FrozenDevice { status: STATUS_DONE, reads: 0 }).with_poll_limit(Some(10));

        let err = hw.raster_triangle(&job, &clip, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            RasterError::Transport(TransportError::Timeout { register: registers::STATUS, polls: 10 })
        ));
    }

    #[test]
    fn test_overflow_status_fails_tile() {
        let mut dev = SimulatedCoprocessor::new();
        dev.write(registers::CLIP_RECT1, pack_xy(128, 128));
        dev.write(registers::V1X, 1000);
        dev.write(registers::V2Y, 1000);
        dev.write(registers::TILE1, pack_xy(126, 126));

        let mut hw = Coprocessor::new(dev);
        let err = hw.raster_tile(Tile::at(0, 0)).unwrap_err();
        assert!(matches!(
            err,
            RasterError::QuadBufferOverflow { x0: 0, y0: 0, capacity: QUAD_BUFFER_CAPACITY }
        ));
        assert_eq!(hw.handshakes(), 0);

        // PREPARE was still issued.
        let mut dev = hw.into_inner();
        assert_eq!(dev.read(registers::STATUS), 0);
    }
}
