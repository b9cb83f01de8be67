/// Software coprocessor behind the register interface
use std::collections::VecDeque;

use glam::Vec3;
use log::warn;

use super::registers::{self, unpack_xy, STATUS_DONE, STATUS_OVERFLOW};
use super::RegisterBus;
use crate::hw::{ClipBox, Command, DepthCoef, QuadBufferCell, RasterJob, RasterModel, Tile};

/// Register file backed by [`RasterModel`].
///
/// A RASTER command runs the model over the programmed tile and queues the
/// stored quads for the handshake. STATUS reports done once the tile is
/// rasterized and the queue is drained; PREPARE clears it. A tile that
/// overflows the model's quad buffer queues nothing and raises
/// [`STATUS_OVERFLOW`] alongside done.
#[derive(Clone, Debug)]
pub struct SimulatedCoprocessor {
    regs: Vec<u32>,
    model: RasterModel,
    fifo: VecDeque<QuadBufferCell>,
    raster_done: bool,
    overflow: bool,
    acked: bool,
    /// Register writes since the last reset pulse, for protocol checks.
    pub writes: Vec<(usize, u32)>,
    tiles: usize,
}

impl SimulatedCoprocessor {
    pub fn new() -> Self {
        Self {
            regs: vec![0; registers::REGISTER_WINDOW / 4],
            model: RasterModel::new(),
            fifo: VecDeque::new(),
            raster_done: false,
            overflow: false,
            acked: false,
            writes: Vec::new(),
            tiles: 0,
        }
    }

    /// Tiles rasterized since the last reset.
    pub fn tiles(&self) -> usize {
        self.tiles
    }

    #[inline]
    fn reg(&self, offset: usize) -> u32 {
        self.regs.get(offset / 4).copied().unwrap_or(0)
    }

    fn job(&self) -> RasterJob {
        let vertex = |regs: [usize; 3]| {
            let [x, y, z] = regs.map(|offset| (self.reg(offset) & 0xFFFF) as f32);
            Vec3::new(x, y, z)
        };
        let (x0, y0) = unpack_xy(self.reg(registers::CLIP_RECT0));
        let (x1, y1) = unpack_xy(self.reg(registers::CLIP_RECT1));
        RasterJob {
            vertices: registers::VERTEX.map(vertex),
            bbox: ClipBox {
                x0: x0 as f32,
                y0: y0 as f32,
                x1: x1 as f32,
                y1: y1 as f32,
            },
            depth: DepthCoef {
                a: self.reg(registers::DEPTH_COEF_A) as i32,
                b: self.reg(registers::DEPTH_COEF_B) as i32,
                c: self.reg(registers::DEPTH_COEF_C) as i32,
            },
        }
    }

    fn raster(&mut self) {
        let tile = Tile::unpack(self.reg(registers::TILE0), self.reg(registers::TILE1));
        let job = self.job();
        match self.model.run_tile(&job, tile) {
            Ok(buffer) => self.fifo.extend(buffer.cells().iter().copied()),
            Err(err) => {
                warn!("simulated coprocessor dropped tile ({}, {}): {err}", tile.x0, tile.y0);
                self.model.reset();
                self.overflow = true;
            }
        }
        self.tiles += 1;
        self.raster_done = true;
    }

    fn reset(&mut self) {
        self.model.reset();
        self.fifo.clear();
        self.raster_done = false;
        self.overflow = false;
        self.acked = false;
        self.tiles = 0;
    }
}

impl Default for SimulatedCoprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for SimulatedCoprocessor {
    fn read(&mut self, offset: usize) -> u32 {
        match offset {
            registers::STATUS => {
                if !self.raster_done || !self.fifo.is_empty() {
                    0
                } else if self.overflow {
                    STATUS_DONE | STATUS_OVERFLOW
                } else {
                    STATUS_DONE
                }
            }
            registers::REQ => (!self.fifo.is_empty() && !self.acked) as u32,
            registers::DATA_HIGH => self.fifo.front().map_or(0, QuadBufferCell::pack_position),
            registers::DATA_LOW => self.fifo.front().map_or(0, QuadBufferCell::pack_mask),
            _ => self.reg(offset),
        }
    }

    fn write(&mut self, offset: usize, value: u32) {
        if offset == registers::RESET && value == registers::RESET_ASSERT {
            self.writes.clear();
        }
        self.writes.push((offset, value));
        if let Some(reg) = self.regs.get_mut(offset / 4) {
            *reg = value;
        }

        match offset {
            registers::RESET if value == registers::RESET_ASSERT => self.reset(),
            registers::COMMAND => match Command::from_register(value) {
                Command::Raster => self.raster(),
                Command::Prepare => {
                    self.raster_done = false;
                    self.overflow = false;
                }
                Command::Nop => {}
            },
            registers::ACK => {
                if value != 0 && !self.acked && self.fifo.pop_front().is_some() {
                    self.acked = true;
                } else if value == 0 {
                    self.acked = false;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::registers::*;

    #[test]
    fn test_handshake_pops_one_quad_per_ack() {
        let mut dev = SimulatedCoprocessor::new();
        dev.fifo.extend([
            QuadBufferCell { x: 2, y: 4, mask: 0xF, ..Default::default() },
            QuadBufferCell { x: 4, y: 4, mask: 0x1, ..Default::default() },
        ]);
        dev.raster_done = true;

        assert_eq!(dev.read(STATUS), 0);
        assert_eq!(dev.read(REQ), 1);
        assert_eq!(dev.read(DATA_HIGH), 2 << 16 | 4);
        dev.write(ACK, 1);
        assert_eq!(dev.read(REQ), 0);
        dev.write(ACK, 1);
        assert_eq!(dev.fifo.len(), 1);
        dev.write(ACK, 0);
        assert_eq!(dev.read(REQ), 1);
        assert_eq!(dev.read(DATA_LOW), 0x1);
        dev.write(ACK, 1);
        dev.write(ACK, 0);
        assert_eq!(dev.read(STATUS), STATUS_DONE);
    }

    #[test]
    fn test_prepare_clears_done() {
        let mut dev = SimulatedCoprocessor::new();
        dev.write(TILE0, pack_xy(0, 0));
        dev.write(TILE1, pack_xy(62, 62));
        dev.write(CLIP_RECT1, pack_xy(8, 8));
        dev.write(V1X, 8);
        dev.write(V2Y, 8);
        dev.write(COMMAND, Command::Raster as u32);
        while dev.read(REQ) != 0 {
            dev.write(ACK, 1);
            dev.write(ACK, 0);
        }
        assert_eq!(dev.read(STATUS), STATUS_DONE);
        dev.write(COMMAND, Command::Prepare as u32);
        assert_eq!(dev.read(STATUS), 0);
        assert_eq!(dev.tiles(), 1);
    }

    #[test]
    fn test_overflowing_tile_latches_status() {
        let mut dev = SimulatedCoprocessor::new();
        // A tile larger than 64x64 stores more quads than the buffer holds.
        dev.write(TILE0, pack_xy(0, 0));
        dev.write(TILE1, pack_xy(126, 126));
        dev.write(CLIP_RECT1, pack_xy(128, 128));
        dev.write(V1X, 1000);
        dev.write(V2Y, 1000);
        dev.write(COMMAND, Command::Raster as u32);

        assert_eq!(dev.read(STATUS), STATUS_DONE | STATUS_OVERFLOW);
        assert_eq!(dev.read(REQ), 0);
        assert_eq!(dev.tiles(), 1);

        dev.write(COMMAND, Command::Prepare as u32);
        assert_eq!(dev.read(STATUS), 0);

        // The model was reset and rasterizes the next tile normally.
        dev.write(TILE1, pack_xy(62, 62));
        dev.write(CLIP_RECT1, pack_xy(8, 8));
        dev.write(COMMAND, Command::Raster as u32);
        assert_eq!(dev.read(REQ), 1);
        while dev.read(REQ) != 0 {
            dev.write(ACK, 1);
            dev.write(ACK, 0);
        }
        assert_eq!(dev.read(STATUS), STATUS_DONE);
    }
}
