/// Register window mapped from a physical-memory device file
use std::fs::OpenOptions;
use std::ptr;

use log::debug;
use memmap2::{MmapOptions, MmapRaw};

use super::registers::REGISTER_WINDOW;
use super::{RegisterBus, TransportConfig};
use crate::error::TransportError;

/// A mapped coprocessor register window. Accesses are volatile 32-bit
/// loads and stores.
pub struct DevMemWindow {
    map: MmapRaw,
}

impl DevMemWindow {
    pub fn open(config: &TransportConfig) -> Result<Self, TransportError> {
        if config.span < REGISTER_WINDOW {
            return Err(TransportError::WindowTooSmall {
                span: config.span,
                offset: REGISTER_WINDOW,
            });
        }

        // No O_SYNC: the device file is opened with plain read/write access.
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|source| TransportError::Open {
                path: config.device.clone(),
                source,
            })?;

        let map = MmapOptions::new()
            .offset(config.base)
            .len(config.span)
            .map_raw(&file)
            .map_err(|source| TransportError::Map {
                base: config.base,
                span: config.span,
                source,
            })?;

        debug!(
            "mapped coprocessor window {:#x} (+{:#x}) from {}",
            config.base,
            config.span,
            config.device.display()
        );
        Ok(Self { map })
    }

    #[inline]
    fn register(&self, offset: usize) -> *mut u32 {
        debug_assert!(offset + 4 <= self.map.len() && offset % 4 == 0);
        // SAFETY: `open` checked the mapping covers every register offset and
        // the mapping is page aligned, so the word is in bounds and aligned.
        unsafe { self.map.as_mut_ptr().add(offset) as *mut u32 }
    }
}

impl RegisterBus for DevMemWindow {
    fn read(&mut self, offset: usize) -> u32 {
        // SAFETY: see `register`.
        unsafe { ptr::read_volatile(self.register(offset)) }
    }

    fn write(&mut self, offset: usize, value: u32) {
        // SAFETY: see `register`.
        unsafe { ptr::write_volatile(self.register(offset), value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_device_is_open_error() {
        let config = TransportConfig {
            device: PathBuf::from("/nonexistent/quad-setup/mem"),
            ..Default::default()
        };
        let err = DevMemWindow::open(&config).err().unwrap();
        assert!(matches!(err, TransportError::Open { .. }));
    }

    #[test]
    fn test_short_window_is_rejected() {
        let config = TransportConfig {
            span: 0x100,
            ..Default::default()
        };
        let err = DevMemWindow::open(&config).err().unwrap();
        assert!(matches!(err, TransportError::WindowTooSmall { span: 0x100, .. }));
    }
}
