//! Error types for the hardware paths.
//!
//! The software scan converter never fails: rejected primitives are reported
//! through [`PrimOutcome`](crate::setup::PrimOutcome). Only the tile model and
//! the coprocessor transport can produce errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while reaching the coprocessor register window.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open register device {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to map register window at {base:#x} (+{span:#x}): {source}")]
    Map {
        base: u64,
        span: usize,
        #[source]
        source: io::Error,
    },

    #[error("register window of {span:#x} bytes cannot hold register {offset:#x}")]
    WindowTooSmall { span: usize, offset: usize },

    #[error("coprocessor did not respond at register {register:#x} after {polls} polls")]
    Timeout { register: usize, polls: u64 },
}

/// Failures while rasterizing through the tile model or the coprocessor.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("quad buffer overflow in tile ({x0}, {y0}): capacity is {capacity} quads")]
    QuadBufferOverflow { x0: u16, y0: u16, capacity: usize },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, RasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_wraps_into_raster_error() {
        let err: RasterError = TransportError::Open {
            path: PathBuf::from("/dev/mem"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(matches!(err, RasterError::Transport(TransportError::Open { .. })));
        assert!(err.to_string().contains("/dev/mem"));
    }

    #[test]
    fn test_overflow_message_names_tile() {
        let err = RasterError::QuadBufferOverflow { x0: 64, y0: 128, capacity: 1024 };
        assert_eq!(
            err.to_string(),
            "quad buffer overflow in tile (64, 128): capacity is 1024 quads"
        );
    }

    #[test]
    fn test_timeout_message_names_register() {
        let err: RasterError = TransportError::Timeout { register: 0x20, polls: 500 }.into();
        assert_eq!(
            err.to_string(),
            "coprocessor did not respond at register 0x20 after 500 polls"
        );
    }
}
