use std::time::Duration;

use thiserror::Error;

use crate::scpi::scpi_error::{CommandError, InvalidFormatError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Requested transport is not supported by [`crate::protocols::connect`].
    #[error("invalid protocol {0}")]
    InvalidProtocol(String),
    #[error("transfer layer error: {0}")]
    Transport(#[from] std::io::Error),
    #[error(transparent)]
    InvalidFormat(#[from] InvalidFormatError),
    /// The instrument reported a fault for the last command.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// No operation-complete reply arrived in time.
    #[error("timeout: no operation complete reply within {0:?}")]
    Timeout(Duration),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("operation cancelled")]
    Cancelled,
    #[error("session closed")]
    Closed,
    #[error("only memory locations 0 to 9 are allowed, got {0}")]
    InvalidLocation(u8),
    #[error("unexpected response: {0:?}")]
    UnexpectedResponse(String),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::DeadlineExceeded => true,
            Error::Transport(e) => is_timeout_kind(e.kind()),
            _ => false,
        }
    }

    /// The device-side fault, if this error carries one.
    pub fn command_error(&self) -> Option<&CommandError> {
        match self {
            Error::Command(e) => Some(e),
            _ => None,
        }
    }
}

/// Socket timeouts surface as `WouldBlock` on unix and `TimedOut` on windows.
pub(crate) fn is_timeout_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}
