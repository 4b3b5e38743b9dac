//! Error taxonomy for a live session.
//!
//! Everything here is terminal for the current session. Nothing in the crate
//! retries: a failed open, a blank grab or a bad configuration ends the run.

use thiserror::Error;

pub const EXIT_USAGE: u8 = 1;
pub const EXIT_ENGINE: u8 = 2;
pub const EXIT_CONFIG: u8 = 3;
pub const EXIT_PERSISTENCE: u8 = 4;
/// The camera-open failure code (`-1` as seen by the shell).
pub const EXIT_DEVICE_OPEN: u8 = 255;

/// Failures that stop a session before or instead of running it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Usage(String),

    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("failed to construct tracking engine: {0:#}")]
    EngineConstruction(anyhow::Error),

    #[error("couldn't open the camera: {0:#}")]
    DeviceOpen(anyhow::Error),

    #[error("session already terminated")]
    AlreadyTerminated,
}

impl SessionError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionError::Usage(_) => EXIT_USAGE,
            SessionError::Config(_) => EXIT_CONFIG,
            SessionError::EngineConstruction(_) | SessionError::AlreadyTerminated => EXIT_ENGINE,
            SessionError::DeviceOpen(_) => EXIT_DEVICE_OPEN,
        }
    }
}

/// A single failed read from a frame source.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("end of stream")]
    EndOfStream,

    #[error("blank frame grabbed")]
    BlankFrame,

    #[error("capture failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame: {0}")]
    Malformed(String),
}
