// src/error.rs

//! Error type shared by every part of the emulator.
//!
//! Nothing here is recoverable: configuration and resource errors abort
//! construction, drawing errors abort the single call that produced them.

use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EpdError>;

#[derive(Debug, thiserror::Error)]
pub enum EpdError {
    /// The descriptor file could not be opened or read.
    #[error("failed to read display descriptor {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The descriptor file is not valid JSON or has fields of the wrong type.
    #[error("malformed display descriptor {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The descriptor parsed but describes an unusable display.
    #[error("invalid display descriptor {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("invalid emulator option: {0}")]
    InvalidOption(String),

    #[error("unknown color {0:?}")]
    UnknownColor(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("failed to open display window: {0}")]
    Window(String),

    #[error("failed to bind HTTP listener on port {port}: {reason}")]
    Bind { port: u16, reason: String },

    #[error("failed to spawn {name} thread")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode frame")]
    Encode(#[from] image::ImageError),

    /// A drawing closure panicked while holding the frame lock.
    #[error("frame lock poisoned by a panicking drawer")]
    Poisoned,

    #[error("display backend has been shut down")]
    ShutDown,
}

impl<T> From<std::sync::PoisonError<T>> for EpdError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        EpdError::Poisoned
    }
}
