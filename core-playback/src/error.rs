//! # Playback Error Types
//!
//! Error types for the audio and video engines.
//!
//! Public engine operations never return these; they log them and reflect
//! the outcome through state queries. Internal helpers propagate them with `?`.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading, decoding, or presenting media.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The bundle could not provide the resource bytes.
    #[error("Resource unavailable: {name}: {reason}")]
    ResourceUnavailable { name: String, reason: String },

    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// Container or stream headers were rejected.
    #[error("Invalid stream format: {0}")]
    StreamFormat(String),

    /// Codec is recognized but not decodable with the enabled features or
    /// injected capabilities.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    // ========================================================================
    // Decoding Errors
    // ========================================================================
    /// A packet failed to decode.
    #[error("Decoding error: {0}")]
    Decoding(String),

    // ========================================================================
    // Device Errors
    // ========================================================================
    /// An output device call failed.
    #[error("Hardware call '{operation}' failed with code {code:#06x}")]
    HardwareApi { operation: String, code: i32 },

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// Seek position is past the end of the stream.
    #[error("Seek position out of bounds: {0:?}")]
    SeekOutOfBounds(Duration),

    /// Operation needs a loaded resource.
    #[error("No resource loaded")]
    NotLoaded,

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge error: {0}")]
    Bridge(bridge_traits::BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<bridge_traits::BridgeError> for PlaybackError {
    fn from(err: bridge_traits::BridgeError) -> Self {
        match err {
            bridge_traits::BridgeError::Device { operation, code } => {
                PlaybackError::HardwareApi { operation, code }
            }
            other => PlaybackError::Bridge(other),
        }
    }
}

impl PlaybackError {
    /// Returns `true` for errors that make `load()` fail.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            PlaybackError::ResourceUnavailable { .. }
                | PlaybackError::StreamFormat(_)
                | PlaybackError::UnsupportedCodec(_)
        )
    }

    /// Returns `true` if an output device rejected a call.
    pub fn is_hardware(&self) -> bool {
        matches!(self, PlaybackError::HardwareApi { .. })
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
