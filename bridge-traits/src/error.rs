use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Output device rejected a call. `code` is the device-reported error code.
    #[error("Device call '{operation}' failed with code {code:#06x}")]
    Device { operation: String, code: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    pub fn device(operation: impl Into<String>, code: i32) -> Self {
        Self::Device {
            operation: operation.into(),
            code,
        }
    }

    /// Device-reported code, when the error came from an output device.
    pub fn device_code(&self) -> Option<i32> {
        match self {
            Self::Device { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
