//! Failure bookkeeping shared by the engines.
//!
//! Engine operations never return errors. Each failure is logged where it
//! happens and remembered here so hosts can ask for the last one.

use crate::error::PlaybackError;
use parking_lot::Mutex;
use tracing::error;

#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    last_error: Mutex<Option<String>>,
}

impl Diagnostics {
    pub fn record(&self, err: &PlaybackError) {
        *self.last_error.lock() = Some(err.to_string());
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Pass a device call's value through, logging and recording a failure.
    ///
    /// Playback carries on after a failed device call, possibly silent.
    pub fn verify<T>(&self, operation: &str, result: bridge_traits::error::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                let err = PlaybackError::from(err);
                match &err {
                    PlaybackError::HardwareApi { code, .. } => {
                        error!(operation, code = format_args!("{:#06x}", code), "Device call failed")
                    }
                    other => error!(operation, error = %other, "Device call failed"),
                }
                self.record(&err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::BridgeError;

    #[test]
    fn test_verify_passes_values_through() {
        let diag = Diagnostics::default();
        assert_eq!(diag.verify("play_voice", Ok(3)), Some(3));
        assert_eq!(diag.last_error(), None);
    }

    #[test]
    fn test_verify_records_device_failure() {
        let diag = Diagnostics::default();
        let result: bridge_traits::error::Result<()> =
            Err(BridgeError::device("queue_buffers", 0xA003));

        assert_eq!(diag.verify("queue_buffers", result), None);
        assert_eq!(
            diag.last_error().as_deref(),
            Some("Hardware call 'queue_buffers' failed with code 0xa003")
        );
    }
}
