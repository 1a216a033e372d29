//! # Format Detection Module
//!
//! Probe hints and codec classification for Symphonia.

use crate::error::{PlaybackError, Result};
use crate::traits::AudioCodec;
use std::path::Path;
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Format detection helpers.
pub struct FormatDetector;

impl FormatDetector {
    /// Create a probe hint from a resource name's extension.
    ///
    /// ```rust
    /// use core_playback::FormatDetector;
    ///
    /// let hint = FormatDetector::hint_from_name("music/theme.ogg");
    /// // Hint will contain extension "ogg"
    /// ```
    pub fn hint_from_name(name: &str) -> Hint {
        let mut hint = Hint::new();

        match Path::new(name).extension().and_then(|ext| ext.to_str()) {
            Some(extension) => {
                debug!(extension, "Setting probe hint extension");
                hint.with_extension(extension);
            }
            None => debug!("No extension on resource name, probe will auto-detect"),
        }

        hint
    }

    /// Map Symphonia's codec type onto [`AudioCodec`].
    pub fn detect_codec(codec_type: CodecType) -> AudioCodec {
        use symphonia::core::codecs::*;

        if codec_type == CODEC_TYPE_VORBIS {
            AudioCodec::Vorbis
        } else if [
            CODEC_TYPE_PCM_S16LE,
            CODEC_TYPE_PCM_S24LE,
            CODEC_TYPE_PCM_S32LE,
            CODEC_TYPE_PCM_U8,
            CODEC_TYPE_PCM_F32LE,
            CODEC_TYPE_PCM_F64LE,
            CODEC_TYPE_PCM_ALAW,
            CODEC_TYPE_PCM_MULAW,
        ]
        .contains(&codec_type)
        {
            AudioCodec::Pcm
        } else {
            warn!(?codec_type, "Unrecognized codec type");
            AudioCodec::Other(format!("{codec_type:?}"))
        }
    }

    /// Check that the codec's decoder is compiled in.
    pub fn validate_codec_support(codec: &AudioCodec) -> Result<()> {
        match codec {
            AudioCodec::Vorbis if cfg!(feature = "decoder-vorbis") => Ok(()),
            AudioCodec::Vorbis => Err(PlaybackError::UnsupportedCodec(
                "Vorbis decoder not enabled. Enable 'decoder-vorbis' feature".to_string(),
            )),
            AudioCodec::Pcm if cfg!(feature = "decoder-pcm") => Ok(()),
            AudioCodec::Pcm => Err(PlaybackError::UnsupportedCodec(
                "PCM decoder not enabled. Enable 'decoder-pcm' feature".to_string(),
            )),
            AudioCodec::Other(name) => Err(PlaybackError::UnsupportedCodec(format!(
                "Unsupported codec: {}",
                name
            ))),
        }
    }

    /// Usual file extension for a codec's container.
    pub fn codec_extension(codec: &AudioCodec) -> &'static str {
        match codec {
            AudioCodec::Vorbis => "ogg",
            AudioCodec::Pcm => "wav",
            AudioCodec::Other(_) => "bin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::codecs::{CODEC_TYPE_FLAC, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_VORBIS};

    #[test]
    fn test_hint_from_name() {
        // Hint is opaque; both paths must build one without panicking
        let _ = FormatDetector::hint_from_name("sfx/door.wav");
        let _ = FormatDetector::hint_from_name("no_extension");
    }

    #[test]
    fn test_detect_codec() {
        assert_eq!(FormatDetector::detect_codec(CODEC_TYPE_VORBIS), AudioCodec::Vorbis);
        assert_eq!(FormatDetector::detect_codec(CODEC_TYPE_PCM_S16LE), AudioCodec::Pcm);
        assert!(matches!(
            FormatDetector::detect_codec(CODEC_TYPE_FLAC),
            AudioCodec::Other(_)
        ));
    }

    #[test]
    fn test_codec_extension() {
        assert_eq!(FormatDetector::codec_extension(&AudioCodec::Vorbis), "ogg");
        assert_eq!(FormatDetector::codec_extension(&AudioCodec::Pcm), "wav");
    }

    #[test]
    fn test_codec_validation() {
        assert_eq!(
            FormatDetector::validate_codec_support(&AudioCodec::Pcm).is_ok(),
            cfg!(feature = "decoder-pcm")
        );
        assert!(matches!(
            FormatDetector::validate_codec_support(&AudioCodec::Other("flac".into())),
            Err(PlaybackError::UnsupportedCodec(_))
        ));
    }
}
