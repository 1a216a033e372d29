//! # Symphonia Decoder Implementation
//!
//! Vorbis and PCM decode contexts reading through a [`ResourceSource`].

use crate::decoder::format_detector::FormatDetector;
use crate::decoder::sample_converter::SampleConverter;
use crate::error::{PlaybackError, Result};
use crate::resource::ResourceSource;
use crate::traits::{AudioDecoder, AudioDecoderFactory, AudioFormat, AudioFrameChunk};
use std::time::Duration;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::units::Time;
use tracing::{debug, error, info, instrument, warn};

/// Default number of consecutive bad packets tolerated before giving up.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Symphonia decode context implementing [`AudioDecoder`].
///
/// The decoder keeps the unread tail of the last decoded packet, so callers
/// can ask for any number of frames without losing audio at packet
/// boundaries.
pub struct SymphoniaDecoder {
    /// Format reader (demuxer); owns the media source stream
    format_reader: Box<dyn FormatReader>,

    decoder: Box<dyn Decoder>,

    track_id: u32,

    format: AudioFormat,

    converter: SampleConverter,

    /// Decoded samples not yet handed out
    pending: Vec<f32>,

    /// Read position inside `pending`, in samples
    pending_offset: usize,

    /// Frames to discard after an accurate seek landed early
    skip_frames: u64,

    /// Seek target not yet matched against a decoded packet timestamp
    seek_target: Option<u64>,

    /// Stream frame index of the next frame handed out
    position_frames: u64,

    max_consecutive_errors: usize,

    eof: bool,

    /// Resource name, for diagnostics
    source_info: String,
}

impl SymphoniaDecoder {
    /// Probe `source` and prepare a decoder for its first audio track.
    ///
    /// # Errors
    ///
    /// - `StreamFormat` if the container is not recognized or has no audio
    /// - `UnsupportedCodec` if the codec is not compiled in
    #[instrument(skip(source), fields(resource = %source.resource().name()))]
    pub fn open(source: ResourceSource) -> Result<Self> {
        let source_info = source.resource().name().to_string();
        let hint = FormatDetector::hint_from_name(&source_info);
        let mss = MediaSourceStream::new(Box::new(source), Default::default());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| {
                warn!("Format probe failed: {}", e);
                PlaybackError::StreamFormat(format!("Failed to probe {}: {}", source_info, e))
            })?;

        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                PlaybackError::StreamFormat(format!("No audio track in {}", source_info))
            })?;

        let track_id = track.id;
        let codec = FormatDetector::detect_codec(track.codec_params.codec);
        FormatDetector::validate_codec_support(&codec)?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| PlaybackError::StreamFormat("Missing sample rate".to_string()))?;

        // Channels may only be known after the first decode; corrected then
        let channels = track
            .codec_params
            .channels
            .map(|ch| ch.count() as u16)
            .unwrap_or(2);

        let mut format = AudioFormat::new(codec, sample_rate, channels)
            .with_total_frames(track.codec_params.n_frames);
        format.bits_per_sample = track.codec_params.bits_per_sample.map(|b| b as u16);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                PlaybackError::UnsupportedCodec(format!("Failed to create codec decoder: {}", e))
            })?;

        info!(
            codec = ?format.codec,
            sample_rate,
            channels,
            duration = ?format.duration(),
            "Decoder initialized"
        );

        Ok(Self {
            format_reader,
            decoder,
            track_id,
            format,
            converter: SampleConverter::new(),
            pending: Vec::new(),
            pending_offset: 0,
            skip_frames: 0,
            seek_target: None,
            position_frames: 0,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            eof: false,
            source_info,
        })
    }

    /// Override how many consecutive bad packets are skipped before
    /// `decode_frames` fails.
    pub fn with_max_consecutive_errors(mut self, max: usize) -> Self {
        self.max_consecutive_errors = max.max(1);
        self
    }

    fn channels(&self) -> usize {
        self.format.channels.max(1) as usize
    }

    fn pending_frames(&self) -> usize {
        (self.pending.len() - self.pending_offset) / self.channels()
    }

    /// Read and decode packets until one yields samples.
    ///
    /// Corrupt packets are skipped up to `max_consecutive_errors` in a row.
    /// Returns `Ok(false)` at the end of the stream.
    #[instrument(skip(self), level = "trace")]
    fn decode_next_packet(&mut self) -> Result<bool> {
        let mut consecutive_errors = 0;

        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    warn!("Decoder reset required for track list change");
                    return Err(PlaybackError::Decoding(
                        "Track list changed, reset required".to_string(),
                    ));
                }
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!(frames = self.position_frames, "Reached end of stream");
                    self.eof = true;
                    return Ok(false);
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        "Error reading packet (attempt {}/{}): {}",
                        consecutive_errors, self.max_consecutive_errors, e
                    );
                    if consecutive_errors >= self.max_consecutive_errors {
                        error!("Too many consecutive read errors in {}", self.source_info);
                        return Err(PlaybackError::Decoding(format!(
                            "Stream failure after {} attempts: {}",
                            consecutive_errors, e
                        )));
                    }
                    continue;
                }
            };

            // Drop metadata revisions read alongside the packet
            while !self.format_reader.metadata().is_latest() {
                self.format_reader.metadata().pop();
            }

            if packet.track_id() != self.track_id {
                continue;
            }

            let packet_ts = packet.ts();
            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let decoded_channels = decoded.spec().channels.count() as u16;
                    if self.format.channels != decoded_channels {
                        debug!(
                            from = self.format.channels,
                            to = decoded_channels,
                            "Updating channel count from decoded audio"
                        );
                        self.format.channels = decoded_channels;
                    }

                    let samples = self.converter.interleave(decoded);
                    self.pending.clear();
                    self.pending.extend_from_slice(samples);
                    self.pending_offset = 0;

                    // Codecs with overlapped windows emit nothing for the
                    // first packet after a reset, so the skip is measured
                    // from the first packet that produced audio.
                    if !self.pending.is_empty() {
                        if let Some(target) = self.seek_target.take() {
                            self.skip_frames = target.saturating_sub(packet_ts);
                            self.position_frames = target.max(packet_ts);
                        }
                    }

                    if self.skip_frames > 0 {
                        let skip = (self.skip_frames as usize).min(self.pending_frames());
                        self.pending_offset = skip * self.channels();
                        self.skip_frames -= skip as u64;
                    }

                    if self.pending_frames() == 0 {
                        continue;
                    }
                    return Ok(true);
                }
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_))
                    if consecutive_errors + 1 < self.max_consecutive_errors =>
                {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping bad packet (attempt {}/{})",
                        consecutive_errors, self.max_consecutive_errors
                    );
                    continue;
                }
                Err(e) => {
                    error!("Decode failed in {}: {}", self.source_info, e);
                    return Err(PlaybackError::Decoding(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            }
        }
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn format(&self) -> &AudioFormat {
        &self.format
    }

    fn decode_frames(&mut self, max_frames: usize) -> Result<Option<AudioFrameChunk>> {
        while self.pending_frames() == 0 {
            if self.eof || !self.decode_next_packet()? {
                return Ok(None);
            }
        }

        let frames = self.pending_frames().min(max_frames);
        let end = self.pending_offset + frames * self.channels();
        let samples = self.pending[self.pending_offset..end].to_vec();
        self.pending_offset = end;

        let chunk = AudioFrameChunk::new(samples, frames, self.position_frames);
        self.position_frames += frames as u64;
        Ok(Some(chunk))
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        if let Some(duration) = self.format.duration() {
            if position > duration {
                return Err(PlaybackError::SeekOutOfBounds(position));
            }
        }

        let time = Time::from(position.as_secs_f64());
        let seeked = self
            .format_reader
            .seek(SeekMode::Accurate, SeekTo::Time { time, track_id: Some(self.track_id) })
            .map_err(|e| PlaybackError::Decoding(format!("Seek failed: {}", e)))?;

        self.decoder.reset();
        self.pending.clear();
        self.pending_offset = 0;
        self.skip_frames = 0;
        self.seek_target = Some(seeked.required_ts);
        self.position_frames = seeked.required_ts;
        self.eof = false;

        debug!(
            ?position,
            frame = self.position_frames,
            landed = seeked.actual_ts,
            "Seek completed"
        );
        Ok(())
    }

    fn position_frame(&self) -> u64 {
        self.position_frames
    }
}

/// Default [`AudioDecoderFactory`] backed by Symphonia.
#[derive(Debug, Clone)]
pub struct SymphoniaFactory {
    max_consecutive_errors: usize,
}

impl SymphoniaFactory {
    pub fn new(max_consecutive_errors: usize) -> Self {
        Self {
            max_consecutive_errors,
        }
    }
}

impl Default for SymphoniaFactory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONSECUTIVE_ERRORS)
    }
}

impl AudioDecoderFactory for SymphoniaFactory {
    fn open(&self, source: ResourceSource) -> Result<Box<dyn AudioDecoder>> {
        let decoder =
            SymphoniaDecoder::open(source)?.with_max_consecutive_errors(self.max_consecutive_errors);
        Ok(Box::new(decoder))
    }
}
