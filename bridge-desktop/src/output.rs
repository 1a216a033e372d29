//! Audio device output using `cpal`.
//!
//! `cpal` streams are not `Send`, so the stream lives on a dedicated output
//! thread for the lifetime of the [`CpalAudioOutput`]. Voice and buffer calls
//! go straight to the shared [`SoftwareMixer`]; the device callback pulls
//! mixed samples from it.

use crate::mixer::SoftwareMixer;
use bridge_traits::{
    audio::{AudioOutput, BufferId, PcmFormat, Vec3, VoiceId, VoiceState},
    error::{BridgeError, Result},
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// [`AudioOutput`] backed by the system's audio device.
pub struct CpalAudioOutput {
    mixer: Arc<SoftwareMixer>,
    device_name: String,
    error_flag: Arc<AtomicBool>,
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalAudioOutput {
    /// Open the named output device, or the default one when `device_name` is
    /// `None` or not found.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();
        let device = Self::select_device(&host, device_name)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let (config, sample_format) = Self::best_config(&device)?;

        let format = PcmFormat::new(config.channels, config.sample_rate.0);
        debug!(
            device = %device_name,
            sample_rate = format.sample_rate,
            channels = format.channels,
            sample_format = ?sample_format,
            "Audio device configuration"
        );

        let mixer = Arc::new(SoftwareMixer::new(format));
        let error_flag = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread_mixer = Arc::clone(&mixer);
        let thread_flag = Arc::clone(&error_flag);
        let thread = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream = match sample_format {
                    SampleFormat::F32 => {
                        build_stream::<f32>(&device, &config, thread_mixer, thread_flag)
                    }
                    SampleFormat::I16 => {
                        build_stream::<i16>(&device, &config, thread_mixer, thread_flag)
                    }
                    SampleFormat::U16 => {
                        build_stream::<u16>(&device, &config, thread_mixer, thread_flag)
                    }
                    other => Err(BridgeError::NotAvailable(format!(
                        "Unsupported sample format: {:?}",
                        other
                    ))),
                }
                .and_then(|stream| {
                    stream.play().map_err(|e| {
                        BridgeError::OperationFailed(format!("Failed to start stream: {}", e))
                    })?;
                    Ok(stream)
                });

                match stream {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        // Keep the stream alive until the output is dropped.
                        let _ = shutdown_rx.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(BridgeError::Io)?;

        ready_rx.recv().map_err(|_| {
            BridgeError::OperationFailed("Audio output thread exited during startup".to_string())
        })??;

        info!(device = %device_name, "Audio output started");

        Ok(Self {
            mixer,
            device_name,
            error_flag,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    fn select_device(host: &cpal::Host, device_name: Option<&str>) -> Result<Device> {
        if let Some(name) = device_name {
            let found = host
                .output_devices()
                .map_err(|e| {
                    BridgeError::NotAvailable(format!("Failed to enumerate devices: {}", e))
                })?
                .find(|d| d.name().ok().as_deref() == Some(name));

            match found {
                Some(device) => return Ok(device),
                None => warn!(
                    requested = name,
                    "Requested device not found, falling back to default device"
                ),
            }
        }

        host.default_output_device()
            .ok_or_else(|| BridgeError::NotAvailable("No default output device found".to_string()))
    }

    /// Prefer stereo f32 at the device's default rate.
    fn best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let default = device
            .default_output_config()
            .map_err(|e| BridgeError::NotAvailable(format!("Failed to get default config: {}", e)))?;
        let rate = default.sample_rate();

        let preferred = device
            .supported_output_configs()
            .map_err(|e| BridgeError::NotAvailable(format!("Failed to get device configs: {}", e)))?
            .find(|config| {
                config.channels() == 2
                    && config.min_sample_rate() <= rate
                    && config.max_sample_rate() >= rate
                    && config.sample_format() == SampleFormat::F32
            });

        if let Some(supported) = preferred {
            let format = supported.sample_format();
            return Ok((supported.with_sample_rate(rate).config(), format));
        }

        let format = default.sample_format();
        Ok((default.config(), format))
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn device_format(&self) -> PcmFormat {
        self.mixer.device_format()
    }

    /// Whether the device reported a stream error since the last
    /// [`clear_error`](Self::clear_error).
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::Relaxed)
    }

    pub fn clear_error(&self) {
        self.error_flag.store(false, Ordering::Relaxed);
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mixer: Arc<SoftwareMixer>,
    error_flag: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                mixer.render(&mut scratch);
                for (out, sample) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(*sample);
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_flag.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to build stream: {}", e)))
}

impl Drop for CpalAudioOutput {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

impl AudioOutput for CpalAudioOutput {
    fn create_voice(&self) -> Result<VoiceId> {
        self.mixer.create_voice()
    }

    fn destroy_voice(&self, voice: VoiceId) -> Result<()> {
        self.mixer.destroy_voice(voice)
    }

    fn create_buffers(&self, count: usize) -> Result<Vec<BufferId>> {
        self.mixer.create_buffers(count)
    }

    fn destroy_buffers(&self, buffers: &[BufferId]) -> Result<()> {
        self.mixer.destroy_buffers(buffers)
    }

    fn buffer_data(&self, buffer: BufferId, format: PcmFormat, samples: &[f32]) -> Result<()> {
        self.mixer.buffer_data(buffer, format, samples)
    }

    fn queue_buffers(&self, voice: VoiceId, buffers: &[BufferId]) -> Result<()> {
        self.mixer.queue_buffers(voice, buffers)
    }

    fn unqueue_buffers(&self, voice: VoiceId, count: usize) -> Result<Vec<BufferId>> {
        self.mixer.unqueue_buffers(voice, count)
    }

    fn buffers_processed(&self, voice: VoiceId) -> Result<usize> {
        self.mixer.buffers_processed(voice)
    }

    fn buffers_queued(&self, voice: VoiceId) -> Result<usize> {
        self.mixer.buffers_queued(voice)
    }

    fn play_voice(&self, voice: VoiceId) -> Result<()> {
        self.mixer.play_voice(voice)
    }

    fn pause_voice(&self, voice: VoiceId) -> Result<()> {
        self.mixer.pause_voice(voice)
    }

    fn stop_voice(&self, voice: VoiceId) -> Result<()> {
        self.mixer.stop_voice(voice)
    }

    fn voice_state(&self, voice: VoiceId) -> Result<VoiceState> {
        self.mixer.voice_state(voice)
    }

    fn sample_offset(&self, voice: VoiceId) -> Result<u64> {
        self.mixer.sample_offset(voice)
    }

    fn set_position(&self, voice: VoiceId, position: Vec3) -> Result<()> {
        self.mixer.set_position(voice, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires an audio device; CI machines usually have none.
    #[test]
    #[ignore]
    fn test_default_device_starts() {
        let output = CpalAudioOutput::new(None).unwrap();
        let voice = output.create_voice().unwrap();

        assert_eq!(output.voice_state(voice).unwrap(), VoiceState::Initial);
        assert!(!output.has_error());
    }
}
