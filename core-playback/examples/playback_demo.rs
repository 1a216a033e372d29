//! # Headless Playback Example
//!
//! Streams a synthesized tone through the software mixer and keeps a second
//! track matched to it, printing both cursors as the frame loop runs.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use bridge_desktop::SoftwareMixer;
use bridge_traits::{MemoryBundle, PcmFormat};
use core_playback::{Audio, AudioSettings, MediaObject};
use core_runtime::config::EngineConfig;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::io::Cursor;
use std::sync::Arc;

const RATE: u32 = 22_050;
/// Device frames rendered per simulated display frame (~60 Hz).
const FRAMES_PER_TICK: usize = RATE as usize / 60;

fn tone(frequency: f32, seconds: f32) -> anyhow::Result<Vec<u8>> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, spec)?;
    let frames = (RATE as f32 * seconds) as usize;
    for i in 0..frames {
        let t = i as f32 / RATE as f32;
        writer.write_sample(((2.0 * PI * frequency * t).sin() * 0.3 * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("core_playback=debug")
        .init();

    let bundle = MemoryBundle::new()
        .with_resource("music/theme.wav", tone(440.0, 2.0)?)
        .with_resource("music/theme_fifth.wav", tone(660.0, 2.0)?);
    let mixer = Arc::new(SoftwareMixer::new(PcmFormat::new(2, RATE)));
    let config = EngineConfig::builder()
        .bundle(Arc::new(bundle))
        .audio_output(mixer.clone())
        .build()?;

    let mut theme = Audio::with_settings(&config, AudioSettings::low_latency());
    theme.set_resource("music/theme.wav");
    theme.set_loopable(true);
    theme.load();
    theme.play();

    // Let the theme run for a while before the second voice joins in
    for _ in 0..30 {
        mixer.render_frames(FRAMES_PER_TICK);
        theme.update();
    }

    let mut fifth = Audio::with_settings(&config, AudioSettings::low_latency());
    fifth.set_resource("music/theme_fifth.wav");
    fifth.set_loopable(true);
    fifth.match_with(&theme);
    fifth.load();
    fifth.play();

    for tick in 0..240 {
        let out = mixer.render_frames(FRAMES_PER_TICK);
        theme.update();
        fifth.update();

        if tick % 30 == 0 {
            let peak = out.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
            println!(
                "tick {:>3}  theme {:>6.3}s  fifth {:>6.3}s  peak {:.2}",
                tick,
                theme.cursor_secs(),
                fifth.cursor_secs(),
                peak
            );
        }
    }

    fifth.unload();
    theme.unload();
    println!("voices left: {}", mixer.voice_count());
    Ok(())
}
