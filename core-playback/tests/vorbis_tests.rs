//! Ogg Vorbis playback against a checked-in clip.
//!
//! `silence_1280.ogg` is mono Vorbis at 1 kHz: 1280 frames of silence in
//! 128-frame packets, so one frame is one millisecond like the WAV fixtures.

mod common;

use bridge_traits::MemoryBundle;
use common::{wav, Harness};
use core_playback::{
    Audio, AudioCodec, AudioDecoder, AudioSettings, MediaObject, MediaState, Resource,
    ResourceSource, SymphoniaDecoder,
};
use std::time::Duration;

const CLIP: &[u8] = include_bytes!("fixtures/silence_1280.ogg");

fn settings() -> AudioSettings {
    AudioSettings {
        buffer_count: 3,
        buffer_frames: 100,
        ..Default::default()
    }
}

fn harness() -> Harness {
    Harness::new(
        MemoryBundle::new()
            .with_resource("silence.ogg", CLIP.to_vec())
            .with_resource("lead.wav", wav(2000, 0.5)),
    )
}

fn loaded(harness: &Harness, name: &str) -> Audio {
    let mut audio = Audio::with_settings(&harness.config, settings());
    audio.set_resource(name);
    audio.load();
    audio
}

fn open_clip() -> SymphoniaDecoder {
    SymphoniaDecoder::open(ResourceSource::new(Resource::from_bytes("silence.ogg", CLIP))).unwrap()
}

#[test]
fn test_decoder_reads_whole_clip() {
    let mut decoder = open_clip();
    let format = decoder.format().clone();
    assert_eq!(format.codec, AudioCodec::Vorbis);
    assert_eq!(format.sample_rate, 1000);
    assert_eq!(format.channels, 1);
    assert_eq!(format.duration(), Some(Duration::from_millis(1280)));

    let mut next_frame = 0;
    while let Some(chunk) = decoder.decode_frames(100).unwrap() {
        assert_eq!(chunk.start_frame, next_frame);
        assert!(chunk.samples.iter().all(|&s| s == 0.0));
        next_frame += chunk.frames as u64;
    }
    assert_eq!(next_frame, 1280);
}

#[test]
fn test_seek_reports_first_audible_frame() {
    let mut decoder = open_clip();
    decoder.decode_frames(500).unwrap();

    // 350 falls inside the fourth packet; the reset decoder needs that
    // packet to prime its window, so audio resumes at the next boundary.
    decoder.seek(Duration::from_millis(350)).unwrap();
    let chunk = decoder.decode_frames(1000).unwrap().unwrap();
    assert_eq!(chunk.start_frame, 384);

    let mut total = chunk.frames as u64;
    while let Some(chunk) = decoder.decode_frames(1000).unwrap() {
        total += chunk.frames as u64;
    }
    assert_eq!(chunk.start_frame + total, 1280);

    decoder.rewind().unwrap();
    assert_eq!(decoder.decode_frames(10).unwrap().unwrap().start_frame, 0);
}

#[test]
fn test_load_vorbis_through_bundle() {
    let harness = harness();
    let audio = loaded(&harness, "silence.ogg");

    assert_eq!(audio.state(), MediaState::Stopped);
    assert!(audio.is_loaded());
    assert_eq!(audio.format().unwrap().sample_rate, 1000);
    assert_eq!(audio.duration(), Some(Duration::from_millis(1280)));
    assert_eq!(harness.mixer.voice_count(), 1);
}

#[test]
fn test_vorbis_loop_keeps_cursor_continuous() {
    let harness = harness();
    let mut audio = loaded(&harness, "silence.ogg");
    audio.set_loopable(true);
    audio.play();

    for round in 1..=14u64 {
        harness.render(100);
        audio.update();
        assert_eq!(audio.state(), MediaState::Playing, "round {}", round);
        assert_eq!(
            audio.cursor(),
            Duration::from_millis(round * 100 % 1280),
            "round {}",
            round
        );
    }
    assert!(audio.last_error().is_none());
}

#[test]
fn test_vorbis_stop_and_replay() {
    let harness = harness();
    let mut audio = loaded(&harness, "silence.ogg");
    audio.play();
    harness.render(300);
    audio.update();
    assert_eq!(audio.cursor(), Duration::from_millis(300));

    audio.stop();
    assert_eq!(audio.state(), MediaState::Stopped);
    assert_eq!(audio.cursor(), Duration::ZERO);

    audio.play();
    harness.render(40);
    audio.update();
    assert_eq!(audio.cursor(), Duration::from_millis(40));

    // Unlooped, the clip runs out and stops on its own
    for _ in 0..14 {
        harness.render(100);
        audio.update();
    }
    assert_eq!(audio.state(), MediaState::Stopped);
    assert!(audio.is_loaded());
}

#[test]
fn test_matched_vorbis_joins_partner() {
    let harness = harness();
    let mut lead = loaded(&harness, "lead.wav");
    lead.play();
    for _ in 0..5 {
        harness.render(70);
        lead.update();
    }

    let mut follower = loaded(&harness, "silence.ogg");
    follower.match_with(&lead);
    follower.play();

    let tolerance = Duration::from_millis(100);
    for _ in 0..5 {
        harness.render(70);
        lead.update();
        follower.update();

        let (a, b) = (lead.cursor(), follower.cursor());
        let drift = if a > b { a - b } else { b - a };
        assert!(drift <= tolerance, "drift {:?} between {:?} and {:?}", drift, a, b);
    }
    assert!(follower.is_matched());
}
