mod common;

use bridge_traits::MemoryBundle;
use common::{theora_clip, wav, Harness, CORRUPT};
use core_playback::{
    Audio, AudioSettings, MediaObject, MediaState, PixelFormat, Video, VideoSettings,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn loaded(harness: &Harness, name: &str, loopable: bool, synced: bool) -> Video {
    let mut video = Video::with_flags(&harness.config, false, loopable, synced);
    video.set_resource(name);
    video.load();
    video
}

#[test]
fn test_missing_and_malformed_clips_fail_to_load() {
    let harness = Harness::new(
        MemoryBundle::new()
            .with_resource("audio.wav", wav(100, 0.5))
            .with_resource("empty.ogv", Vec::new()),
    );

    for name in ["absent.ogv", "audio.wav", "empty.ogv"] {
        let video = loaded(&harness, name, false, false);
        assert_eq!(video.state(), MediaState::Initial, "{name}");
        assert!(video.last_error().is_some(), "{name}");
    }
}

#[test]
fn test_frames_are_cropped_and_converted() {
    let harness = Harness::new(MemoryBundle::new().with_resource("clip.ogv", theora_clip(&[235], 25)));
    let mut video = Video::with_settings(
        &harness.config,
        VideoSettings {
            pixel_format: PixelFormat::Bgra32,
            ..Default::default()
        },
    );
    video.set_resource("clip.ogv");
    video.load();
    video.play();
    video.update();

    let frame = video.current_frame().unwrap();
    assert_eq!((frame.width, frame.height), (32, 32));
    assert_eq!(frame.stride, 32 * 4);
    assert_eq!(frame.data.len(), 32 * 32 * 4);
    assert_eq!(frame.row(31)[..4], [255, 255, 255, 255]);
}

#[test]
fn test_new_frame_flag_toggles_once_per_frame() {
    let harness = Harness::new(
        MemoryBundle::new().with_resource("clip.ogv", theora_clip(&[16, 60, 120, 200], 25)),
    );
    let mut video = loaded(&harness, "clip.ogv", false, false);
    video.play();

    let mut generations = Vec::new();
    for _ in 0..4 {
        assert!(!video.has_new_frame());
        video.update();
        assert!(video.has_new_frame());

        let first = video.current_frame().unwrap();
        let second = video.current_frame().unwrap();
        assert!(!video.has_new_frame());
        assert_eq!(first.data, second.data);
        assert_eq!(first.generation, second.generation);
        generations.push(first.generation);
    }
    assert!(generations.windows(2).all(|w| w[1] == w[0] + 1));
}

#[test]
fn test_non_looping_clip_keeps_last_frame() {
    let harness = Harness::new(MemoryBundle::new().with_resource("clip.ogv", theora_clip(&[16, 235], 25)));
    let mut video = loaded(&harness, "clip.ogv", false, false);
    video.play();
    for _ in 0..5 {
        video.update();
    }

    assert_eq!(video.state(), MediaState::Stopped);
    let last = video.current_frame().unwrap();
    assert_eq!(last.index, 1);
    assert_eq!(video.position(), Duration::from_millis(40));
}

#[test]
fn test_looping_clip_keeps_playing() {
    let harness = Harness::new(MemoryBundle::new().with_resource("clip.ogv", theora_clip(&[16, 235], 25)));
    let mut video = loaded(&harness, "clip.ogv", true, false);
    video.play();

    let mut indices = Vec::new();
    for _ in 0..5 {
        video.update();
        indices.push(video.current_frame().unwrap().index);
    }
    assert_eq!(indices, vec![0, 1, 0, 1, 0]);
    assert_eq!(video.state(), MediaState::Playing);
}

#[test]
fn test_synced_clip_follows_wall_clock() {
    let harness = Harness::new(
        MemoryBundle::new().with_resource("clip.ogv", theora_clip(&[16, 60, 120, 200], 10)),
    );
    let mut video = loaded(&harness, "clip.ogv", false, true);
    video.play();

    let mut shown = Vec::new();
    for _ in 0..8 {
        video.update();
        if video.has_new_frame() {
            shown.push(video.current_frame().unwrap().index);
        }
        harness.clock.advance(Duration::from_millis(50));
    }
    assert_eq!(shown, vec![0, 1, 2, 3]);
}

#[test]
fn test_clip_follows_audio_cursor() {
    let harness = Harness::new(
        MemoryBundle::new()
            .with_resource("clip.ogv", theora_clip(&[10, 20, 30, 40, 50, 60], 10))
            .with_resource("track.wav", wav(2000, 0.5)),
    );
    let mut audio = Audio::with_settings(
        &harness.config,
        AudioSettings {
            buffer_count: 3,
            buffer_frames: 100,
            ..Default::default()
        },
    );
    audio.set_resource("track.wav");
    audio.load();

    let mut video = loaded(&harness, "clip.ogv", false, true);
    video.set_sync_source(Arc::new(audio.cursor_handle()));

    audio.play();
    video.play();
    for _ in 0..5 {
        harness.render(50);
        audio.update();
    }
    video.update();
    assert_eq!(audio.cursor(), Duration::from_millis(250));
    assert_eq!(video.current_frame().unwrap().index, 2);

    // Once the sound goes away, the clip keeps time on its own
    audio.unload();
    video.update();
    assert!(video.is_playing());
    harness.clock.advance(Duration::from_millis(100));
    video.update();
    assert_eq!(video.current_frame().unwrap().index, 3);
}

#[test]
fn test_corrupt_frames_are_skipped() {
    let harness = Harness::new(
        MemoryBundle::new().with_resource("clip.ogv", theora_clip(&[16, CORRUPT, 235], 25)),
    );
    let mut video = loaded(&harness, "clip.ogv", false, false);
    video.play();
    for _ in 0..3 {
        video.update();
    }

    assert_eq!(video.current_frame().unwrap().index, 2);
    assert!(video.last_error().is_some());
    assert!(video.is_playing());
}

#[test]
fn test_reader_thread_sees_whole_frames() {
    let lumas: Vec<u8> = (0..60).map(|i| 16 + i as u8 * 3).collect();
    let harness = Harness::new(MemoryBundle::new().with_resource("clip.ogv", theora_clip(&lumas, 60)));
    let mut video = loaded(&harness, "clip.ogv", true, false);
    let reader = video.frame_reader();
    let done = Arc::new(AtomicBool::new(false));

    let presenter = thread::spawn({
        let done = done.clone();
        move || {
            let mut seen = 0;
            loop {
                let finished = done.load(Ordering::Acquire);
                if let Some(frame) = reader.current_frame() {
                    let first = frame.data[0];
                    assert!(frame.data.iter().all(|&b| b == first), "torn frame");
                    seen += 1;
                }
                if finished {
                    return seen;
                }
            }
        }
    });

    video.play();
    for _ in 0..300 {
        video.update();
    }
    done.store(true, Ordering::Release);

    assert!(presenter.join().unwrap() > 0);
}

#[test]
fn test_media_objects_share_a_frame_loop() {
    let harness = Harness::new(
        MemoryBundle::new()
            .with_resource("clip.ogv", theora_clip(&[16, 235], 25))
            .with_resource("track.wav", wav(1000, 0.5)),
    );

    let mut audio = Audio::new(&harness.config);
    audio.set_autoplay(true);
    audio.set_resource("track.wav");
    let video = Video::with_flags(&harness.config, true, true, false);

    let mut objects: Vec<Box<dyn MediaObject>> = vec![Box::new(audio), Box::new(video)];
    objects[1].set_resource("clip.ogv");
    for object in objects.iter_mut() {
        object.load();
    }
    for _ in 0..10 {
        for object in objects.iter_mut() {
            object.update();
        }
    }

    assert!(objects.iter().all(|o| o.is_playing()));
    for object in objects.iter_mut() {
        object.unload();
    }
    assert!(objects.iter().all(|o| !o.is_loaded()));
    assert_eq!(harness.mixer.voice_count(), 0);
}
