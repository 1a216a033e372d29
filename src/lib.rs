//! Workspace placeholder crate.
//!
//! Maps the workspace feature flags (`desktop-shims`, `decoder-vorbis`,
//! `decoder-pcm`, `video-ffmpeg`) onto `core-runtime` and `core-playback` so a host can depend
//! on `media-engine-workspace` and pick codecs and desktop defaults in one place.
