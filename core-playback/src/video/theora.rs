//! Theora header parsing.
//!
//! A Theora stream opens with three header packets: identification
//! (`0x80`), comment (`0x81`) and setup (`0x82`), each followed by the
//! signature `theora`. Only the first two are interpreted here; the setup
//! header is handed to the frame decoder untouched.

use crate::error::{PlaybackError, Result};
use crate::traits::VideoInfo;
use bridge_traits::ChromaSampling;
use bytes::Bytes;

const SIGNATURE: &[u8] = b"theora";
const IDENTIFICATION: u8 = 0x80;
const COMMENT: u8 = 0x81;
const SETUP: u8 = 0x82;

/// Identification header length in bytes, signature included.
const IDENTIFICATION_LEN: usize = 42;

/// Header packet kind, from its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Identification,
    Comment,
    Setup,
}

impl HeaderKind {
    /// Classify `packet` if it carries a Theora header signature.
    pub fn of(packet: &[u8]) -> Option<Self> {
        if packet.len() < 7 || &packet[1..7] != SIGNATURE {
            return None;
        }
        match packet[0] {
            IDENTIFICATION => Some(HeaderKind::Identification),
            COMMENT => Some(HeaderKind::Comment),
            SETUP => Some(HeaderKind::Setup),
            _ => None,
        }
    }
}

/// Whether `packet` is a Theora identification header.
pub fn is_theora_bos(packet: &[u8]) -> bool {
    HeaderKind::of(packet) == Some(HeaderKind::Identification)
}

/// Bitstream version from the identification header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
}

/// Vendor string and `KEY=value` user comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TheoraComments {
    pub vendor: String,
    pub comments: Vec<(String, String)>,
}

impl TheoraComments {
    /// First value for `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.comments
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// The three parsed header packets of a stream.
#[derive(Debug, Clone)]
pub struct TheoraHeaders {
    pub version: Version,
    pub info: VideoInfo,
    pub comments: TheoraComments,
    /// Raw identification, comment and setup packets, in order.
    pub packets: Vec<Bytes>,
}

/// Accumulates header packets in stream order.
#[derive(Debug, Default)]
pub struct HeaderCollector {
    ident: Option<(Version, VideoInfo)>,
    comments: Option<TheoraComments>,
    packets: Vec<Bytes>,
}

impl HeaderCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next packet of the stream.
    ///
    /// Returns the parsed headers once the setup header has arrived.
    pub fn push(&mut self, packet: &[u8]) -> Result<Option<TheoraHeaders>> {
        let expected = match self.packets.len() {
            0 => HeaderKind::Identification,
            1 => HeaderKind::Comment,
            _ => HeaderKind::Setup,
        };

        let kind = HeaderKind::of(packet);
        if kind != Some(expected) {
            return Err(PlaybackError::StreamFormat(format!(
                "Expected Theora {:?} header, found {:?}",
                expected, kind
            )));
        }

        match expected {
            HeaderKind::Identification => self.ident = Some(parse_identification(packet)?),
            HeaderKind::Comment => self.comments = Some(parse_comments(packet)?),
            HeaderKind::Setup => {}
        }
        self.packets.push(Bytes::copy_from_slice(packet));

        if expected != HeaderKind::Setup {
            return Ok(None);
        }

        match (self.ident.take(), self.comments.take()) {
            (Some((version, info)), Some(comments)) => Ok(Some(TheoraHeaders {
                version,
                info,
                comments,
                packets: std::mem::take(&mut self.packets),
            })),
            _ => Err(PlaybackError::Internal("Header state out of order".into())),
        }
    }
}

fn be(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

/// Parse an identification header into its version and [`VideoInfo`].
pub fn parse_identification(packet: &[u8]) -> Result<(Version, VideoInfo)> {
    if !is_theora_bos(packet) {
        return Err(PlaybackError::StreamFormat("Not a Theora identification header".into()));
    }
    if packet.len() < IDENTIFICATION_LEN {
        return Err(PlaybackError::StreamFormat(format!(
            "Identification header too short: {} bytes",
            packet.len()
        )));
    }

    let p = &packet[7..];
    let version = Version {
        major: p[0],
        minor: p[1],
        revision: p[2],
    };
    if version.major != 3 || version.minor > 2 {
        return Err(PlaybackError::UnsupportedCodec(format!(
            "Theora bitstream version {}.{}.{}",
            version.major, version.minor, version.revision
        )));
    }

    let frame_mb_width = be(&p[3..5]);
    let frame_mb_height = be(&p[5..7]);
    let picture_width = be(&p[7..10]);
    let picture_height = be(&p[10..13]);
    let picture_x = p[13] as u32;
    let picture_y_bottom = p[14] as u32;
    let fps_numerator = be(&p[15..19]);
    let fps_denominator = be(&p[19..23]);
    let aspect_numerator = be(&p[23..26]);
    let aspect_denominator = be(&p[26..29]);
    // p[29] colorspace, p[30..33] nominal bitrate
    let tail = be(&p[33..35]);
    let keyframe_granule_shift = ((tail >> 5) & 0x1f) as u8;
    let pixel_format = (tail >> 3) & 0x3;
    let reserved = tail & 0x7;

    let frame_width = frame_mb_width * 16;
    let frame_height = frame_mb_height * 16;

    let invalid = |what: &str| Err(PlaybackError::StreamFormat(format!("Invalid Theora header: {what}")));
    if frame_width == 0 || frame_height == 0 {
        return invalid("empty frame");
    }
    if picture_width == 0
        || picture_height == 0
        || picture_width + picture_x > frame_width
        || picture_height + picture_y_bottom > frame_height
    {
        return invalid("picture outside frame");
    }
    if fps_numerator == 0 || fps_denominator == 0 {
        return invalid("zero frame rate");
    }
    if reserved != 0 {
        return invalid("reserved bits set");
    }

    let chroma = match pixel_format {
        0 => ChromaSampling::Yuv420,
        2 => ChromaSampling::Yuv422,
        3 => ChromaSampling::Yuv444,
        _ => return invalid("reserved pixel format"),
    };

    let info = VideoInfo {
        frame_width,
        frame_height,
        picture_width,
        picture_height,
        picture_x,
        // Stored from the bottom edge; rows here count from the top
        picture_y: frame_height - picture_height - picture_y_bottom,
        fps_numerator,
        fps_denominator,
        aspect_numerator,
        aspect_denominator,
        chroma,
        keyframe_granule_shift,
    };

    Ok((version, info))
}

/// Parse a comment header.
pub fn parse_comments(packet: &[u8]) -> Result<TheoraComments> {
    if HeaderKind::of(packet) != Some(HeaderKind::Comment) {
        return Err(PlaybackError::StreamFormat("Not a Theora comment header".into()));
    }

    let mut reader = FieldReader { rest: &packet[7..] };

    let vendor_len = reader.length()?;
    let vendor = String::from_utf8_lossy(reader.take(vendor_len)?).into_owned();

    let count = reader.length()?;
    let mut comments = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        let len = reader.length()?;
        let text = String::from_utf8_lossy(reader.take(len)?).into_owned();
        match text.split_once('=') {
            Some((key, value)) => comments.push((key.to_string(), value.to_string())),
            None => comments.push((text, String::new())),
        }
    }

    Ok(TheoraComments { vendor, comments })
}

struct FieldReader<'a> {
    rest: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.rest.len() < len {
            return Err(PlaybackError::StreamFormat("Truncated comment header".into()));
        }
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        Ok(head)
    }

    fn length(&mut self) -> Result<usize> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
    }
}

/// Frame index encoded in a Theora granule position.
///
/// The granule packs the last keyframe's index in the high bits and the
/// frames since it in the low `shift` bits.
pub fn granule_frame(granule: u64, shift: u8) -> u64 {
    if shift == 0 {
        return granule;
    }
    let shift = shift.min(63);
    (granule >> shift) + (granule & ((1u64 << shift) - 1))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Identification header for a `w`x`h` picture in a whole-macroblock frame.
    pub(crate) fn ident_packet(w: u32, h: u32, fps: (u32, u32), pf: u8) -> Vec<u8> {
        let mb_w = w.div_ceil(16);
        let mb_h = h.div_ceil(16);
        let mut p = vec![IDENTIFICATION];
        p.extend_from_slice(SIGNATURE);
        p.extend_from_slice(&[3, 2, 1]);
        p.extend_from_slice(&(mb_w as u16).to_be_bytes());
        p.extend_from_slice(&(mb_h as u16).to_be_bytes());
        p.extend_from_slice(&w.to_be_bytes()[1..]);
        p.extend_from_slice(&h.to_be_bytes()[1..]);
        p.push(0); // picture x
        p.push(0); // picture y, from the bottom
        p.extend_from_slice(&fps.0.to_be_bytes());
        p.extend_from_slice(&fps.1.to_be_bytes());
        p.extend_from_slice(&1u32.to_be_bytes()[1..]);
        p.extend_from_slice(&1u32.to_be_bytes()[1..]);
        p.push(0); // colorspace
        p.extend_from_slice(&[0, 0, 0]); // bitrate
        let tail: u16 = (32 << 10) | (6 << 5) | ((pf as u16) << 3);
        p.extend_from_slice(&tail.to_be_bytes());
        p
    }

    pub(crate) fn comment_packet(vendor: &str, comments: &[&str]) -> Vec<u8> {
        let mut p = vec![COMMENT];
        p.extend_from_slice(SIGNATURE);
        p.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        p.extend_from_slice(vendor.as_bytes());
        p.extend_from_slice(&(comments.len() as u32).to_le_bytes());
        for c in comments {
            p.extend_from_slice(&(c.len() as u32).to_le_bytes());
            p.extend_from_slice(c.as_bytes());
        }
        p
    }

    pub(crate) fn setup_packet() -> Vec<u8> {
        let mut p = vec![SETUP];
        p.extend_from_slice(SIGNATURE);
        p.extend_from_slice(&[0xAA; 8]);
        p
    }

    #[test]
    fn test_parse_identification() {
        let (version, info) = parse_identification(&ident_packet(60, 40, (25, 1), 0)).unwrap();

        assert_eq!(version, Version { major: 3, minor: 2, revision: 1 });
        assert_eq!((info.frame_width, info.frame_height), (64, 48));
        assert_eq!((info.picture_width, info.picture_height), (60, 40));
        assert_eq!(info.picture_y, 8);
        assert_eq!(info.chroma, ChromaSampling::Yuv420);
        assert_eq!(info.keyframe_granule_shift, 6);
        assert_eq!(info.frame_rate(), 25.0);
    }

    #[test]
    fn test_pixel_formats() {
        let (_, info) = parse_identification(&ident_packet(16, 16, (30, 1), 2)).unwrap();
        assert_eq!(info.chroma, ChromaSampling::Yuv422);

        let (_, info) = parse_identification(&ident_packet(16, 16, (30, 1), 3)).unwrap();
        assert_eq!(info.chroma, ChromaSampling::Yuv444);

        assert!(parse_identification(&ident_packet(16, 16, (30, 1), 1)).is_err());
    }

    #[test]
    fn test_rejects_bad_identification() {
        let mut short = ident_packet(16, 16, (30, 1), 0);
        short.truncate(20);
        assert!(matches!(parse_identification(&short), Err(PlaybackError::StreamFormat(_))));

        let zero_rate = ident_packet(16, 16, (0, 1), 0);
        assert!(parse_identification(&zero_rate).is_err());

        let mut old = ident_packet(16, 16, (30, 1), 0);
        old[7] = 2;
        assert!(matches!(parse_identification(&old), Err(PlaybackError::UnsupportedCodec(_))));
    }

    #[test]
    fn test_parse_comments() {
        let packet = comment_packet("Xiph.Org libtheora", &["TITLE=Intro", "ENCODER"]);
        let comments = parse_comments(&packet).unwrap();

        assert_eq!(comments.vendor, "Xiph.Org libtheora");
        assert_eq!(comments.get("title"), Some("Intro"));
        assert_eq!(comments.comments[1], ("ENCODER".to_string(), String::new()));
    }

    #[test]
    fn test_truncated_comments() {
        let mut packet = comment_packet("vendor", &["A=B"]);
        packet.truncate(packet.len() - 2);
        assert!(parse_comments(&packet).is_err());
    }

    #[test]
    fn test_collector_requires_order() {
        let mut collector = HeaderCollector::new();
        assert!(collector.push(&comment_packet("v", &[])).is_err());

        let mut collector = HeaderCollector::new();
        assert!(collector.push(&ident_packet(32, 32, (24, 1), 0)).unwrap().is_none());
        assert!(collector.push(&comment_packet("v", &[])).unwrap().is_none());
        let headers = collector.push(&setup_packet()).unwrap().unwrap();

        assert_eq!(headers.packets.len(), 3);
        assert_eq!(headers.info.picture_width, 32);
    }

    #[test]
    fn test_granule_frame() {
        assert_eq!(granule_frame(0, 6), 0);
        assert_eq!(granule_frame((10 << 6) | 3, 6), 13);
        assert_eq!(granule_frame(42, 0), 42);
    }
}
