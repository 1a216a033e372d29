//! Ogg demuxing for Theora streams.

use super::theora::{is_theora_bos, HeaderCollector, TheoraHeaders};
use crate::error::{PlaybackError, Result};
use crate::resource::ResourceSource;
use ogg::{OggReadError, PacketReader};
use std::io::{Seek, SeekFrom};
use tracing::debug;

/// A data packet of the selected logical stream.
#[derive(Debug)]
pub struct VideoPacket {
    pub data: Vec<u8>,
    /// Granule of the page this packet ends, when it is the last on it.
    pub granule: Option<u64>,
}

/// Pulls packets of the first Theora logical stream out of an Ogg file.
///
/// Other logical streams (typically a Vorbis soundtrack) are skipped.
pub struct OggDemuxer {
    reader: Option<PacketReader<ResourceSource>>,
    serial: u32,
}

fn read_error(err: OggReadError) -> PlaybackError {
    match err {
        OggReadError::ReadError(io) => PlaybackError::Io(io),
        other => PlaybackError::StreamFormat(other.to_string()),
    }
}

impl OggDemuxer {
    /// Locate the Theora stream and read its three header packets.
    pub fn open(source: ResourceSource) -> Result<(Self, TheoraHeaders)> {
        let mut reader = PacketReader::new(source);

        let serial = loop {
            let packet = reader
                .read_packet()
                .map_err(read_error)?
                .ok_or_else(|| PlaybackError::StreamFormat("No Theora stream found".into()))?;
            if !packet.first_in_stream() {
                // All beginning-of-stream pages come before any data
                return Err(PlaybackError::StreamFormat("No Theora stream found".into()));
            }
            if is_theora_bos(&packet.data) {
                break packet.stream_serial();
            }
        };

        let mut demuxer = Self {
            reader: Some(reader),
            serial,
        };

        // The identification header was consumed above; start over so the
        // collector sees the stream in order.
        demuxer.rewind_to_start()?;
        let headers = demuxer.read_headers()?;

        debug!(
            serial,
            width = headers.info.picture_width,
            height = headers.info.picture_height,
            fps = headers.info.frame_rate(),
            vendor = %headers.comments.vendor,
            "Found Theora stream"
        );

        Ok((demuxer, headers))
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    fn reader(&mut self) -> Result<&mut PacketReader<ResourceSource>> {
        self.reader
            .as_mut()
            .ok_or_else(|| PlaybackError::Internal("Demuxer lost its reader".into()))
    }

    fn next_own(&mut self) -> Result<Option<ogg::Packet>> {
        let serial = self.serial;
        let reader = self.reader()?;
        loop {
            match reader.read_packet().map_err(read_error)? {
                Some(packet) if packet.stream_serial() == serial => return Ok(Some(packet)),
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }

    fn read_headers(&mut self) -> Result<TheoraHeaders> {
        let mut collector = HeaderCollector::new();
        loop {
            let packet = self.next_own()?.ok_or_else(|| {
                PlaybackError::StreamFormat("Stream ended inside Theora headers".into())
            })?;
            if let Some(headers) = collector.push(&packet.data)? {
                return Ok(headers);
            }
        }
    }

    fn rewind_to_start(&mut self) -> Result<()> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| PlaybackError::Internal("Demuxer lost its reader".into()))?;
        let mut source = reader.into_inner();
        source.seek(SeekFrom::Start(0))?;
        self.reader = Some(PacketReader::new(source));
        Ok(())
    }

    /// Next data packet, or `None` at end of stream.
    pub fn next_packet(&mut self) -> Result<Option<VideoPacket>> {
        Ok(self.next_own()?.map(|packet| {
            let granule = (packet.last_in_page() && packet.absgp_page() != u64::MAX)
                .then(|| packet.absgp_page());
            VideoPacket {
                data: packet.data,
                granule,
            }
        }))
    }

    /// Return to the first data packet.
    pub fn rewind(&mut self) -> Result<()> {
        self.rewind_to_start()?;
        self.read_headers().map(|_| ())
    }
}
