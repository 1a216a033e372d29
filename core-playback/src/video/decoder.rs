use super::demux::OggDemuxer;
use super::theora::{granule_frame, TheoraComments, TheoraHeaders, Version};
use crate::error::{PlaybackError, Result};
use crate::resource::ResourceSource;
use crate::traits::{VideoDecoder, VideoInfo};
use bridge_traits::{CodecSetup, FrameDecoder, PlanarFrame, VideoCodecProvider};
use tracing::{debug, instrument, trace};

/// Ogg/Theora decode context.
///
/// Demuxing and header parsing happen here; frame reconstruction is done by
/// a [`FrameDecoder`] from the injected [`VideoCodecProvider`].
pub struct TheoraDecoder {
    demuxer: OggDemuxer,
    frames: Box<dyn FrameDecoder>,
    info: VideoInfo,
    version: Version,
    comments: TheoraComments,
    /// Index the next decoded packet will get.
    next_index: u64,
}

impl TheoraDecoder {
    #[instrument(skip(source, provider), fields(resource = %source.resource().name(), codec = provider.codec_name()))]
    pub fn open(source: ResourceSource, provider: &dyn VideoCodecProvider) -> Result<Self> {
        let (demuxer, headers) = OggDemuxer::open(source)?;
        let TheoraHeaders {
            version,
            info,
            comments,
            packets,
        } = headers;

        let setup = CodecSetup {
            headers: packets,
            frame_width: info.frame_width,
            frame_height: info.frame_height,
            chroma: info.chroma,
        };
        let frames = provider.create(&setup).map_err(|e| {
            PlaybackError::UnsupportedCodec(format!("{} rejected stream: {}", provider.codec_name(), e))
        })?;

        debug!(
            version = %format_args!("{}.{}.{}", version.major, version.minor, version.revision),
            "Theora decoder ready"
        );

        Ok(Self {
            demuxer,
            frames,
            info,
            version,
            comments,
            next_index: 0,
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn comments(&self) -> &TheoraComments {
        &self.comments
    }

    /// Frame index a page granule refers to.
    fn granule_index(&self, granule: u64) -> u64 {
        let frame = granule_frame(granule, self.info.keyframe_granule_shift);
        // From 3.2.1 on, granules count frames rather than index them
        if self.version.revision >= 1 {
            frame.saturating_sub(1)
        } else {
            frame
        }
    }
}

impl VideoDecoder for TheoraDecoder {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<u64>> {
        let Some(packet) = self.demuxer.next_packet()? else {
            return Ok(None);
        };

        let index = match packet.granule {
            Some(granule) => self.granule_index(granule),
            None => self.next_index,
        };
        self.next_index = index + 1;

        self.frames
            .decode_packet(&packet.data)
            .map_err(|e| PlaybackError::Decoding(format!("frame {}: {}", index, e)))?;

        trace!(index, bytes = packet.data.len(), "Decoded frame");
        Ok(Some(index))
    }

    fn frame(&self) -> Option<PlanarFrame<'_>> {
        self.frames.frame()
    }

    fn rewind(&mut self) -> Result<()> {
        self.demuxer.rewind()?;
        self.frames.reset();
        self.next_index = 0;
        Ok(())
    }
}

impl std::fmt::Debug for TheoraDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TheoraDecoder")
            .field("info", &self.info)
            .field("version", &self.version)
            .field("next_index", &self.next_index)
            .finish()
    }
}
