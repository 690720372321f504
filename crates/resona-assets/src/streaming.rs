//! The streaming backend seam.
//!
//! When the engine opens a streamed file by media id, the hook asks the
//! media asset which chunk to serve - the full payload when chunk 0 is not
//! a prefetch, otherwise chunk 1 - and returns a descriptor the backend
//! reads ranges from. Byte transfer itself happens on the backend's worker
//! threads; this seam only describes what to read.

use std::path::Path;
use std::sync::Arc;

use crate::error::{AssetError, AssetResult};
use crate::io::{BytesFuture, BytesReader, IoResult};
use crate::media::{ChunkData, MediaAsset};

/// What the streaming backend should serve for one opened media file.
pub struct StreamDescriptor {
    /// The media asset's short id.
    pub media_id: u32,
    /// Total size of the served chunk in bytes.
    pub total_size: u64,
    source: ChunkData,
}

/// Serves streamed media chunks to the engine's I/O layer.
pub struct StreamingHook {
    reader: Arc<dyn BytesReader>,
}

impl StreamingHook {
    /// Create a hook reading file-backed chunks through `reader`.
    pub fn new(reader: Arc<dyn BytesReader>) -> Self {
        Self { reader }
    }

    /// Open a media asset for streaming.
    pub fn open(&self, media: &MediaAsset, platform: &str) -> AssetResult<StreamDescriptor> {
        let chunk = media
            .streamed_chunk(platform)
            .ok_or(AssetError::MediaNotResident { media_id: media.id })?;
        Ok(StreamDescriptor {
            media_id: media.id,
            total_size: chunk.data.len(),
            source: chunk.data,
        })
    }

    /// Read a range of the served chunk.
    pub fn read(&self, descriptor: &StreamDescriptor, offset: u64, len: u64) -> BytesFuture {
        if offset + len > descriptor.total_size {
            let result = Err(AssetError::InvalidData {
                message: format!(
                    "range {}..{} out of bounds for media {} ({} bytes)",
                    offset,
                    offset + len,
                    descriptor.media_id,
                    descriptor.total_size
                ),
            });
            return Box::pin(async move { result });
        }
        match &descriptor.source {
            ChunkData::Resident(bytes) => {
                let start = offset as usize;
                let end = start + len as usize;
                let slice = bytes[start..end].to_vec();
                Box::pin(async move { Ok(slice) })
            }
            ChunkData::FileBacked {
                path,
                offset: base,
                ..
            } => self.reader.read_range(Path::new(path), base + offset, len),
        }
    }

    /// Blocking convenience wrapper around [`StreamingHook::read`].
    pub fn read_sync(
        &self,
        descriptor: &StreamDescriptor,
        offset: u64,
        len: u64,
    ) -> IoResult<Vec<u8>> {
        futures_lite::future::block_on(self.read(descriptor, offset, len))
    }
}
