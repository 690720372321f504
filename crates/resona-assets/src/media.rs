//! Streamable sound media and its per-platform payloads.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use resona_core::engine::MediaSourceSettings;

use crate::context::AudioContext;
use crate::platform::PlatformKeyed;

/// Payload bytes of one media chunk: resident in memory, or a lazily
/// served file range owned by the streaming backend.
#[derive(Debug, Clone)]
pub enum ChunkData {
    /// Bytes held in memory.
    Resident(Arc<[u8]>),
    /// A byte range inside a cooked pack file, read on demand.
    FileBacked {
        /// The pack file.
        path: PathBuf,
        /// Offset of the chunk within the file.
        offset: u64,
        /// Chunk length in bytes.
        len: u64,
    },
}

impl ChunkData {
    /// The resident buffer, if the bytes are in memory.
    pub fn resident(&self) -> Option<&Arc<[u8]>> {
        match self {
            ChunkData::Resident(bytes) => Some(bytes),
            ChunkData::FileBacked { .. } => None,
        }
    }

    /// Chunk length in bytes.
    pub fn len(&self) -> u64 {
        match self {
            ChunkData::Resident(bytes) => bytes.len() as u64,
            ChunkData::FileBacked { len, .. } => *len,
        }
    }

    /// Whether the chunk holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single contiguous byte payload belonging to one media asset.
#[derive(Debug, Clone)]
pub struct MediaChunk {
    /// Whether this is the small head fragment loaded eagerly so playback
    /// can start before the full file streams in.
    pub is_prefetch: bool,
    /// The payload bytes.
    pub data: ChunkData,
}

impl MediaChunk {
    /// A resident chunk.
    pub fn resident(is_prefetch: bool, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            is_prefetch,
            data: ChunkData::Resident(bytes.into()),
        }
    }
}

/// Per-platform payload of one media asset.
///
/// Created by the build pipeline, consumed at runtime. At most one
/// non-prefetch chunk exists; when two chunks are present, index 0 is the
/// prefetch and index 1 the full payload.
#[derive(Debug, Clone, Default)]
pub struct MediaAssetData {
    /// Whether the full payload is streamed rather than loaded up front.
    pub is_streamed: bool,
    /// Whether the payload should live in device memory when available.
    pub use_device_memory: bool,
    /// Build-time bookkeeping; not meaningful at runtime.
    pub last_write_time: Option<SystemTime>,
    /// The payload chunks.
    pub chunks: Vec<MediaChunk>,
}

/// One streamable sound-media file.
///
/// Holds per-platform [`MediaAssetData`] and registers the resident
/// payload with the engine's media table on load. Ownership of media is a
/// path lookup through the asset-resolution service; assets referencing
/// this media hold its path, never the asset itself.
pub struct MediaAsset {
    /// Stable short id, the engine media key.
    pub id: u32,
    /// Build-time display name.
    pub name: Option<String>,
    data: PlatformKeyed<MediaAssetData>,
    /// Opaque companion objects attached by game or pipeline code.
    user_data: Vec<Box<dyn Any + Send + Sync>>,
    /// The triple currently registered with the engine, kept so unload can
    /// hand back exactly what load registered.
    registered: Mutex<Option<MediaSourceSettings>>,
}

impl MediaAsset {
    /// Create a media asset over its per-platform payloads.
    pub fn new(id: u32, data: PlatformKeyed<MediaAssetData>) -> Self {
        Self {
            id,
            name: None,
            data,
            user_data: Vec::new(),
            registered: Mutex::new(None),
        }
    }

    /// Attach the build-time display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a companion object.
    pub fn add_user_data(&mut self, value: impl Any + Send + Sync) {
        self.user_data.push(Box::new(value));
    }

    /// The first companion object of the given type, if any.
    pub fn user_data<T: Any>(&self) -> Option<&T> {
        self.user_data
            .iter()
            .find_map(|entry| entry.downcast_ref::<T>())
    }

    /// The payload for the given platform.
    pub fn media_data(&self, platform: &str) -> Option<Arc<MediaAssetData>> {
        self.data.current(platform)
    }

    /// The platform-keyed payloads (serialization and build tooling).
    pub fn platform_entries(&self) -> &PlatformKeyed<MediaAssetData> {
        &self.data
    }

    /// Whether the payload is currently in the engine media table.
    pub fn is_registered(&self) -> bool {
        self.registered.lock().is_some()
    }

    /// Register the payload with the engine media table.
    ///
    /// No-op if already registered, if the media is streamed without a
    /// prefetch chunk (the streaming backend serves it), or if the chunk
    /// bytes are not resident yet (retried on the next load).
    pub fn load(&self, ctx: &AudioContext) {
        let Some(data) = self.media_data(&ctx.settings.platform) else {
            return;
        };
        let Some(chunk) = data.chunks.first() else {
            return;
        };
        if data.is_streamed && !chunk.is_prefetch {
            return;
        }

        let mut registered = self.registered.lock();
        if registered.is_some() {
            return;
        }

        let Some(bytes) = chunk.data.resident() else {
            tracing::debug!(media = self.id, "chunk bytes not resident, load deferred");
            return;
        };

        let mut payload = bytes.clone();
        if data.use_device_memory {
            match ctx.engine.device_alloc(bytes) {
                Some(device_copy) => payload = device_copy,
                None => {
                    tracing::warn!(
                        media = self.id,
                        "device memory allocation failed, falling back to host memory"
                    );
                }
            }
        }

        let source = MediaSourceSettings {
            id: self.id,
            data: payload,
        };
        match ctx.engine.set_media(source.clone()) {
            Ok(()) => *registered = Some(source),
            Err(err) => {
                tracing::warn!(media = self.id, %err, "set_media failed");
            }
        }
    }

    /// Remove the payload from the engine media table.
    ///
    /// Idempotent: a second unload without an intervening load is a no-op.
    /// Dropping the registered triple also releases any device-memory copy.
    pub fn unload(&self, ctx: &AudioContext) {
        let Some(source) = self.registered.lock().take() else {
            return;
        };
        if let Err(err) = ctx.engine.unset_media(&source) {
            tracing::warn!(media = self.id, %err, "unset_media failed");
        }
    }

    /// The chunk the streaming backend should serve: chunk 0 if it is the
    /// full payload, otherwise chunk 1 when present.
    pub fn streamed_chunk(&self, platform: &str) -> Option<MediaChunk> {
        let data = self.media_data(platform)?;
        let first = data.chunks.first()?;
        if !first.is_prefetch {
            return Some(first.clone());
        }
        data.chunks.get(1).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use resona_core::config::AudioSettings;
    use resona_test_utils::MockAudioEngine;

    use super::*;
    use crate::resolver::AssetRegistry;

    fn test_context() -> (Arc<MockAudioEngine>, AudioContext) {
        let engine = Arc::new(MockAudioEngine::new());
        let registry = Arc::new(AssetRegistry::new(engine.clone()));
        let ctx = AudioContext::new(engine.clone(), registry, AudioSettings::default());
        (engine, ctx)
    }

    fn in_memory(id: u32, data: MediaAssetData) -> MediaAsset {
        MediaAsset::new(id, PlatformKeyed::runtime(data))
    }

    #[test]
    fn load_registers_single_chunk() {
        let (engine, ctx) = test_context();
        let media = in_memory(
            10,
            MediaAssetData {
                chunks: vec![MediaChunk::resident(false, vec![0u8; 50 * 1024])],
                ..Default::default()
            },
        );

        media.load(&ctx);

        assert!(media.is_registered());
        assert_eq!(engine.media_snapshot(), vec![(10, 50 * 1024)]);
    }

    #[test]
    fn load_is_idempotent() {
        let (engine, ctx) = test_context();
        let media = in_memory(
            11,
            MediaAssetData {
                chunks: vec![MediaChunk::resident(false, vec![1u8; 8])],
                ..Default::default()
            },
        );

        media.load(&ctx);
        media.load(&ctx);

        // Second load never reaches the engine.
        assert_eq!(engine.count_set_media(), 1);
    }

    #[test]
    fn streamed_with_prefetch_registers_only_the_prefetch() {
        let (engine, ctx) = test_context();
        let media = in_memory(
            12,
            MediaAssetData {
                is_streamed: true,
                chunks: vec![
                    MediaChunk::resident(true, vec![0u8; 4 * 1024]),
                    MediaChunk::resident(false, vec![0u8; 200 * 1024]),
                ],
                ..Default::default()
            },
        );

        media.load(&ctx);

        assert_eq!(engine.media_snapshot(), vec![(12, 4 * 1024)]);
        // The backend serves the full payload.
        let streamed = media.streamed_chunk(&ctx.settings.platform).unwrap();
        assert!(!streamed.is_prefetch);
        assert_eq!(streamed.data.len(), 200 * 1024);
    }

    #[test]
    fn streamed_without_prefetch_never_registers() {
        let (engine, ctx) = test_context();
        let media = in_memory(
            13,
            MediaAssetData {
                is_streamed: true,
                chunks: vec![MediaChunk::resident(false, vec![0u8; 64])],
                ..Default::default()
            },
        );

        media.load(&ctx);

        assert!(!media.is_registered());
        assert_eq!(engine.count_set_media(), 0);
        assert!(media.streamed_chunk(&ctx.settings.platform).is_some());
    }

    #[test]
    fn non_resident_chunk_defers_load() {
        let (engine, ctx) = test_context();
        let media = in_memory(
            14,
            MediaAssetData {
                chunks: vec![MediaChunk {
                    is_prefetch: false,
                    data: ChunkData::FileBacked {
                        path: "Media/14.pck".into(),
                        offset: 0,
                        len: 128,
                    },
                }],
                ..Default::default()
            },
        );

        media.load(&ctx);

        assert!(!media.is_registered());
        assert_eq!(engine.count_set_media(), 0);
    }

    #[test]
    fn unload_twice_unregisters_once() {
        let (engine, ctx) = test_context();
        let media = in_memory(
            15,
            MediaAssetData {
                chunks: vec![MediaChunk::resident(false, vec![0u8; 16])],
                ..Default::default()
            },
        );

        media.load(&ctx);
        media.unload(&ctx);
        media.unload(&ctx);

        assert_eq!(engine.count_unset_media(), 1);
        assert!(engine.registered_media_ids().is_empty());
    }

    #[test]
    fn device_memory_exhaustion_falls_back_to_host() {
        let (engine, ctx) = test_context();
        engine.set_device_memory_available(false);

        let media = in_memory(
            16,
            MediaAssetData {
                use_device_memory: true,
                chunks: vec![MediaChunk::resident(false, vec![0u8; 32])],
                ..Default::default()
            },
        );

        media.load(&ctx);

        // Degraded but registered.
        assert!(media.is_registered());
        assert_eq!(engine.media_snapshot(), vec![(16, 32)]);
    }

    #[test]
    fn user_data_is_looked_up_by_type() {
        struct CaptionTrack(&'static str);

        let mut media = in_memory(18, MediaAssetData::default());
        media.add_user_data(CaptionTrack("subtitles_en"));

        assert_eq!(media.user_data::<CaptionTrack>().unwrap().0, "subtitles_en");
        assert!(media.user_data::<u32>().is_none());
    }

    #[test]
    fn missing_platform_data_is_a_noop() {
        let (engine, ctx) = test_context();
        let media = MediaAsset::new(
            17,
            PlatformKeyed::editor_with([("PS4".to_string(), MediaAssetData::default())]),
        );

        media.load(&ctx);

        assert!(!media.is_registered());
        assert_eq!(engine.call_count(), 0);
    }
}
