//! Bank payloads and the per-asset load/unload state machine.
//!
//! States per payload: unloaded, loaded (bank blob handed to the engine),
//! loaded-with-media (referenced media asynchronously requested). Load and
//! unload are driven from the owner thread; the only asynchronous part is
//! the media stream request, which returns a ticket immediately.

use std::sync::Arc;

use parking_lot::Mutex;
use resona_core::engine::BankId;
use resona_core::path::AssetPath;
use resona_core::ticket::StreamHandle;

use crate::context::AudioContext;
use crate::error::{AssetError, AssetResult};
use crate::event::EventData;
use crate::switch::SwitchContainerData;

/// The operations every asset-data kind supports.
pub trait AssetDataOps {
    /// Hand the payload to the engine and request whatever it references.
    fn load(&self, ctx: &AudioContext) -> AssetResult<()>;

    /// Undo `load`, releasing engine-side resources.
    fn unload(&self, ctx: &AudioContext) -> AssetResult<()>;

    /// Append the media this payload references, deduplicated.
    fn media_list(&self, out: &mut Vec<AssetPath>);
}

/// Append `path` to `out` unless already present.
pub(crate) fn add_unique(out: &mut Vec<AssetPath>, path: &AssetPath) {
    if !out.contains(path) {
        out.push(path.clone());
    }
}

/// A compiled bank fragment plus the engine handle it is registered under.
///
/// `bank` is `Some` exactly while the blob has been handed to the engine
/// and not yet unloaded.
pub struct BankData {
    /// Name used for engine registration and diagnostics.
    pub name: String,
    blob: Arc<[u8]>,
    bank: Mutex<Option<BankId>>,
}

impl BankData {
    /// Wrap a serialized bank blob.
    pub fn new(name: impl Into<String>, blob: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            blob: blob.into(),
            bank: Mutex::new(None),
        }
    }

    /// An empty payload for assets without a bank fragment.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// The serialized blob.
    pub fn blob(&self) -> &Arc<[u8]> {
        &self.blob
    }

    /// Whether the blob is currently registered with the engine.
    pub fn is_loaded(&self) -> bool {
        self.bank.lock().is_some()
    }

    /// The engine handle, while registered.
    pub fn bank_id(&self) -> Option<BankId> {
        *self.bank.lock()
    }
}

impl AssetDataOps for BankData {
    fn load(&self, ctx: &AudioContext) -> AssetResult<()> {
        let mut bank = self.bank.lock();
        if bank.is_some() {
            // Already registered; never hand the blob over twice.
            return Ok(());
        }
        if self.blob.is_empty() {
            return Ok(());
        }
        match ctx.engine.register_bank(&self.name, self.blob.clone()) {
            Ok(id) => {
                *bank = Some(id);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(bank = %self.name, %err, "bank registration failed");
                Err(AssetError::Engine(err))
            }
        }
    }

    fn unload(&self, ctx: &AudioContext) -> AssetResult<()> {
        let mut bank = self.bank.lock();
        let Some(id) = bank.take() else {
            if self.blob.is_empty() {
                return Ok(());
            }
            return Err(AssetError::NotLoaded {
                name: self.name.clone(),
            });
        };
        if let Err(err) = ctx.engine.unregister_bank(id, &self.blob) {
            tracing::warn!(bank = %self.name, %err, "bank unregistration failed");
        }
        Ok(())
    }

    fn media_list(&self, _out: &mut Vec<AssetPath>) {}
}

/// Bank data plus the media it references: load is a two-phase operation.
///
/// Phase one registers the blob; phase two issues one deduplicated
/// asynchronous stream request for every referenced media asset. The
/// returned ticket is held until unload; completion is fire-and-forget
/// from this component's perspective.
pub struct BankDataWithMedia {
    /// The bank payload.
    pub bank: BankData,
    /// Paths of the referenced media assets.
    pub media: Vec<AssetPath>,
    ticket: Mutex<Option<StreamHandle>>,
}

impl BankDataWithMedia {
    /// Pair a bank payload with its referenced media.
    pub fn new(bank: BankData, media: Vec<AssetPath>) -> Self {
        Self {
            bank,
            media,
            ticket: Mutex::new(None),
        }
    }

    /// Whether the media stream request is outstanding or completed and
    /// not yet released.
    pub fn is_media_requested(&self) -> bool {
        self.ticket.lock().is_some()
    }
}

impl AssetDataOps for BankDataWithMedia {
    fn load(&self, ctx: &AudioContext) -> AssetResult<()> {
        self.bank.load(ctx)?;
        if self.media.is_empty() {
            return Ok(());
        }
        let mut ticket = self.ticket.lock();
        if ticket.is_some() {
            // The request is already outstanding or completed.
            return Ok(());
        }
        let mut paths = Vec::new();
        for path in &self.media {
            add_unique(&mut paths, path);
        }
        *ticket = Some(ctx.resolver.request_async_load(paths));
        Ok(())
    }

    fn unload(&self, ctx: &AudioContext) -> AssetResult<()> {
        // Media is released only once the bank is out of the engine;
        // unregistering a bank invalidates in-flight media references
        // tied to it.
        self.bank.unload(ctx)?;
        self.ticket.lock().take();
        Ok(())
    }

    fn media_list(&self, out: &mut Vec<AssetPath>) {
        for path in &self.media {
            add_unique(out, path);
        }
    }
}

/// Closed set of per-platform asset payload kinds.
pub enum AssetData {
    /// A bank blob with no referenced media (e.g. the init bank).
    Bank(BankData),
    /// A bank blob plus streamed media.
    WithMedia(BankDataWithMedia),
    /// Media partly gated behind switch/state selectors.
    SwitchContainer(SwitchContainerData),
    /// A playable event, with metadata and optional localization.
    Event(EventData),
}

impl AssetData {
    /// The bank payload common to every kind.
    pub fn bank(&self) -> &BankData {
        match self {
            AssetData::Bank(data) => data,
            AssetData::WithMedia(data) => &data.bank,
            AssetData::SwitchContainer(data) => &data.base.bank,
            AssetData::Event(data) => &data.base.base.bank,
        }
    }

    /// Whether the bank blob is currently registered.
    pub fn is_loaded(&self) -> bool {
        self.bank().is_loaded()
    }

    /// The event payload, if this is an event.
    pub fn as_event(&self) -> Option<&EventData> {
        match self {
            AssetData::Event(data) => Some(data),
            _ => None,
        }
    }

    /// Drain pending switch broadcasts into the tree (owner thread).
    pub fn process_events(&self, ctx: &AudioContext) {
        match self {
            AssetData::Bank(_) | AssetData::WithMedia(_) => {}
            AssetData::SwitchContainer(data) => data.process_events(ctx),
            AssetData::Event(data) => data.process_events(ctx),
        }
    }
}

impl AssetDataOps for AssetData {
    fn load(&self, ctx: &AudioContext) -> AssetResult<()> {
        match self {
            AssetData::Bank(data) => data.load(ctx),
            AssetData::WithMedia(data) => data.load(ctx),
            AssetData::SwitchContainer(data) => data.load(ctx),
            AssetData::Event(data) => data.load(ctx),
        }
    }

    fn unload(&self, ctx: &AudioContext) -> AssetResult<()> {
        match self {
            AssetData::Bank(data) => data.unload(ctx),
            AssetData::WithMedia(data) => data.unload(ctx),
            AssetData::SwitchContainer(data) => data.unload(ctx),
            AssetData::Event(data) => data.unload(ctx),
        }
    }

    fn media_list(&self, out: &mut Vec<AssetPath>) {
        match self {
            AssetData::Bank(data) => data.media_list(out),
            AssetData::WithMedia(data) => data.media_list(out),
            AssetData::SwitchContainer(data) => data.media_list(out),
            AssetData::Event(data) => data.media_list(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use resona_core::config::AudioSettings;
    use resona_test_utils::MockAudioEngine;

    use super::*;
    use crate::media::{MediaAsset, MediaAssetData, MediaChunk};
    use crate::platform::PlatformKeyed;
    use crate::resolver::AssetRegistry;

    fn test_context() -> (Arc<MockAudioEngine>, Arc<AssetRegistry>, AudioContext) {
        let engine = Arc::new(MockAudioEngine::new());
        let registry = Arc::new(AssetRegistry::new(engine.clone()));
        let ctx = AudioContext::new(engine.clone(), registry.clone(), AudioSettings::default());
        (engine, registry, ctx)
    }

    fn register_media(registry: &AssetRegistry, path: &str, id: u32, size: usize) {
        let media = MediaAsset::new(
            id,
            PlatformKeyed::runtime(MediaAssetData {
                chunks: vec![MediaChunk::resident(false, vec![0u8; size])],
                ..Default::default()
            }),
        );
        registry.insert_media(AssetPath::new(path), Arc::new(media));
    }

    #[test]
    fn load_registers_the_bank_once() {
        let (engine, _registry, ctx) = test_context();
        let data = BankData::new("Weapons", vec![1u8; 256]);

        data.load(&ctx).unwrap();
        data.load(&ctx).unwrap();

        assert_eq!(engine.count_register_bank(), 1);
        assert!(data.is_loaded());
    }

    #[test]
    fn unload_twice_is_idempotent() {
        let (engine, _registry, ctx) = test_context();
        let data = BankData::new("Weapons", vec![1u8; 256]);

        data.load(&ctx).unwrap();
        data.unload(&ctx).unwrap();
        let second = data.unload(&ctx);

        assert!(matches!(second, Err(AssetError::NotLoaded { .. })));
        assert_eq!(engine.count_unregister_bank(), 1);
        assert_eq!(engine.bank_count(), 0);
    }

    #[test]
    fn empty_bank_loads_and_unloads_without_the_engine() {
        let (engine, _registry, ctx) = test_context();
        let data = BankData::empty("Stub");

        data.load(&ctx).unwrap();
        data.unload(&ctx).unwrap();

        assert_eq!(engine.call_count(), 0);
    }

    #[test]
    fn registration_failure_leaves_the_bank_unloaded() {
        let (engine, _registry, ctx) = test_context();
        engine.reject_banks("bad version");
        let data = BankData::new("Weapons", vec![1u8; 8]);

        assert!(data.load(&ctx).is_err());
        assert!(!data.is_loaded());
        assert_eq!(engine.bank_count(), 0);
    }

    #[test]
    fn media_request_is_deduplicated_and_issued_once() {
        let (_engine, registry, ctx) = test_context();
        register_media(&registry, "Media/1", 1, 8);
        register_media(&registry, "Media/2", 2, 8);

        let data = BankDataWithMedia::new(
            BankData::new("Weapons", vec![1u8; 8]),
            vec![
                AssetPath::new("Media/1"),
                AssetPath::new("Media/2"),
                AssetPath::new("Media/1"),
            ],
        );

        data.load(&ctx).unwrap();
        assert!(data.is_media_requested());
        assert_eq!(registry.pending_count(), 1);

        // Re-loading must not issue a second request.
        data.load(&ctx).unwrap();
        assert_eq!(registry.pending_count(), 1);
    }

    #[test]
    fn unload_releases_the_ticket_after_the_bank() {
        let (engine, registry, ctx) = test_context();
        register_media(&registry, "Media/1", 1, 8);

        let data = BankDataWithMedia::new(
            BankData::new("Weapons", vec![1u8; 8]),
            vec![AssetPath::new("Media/1")],
        );

        data.load(&ctx).unwrap();
        registry.process_pending(&ctx, 16);
        assert_eq!(engine.registered_media_ids(), vec![1]);

        data.unload(&ctx).unwrap();
        assert!(!data.is_media_requested());

        // The released ticket is swept on the next pump, dropping the media.
        registry.process_pending(&ctx, 16);
        assert!(engine.registered_media_ids().is_empty());
        assert_eq!(engine.bank_count(), 0);
    }

    #[test]
    fn failed_bank_load_skips_the_media_request() {
        let (engine, registry, ctx) = test_context();
        engine.reject_banks("bad version");
        register_media(&registry, "Media/1", 1, 8);

        let data = BankDataWithMedia::new(
            BankData::new("Weapons", vec![1u8; 8]),
            vec![AssetPath::new("Media/1")],
        );

        assert!(data.load(&ctx).is_err());
        assert!(!data.is_media_requested());
        assert_eq!(registry.pending_count(), 0);
    }
}
