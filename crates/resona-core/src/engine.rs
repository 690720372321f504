//! The audio engine service abstraction.
//!
//! Everything the asset subsystem needs from the middleware runtime sits
//! behind [`AudioEngine`]: the bank table, the process-wide media table,
//! device memory, language state, and the switch/state broadcast pair.
//! Components receive the engine explicitly through their operation
//! context; there is no global accessor.

use std::fmt;
use std::sync::Arc;

use crate::broadcast::Channel;
use crate::path::AssetPath;

/// Identifier the engine assigns to a registered bank blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BankId(pub u32);

/// The id/pointer/size triple registered in the engine media table.
///
/// The `Arc` doubles as the registration identity: [`AudioEngine::unset_media`]
/// must receive the same buffer that was registered, and implementations
/// compare by pointer, not by content.
#[derive(Debug, Clone)]
pub struct MediaSourceSettings {
    /// The media asset's stable short id, the engine media key.
    pub id: u32,
    /// The payload handed to the engine.
    pub data: Arc<[u8]>,
}

impl MediaSourceSettings {
    /// Size of the registered payload in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Errors surfaced by an [`AudioEngine`] implementation.
#[derive(Debug)]
pub enum EngineError {
    /// The engine is not initialized; every operation is a no-op failure.
    Unavailable,

    /// The engine rejected a bank blob.
    BankRegistrationFailed {
        /// Bank name, for diagnostics.
        name: String,
        /// Engine-reported reason.
        reason: String,
    },

    /// A media id was registered while already present in the media table.
    AlreadyRegistered {
        /// The offending media id.
        media_id: u32,
    },

    /// An unregistration did not match the registered id/pointer/size triple.
    MediaMismatch {
        /// The offending media id.
        media_id: u32,
    },

    /// A bank handle that the engine does not know about.
    UnknownBank {
        /// The offending handle.
        bank: BankId,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Unavailable => {
                write!(f, "audio engine is not available")
            }
            EngineError::BankRegistrationFailed { name, reason } => {
                write!(f, "bank '{}' was rejected by the engine: {}", name, reason)
            }
            EngineError::AlreadyRegistered { media_id } => {
                write!(f, "media {} is already registered", media_id)
            }
            EngineError::MediaMismatch { media_id } => {
                write!(
                    f,
                    "media {} unregistration does not match the registered buffer",
                    media_id
                )
            }
            EngineError::UnknownBank { bank } => {
                write!(f, "unknown bank handle {:?}", bank)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// The two engine-wide switch/state broadcast channels.
///
/// A switch or state group value broadcasts on `loaded` when it becomes
/// available and on `unloaded` when it goes away; switch-container trees
/// gate their media on these.
#[derive(Default)]
pub struct SwitchBroadcasts {
    /// Fired when a group value finishes loading.
    pub loaded: Channel<AssetPath>,
    /// Fired when a group value is unloaded.
    pub unloaded: Channel<AssetPath>,
}

/// Service trait over the middleware runtime.
///
/// All methods take `&self` and return owned values, keeping the trait
/// object-safe and letting implementations use interior mutability; the
/// asset subsystem shares one engine through an `Arc<dyn AudioEngine>`.
pub trait AudioEngine: Send + Sync {
    /// Hand a compiled bank blob to the engine.
    fn register_bank(&self, name: &str, blob: Arc<[u8]>) -> EngineResult<BankId>;

    /// Remove a previously registered bank. The blob must be the buffer
    /// that was registered under `id`.
    fn unregister_bank(&self, id: BankId, blob: &Arc<[u8]>) -> EngineResult<()>;

    /// Register a media payload in the process-wide media table.
    ///
    /// At most one registration per media id may exist at a time.
    fn set_media(&self, source: MediaSourceSettings) -> EngineResult<()>;

    /// Unregister a media payload using the exact triple that was registered.
    fn unset_media(&self, source: &MediaSourceSettings) -> EngineResult<()>;

    /// Allocate a device-memory copy of `bytes`.
    ///
    /// `None` means device memory is exhausted; the caller is expected to
    /// fall back to the host buffer.
    fn device_alloc(&self, bytes: &[u8]) -> Option<Arc<[u8]>>;

    /// The language localized lookups fall back to.
    fn default_language(&self) -> String;

    /// The language whose localized data is currently active.
    fn current_language(&self) -> String;

    /// Record a completed language switch.
    fn set_current_language(&self, language: &str);

    /// The switch/state broadcast channels.
    fn switch_events(&self) -> &SwitchBroadcasts;
}
