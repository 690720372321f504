//! Mock implementation of the audio engine for testing.
//!
//! Records every call against in-memory bank and media tables without
//! touching a real middleware runtime.

use std::sync::Arc;

use parking_lot::Mutex;
use resona_core::engine::{
    AudioEngine, BankId, EngineError, EngineResult, MediaSourceSettings, SwitchBroadcasts,
};

/// Records an engine operation for verification in tests.
#[derive(Debug, Clone)]
pub enum EngineCall {
    RegisterBank {
        name: String,
        size: usize,
    },
    UnregisterBank {
        bank: BankId,
    },
    SetMedia {
        id: u32,
        size: usize,
    },
    UnsetMedia {
        id: u32,
        size: usize,
    },
    DeviceAlloc {
        size: usize,
    },
}

struct RegisteredBank {
    name: String,
    blob: Arc<[u8]>,
}

/// Mock implementation of [`AudioEngine`] for testing.
///
/// Methods take `&self` but mutate internal tables, so state lives behind
/// `parking_lot::Mutex` (the trait requires `Send + Sync`, which rules out
/// `RefCell`). The media table enforces the invariants a real runtime
/// depends on: a second registration under a live id fails, and an
/// unregistration must present the exact buffer that was registered.
pub struct MockAudioEngine {
    /// Recorded calls for verification.
    calls: Mutex<Vec<EngineCall>>,

    /// Registered banks by handle.
    banks: Mutex<Vec<(BankId, RegisteredBank)>>,

    /// The process-wide media table: id -> registered triple.
    media: Mutex<Vec<MediaSourceSettings>>,

    /// Next bank handle to hand out.
    next_bank: Mutex<u32>,

    /// When false, `device_alloc` reports exhaustion.
    device_memory_available: Mutex<bool>,

    /// When set, `register_bank` rejects every blob with this reason.
    reject_banks: Mutex<Option<String>>,

    switch: SwitchBroadcasts,

    default_language: Mutex<String>,
    current_language: Mutex<String>,
}

impl MockAudioEngine {
    /// Create a mock engine with device memory available and `en-US` as
    /// both the default and current language.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            banks: Mutex::new(Vec::new()),
            media: Mutex::new(Vec::new()),
            next_bank: Mutex::new(1),
            device_memory_available: Mutex::new(true),
            reject_banks: Mutex::new(None),
            switch: SwitchBroadcasts::default(),
            default_language: Mutex::new("en-US".to_string()),
            current_language: Mutex::new("en-US".to_string()),
        }
    }

    /// Simulate device memory exhaustion (or recovery).
    pub fn set_device_memory_available(&self, available: bool) {
        *self.device_memory_available.lock() = available;
    }

    /// Make `register_bank` reject every blob with the given reason.
    pub fn reject_banks(&self, reason: impl Into<String>) {
        *self.reject_banks.lock() = Some(reason.into());
    }

    /// Stop rejecting bank registrations.
    pub fn accept_banks(&self) {
        *self.reject_banks.lock() = None;
    }

    /// Override the default language.
    pub fn set_default_language(&self, language: impl Into<String>) {
        *self.default_language.lock() = language.into();
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Clear recorded calls (useful between test steps).
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Count `set_media` calls.
    pub fn count_set_media(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, EngineCall::SetMedia { .. }))
            .count()
    }

    /// Count `unset_media` calls.
    pub fn count_unset_media(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, EngineCall::UnsetMedia { .. }))
            .count()
    }

    /// Count `register_bank` calls.
    pub fn count_register_bank(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, EngineCall::RegisterBank { .. }))
            .count()
    }

    /// Count `unregister_bank` calls.
    pub fn count_unregister_bank(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, EngineCall::UnregisterBank { .. }))
            .count()
    }

    /// Ids currently present in the media table, ascending.
    pub fn registered_media_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.media.lock().iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of the media table as `(id, size)` pairs, ascending by id.
    pub fn media_snapshot(&self) -> Vec<(u32, usize)> {
        let mut entries: Vec<(u32, usize)> =
            self.media.lock().iter().map(|m| (m.id, m.size())).collect();
        entries.sort_unstable();
        entries
    }

    /// The registered payload size for a media id, if registered.
    pub fn media_size(&self, id: u32) -> Option<usize> {
        self.media
            .lock()
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.size())
    }

    /// Names of currently registered banks, in registration order.
    pub fn registered_bank_names(&self) -> Vec<String> {
        self.banks
            .lock()
            .iter()
            .map(|(_, bank)| bank.name.clone())
            .collect()
    }

    /// Number of currently registered banks.
    pub fn bank_count(&self) -> usize {
        self.banks.lock().len()
    }
}

impl Default for MockAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for MockAudioEngine {
    fn register_bank(&self, name: &str, blob: Arc<[u8]>) -> EngineResult<BankId> {
        self.calls.lock().push(EngineCall::RegisterBank {
            name: name.to_string(),
            size: blob.len(),
        });

        if let Some(reason) = self.reject_banks.lock().clone() {
            return Err(EngineError::BankRegistrationFailed {
                name: name.to_string(),
                reason,
            });
        }

        let mut next = self.next_bank.lock();
        let id = BankId(*next);
        *next += 1;

        self.banks.lock().push((
            id,
            RegisteredBank {
                name: name.to_string(),
                blob,
            },
        ));
        Ok(id)
    }

    fn unregister_bank(&self, id: BankId, blob: &Arc<[u8]>) -> EngineResult<()> {
        self.calls.lock().push(EngineCall::UnregisterBank { bank: id });

        let mut banks = self.banks.lock();
        let Some(index) = banks.iter().position(|(bank_id, _)| *bank_id == id) else {
            return Err(EngineError::UnknownBank { bank: id });
        };
        if !Arc::ptr_eq(&banks[index].1.blob, blob) {
            return Err(EngineError::UnknownBank { bank: id });
        }
        banks.remove(index);
        Ok(())
    }

    fn set_media(&self, source: MediaSourceSettings) -> EngineResult<()> {
        self.calls.lock().push(EngineCall::SetMedia {
            id: source.id,
            size: source.size(),
        });

        let mut media = self.media.lock();
        if media.iter().any(|m| m.id == source.id) {
            return Err(EngineError::AlreadyRegistered {
                media_id: source.id,
            });
        }
        media.push(source);
        Ok(())
    }

    fn unset_media(&self, source: &MediaSourceSettings) -> EngineResult<()> {
        self.calls.lock().push(EngineCall::UnsetMedia {
            id: source.id,
            size: source.size(),
        });

        let mut media = self.media.lock();
        let Some(index) = media.iter().position(|m| {
            m.id == source.id && Arc::ptr_eq(&m.data, &source.data)
        }) else {
            return Err(EngineError::MediaMismatch {
                media_id: source.id,
            });
        };
        media.remove(index);
        Ok(())
    }

    fn device_alloc(&self, bytes: &[u8]) -> Option<Arc<[u8]>> {
        self.calls
            .lock()
            .push(EngineCall::DeviceAlloc { size: bytes.len() });

        if *self.device_memory_available.lock() {
            Some(bytes.to_vec().into())
        } else {
            None
        }
    }

    fn default_language(&self) -> String {
        self.default_language.lock().clone()
    }

    fn current_language(&self) -> String {
        self.current_language.lock().clone()
    }

    fn set_current_language(&self, language: &str) {
        *self.current_language.lock() = language.to_string();
    }

    fn switch_events(&self) -> &SwitchBroadcasts {
        &self.switch
    }
}
