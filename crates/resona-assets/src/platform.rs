//! Platform-keyed payload selection.
//!
//! Build-time assets carry one payload per target platform; cooked runtime
//! assets carry exactly the payload for the running platform. Both shapes
//! share [`PlatformKeyed`], and the cook step collapses the map into a
//! single entry (see `serial`).

use std::sync::Arc;

use parking_lot::Mutex;
use resona_core::alloc::HashMap;
use resona_core::path::AssetPath;

use crate::bank::{AssetData, AssetDataOps};

/// A payload selected by platform.
pub enum PlatformKeyed<T> {
    /// Build-time shape: one payload per target platform. Build workers
    /// populate entries concurrently, hence the lock.
    PerPlatform(Mutex<HashMap<String, Arc<T>>>),
    /// Runtime shape: the single payload cooked for this platform.
    Current(Arc<T>),
}

impl<T> PlatformKeyed<T> {
    /// Runtime shape holding one cooked payload.
    pub fn runtime(value: T) -> Self {
        PlatformKeyed::Current(Arc::new(value))
    }

    /// Empty build-time shape.
    pub fn editor() -> Self {
        PlatformKeyed::PerPlatform(Mutex::new(HashMap::new()))
    }

    /// Build-time shape seeded with the given entries.
    pub fn editor_with(entries: impl IntoIterator<Item = (String, T)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(platform, value)| (platform, Arc::new(value)))
            .collect();
        PlatformKeyed::PerPlatform(Mutex::new(map))
    }

    /// The payload for the given platform, if any.
    pub fn current(&self, platform: &str) -> Option<Arc<T>> {
        match self {
            PlatformKeyed::Current(value) => Some(value.clone()),
            PlatformKeyed::PerPlatform(map) => map.lock().get(platform).cloned(),
        }
    }

    /// Find the payload for `platform`, creating it with `make` on a miss.
    ///
    /// On the runtime shape this returns the single payload unchanged.
    pub fn find_or_add(&self, platform: &str, make: impl FnOnce() -> T) -> Arc<T> {
        match self {
            PlatformKeyed::Current(value) => value.clone(),
            PlatformKeyed::PerPlatform(map) => map
                .lock()
                .entry(platform.to_string())
                .or_insert_with(|| Arc::new(make()))
                .clone(),
        }
    }

    /// Platforms present in the build-time shape, sorted. Empty at runtime.
    pub fn platforms(&self) -> Vec<String> {
        match self {
            PlatformKeyed::Current(_) => Vec::new(),
            PlatformKeyed::PerPlatform(map) => {
                let mut platforms: Vec<String> = map.lock().keys().cloned().collect();
                platforms.sort();
                platforms
            }
        }
    }

    /// Visit every payload regardless of platform.
    pub fn for_each(&self, mut visit: impl FnMut(&Arc<T>)) {
        match self {
            PlatformKeyed::Current(value) => visit(value),
            PlatformKeyed::PerPlatform(map) => {
                for value in map.lock().values() {
                    visit(value);
                }
            }
        }
    }
}

/// The per-platform bank payload of one logical asset.
///
/// Exactly one [`AssetData`] is reachable at runtime.
pub struct AssetPlatformData {
    /// The platform-keyed asset data.
    pub data: PlatformKeyed<AssetData>,
}

impl AssetPlatformData {
    /// Runtime shape holding one cooked payload.
    pub fn runtime(data: AssetData) -> Self {
        Self {
            data: PlatformKeyed::runtime(data),
        }
    }

    /// Empty build-time shape.
    pub fn editor() -> Self {
        Self {
            data: PlatformKeyed::editor(),
        }
    }

    /// The asset data for the given platform.
    pub fn current(&self, platform: &str) -> Option<Arc<AssetData>> {
        self.data.current(platform)
    }

    /// Find or create the asset data for a platform (build pipeline).
    pub fn find_or_add(&self, platform: &str, make: impl FnOnce() -> AssetData) -> Arc<AssetData> {
        self.data.find_or_add(platform, make)
    }

    /// Collect the media referenced by every platform's payload,
    /// deduplicated.
    pub fn media_list(&self, out: &mut Vec<AssetPath>) {
        self.data.for_each(|data| data.media_list(out));
    }

    /// Whether any platform's payload currently holds a registered bank.
    pub fn any_loaded(&self) -> bool {
        let mut loaded = false;
        self.data.for_each(|data| loaded |= data.is_loaded());
        loaded
    }
}
