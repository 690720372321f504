//! Logical audio assets driving load/unload on their platform payloads.
//!
//! One [`AssetBase`] exists per game-recognizable entity: a playable
//! event, a sound bank, an aux bus, or the init bank. The base selects the
//! running platform's [`AssetData`] and drives its lifecycle; load happens
//! when deserialization completes and unload at teardown.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::bank::{AssetData, AssetDataOps};
use crate::context::AudioContext;
use crate::platform::AssetPlatformData;

/// The logical asset backing every Resona asset kind.
pub struct AssetBase {
    /// Asset name, for diagnostics.
    pub name: String,
    /// Created lazily on the first build-time request, or deserialized
    /// directly at runtime.
    platform_data: Mutex<Option<Arc<AssetPlatformData>>>,
}

impl AssetBase {
    /// Create an asset over existing platform data (or none, for assets
    /// populated later by the build pipeline).
    pub fn new(name: impl Into<String>, platform_data: Option<Arc<AssetPlatformData>>) -> Self {
        Self {
            name: name.into(),
            platform_data: Mutex::new(platform_data),
        }
    }

    /// Convenience constructor for runtime assets: wraps cooked data for
    /// the running platform.
    pub fn with_runtime_data(name: impl Into<String>, data: AssetData) -> Self {
        Self::new(name, Some(Arc::new(AssetPlatformData::runtime(data))))
    }

    /// The platform data, if present.
    pub fn platform_data(&self) -> Option<Arc<AssetPlatformData>> {
        self.platform_data.lock().clone()
    }

    /// The payload for the running platform.
    pub fn asset_data(&self, ctx: &AudioContext) -> Option<Arc<AssetData>> {
        let platform_data = self.platform_data.lock().clone()?;
        platform_data.current(&ctx.settings.platform)
    }

    /// Runtime entry point: called once deserialization completes.
    pub fn post_load(&self, ctx: &AudioContext) {
        self.load(ctx);
    }

    /// Load the running platform's payload. Engine failures are logged and
    /// leave the asset silent rather than propagating.
    pub fn load(&self, ctx: &AudioContext) {
        if let Some(data) = self.asset_data(ctx)
            && let Err(err) = data.load(ctx)
        {
            tracing::warn!(asset = %self.name, %err, "asset failed to load");
        }
    }

    /// Unload the running platform's payload.
    pub fn unload(&self, ctx: &AudioContext) {
        if let Some(data) = self.asset_data(ctx)
            && let Err(err) = data.unload(ctx)
        {
            tracing::debug!(asset = %self.name, %err, "asset was not loaded");
        }
    }

    /// Find or create the payload for a platform (build pipeline). The
    /// platform-data object itself is created on first use.
    pub fn find_or_add_asset_data(
        &self,
        platform: &str,
        make: impl FnOnce() -> AssetData,
    ) -> Arc<AssetData> {
        let platform_data = {
            let mut guard = self.platform_data.lock();
            guard
                .get_or_insert_with(|| Arc::new(AssetPlatformData::editor()))
                .clone()
        };
        platform_data.find_or_add(platform, make)
    }
}

impl Drop for AssetBase {
    fn drop(&mut self) {
        // Teardown must unload through a context; a still-registered bank
        // at this point will never be handed back to the engine.
        let guard = self.platform_data.lock();
        if let Some(platform_data) = guard.as_ref()
            && Arc::strong_count(platform_data) == 1
            && platform_data.any_loaded()
        {
            tracing::warn!(asset = %self.name, "asset dropped while still loaded");
        }
    }
}

/// A user-defined sound bank asset.
pub struct SoundBank {
    /// The logical asset.
    pub base: AssetBase,
}

impl SoundBank {
    /// Wrap a logical asset as a sound bank.
    pub fn new(base: AssetBase) -> Self {
        Self { base }
    }
}

/// An auxiliary bus asset (environmental sends).
pub struct AuxBus {
    /// The logical asset.
    pub base: AssetBase,
}

impl AuxBus {
    /// Wrap a logical asset as an aux bus.
    pub fn new(base: AssetBase) -> Self {
        Self { base }
    }
}

/// The engine's always-resident startup bank, carrying plugin and global
/// configuration metadata plus the list of audio languages the project
/// was built with.
pub struct InitBank {
    /// The logical asset.
    pub base: AssetBase,
    /// Audio languages available in the built project.
    pub available_languages: Vec<String>,
}

impl InitBank {
    /// Wrap a logical asset as the init bank.
    pub fn new(base: AssetBase, available_languages: Vec<String>) -> Self {
        Self {
            base,
            available_languages,
        }
    }

    /// Whether the project was built with the given audio language.
    pub fn has_language(&self, language: &str) -> bool {
        self.available_languages
            .iter()
            .any(|available| available == language)
    }
}
