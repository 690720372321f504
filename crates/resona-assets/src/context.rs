//! Explicit service context threaded through asset operations.

use std::sync::Arc;

use resona_core::config::AudioSettings;
use resona_core::engine::AudioEngine;

use crate::resolver::AssetResolver;

/// The services every load/unload operation needs: the audio engine, the
/// asset-resolution service, and the runtime settings.
///
/// Passed by reference into each operation rather than stored on the
/// assets, so components stay free of global accessors and ownership
/// cycles. Built once at startup and owned by whatever drives the owner
/// thread.
pub struct AudioContext {
    /// The middleware runtime.
    pub engine: Arc<dyn AudioEngine>,
    /// Path-to-asset resolution and streaming.
    pub resolver: Arc<dyn AssetResolver>,
    /// Platform and language settings.
    pub settings: AudioSettings,
}

impl AudioContext {
    /// Bundle the services into a context.
    pub fn new(
        engine: Arc<dyn AudioEngine>,
        resolver: Arc<dyn AssetResolver>,
        settings: AudioSettings,
    ) -> Self {
        Self {
            engine,
            resolver,
            settings,
        }
    }
}
