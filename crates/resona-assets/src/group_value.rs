//! Switch/state group values: the selector assets that gate
//! switch-container media.

use std::sync::atomic::{AtomicBool, Ordering};

use resona_core::path::AssetPath;

use crate::context::AudioContext;

/// A named selector whose current value determines which branch of a
/// switch container is active.
///
/// Loading a group value broadcasts on the engine's `switch loaded`
/// channel; unloading broadcasts on `switch unloaded`. Switch-container
/// trees react to both.
pub struct GroupValue {
    /// The selector's asset path, the key broadcasts are matched on.
    pub path: AssetPath,
    loaded: AtomicBool,
}

impl GroupValue {
    /// Create an unloaded group value.
    pub fn new(path: AssetPath) -> Self {
        Self {
            path,
            loaded: AtomicBool::new(false),
        }
    }

    /// Whether the selector is currently loaded (resolvable).
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Mark the selector loaded and broadcast. Idempotent.
    pub fn load(&self, ctx: &AudioContext) {
        if !self.loaded.swap(true, Ordering::AcqRel) {
            ctx.engine.switch_events().loaded.broadcast(self.path.clone());
        }
    }

    /// Mark the selector unloaded and broadcast. Idempotent.
    pub fn unload(&self, ctx: &AudioContext) {
        if self.loaded.swap(false, Ordering::AcqRel) {
            ctx.engine
                .switch_events()
                .unloaded
                .broadcast(self.path.clone());
        }
    }
}
