//! Playable events and localized-language switching.

use std::sync::Arc;

use parking_lot::Mutex;
use resona_core::alloc::HashMap;
use resona_core::path::AssetPath;
use resona_core::ticket::StreamHandle;

use crate::asset::AssetBase;
use crate::bank::{AssetData, AssetDataOps};
use crate::context::AudioContext;
use crate::error::AssetResult;
use crate::platform::AssetPlatformData;
use crate::switch::SwitchContainerData;

/// The per-platform payload of a playable event: switch-gated media plus
/// playback metadata and, for events packed into a bank with their voice
/// lines, nested per-language variants.
///
/// When `localized_media` is non-empty, the fields of `base` describe the
/// non-localized (SFX) portion and each entry is a variant of the same
/// shape loaded on demand.
pub struct EventData {
    /// Switch tree, media, and the bank blob.
    pub base: SwitchContainerData,
    /// Maximum attenuation radius for this event.
    pub max_attenuation_radius: f32,
    /// Whether this event loops forever (duration fields invalid).
    pub is_infinite: bool,
    /// Minimum playback duration in seconds.
    pub min_duration: f32,
    /// Maximum playback duration in seconds.
    pub max_duration: f32,
    /// Per-language variants, keyed by audio language.
    pub localized_media: HashMap<String, EventData>,
}

impl EventData {
    /// Wrap a switch-container payload with zeroed metadata.
    pub fn new(base: SwitchContainerData) -> Self {
        Self {
            base,
            max_attenuation_radius: 0.0,
            is_infinite: false,
            min_duration: 0.0,
            max_duration: 0.0,
            localized_media: HashMap::new(),
        }
    }

    /// The variant for a language, if packed in.
    pub fn localized(&self, language: &str) -> Option<&EventData> {
        self.localized_media.get(language)
    }

    /// Drain pending switch broadcasts for this payload and any loaded
    /// localized variants.
    pub fn process_events(&self, ctx: &AudioContext) {
        self.base.process_events(ctx);
        for variant in self.localized_media.values() {
            variant.process_events(ctx);
        }
    }
}

impl AssetDataOps for EventData {
    fn load(&self, ctx: &AudioContext) -> AssetResult<()> {
        // Localized variants load on demand through the owning event.
        self.base.load(ctx)
    }

    fn unload(&self, ctx: &AudioContext) -> AssetResult<()> {
        self.base.unload(ctx)
    }

    fn media_list(&self, out: &mut Vec<AssetPath>) {
        self.base.media_list(out);
        for variant in self.localized_media.values() {
            variant.media_list(out);
        }
    }
}

/// Callback invoked once a language switch finishes.
pub type SwitchLanguageCallback = Box<dyn FnOnce(bool) + Send>;

/// A language switch waiting on its platform-data stream.
struct PendingSwitch {
    language: String,
    path: AssetPath,
    ticket: StreamHandle,
    on_complete: Option<SwitchLanguageCallback>,
}

/// Localized platform data currently swapped in, together with the stream
/// ticket that loaded it. The ticket is held until the data is unloaded.
struct LoadedLocalized {
    data: Arc<AssetPlatformData>,
    ticket: StreamHandle,
}

/// Which representation serves a requested language.
enum LanguageTarget {
    /// The language is packed into the event data itself.
    Nested,
    /// The language lives in a separate platform-data asset at this path
    /// (possibly already substituted with the default language).
    PlatformData(AssetPath),
}

/// A playable event asset with localized-language switching.
///
/// Two representations of localized data coexist: per-language platform
/// data referenced by path, and per-language variants nested inside the
/// event payload. Both are checked wherever localization matters.
pub struct AudioEvent {
    /// The logical asset this event specializes.
    pub base: AssetBase,
    /// Language to platform-data path, for the separate-asset
    /// representation.
    pub localized_platform_data: HashMap<String, AssetPath>,
    current_localized: Mutex<Option<LoadedLocalized>>,
    pending_switch: Mutex<Option<PendingSwitch>>,
}

impl AudioEvent {
    /// Wrap a logical asset as an event.
    pub fn new(base: AssetBase) -> Self {
        Self {
            base,
            localized_platform_data: HashMap::new(),
            current_localized: Mutex::new(None),
            pending_switch: Mutex::new(None),
        }
    }

    /// Attach the per-language platform-data paths.
    pub fn with_localized_platform_data(
        mut self,
        map: impl IntoIterator<Item = (String, AssetPath)>,
    ) -> Self {
        self.localized_platform_data = map.into_iter().collect();
        self
    }

    /// The payload playback routes through: the active localized platform
    /// data when a language is swapped in, the base data otherwise.
    pub fn asset_data(&self, ctx: &AudioContext) -> Option<Arc<AssetData>> {
        if !self.localized_platform_data.is_empty()
            && let Some(localized) = self.current_localized.lock().as_ref()
        {
            return localized.data.current(&ctx.settings.platform);
        }
        self.base.asset_data(ctx)
    }

    fn with_event_data<R>(
        &self,
        ctx: &AudioContext,
        read: impl FnOnce(&EventData) -> R,
    ) -> Option<R> {
        let data = self.asset_data(ctx)?;
        data.as_event().map(read)
    }

    /// Maximum attenuation radius, 0 when no event data is reachable.
    pub fn max_attenuation_radius(&self, ctx: &AudioContext) -> f32 {
        self.with_event_data(ctx, |event| event.max_attenuation_radius)
            .unwrap_or(0.0)
    }

    /// Whether the event loops forever.
    pub fn is_infinite(&self, ctx: &AudioContext) -> bool {
        self.with_event_data(ctx, |event| event.is_infinite)
            .unwrap_or(false)
    }

    /// Minimum playback duration in seconds.
    pub fn minimum_duration(&self, ctx: &AudioContext) -> f32 {
        self.with_event_data(ctx, |event| event.min_duration)
            .unwrap_or(0.0)
    }

    /// Maximum playback duration in seconds.
    pub fn maximum_duration(&self, ctx: &AudioContext) -> f32 {
        self.with_event_data(ctx, |event| event.max_duration)
            .unwrap_or(0.0)
    }

    /// Whether this event carries localized data in either representation.
    pub fn is_localized(&self, ctx: &AudioContext) -> bool {
        !self.localized_platform_data.is_empty()
            || self
                .with_event_data(ctx, |event| !event.localized_media.is_empty())
                .unwrap_or(false)
    }

    /// Runtime entry point: called once deserialization completes.
    pub fn post_load(&self, ctx: &AudioContext) {
        self.load(ctx);
    }

    /// Load the event, routing through the localized path when localized.
    pub fn load(&self, ctx: &AudioContext) {
        if self.is_localized(ctx) {
            let language = ctx.engine.current_language();
            self.load_localized(ctx, &language, None);
        } else {
            self.base.load(ctx);
        }
    }

    /// Unload the event, routing through the localized path when localized.
    pub fn unload(&self, ctx: &AudioContext) {
        if self.is_localized(ctx) {
            self.unload_localized(ctx);
        } else {
            self.base.unload(ctx);
        }
    }

    /// Swap the event's localized data to `new_language`.
    ///
    /// Availability is verified before anything is unloaded: the exact
    /// language asset is looked up first, then the same path with the
    /// default language substituted. Returns `false` and changes nothing
    /// when neither representation can serve the language, so a failed
    /// switch leaves the previous language playing. `on_complete` fires
    /// once the new data is resident.
    pub fn switch_language(
        &self,
        ctx: &AudioContext,
        new_language: &str,
        on_complete: Option<SwitchLanguageCallback>,
    ) -> bool {
        let Some(target) = self.resolve_language(ctx, new_language) else {
            return false;
        };

        self.unload_localized(ctx);
        self.load_target(ctx, new_language, target, on_complete);
        true
    }

    /// Drive pending work from the owner thread: switch broadcasts for the
    /// active payload, and completion of an in-flight language switch.
    pub fn process_pending(&self, ctx: &AudioContext) {
        if let Some(data) = self.asset_data(ctx) {
            data.process_events(ctx);
        }

        let completed = {
            let mut pending = self.pending_switch.lock();
            match pending.as_ref() {
                Some(waiting) if waiting.ticket.is_complete() => pending.take(),
                _ => None,
            }
        };
        let Some(PendingSwitch {
            language,
            path,
            ticket,
            on_complete,
        }) = completed
        else {
            return;
        };

        match ctx.resolver.resolve_platform_data(&path) {
            Some(data) => {
                *self.current_localized.lock() = Some(LoadedLocalized { data, ticket });
                if let Some(asset_data) = self.asset_data(ctx)
                    && let Err(err) = asset_data.load(ctx)
                {
                    tracing::warn!(event = %self.base.name, %err, "localized data failed to load");
                }
                ctx.engine.set_current_language(&language);
                if let Some(callback) = on_complete {
                    callback(true);
                }
            }
            None => {
                tracing::warn!(
                    event = %self.base.name,
                    %path,
                    "localized platform data did not resolve"
                );
                if let Some(callback) = on_complete {
                    callback(false);
                }
            }
        }
    }

    /// Whether a language switch is waiting on its stream.
    pub fn has_pending_switch(&self) -> bool {
        self.pending_switch.lock().is_some()
    }

    fn resolve_language(&self, ctx: &AudioContext, language: &str) -> Option<LanguageTarget> {
        if let Some(path) = self.localized_platform_data.get(language) {
            if ctx.resolver.contains(path) {
                return Some(LanguageTarget::PlatformData(path.clone()));
            }
            let fallback = path.swap_language(language, &ctx.engine.default_language());
            if ctx.resolver.contains(&fallback) {
                return Some(LanguageTarget::PlatformData(fallback));
            }
            return None;
        }
        if self
            .with_event_data(ctx, |event| event.localized_media.contains_key(language))
            .unwrap_or(false)
        {
            return Some(LanguageTarget::Nested);
        }
        None
    }

    fn load_localized(
        &self,
        ctx: &AudioContext,
        language: &str,
        on_complete: Option<SwitchLanguageCallback>,
    ) {
        match self.resolve_language(ctx, language) {
            Some(target) => self.load_target(ctx, language, target, on_complete),
            None => {
                tracing::debug!(
                    event = %self.base.name,
                    language,
                    "no localized data for language, loading base payload"
                );
                self.base.load(ctx);
                if let Some(callback) = on_complete {
                    callback(false);
                }
            }
        }
    }

    fn load_target(
        &self,
        ctx: &AudioContext,
        language: &str,
        target: LanguageTarget,
        on_complete: Option<SwitchLanguageCallback>,
    ) {
        match target {
            LanguageTarget::Nested => {
                // The variant's own load issues whatever streaming it
                // needs; nothing more is outstanding at this level.
                let loaded = self
                    .with_event_data(ctx, |event| {
                        match event.localized(language) {
                            Some(variant) => match variant.load(ctx) {
                                Ok(()) => true,
                                Err(err) => {
                                    tracing::warn!(
                                        event = %self.base.name,
                                        language,
                                        %err,
                                        "nested localized data failed to load"
                                    );
                                    false
                                }
                            },
                            None => false,
                        }
                    })
                    .unwrap_or(false);
                if loaded {
                    ctx.engine.set_current_language(language);
                }
                if let Some(callback) = on_complete {
                    callback(loaded);
                }
            }
            LanguageTarget::PlatformData(path) => {
                let ticket = ctx.resolver.request_async_load(vec![path.clone()]);
                *self.pending_switch.lock() = Some(PendingSwitch {
                    language: language.to_string(),
                    path,
                    ticket,
                    on_complete,
                });
            }
        }
    }

    fn unload_localized(&self, ctx: &AudioContext) {
        let nested = self
            .with_event_data(ctx, |event| !event.localized_media.is_empty())
            .unwrap_or(false);
        if nested {
            let current = ctx.engine.current_language();
            if let Some(data) = self.asset_data(ctx)
                && let Some(event) = data.as_event()
                && let Some(variant) = event.localized(&current)
                && let Err(err) = variant.unload(ctx)
            {
                tracing::debug!(
                    event = %self.base.name,
                    language = %current,
                    %err,
                    "nested localized data was not loaded"
                );
            }
            return;
        }

        // A switch still in flight is cancelled by dropping its ticket.
        self.pending_switch.lock().take();

        let swapped_out = self.current_localized.lock().take();
        if let Some(LoadedLocalized { data, ticket }) = swapped_out {
            if let Some(asset_data) = data.current(&ctx.settings.platform)
                && let Err(err) = asset_data.unload(ctx)
            {
                tracing::warn!(event = %self.base.name, %err, "localized data failed to unload");
            }
            ticket.release();
        }
    }
}
