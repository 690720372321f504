//! Asset resolution and owner-thread streaming.
//!
//! Media and localized data are referenced by [`AssetPath`] and resolved
//! through the injected [`AssetResolver`] service; ownership is a lookup,
//! never a stored reference. The same service issues stream requests:
//! they return a ticket immediately and are serviced from the owner
//! thread's `process_pending` pump.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use resona_core::alloc::HashMap;
use resona_core::engine::AudioEngine;
use resona_core::path::AssetPath;
use resona_core::ticket::{StreamHandle, TicketState};

use crate::context::AudioContext;
use crate::group_value::GroupValue;
use crate::media::MediaAsset;
use crate::platform::AssetPlatformData;

/// Path-to-asset resolution plus asynchronous streaming.
pub trait AssetResolver: Send + Sync {
    /// The media asset at `path`, if known.
    fn resolve_media(&self, path: &AssetPath) -> Option<Arc<MediaAsset>>;

    /// The platform-data asset at `path`, if known.
    fn resolve_platform_data(&self, path: &AssetPath) -> Option<Arc<AssetPlatformData>>;

    /// Whether any asset exists at `path` (loadable, not necessarily
    /// resident).
    fn contains(&self, path: &AssetPath) -> bool;

    /// Whether the asset at `path` is currently loaded/valid - the
    /// switch-container gating predicate.
    fn is_loaded(&self, path: &AssetPath) -> bool;

    /// Begin streaming the given assets. Never blocks; the returned ticket
    /// completes once the request has been serviced, and releasing it
    /// before then cancels the request.
    fn request_async_load(&self, paths: Vec<AssetPath>) -> StreamHandle;
}

/// A stream request and, once serviced, the record keeping its media
/// referenced until the ticket is released.
struct StreamRecord {
    state: Arc<TicketState>,
    paths: Vec<AssetPath>,
}

/// In-memory asset tables plus the streaming pump.
///
/// The game registers its cooked assets here; load/unload components look
/// them up by path. Stream requests queue until [`AssetRegistry::process_pending`]
/// services them on the owner thread: requested media is loaded (and
/// reference-counted across overlapping requests), and media whose last
/// referencing ticket has been released is unloaded.
pub struct AssetRegistry {
    engine: Arc<dyn AudioEngine>,
    media: Mutex<HashMap<AssetPath, Arc<MediaAsset>>>,
    platform_data: Mutex<HashMap<AssetPath, Arc<AssetPlatformData>>>,
    group_values: Mutex<HashMap<AssetPath, Arc<GroupValue>>>,
    pending: Mutex<VecDeque<StreamRecord>>,
    active: Mutex<Vec<StreamRecord>>,
    stream_refs: Mutex<HashMap<AssetPath, u32>>,
    next_ticket: AtomicU64,
}

impl AssetRegistry {
    /// Create an empty registry over the given engine.
    pub fn new(engine: Arc<dyn AudioEngine>) -> Self {
        Self {
            engine,
            media: Mutex::new(HashMap::new()),
            platform_data: Mutex::new(HashMap::new()),
            group_values: Mutex::new(HashMap::new()),
            pending: Mutex::new(VecDeque::new()),
            active: Mutex::new(Vec::new()),
            stream_refs: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Register a media asset under its path.
    pub fn insert_media(&self, path: AssetPath, media: Arc<MediaAsset>) {
        self.media.lock().insert(path, media);
    }

    /// Register a platform-data asset under its path.
    pub fn insert_platform_data(&self, path: AssetPath, data: Arc<AssetPlatformData>) {
        self.platform_data.lock().insert(path, data);
    }

    /// Register a group value under its own path.
    pub fn insert_group_value(&self, value: Arc<GroupValue>) {
        self.group_values.lock().insert(value.path.clone(), value);
    }

    /// The group value at `path`, if known.
    pub fn group_value(&self, path: &AssetPath) -> Option<Arc<GroupValue>> {
        self.group_values.lock().get(path).cloned()
    }

    /// Number of queued stream requests.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether any stream requests are queued.
    pub fn has_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// The engine this registry loads media against.
    pub fn engine(&self) -> &Arc<dyn AudioEngine> {
        &self.engine
    }

    /// Service queued stream requests (call each frame from the owner
    /// thread). At most `max_loads` requests complete per call; returns
    /// the number serviced. Requests whose ticket was released before
    /// servicing are discarded, and media whose last referencing ticket
    /// has been released is unloaded first.
    pub fn process_pending(&self, ctx: &AudioContext, max_loads: usize) -> usize {
        self.sweep_released(ctx);

        let mut processed = 0;
        while processed < max_loads {
            let Some(request) = self.pending.lock().pop_front() else {
                break;
            };
            processed += 1;

            if request.state.is_released() {
                // Cancelled before servicing; nothing was loaded, so
                // nothing needs releasing.
                continue;
            }

            for path in &request.paths {
                if let Some(media) = self.resolve_media(path) {
                    *self.stream_refs.lock().entry(path.clone()).or_insert(0) += 1;
                    media.load(ctx);
                } else if self.resolve_platform_data(path).is_none() {
                    tracing::warn!(%path, "stream request for unknown asset");
                }
            }

            request.state.mark_complete();
            self.active.lock().push(request);
        }

        processed
    }

    fn sweep_released(&self, ctx: &AudioContext) {
        let released: Vec<StreamRecord> = {
            let mut active = self.active.lock();
            let mut released = Vec::new();
            active.retain_mut(|record| {
                if record.state.is_released() {
                    released.push(StreamRecord {
                        state: record.state.clone(),
                        paths: std::mem::take(&mut record.paths),
                    });
                    false
                } else {
                    true
                }
            });
            released
        };

        for record in released {
            for path in &record.paths {
                let last_reference = {
                    let mut refs = self.stream_refs.lock();
                    match refs.get_mut(path) {
                        Some(count) => {
                            *count -= 1;
                            if *count == 0 {
                                refs.remove(path);
                                true
                            } else {
                                false
                            }
                        }
                        None => false,
                    }
                };
                if last_reference
                    && let Some(media) = self.resolve_media(path)
                {
                    media.unload(ctx);
                }
            }
        }
    }
}

impl AssetResolver for AssetRegistry {
    fn resolve_media(&self, path: &AssetPath) -> Option<Arc<MediaAsset>> {
        self.media.lock().get(path).cloned()
    }

    fn resolve_platform_data(&self, path: &AssetPath) -> Option<Arc<AssetPlatformData>> {
        self.platform_data.lock().get(path).cloned()
    }

    fn contains(&self, path: &AssetPath) -> bool {
        self.media.lock().contains_key(path)
            || self.platform_data.lock().contains_key(path)
            || self.group_values.lock().contains_key(path)
    }

    fn is_loaded(&self, path: &AssetPath) -> bool {
        if let Some(value) = self.group_values.lock().get(path) {
            return value.is_loaded();
        }
        if let Some(media) = self.media.lock().get(path) {
            return media.is_registered();
        }
        self.platform_data.lock().contains_key(path)
    }

    fn request_async_load(&self, paths: Vec<AssetPath>) -> StreamHandle {
        let state = TicketState::new(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        self.pending.lock().push_back(StreamRecord {
            state: state.clone(),
            paths,
        });
        StreamHandle::new(state)
    }
}
