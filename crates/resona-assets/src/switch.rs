//! Switch-container trees: media gated behind switch/state selectors.
//!
//! A node's media is streamed in only while its group value (the selector
//! chosen by game logic) is loaded. Activation arrives through the two
//! engine-wide broadcast channels; the owning payload drains its
//! subscriptions from the owner thread in `process_events`.

use parking_lot::Mutex;
use resona_core::broadcast::Subscription;
use resona_core::path::AssetPath;
use resona_core::ticket::StreamHandle;

use crate::bank::{AssetDataOps, BankDataWithMedia, add_unique};
use crate::context::AudioContext;
use crate::error::AssetResult;

/// A tree node pairing a group value with media and child nodes.
///
/// Ownership is strictly parent to child; the tree never aliases.
pub struct SwitchContainerNode {
    /// Selector this node is gated on. `None` means the media is always
    /// requested when the owning payload loads.
    pub group_value: Option<AssetPath>,
    /// Media streamed while the selector is active.
    pub media: Vec<AssetPath>,
    /// Nested choices, each gated by its own selector.
    pub children: Vec<SwitchContainerNode>,
    ticket: Mutex<Option<StreamHandle>>,
}

impl SwitchContainerNode {
    /// Create a node.
    pub fn new(
        group_value: Option<AssetPath>,
        media: Vec<AssetPath>,
        children: Vec<SwitchContainerNode>,
    ) -> Self {
        Self {
            group_value,
            media,
            children,
            ticket: Mutex::new(None),
        }
    }

    /// Whether this node's media request is outstanding or completed and
    /// not yet released.
    pub fn is_media_requested(&self) -> bool {
        self.ticket.lock().is_some()
    }

    /// Request this node's media unless a request already exists. The
    /// ticket check also deduplicates repeated load broadcasts.
    fn load_media(&self, ctx: &AudioContext) {
        if self.media.is_empty() {
            return;
        }
        let mut ticket = self.ticket.lock();
        if ticket.is_some() {
            return;
        }
        let mut paths = Vec::new();
        for path in &self.media {
            add_unique(&mut paths, path);
        }
        *ticket = Some(ctx.resolver.request_async_load(paths));
    }

    /// Initial walk at payload load time. A node's media is requested when
    /// its selector currently resolves, or unconditionally when it has no
    /// selector. The walk continues into children either way: a child may
    /// be gated on a different selector that is active on its own.
    fn load_tree(&self, ctx: &AudioContext) {
        let active = match &self.group_value {
            None => true,
            Some(group_value) => ctx.resolver.is_loaded(group_value),
        };
        if active {
            self.load_media(ctx);
        }
        for child in &self.children {
            child.load_tree(ctx);
        }
    }

    /// A group value finished loading somewhere in the process.
    fn apply_switch_loaded(&self, path: &AssetPath, ctx: &AudioContext) {
        match &self.group_value {
            Some(group_value) if group_value == path => {
                self.load_media(ctx);
                // Pre-activate the subtree under the now-active selector;
                // each child still gates on its own selector.
                for child in &self.children {
                    child.load_tree(ctx);
                }
            }
            _ => {
                for child in &self.children {
                    child.apply_switch_loaded(path, ctx);
                }
            }
        }
    }

    /// A group value was unloaded somewhere in the process. Releases the
    /// matching node's subtree and nothing else.
    fn apply_switch_unloaded(&self, path: &AssetPath) {
        match &self.group_value {
            Some(group_value) if group_value == path => {
                self.release_media_recursive();
            }
            _ => {
                for child in &self.children {
                    child.apply_switch_unloaded(path);
                }
            }
        }
    }

    fn release_media_recursive(&self) {
        self.ticket.lock().take();
        for child in &self.children {
            child.release_media_recursive();
        }
    }

    fn media_list(&self, out: &mut Vec<AssetPath>) {
        for path in &self.media {
            add_unique(out, path);
        }
        for child in &self.children {
            child.media_list(out);
        }
    }
}

struct SwitchSubscriptions {
    loaded: Subscription<AssetPath>,
    unloaded: Subscription<AssetPath>,
}

/// Bank data whose media is partly gated behind switch/state selectors.
///
/// Subscribes to the engine's switch broadcasts on first load (when the
/// tree is non-empty) and stays subscribed until dropped; the subscription
/// objects detach themselves, so teardown cannot leave a dangling
/// delegate.
pub struct SwitchContainerData {
    /// The always-on bank payload and media.
    pub base: BankDataWithMedia,
    /// Top-level switch container nodes.
    pub containers: Vec<SwitchContainerNode>,
    subscriptions: Mutex<Option<SwitchSubscriptions>>,
}

impl SwitchContainerData {
    /// Pair a media-bearing payload with its switch tree.
    pub fn new(base: BankDataWithMedia, containers: Vec<SwitchContainerNode>) -> Self {
        Self {
            base,
            containers,
            subscriptions: Mutex::new(None),
        }
    }

    /// Whether the payload is listening for switch broadcasts.
    pub fn is_subscribed(&self) -> bool {
        self.subscriptions.lock().is_some()
    }

    /// Drain pending switch broadcasts into the tree. Call from the owner
    /// thread; broadcasts emitted on other threads queue until then.
    pub fn process_events(&self, ctx: &AudioContext) {
        let subscriptions = self.subscriptions.lock();
        let Some(subscriptions) = subscriptions.as_ref() else {
            return;
        };
        for path in subscriptions.loaded.drain() {
            for node in &self.containers {
                node.apply_switch_loaded(&path, ctx);
            }
        }
        for path in subscriptions.unloaded.drain() {
            for node in &self.containers {
                node.apply_switch_unloaded(&path);
            }
        }
    }
}

impl AssetDataOps for SwitchContainerData {
    fn load(&self, ctx: &AudioContext) -> AssetResult<()> {
        self.base.load(ctx)?;
        if !self.containers.is_empty() {
            for node in &self.containers {
                node.load_tree(ctx);
            }
            let mut subscriptions = self.subscriptions.lock();
            if subscriptions.is_none() {
                let events = ctx.engine.switch_events();
                *subscriptions = Some(SwitchSubscriptions {
                    loaded: events.loaded.subscribe(),
                    unloaded: events.unloaded.subscribe(),
                });
            }
        }
        Ok(())
    }

    fn unload(&self, ctx: &AudioContext) -> AssetResult<()> {
        self.base.unload(ctx)?;
        for node in &self.containers {
            node.release_media_recursive();
        }
        Ok(())
    }

    fn media_list(&self, out: &mut Vec<AssetPath>) {
        self.base.media_list(out);
        for node in &self.containers {
            node.media_list(out);
        }
    }
}

/// One node's worth of build-pipeline output: the media the node claims
/// plus its children. Input to [`build_switch_tree`].
pub struct SwitchNodeClaim {
    /// Selector the node is gated on.
    pub group_value: Option<AssetPath>,
    /// Every media path the pipeline attributed to this node, duplicates
    /// across the tree included.
    pub claimed_media: Vec<AssetPath>,
    /// Nested claims.
    pub children: Vec<SwitchNodeClaim>,
}

/// Build a switch tree from per-node claims in two passes: first every
/// media path is assigned to the shallowest node claiming it, then
/// duplicate claims are pruned top-down. No path ends up requested from
/// two nodes, and the result does not depend on sibling parse order
/// beyond first-claim-wins at equal depth.
pub fn build_switch_tree(claims: Vec<SwitchNodeClaim>) -> Vec<SwitchContainerNode> {
    use resona_core::alloc::HashMap;

    fn assign(
        claims: &[SwitchNodeClaim],
        depth: usize,
        counter: &mut usize,
        owners: &mut HashMap<AssetPath, (usize, usize)>,
    ) {
        for claim in claims {
            let node = *counter;
            *counter += 1;
            for path in &claim.claimed_media {
                match owners.get(path) {
                    Some((owner_depth, _)) if *owner_depth <= depth => {}
                    _ => {
                        owners.insert(path.clone(), (depth, node));
                    }
                }
            }
            assign(&claim.children, depth + 1, counter, owners);
        }
    }

    fn prune(
        claims: Vec<SwitchNodeClaim>,
        counter: &mut usize,
        owners: &HashMap<AssetPath, (usize, usize)>,
    ) -> Vec<SwitchContainerNode> {
        claims
            .into_iter()
            .map(|claim| {
                let node = *counter;
                *counter += 1;
                let mut media = Vec::new();
                for path in &claim.claimed_media {
                    if owners.get(path).is_some_and(|(_, owner)| *owner == node) {
                        add_unique(&mut media, path);
                    }
                }
                let children = prune(claim.children, counter, owners);
                SwitchContainerNode::new(claim.group_value, media, children)
            })
            .collect()
    }

    let mut owners = HashMap::new();
    let mut counter = 0;
    assign(&claims, 0, &mut counter, &mut owners);

    let mut counter = 0;
    prune(claims, &mut counter, &owners)
}
