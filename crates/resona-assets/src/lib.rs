//! Sound-bank and streaming-media asset integration.
//!
//! Resona wires a third-party audio middleware's compiled banks, events,
//! and streamed media into a game engine's asset pipeline. The hard core
//! is the asset-data load/unload graph: platform- and language-specific
//! payloads that must be handed to the engine, streamed, and handed back
//! without leaking engine-side resources, while supporting runtime
//! language switching.
//!
//! - [`MediaAsset`] registers resident payloads in the engine media table
//!   and tells the streaming backend which chunk to serve.
//! - [`AssetData`] is the closed set of per-platform payload kinds, from a
//!   plain bank blob up to a localized event, each with a load/unload
//!   state machine.
//! - [`SwitchContainerNode`] trees stream media only while their
//!   switch/state selector is active, reacting to engine-wide broadcasts.
//! - [`AudioEvent`] adds localized-language switching over either nested
//!   per-language payloads or separate per-language platform data.
//! - [`AssetRegistry`] resolves paths to assets and services stream
//!   requests from the owner thread.
//!
//! Operations never block: stream requests return a ticket immediately and
//! complete on the owner thread's pumps ([`AssetRegistry::process_pending`],
//! [`AudioEvent::process_pending`]). All services arrive through an
//! explicit [`AudioContext`]; there are no global accessors.

pub mod asset;
pub mod bank;
pub mod context;
pub mod error;
pub mod event;
pub mod group_value;
pub mod io;
pub mod media;
pub mod platform;
pub mod resolver;
pub mod serial;
pub mod streaming;
pub mod switch;

pub use asset::{AssetBase, AuxBus, InitBank, SoundBank};
pub use bank::{AssetData, AssetDataOps, BankData, BankDataWithMedia};
pub use context::AudioContext;
pub use error::{AssetError, AssetResult};
pub use event::{AudioEvent, EventData, SwitchLanguageCallback};
pub use group_value::GroupValue;
pub use io::{BytesFuture, BytesReader, FileReader, IoResult, MemoryReader};
pub use media::{ChunkData, MediaAsset, MediaAssetData, MediaChunk};
pub use platform::{AssetPlatformData, PlatformKeyed};
pub use resolver::{AssetRegistry, AssetResolver};
pub use serial::CookFilter;
pub use streaming::{StreamDescriptor, StreamingHook};
pub use switch::{SwitchContainerData, SwitchContainerNode, SwitchNodeClaim, build_switch_tree};
