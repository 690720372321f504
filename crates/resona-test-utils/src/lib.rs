//! Test utilities for the Resona sound-bank integration.
//!
//! The main component is [`MockAudioEngine`], an [`resona_core::engine::AudioEngine`]
//! implementation that keeps its bank and media tables in memory, records
//! every call for verification, and enforces the table invariants
//! (at-most-one registration per media id, exact unregistration triples)
//! that a real middleware runtime relies on.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use resona_core::engine::{AudioEngine, MediaSourceSettings};
//! use resona_test_utils::MockAudioEngine;
//!
//! let engine = MockAudioEngine::new();
//! let data: Arc<[u8]> = vec![0u8; 64].into();
//!
//! engine
//!     .set_media(MediaSourceSettings { id: 7, data: data.clone() })
//!     .unwrap();
//!
//! assert_eq!(engine.count_set_media(), 1);
//! assert_eq!(engine.registered_media_ids(), vec![7]);
//! ```

mod mock_engine;

pub use mock_engine::{EngineCall, MockAudioEngine};
