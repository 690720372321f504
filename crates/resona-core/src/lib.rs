//! Resona Core
//!
//! Shared vocabulary for the Resona sound-bank integration: the audio
//! engine service abstraction, stream tickets, broadcast channels, asset
//! paths, and runtime settings.

pub mod alloc;
pub mod broadcast;
pub mod config;
pub mod engine;
pub mod logging;
pub mod path;
pub mod ticket;
