//! Error types for the asset subsystem.

use std::fmt;
use std::path::PathBuf;

use resona_core::engine::EngineError;
use resona_core::path::AssetPath;

/// Errors that can occur during asset operations.
///
/// Engine-level failures are recovered locally by the components (logged,
/// asset left unloaded); these values exist so callers that want the
/// detail can have it, never to abort the process over a missing asset.
#[derive(Debug)]
pub enum AssetError {
    /// The audio engine rejected a bank blob; the asset stays unloaded.
    BankRegistrationFailed {
        /// Bank name, for diagnostics.
        name: String,
        /// Engine-reported reason.
        reason: String,
    },

    /// Unloading an asset whose bank was never handed to the engine.
    NotLoaded {
        /// Bank name, for diagnostics.
        name: String,
    },

    /// Chunk data has not been paged in; the load was deferred.
    MediaNotResident {
        /// The media asset's short id.
        media_id: u32,
    },

    /// A language with neither an exact nor default-language asset.
    LanguageUnavailable {
        /// The requested language.
        language: String,
    },

    /// A referenced asset could not be resolved.
    NotFound {
        /// The unresolved path.
        path: AssetPath,
    },

    /// Failed to read bytes from the streaming backend.
    IoError {
        /// The file that failed.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Malformed persisted data or an out-of-range stream request.
    InvalidData {
        /// Description of the problem.
        message: String,
    },

    /// An engine operation failed.
    Engine(EngineError),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::BankRegistrationFailed { name, reason } => {
                write!(f, "bank '{}' failed to register: {}", name, reason)
            }
            AssetError::NotLoaded { name } => {
                write!(f, "bank '{}' is not loaded", name)
            }
            AssetError::MediaNotResident { media_id } => {
                write!(f, "media {} is not resident", media_id)
            }
            AssetError::LanguageUnavailable { language } => {
                write!(f, "no asset available for language '{}'", language)
            }
            AssetError::NotFound { path } => {
                write!(f, "asset not found: {}", path)
            }
            AssetError::IoError { path, source } => {
                write!(f, "IO error reading '{}': {}", path.display(), source)
            }
            AssetError::InvalidData { message } => {
                write!(f, "invalid asset data: {}", message)
            }
            AssetError::Engine(err) => {
                write!(f, "engine error: {}", err)
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::IoError { source, .. } => Some(source),
            AssetError::Engine(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EngineError> for AssetError {
    fn from(err: EngineError) -> Self {
        AssetError::Engine(err)
    }
}

/// Result type alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
