//! Asset paths - stable keys naming game assets.

use std::fmt;

/// A stable, cheaply cloneable key naming a game asset.
///
/// Paths use forward slashes and follow the layout the build pipeline
/// writes, e.g. `Media/164958987` or `Events/Localized/en-US/Play_Dialogue`.
/// Localized assets carry their language as one path segment, which is
/// what [`AssetPath::swap_language`] rewrites.
///
/// An `AssetPath` is a lookup key, never an owning reference: it is
/// resolved through the asset-resolution service at the point of use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetPath(String);

impl AssetPath {
    /// Create a path from any string-like value.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the path is empty (an unset reference).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rewrite the language segment of a localized path.
    ///
    /// Substitution is segment-wise, so a language tag never matches part
    /// of another segment (`en` does not rewrite inside `en-US`). Returns
    /// the path unchanged if no segment equals `from`.
    pub fn swap_language(&self, from: &str, to: &str) -> AssetPath {
        let swapped: Vec<&str> = self
            .0
            .split('/')
            .map(|segment| if segment == from { to } else { segment })
            .collect();
        AssetPath(swapped.join("/"))
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetPath {
    fn from(path: &str) -> Self {
        AssetPath::new(path)
    }
}

impl From<String> for AssetPath {
    fn from(path: String) -> Self {
        AssetPath(path)
    }
}
