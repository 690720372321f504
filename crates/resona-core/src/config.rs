//! Runtime settings for the Resona asset subsystem.

/// Configuration for a Resona runtime.
#[derive(Debug, Clone)]
pub struct AudioSettings {
    /// Name of the running platform, matching the per-platform keys the
    /// build pipeline writes (e.g. `Windows`, `PS4`).
    pub platform: String,
    /// Language used when a localized variant is missing.
    pub default_language: String,
    /// How many pending stream requests the registry completes per pump.
    pub max_pending_loads: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        AudioSettings {
            platform: "Windows".to_string(),
            default_language: "en-US".to_string(),
            max_pending_loads: 16,
        }
    }
}

impl AudioSettings {
    /// Settings for a specific platform, other fields defaulted.
    pub fn for_platform(platform: impl Into<String>) -> Self {
        AudioSettings {
            platform: platform.into(),
            ..Default::default()
        }
    }
}
