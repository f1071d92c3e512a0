//! Configuration file parser for ~/.config/castpage/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde (with `deny_unknown_fields` off),
//! though we log a warning when the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::util::validate_url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RSS feed to render. Must be an absolute http(s) URL.
    pub feed_url: String,

    /// Name of the key-value slot holding the cached feed.
    pub cache_key: String,

    /// How long a cached feed is served before refetching.
    pub cache_ttl_minutes: u64,

    /// Upper bound on the whole feed download (connect + body).
    pub fetch_timeout_secs: u64,

    /// Feed bodies larger than this are rejected.
    pub max_feed_bytes: usize,

    /// Page `<title>`.
    pub page_title: String,

    /// Local logo shown when an episode has no usable cover image.
    pub placeholder_image: String,

    /// Substrings marking a feed image as the host's generic stock artwork.
    pub placeholder_markers: Vec<String>,

    /// Description excerpt length on grid cards.
    pub grid_excerpt_chars: usize,

    /// Description excerpt length on the highlighted latest episode.
    pub highlight_excerpt_chars: usize,

    /// Workflow-dispatch endpoint settings.
    pub trigger: TriggerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "https://anchor.fm/s/101530384/podcast/rss".to_string(),
            cache_key: "aiconvocast_rss_cache".to_string(),
            cache_ttl_minutes: 120,
            fetch_timeout_secs: 30,
            max_feed_bytes: 10 * 1024 * 1024,
            page_title: "AI Convo Cast".to_string(),
            placeholder_image: "ai-convo-cast-logo.jpg".to_string(),
            placeholder_markers: vec!["placeholder".to_string()],
            grid_excerpt_chars: 100,
            highlight_excerpt_chars: 180,
            trigger: TriggerConfig::default(),
        }
    }
}

/// Settings for `castpage serve`.
///
/// SEC-015: Custom Debug impl masks `token` to prevent secret leakage
/// in logs, error messages, and debug output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// API root of the CI provider.
    pub api_base: String,

    /// `owner/name` of the repository hosting the workflow.
    pub repo: String,

    /// Workflow file name or numeric id.
    pub workflow: String,

    /// Branch the workflow runs on.
    pub git_ref: String,

    /// Bearer token (alternative to GH_TOKEN env var).
    /// Env var takes precedence over config file.
    pub token: Option<String>,

    /// Listen address for the HTTP server.
    pub bind: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            repo: "AIConvoCast/AIConvoCast".to_string(),
            workflow: "ai_podcast_pipeline.yml".to_string(),
            git_ref: "main".to_string(),
            token: None,
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// SEC-015: Mask token in Debug output to prevent secret leakage.
impl std::fmt::Debug for TriggerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerConfig")
            .field("api_base", &self.api_base)
            .field("repo", &self.repo)
            .field("workflow", &self.workflow)
            .field("git_ref", &self.git_ref)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("bind", &self.bind)
            .finish()
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 11] = [
        "feed_url",
        "cache_key",
        "cache_ttl_minutes",
        "fetch_timeout_secs",
        "max_feed_bytes",
        "page_title",
        "placeholder_image",
        "placeholder_markers",
        "grid_excerpt_chars",
        "highlight_excerpt_chars",
        "trigger",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    /// - Non-http(s) `feed_url` → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(path = %path.display(), feed_url = %config.feed_url, "Loaded configuration");
        Ok(config)
    }

    /// Checks cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url(&self.feed_url).map_err(|e| ConfigError::Invalid {
            key: "feed_url",
            reason: e.to_string(),
        })?;
        if self.cache_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "cache_key",
                reason: "must not be empty".to_string(),
            });
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_minutes.saturating_mul(60))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
