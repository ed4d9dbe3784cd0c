use crate::bundle::BundleLimits;
use crate::error::Result;
use crate::paths;
use crate::scanner::DEFAULT_DISCOVERY_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DiscoverySettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoverySettings {
    #[serde(default = "default_depth")]
    pub depth: usize,
    #[serde(default)]
    pub include_protected: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_depth() -> usize {
    DEFAULT_DISCOVERY_DEPTH
}

fn default_cache_ttl_secs() -> u64 {
    crate::discovery::DEFAULT_CACHE_TTL.as_secs()
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            include_protected: false,
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl DiscoverySettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

// ---------------------------------------------------------------------------
// LimitsSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsSettings {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_file_bytes() -> u64 {
    crate::bundle::MAX_FILE_BYTES
}

fn default_max_archive_bytes() -> u64 {
    crate::bundle::MAX_ARCHIVE_BYTES
}

fn default_timeout_secs() -> u64 {
    crate::bundle::OPERATION_TIMEOUT.as_secs()
}

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_archive_bytes: default_max_archive_bytes(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl From<&LimitsSettings> for BundleLimits {
    fn from(limits: &LimitsSettings) -> Self {
        BundleLimits {
            max_file_bytes: limits.max_file_bytes,
            max_archive_bytes: limits.max_archive_bytes,
            timeout: Duration::from_secs(limits.timeout_secs),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// User settings, read from `~/.vinsly/config.yaml` unless overridden.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub limits: LimitsSettings,
}

impl Settings {
    /// Explicit path if given, else the default location under the home dir.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => paths::default_config_path(),
        }
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Settings = serde_yaml::from_str(&data)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    pub fn bundle_limits(&self) -> BundleLimits {
        BundleLimits::from(&self.limits)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.discovery.depth == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "discovery.depth is 0; scans always descend at least one level"
                    .to_string(),
            });
        } else if self.discovery.depth > 32 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "discovery.depth={} is unusually deep and may make scans slow",
                    self.discovery.depth
                ),
            });
        }

        if self.discovery.cache_ttl_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "discovery.cache_ttl_secs is 0; every discovery rescans the home directory"
                    .to_string(),
            });
        }

        if self.limits.max_file_bytes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "limits.max_file_bytes is 0; no file can be imported".to_string(),
            });
        }
        if self.limits.max_archive_bytes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "limits.max_archive_bytes is 0; no archive can be imported".to_string(),
            });
        } else if self.limits.max_archive_bytes < self.limits.max_file_bytes {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "limits.max_archive_bytes ({}) is smaller than limits.max_file_bytes ({})",
                    self.limits.max_archive_bytes, self.limits.max_file_bytes
                ),
            });
        }

        if self.limits.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "limits.timeout_secs is 0; every file operation would time out"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
