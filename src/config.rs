use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::directive::DirectiveDef;
use crate::error::ConfigError;
use crate::registry::Overrides;
use crate::resolve::Sources;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "LG_DIRECTIVES_CONFIG";

const USER_CONFIG: &str = "~/.config/lg-directives/config.toml";

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub directives: DirectivesConfig,
    /// Operator-defined directives.
    #[serde(default, rename = "directive", skip_serializing_if = "Vec::is_empty")]
    pub directive: Vec<DirectiveDef>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub log_level: String,
    #[serde(default)]
    pub log_file: String,
    /// Ambient IPv4 source used when a query carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source4: Option<Ipv4Addr>,
    /// Ambient IPv6 source used when a query carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source6: Option<Ipv6Addr>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct DirectivesConfig {
    #[serde(default)]
    pub replace: bool,
    #[serde(default)]
    pub remove: Vec<String>,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    directives: DirectivesOverlay,
    #[serde(default)]
    directive: Vec<DirectiveDef>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    log_level: Option<String>,
    log_file: Option<String>,
    source4: Option<Ipv4Addr>,
    source6: Option<Ipv6Addr>,
}

#[derive(Debug, Deserialize, Default)]
struct DirectivesOverlay {
    replace: Option<bool>,
    #[serde(default)]
    remove: Vec<String>,
}

// ── Merge logic ──

/// Extend a list with additions, skipping items already present.
fn merge_list(base: &mut Vec<String>, add: Vec<String>) {
    for item in add {
        if !base.contains(&item) {
            base.push(item);
        }
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the overlay from `$LG_DIRECTIVES_CONFIG`, or
    ///    ~/.config/lg-directives/config.toml, if the file exists
    ///
    /// Scalars in the overlay override defaults, `remove` extends, and
    /// `[[directive]]` entries are appended.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| USER_CONFIG.to_string());
        Self::load_from(&expand(&path))
    }

    /// Load defaults plus the overlay at `path`. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default_config();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(config);
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        let overlay: ConfigOverlay =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.apply_overlay(overlay);
        Ok(config)
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        // Settings: scalar overrides
        let s = overlay.settings;
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }
        if let Some(v) = s.log_file {
            self.settings.log_file = v;
        }
        if s.source4.is_some() {
            self.settings.source4 = s.source4;
        }
        if s.source6.is_some() {
            self.settings.source6 = s.source6;
        }

        // Directives
        let d = overlay.directives;
        if let Some(v) = d.replace {
            self.directives.replace = v;
        }
        merge_list(&mut self.directives.remove, d.remove);
        self.directive.extend(overlay.directive);
    }

    /// Registry overrides described by this config.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            replace: self.directives.replace,
            remove: self.directives.remove.clone(),
            directives: self.directive.clone(),
        }
    }

    /// Default ambient sources.
    pub fn sources(&self) -> Sources {
        Sources {
            source4: self.settings.source4,
            source6: self.settings.source6,
        }
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        self.settings
            .log_level
            .parse()
            .map_err(|_| ConfigError::LogLevel(self.settings.log_level.clone()))
    }

    /// Log file path with `~` and environment variables expanded.
    pub fn log_path(&self) -> PathBuf {
        expand(&self.settings.log_file)
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

/// Expand `~` and `$VAR` in a configured path, leaving it as written when a
/// variable is unset.
fn expand(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(p) => PathBuf::from(p.into_owned()),
        Err(e) => {
            log::warn!("cannot expand {path}: {e}");
            PathBuf::from(shellexpand::tilde(path).into_owned())
        }
    }
}
