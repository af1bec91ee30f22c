use super::{Config, DEFAULT_CONFIG_FILE};
use crate::core::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader that supports multiple sources.
pub struct ConfigLoader {
    /// Directory the default config file is looked up in.
    base_dir: Option<PathBuf>,
    /// Explicit config file; missing is an error.
    config_file: Option<PathBuf>,
    /// Profile selected by the caller; wins over the env var.
    profile: Option<String>,
}

impl ConfigLoader {
    /// Create a new configuration loader.
    pub fn new() -> Self {
        Self {
            base_dir: None,
            config_file: None,
            profile: None,
        }
    }

    /// Set the directory used when no config file is given explicitly.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Set a configuration file path.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Select a profile, overriding `TESTOPIA_SYNC_PROFILE`.
    pub fn profile(mut self, name: impl Into<String>) -> Self {
        self.profile = Some(name.into());
        self
    }

    /// Load configuration from all enabled sources.
    ///
    /// Priority (later sources override earlier):
    /// 1. Default values
    /// 2. TOML file (explicit, or `testopia.toml` in the base directory if present)
    /// 3. Profile overlay (`--profile` or `TESTOPIA_SYNC_PROFILE`)
    /// 4. Individual env var overrides (`TESTOPIA_SYNC_*`)
    ///
    /// Returns the config and the directory relative paths resolve against.
    pub fn load(self) -> Result<(Config, PathBuf)> {
        let base_dir = match self.base_dir.clone() {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };

        let (path, required) = match &self.config_file {
            Some(path) => (path.clone(), true),
            None => (base_dir.join(DEFAULT_CONFIG_FILE), false),
        };

        let mut config_dir = base_dir;
        let mut value = serde_json::to_value(Config::default())?;
        let mut profiles: HashMap<String, serde_json::Value> = HashMap::new();

        if required || path.exists() {
            let file_value = self.load_toml_file(&path)?;
            extract_profiles(&file_value, &mut profiles);
            deep_merge(&mut value, &strip_profiles(file_value));
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                config_dir = parent.to_path_buf();
            }
            debug!(path = %path.display(), "loaded configuration file");
        }

        let profile_name = self.profile.clone().or_else(super::env::get_profile_name);
        if let Some(profile_name) = profile_name {
            let profile_value = profiles.get(&profile_name).ok_or_else(|| {
                let mut available: Vec<&str> = profiles.keys().map(String::as_str).collect();
                available.sort_unstable();
                if available.is_empty() {
                    Error::config(format!(
                        "profile '{}' not found (no profiles defined)",
                        profile_name,
                    ))
                } else {
                    Error::config(format!(
                        "profile '{}' not found. Available profiles: {}",
                        profile_name,
                        available.join(", "),
                    ))
                }
            })?;
            deep_merge(&mut value, profile_value);
            debug!(profile = %profile_name, "applied configuration profile");
        }

        let mut config: Config = serde_json::from_value(value)
            .map_err(|e| Error::config(format!("invalid configuration: {}", e)))?;

        // Apply individual env var overrides (highest priority)
        super::env::apply_env_overrides(&mut config);

        config.validate()?;
        Ok((config, config_dir))
    }

    /// Load a TOML file as a generic value so profiles can be pulled out.
    fn load_toml_file(&self, path: &Path) -> Result<serde_json::Value> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| Error::config(format!("failed to parse TOML config: {}", e)))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract profile definitions from a config value.
///
/// Profiles live at `value["profiles"]` as `{ name: { ...config fields... } }`.
fn extract_profiles(value: &serde_json::Value, profiles: &mut HashMap<String, serde_json::Value>) {
    if let Some(serde_json::Value::Object(map)) = value.get("profiles") {
        for (name, profile_value) in map {
            profiles.insert(name.clone(), profile_value.clone());
        }
    }
}

fn strip_profiles(mut value: serde_json::Value) -> serde_json::Value {
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("profiles");
    }
    value
}

/// Recursively deep-merge `overlay` into `base`.
///
/// - Objects: keys are merged recursively (overlay keys win for conflicts).
/// - Scalars and arrays: overlay replaces base entirely.
pub(crate) fn deep_merge(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                let entry = base_map
                    .entry(key.clone())
                    .or_insert(serde_json::Value::Null);
                deep_merge(entry, overlay_val);
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}
