//! Environment variable processing for runtime configuration overrides.
//!
//! Env var prefix: `TESTOPIA_SYNC_`
//!
//! - `TESTOPIA_SYNC_PROFILE` - select a configuration profile
//! - `TESTOPIA_SYNC_LOG` - log filter (e.g. `debug`, `testopia_sync=trace`)
//! - `TESTOPIA_SYNC_INSTALLATION` - select the installation by name
//! - `TESTOPIA_SYNC_RUN_ID` - override the test run id
//! - `TESTOPIA_SYNC_URL` - override the selected installation's URL
//! - `TESTOPIA_SYNC_USERNAME` - override the selected installation's user
//! - `TESTOPIA_SYNC_PASSWORD` - override the selected installation's password
//! - `TESTOPIA_SYNC_WORKSPACE` - override the workspace root
//! - `TESTOPIA_SYNC_VERBOSE` - enable debug logging (1/true/yes)
//! - `TESTOPIA_SYNC_REPORT_FORMAT` - summary format (text/html)

use super::{Config, Installation, SummaryFormat};
use std::path::PathBuf;

const PREFIX: &str = "TESTOPIA_SYNC_";

/// Name given to the installation created from env vars alone.
pub const ENV_INSTALLATION: &str = "env";

/// Read the active profile name from `TESTOPIA_SYNC_PROFILE`.
pub fn get_profile_name() -> Option<String> {
    env_str("PROFILE")
}

/// Read the log filter from `TESTOPIA_SYNC_LOG`.
pub fn get_log_filter() -> Option<String> {
    env_str("LOG")
}

/// Apply individual env var overrides to a config.
///
/// Each override is applied only if the env var is set and parses correctly.
/// Invalid values are silently ignored.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(val) = env_str("INSTALLATION") {
        config.installation = Some(val);
    }

    if let Some(val) = env_parse::<i32>("RUN_ID") {
        config.run_id = Some(val);
    }

    if let Some(val) = env_str("WORKSPACE") {
        config.workspace = Some(PathBuf::from(val));
    }

    if let Some(val) = env_bool("VERBOSE") {
        config.verbose = val;
    }

    if let Some(val) = env_str("REPORT_FORMAT") {
        match val.to_lowercase().as_str() {
            "text" => config.report.format = SummaryFormat::Text,
            "html" => config.report.format = SummaryFormat::Html,
            _ => {} // invalid value, ignore
        }
    }

    let url = env_str("URL");
    let username = env_str("USERNAME");
    let password = env_str("PASSWORD");
    if url.is_none() && username.is_none() && password.is_none() {
        return;
    }

    // Credentials without any configured installation define one.
    if config.installations.is_empty() && url.is_some() {
        config.installations.push(Installation {
            name: config
                .installation
                .clone()
                .unwrap_or_else(|| ENV_INSTALLATION.to_string()),
            ..Default::default()
        });
    }

    if let Some(installation) = config.selected_installation_mut() {
        if let Some(url) = url {
            installation.url = url;
        }
        if let Some(username) = username {
            installation.username = username;
        }
        if let Some(password) = password {
            installation.password = password;
        }
    }
}

/// Summarize which env var overrides are currently active.
///
/// Returns a list of `(env_var_name, value)` pairs for display in `check`.
/// The password value is masked.
pub fn detect_active_overrides() -> Vec<(String, String)> {
    let keys = [
        "PROFILE",
        "INSTALLATION",
        "RUN_ID",
        "URL",
        "USERNAME",
        "PASSWORD",
        "WORKSPACE",
        "VERBOSE",
        "REPORT_FORMAT",
        "LOG",
    ];

    let mut active = Vec::new();
    for key in keys {
        if let Some(val) = env_str(key) {
            let shown = if key == "PASSWORD" { "********".to_string() } else { val };
            active.push((format!("{PREFIX}{key}"), shown));
        }
    }
    active
}

// --- helpers ---

fn env_str(suffix: &str) -> Option<String> {
    std::env::var(format!("{PREFIX}{suffix}"))
        .ok()
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(suffix: &str) -> Option<T> {
    env_str(suffix).and_then(|s| s.parse().ok())
}

fn env_bool(suffix: &str) -> Option<bool> {
    env_str(suffix).map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
}

// Env vars are process-global, so serialize tests that read or mutate them.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
