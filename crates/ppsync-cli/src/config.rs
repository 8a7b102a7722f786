//! Operator configuration.
//!
//! Non-secret connection defaults are stored at
//! `~/.config/ppsctl/config.json`. Secrets never go into this file; the
//! password and OTP come from flags or the `PPS_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use ppsync_core::SessionConfig;

/// Application name used for the config directory path
const APP_NAME: &str = "ppsctl";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub allow_insecure: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// Connection values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub otp: Option<String>,
    pub otp_provider: Option<String>,
    /// `--insecure` / `--no-insecure`; `None` defers to the file.
    pub allow_insecure: Option<bool>,
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    /// A missing file is an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Declared session values: flags first, then this file. Anything left
    /// unset is filled from the environment when the session is established.
    pub fn session_config(&self, overrides: Overrides) -> SessionConfig {
        SessionConfig {
            server_url: overrides.server_url.or_else(|| self.server_url.clone()),
            username: overrides.username.or_else(|| self.username.clone()),
            password: overrides.password,
            otp: overrides.otp,
            otp_provider: overrides.otp_provider,
            allow_insecure: overrides.allow_insecure.or(self.allow_insecure),
            timeout_secs: self.timeout_secs,
        }
    }
}
