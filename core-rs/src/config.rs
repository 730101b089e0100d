/**
 * config.rs
 * Daemon configuration (YAML file + command line overrides)
 *
 * Format:
 * ```yaml
 * listen: 127.0.0.1:49200
 * poolMin: 49201
 * poolMax: 49299
 * stateFile: /var/lib/pald/pald.dump
 * throttleMs: 1000
 * ```
 *
 * Every key is optional. Precedence: defaults < file < overrides.
 */

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{PaldError, Result};

/// Port the daemon listens on and the client talks to by default
pub const DEFAULT_LISTEN_PORT: u16 = 49200;

/// Default dynamic pool, right above the daemon's own port
pub const DEFAULT_POOL_MIN: u16 = 49201;
pub const DEFAULT_POOL_MAX: u16 = 49299;

/// Minimum time between two writes of the state file
pub const DEFAULT_THROTTLE_MS: u64 = 1000;

pub const STATE_DIR_NAME: &str = ".pald";
pub const STATE_FILE_NAME: &str = "pald.dump";

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub listen: SocketAddr,
    pub pool_min: u16,
    pub pool_max: u16,
    pub state_file: PathBuf,
    pub throttle_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_LISTEN_PORT)),
            pool_min: DEFAULT_POOL_MIN,
            pool_max: DEFAULT_POOL_MAX,
            state_file: default_state_dir().join(STATE_FILE_NAME),
            throttle_ms: DEFAULT_THROTTLE_MS,
        }
    }
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<SocketAddr>,
    pub pool_min: Option<u16>,
    pub pool_max: Option<u16>,
    pub state_file: Option<PathBuf>,
    pub throttle_ms: Option<u64>,
}

impl DaemonConfig {
    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(DaemonConfig::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PaldError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Save as YAML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Apply overrides on top of this configuration
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(listen) = overrides.listen {
            self.listen = listen;
        }
        if let Some(min) = overrides.pool_min {
            self.pool_min = min;
        }
        if let Some(max) = overrides.pool_max {
            self.pool_max = max;
        }
        if let Some(ref path) = overrides.state_file {
            self.state_file = path.clone();
        }
        if let Some(ms) = overrides.throttle_ms {
            self.throttle_ms = ms;
        }
        self
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    /// Reject settings the daemon cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.pool_min > self.pool_max {
            return Err(PaldError::Config(format!(
                "poolMin {} must not exceed poolMax {}",
                self.pool_min, self.pool_max
            )));
        }
        if self.throttle_ms == 0 {
            return Err(PaldError::Config("throttleMs must be greater than zero".to_string()));
        }
        if self.state_file.as_os_str().is_empty() {
            return Err(PaldError::Config("stateFile must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Per-user state directory: `$HOME/.pald`, or the working directory when
/// `HOME` is not set
pub fn default_state_dir() -> PathBuf {
    match env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(STATE_DIR_NAME),
        _ => PathBuf::from("."),
    }
}
