//! # Settings
//!
//! Process-wide configuration shared by the CLI and the server.
//! Settings come from an optional TOML file followed by environment
//! overrides, so every field has a working default.
//!
//! ## File Format
//!
//! ```toml
//! docs_dir = "/etc/clinical-calculators/docs"
//! version = "1.0"
//!
//! [dependencies]
//! probe = ["python3", "-c", "import {module}"]
//! installer = ["python3", "-m", "pip", "install"]
//! install_timeout_secs = 120
//! resolve_on_startup = true
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//! ```
//!
//! ## Environment Variables
//!
//! - `CLINICAL_CALCULATORS_CONFIG`: path of the TOML file
//! - `CLINICAL_CALCULATORS_DOCS_DIR`: overrides `docs_dir`
//! - `CLINICAL_CALCULATORS_VERSION`: overrides `version`
//! - `HOST` / `PORT`: override the server bind address

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};

/// Environment variable naming the settings file
pub const CONFIG_ENV: &str = "CLINICAL_CALCULATORS_CONFIG";

/// Environment variable overriding the documentation directory
pub const DOCS_DIR_ENV: &str = "CLINICAL_CALCULATORS_DOCS_DIR";

/// Environment variable overriding the version stamped into metadata
pub const VERSION_ENV: &str = "CLINICAL_CALCULATORS_VERSION";

/// Version stamped into responses when nothing else is configured
pub const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// On-disk documentation directory, consulted before the embedded docs
    pub docs_dir: Option<PathBuf>,

    /// Version string stamped into response metadata
    pub version: String,

    /// Dependency probing and installation
    pub dependencies: DependencySettings,

    /// HTTP server bind address
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            docs_dir: None,
            version: DEFAULT_VERSION.to_string(),
            dependencies: DependencySettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `CLINICAL_CALCULATORS_CONFIG` (if set) and apply
    /// environment overrides.
    pub fn load() -> CalcResult<Self> {
        let mut settings = match env::var_os(CONFIG_ENV) {
            Some(path) => Settings::from_file(Path::new(&path))?,
            None => Settings::default(),
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Parse a TOML settings file.
    pub fn from_file(path: &Path) -> CalcResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CalcError::config(path.display().to_string(), e.to_string()))?;
        Settings::from_toml(&contents)
            .map_err(|e| CalcError::config(path.display().to_string(), e.to_string()))
    }

    /// Parse settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply environment variable overrides in place.
    pub fn apply_env(&mut self) {
        if let Some(dir) = env::var_os(DOCS_DIR_ENV) {
            self.docs_dir = Some(PathBuf::from(dir));
        }
        if let Ok(version) = env::var(VERSION_ENV) {
            if !version.trim().is_empty() {
                self.version = version;
            }
        }
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }
}

/// How declared calculator dependencies are probed and installed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencySettings {
    /// Probe command; `{module}` is replaced by the probe module name.
    /// Exit status 0 means present. When empty, the module is looked up as
    /// an executable on `PATH`.
    pub probe: Vec<String>,

    /// Installer command; missing requirements are appended as arguments.
    /// When empty, installation always fails.
    pub installer: Vec<String>,

    /// Upper bound for one installer run
    pub install_timeout_secs: u64,

    /// Resolve every calculator's dependencies when the server starts
    pub resolve_on_startup: bool,
}

impl Default for DependencySettings {
    fn default() -> Self {
        DependencySettings {
            probe: Vec::new(),
            installer: Vec::new(),
            install_timeout_secs: 300,
            resolve_on_startup: true,
        }
    }
}

impl DependencySettings {
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }
}

/// HTTP bind address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}
