//! Configuration types for the upgrader (persisted as `core-upgrader.toml`).
//!
//! Loading, flag overrides and path resolution live in the CLI crate; this
//! crate only owns the on-disk shape and its defaults.

use serde::{Deserialize, Serialize};

/// Canonical config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "core-upgrader.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UpgraderConfig {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub extensions: ExtensionSettings,
    #[serde(default)]
    pub local_configuration: LocalConfigurationSettings,
    #[serde(default)]
    pub runner: RunnerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSettings {
    /// SQLite database file holding the site tables.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtensionSettings {
    /// Extension keys considered loaded in addition to the composer manifest.
    #[serde(default)]
    pub loaded: Vec<String>,
    #[serde(default = "default_composer_bin")]
    pub composer_bin: String,
    /// Directory holding `composer.json`; installs run from here.
    #[serde(default = "default_project_dir")]
    pub project_dir: String,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            loaded: Vec::new(),
            composer_bin: default_composer_bin(),
            project_dir: default_project_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalConfigurationSettings {
    #[serde(default = "default_local_configuration_path")]
    pub path: String,
}

impl Default for LocalConfigurationSettings {
    fn default() -> Self {
        Self {
            path: default_local_configuration_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RunnerSettings {
    /// Wizard identifiers whose confirmation is granted up front.
    #[serde(default)]
    pub confirm: Vec<String>,
    #[serde(default)]
    pub confirm_all: bool,
    /// Ask on the terminal for confirmations not granted up front.
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub ensure_prerequisites: bool,
}

fn default_database_path() -> String {
    "var/site.sqlite".to_string()
}

fn default_composer_bin() -> String {
    "composer".to_string()
}

fn default_project_dir() -> String {
    ".".to_string()
}

fn default_local_configuration_path() -> String {
    "LocalConfiguration.toml".to_string()
}
