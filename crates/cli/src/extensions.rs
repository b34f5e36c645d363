use anyhow::{Context, Result};
use core_upgrader_core::{ExtensionManager, ExtensionModel, WizardError};
use core_upgrader_runtime_config::ExtensionSettings;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Extensions known from the config file and the project's `composer.json`;
/// installs shell out to `composer require`.
pub struct ComposerExtensions {
    composer_bin: String,
    project_dir: PathBuf,
    loaded: Mutex<HashSet<String>>,
}

impl ComposerExtensions {
    pub fn from_settings(settings: &ExtensionSettings) -> Result<Self> {
        let project_dir = PathBuf::from(&settings.project_dir);
        let mut loaded: HashSet<String> = settings.loaded.iter().cloned().collect();
        loaded.extend(manifest_extensions(&project_dir.join("composer.json"))?);
        tracing::debug!(count = loaded.len(), "extensions loaded");
        Ok(Self {
            composer_bin: settings.composer_bin.clone(),
            project_dir,
            loaded: Mutex::new(loaded),
        })
    }

    fn loaded(&self) -> MutexGuard<'_, HashSet<String>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Extension key for a composer package (`typo3/cms-fluid-styled-content`
/// -> `fluid_styled_content`). Platform requirements have no key.
pub fn extension_key(package: &str) -> Option<String> {
    let (_, name) = package.split_once('/')?;
    let name = name.strip_prefix("cms-").unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    Some(name.replace('-', "_"))
}

fn manifest_extensions(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let manifest: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(manifest
        .get("require")
        .and_then(serde_json::Value::as_object)
        .map(|require| require.keys().filter_map(|package| extension_key(package)).collect())
        .unwrap_or_default())
}

impl ExtensionManager for ComposerExtensions {
    fn is_loaded(&self, key: &str) -> bool {
        self.loaded().contains(key)
    }

    fn install(&self, extension: &ExtensionModel) -> Result<(), WizardError> {
        let requirement = format!("{}:^{}", extension.composer_package, extension.version);
        tracing::info!(extension = extension.key, %requirement, "installing extension");

        let output = Command::new(&self.composer_bin)
            .arg("require")
            .arg(&requirement)
            .current_dir(&self.project_dir)
            .output()
            .map_err(|err| {
                WizardError::Provisioning(format!("failed to run `{}`: {err}", self.composer_bin))
            })?;
        if !output.status.success() {
            return Err(WizardError::Provisioning(format!(
                "`{} require {requirement}` failed: {}",
                self.composer_bin,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        self.loaded().insert(extension.key.to_string());
        Ok(())
    }
}
