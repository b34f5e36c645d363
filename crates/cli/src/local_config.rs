use anyhow::{Context, Result};
use core_upgrader_core::local_config::{self, LocalConfiguration};
use core_upgrader_core::WizardError;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use toml::{Table, Value};

/// Site configuration backed by a TOML file; every change is written through.
pub struct TomlLocalConfiguration {
    path: PathBuf,
    doc: Mutex<Table>,
}

impl TomlLocalConfiguration {
    /// A missing file starts out empty and is created on first write.
    pub fn open(path: &Path) -> Result<Self> {
        let doc = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str::<Table>(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Table::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            doc: Mutex::new(doc),
        })
    }

    fn doc(&self) -> MutexGuard<'_, Table> {
        self.doc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, doc: &Table) -> Result<(), WizardError> {
        let content = toml::to_string_pretty(doc)
            .map_err(|err| WizardError::Configuration(format!("serialize: {err}")))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                WizardError::Configuration(format!("create {}: {err}", parent.display()))
            })?;
        }
        std::fs::write(&self.path, content).map_err(|err| {
            WizardError::Configuration(format!("write {}: {err}", self.path.display()))
        })
    }
}

impl LocalConfiguration for TomlLocalConfiguration {
    fn get(&self, path: &str) -> Option<Value> {
        local_config::lookup(&self.doc(), path).cloned()
    }

    fn set(&self, path: &str, value: Value) -> Result<(), WizardError> {
        let mut doc = self.doc();
        local_config::insert(&mut doc, path, value)?;
        self.persist(&doc)
    }

    fn remove(&self, paths: &[&str]) -> Result<(), WizardError> {
        let mut doc = self.doc();
        let mut changed = false;
        for path in paths {
            changed |= local_config::remove(&mut doc, path).is_some();
        }
        if changed {
            self.persist(&doc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_are_written_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LocalConfiguration.toml");
        std::fs::write(&path, "[BE]\nfileCreateMask = \"0664\"\n").unwrap();

        let config = TomlLocalConfiguration::open(&path).unwrap();
        let mask = config.get("BE/fileCreateMask").unwrap();
        config.set("SYS/fileCreateMask", mask).unwrap();
        config.remove(&["BE/fileCreateMask", "BE/absent"]).unwrap();

        let reopened = TomlLocalConfiguration::open(&path).unwrap();
        assert_eq!(
            reopened.get("SYS/fileCreateMask").and_then(|v| v.as_str().map(str::to_string)),
            Some("0664".to_string())
        );
        assert!(reopened.get("BE/fileCreateMask").is_none());
    }

    #[test]
    fn missing_file_is_created_on_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("LocalConfiguration.toml");

        let config = TomlLocalConfiguration::open(&path).unwrap();
        assert!(config.get("SYS/createGroup").is_none());
        config.remove(&["SYS/createGroup"]).unwrap();
        assert!(!path.exists());

        config.set("SYS/createGroup", Value::String("www".into())).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("createGroup = \"www\""));
    }
}
