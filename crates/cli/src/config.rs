use anyhow::{Context, Result, bail};
use core_upgrader_runtime_config::{CONFIG_FILE_NAME, UpgraderConfig};
use std::path::{Path, PathBuf};

/// Effective configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub from_file: bool,
    pub config: UpgraderConfig,
}

/// Flag values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub confirm: Vec<String>,
    pub confirm_all: bool,
    pub interactive: bool,
    pub ensure_prerequisites: bool,
}

fn read_config_doc(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    let doc = toml::from_str::<toml::Value>(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))?;
    Ok(doc)
}

/// Paths in the file are relative to the file's directory.
fn resolve_relative(base: &Path, value: &mut String) {
    let path = Path::new(value.as_str());
    if path.is_relative() {
        *value = base.join(path).to_string_lossy().into_owned();
    }
}

/// Load `explicit` (must exist) or `core-upgrader.toml` in the working directory (optional).
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    if !path.exists() {
        if explicit.is_some() {
            bail!("config file not found at {}", path.display());
        }
        return Ok(LoadedConfig {
            path,
            from_file: false,
            config: UpgraderConfig::default(),
        });
    }

    let doc = read_config_doc(&path)?;
    let mut config = doc
        .try_into::<UpgraderConfig>()
        .with_context(|| format!("Invalid config at {}", path.display()))?;

    let base = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    resolve_relative(base, &mut config.database.path);
    resolve_relative(base, &mut config.extensions.project_dir);
    resolve_relative(base, &mut config.local_configuration.path);

    Ok(LoadedConfig {
        path,
        from_file: true,
        config,
    })
}

impl Overrides {
    pub fn apply(&self, config: &mut UpgraderConfig) {
        if let Some(database) = &self.database {
            config.database.path = database.to_string_lossy().into_owned();
        }
        for identifier in &self.confirm {
            if !config.runner.confirm.contains(identifier) {
                config.runner.confirm.push(identifier.clone());
            }
        }
        config.runner.confirm_all |= self.confirm_all;
        config.runner.interactive |= self.interactive;
        config.runner.ensure_prerequisites |= self.ensure_prerequisites;
    }
}

/// Print the effective configuration as TOML.
pub fn show_config(loaded: &LoadedConfig) -> Result<()> {
    if loaded.from_file {
        println!("# Config file: {}", loaded.path.display());
    } else {
        println!("# Config file: {} (not found, using defaults)", loaded.path.display());
    }
    let content = toml::to_string_pretty(&loaded.config).context("Failed to serialize config")?;
    print!("{content}");
    Ok(())
}
