use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BACKEND_COMMAND: &str = "grovr-backend";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    pub log_path: PathBuf,
    pub file: ConfigFile,
}

/// On-disk config file (~/.grovr/config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Program that implements the command boundary (git, secrets, network).
    pub backend_command: String,
    pub backend_args: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            backend_command: DEFAULT_BACKEND_COMMAND.to_string(),
            backend_args: Vec::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Read `<base_dir>/config.toml`, returning defaults if missing or unparseable.
pub fn load_config_file(base_dir: &Path) -> ConfigFile {
    let path = base_dir.join("config.toml");
    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
            Ok(cf) => cf,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse config.toml, using defaults");
                ConfigFile::default()
            }
        },
        Err(_) => ConfigFile::default(),
    }
}

/// Write a `ConfigFile` to `<base_dir>/config.toml`.
pub fn save_config_file(base_dir: &Path, config_file: &ConfigFile) -> Result<()> {
    let path = base_dir.join("config.toml");
    let contents =
        toml::to_string_pretty(config_file).context("failed to serialize config.toml")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

impl Config {
    pub fn new(base_dir: PathBuf, file: ConfigFile) -> Self {
        let log_path = base_dir.join("grovr.log");
        Self {
            base_dir,
            log_path,
            file,
        }
    }

    pub fn load() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Could not find home directory")?;
        let base_dir = home_dir.join(".grovr");
        let file = load_config_file(&base_dir);

        let config = Self::new(base_dir, file);
        tracing::debug!(
            base_dir = %config.base_dir.display(),
            backend = %config.file.backend_command,
            "config loaded"
        );
        Ok(config)
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.file.request_timeout_secs.max(1))
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir).context("Failed to create grovr base directory")?;
        Ok(())
    }

    /// Write the default config.toml. Existing files are kept unless `force` is set.
    pub fn init_default_file(&self, force: bool) -> Result<bool> {
        self.ensure_dirs()?;
        if !force && self.config_path().exists() {
            return Ok(false);
        }
        save_config_file(&self.base_dir, &ConfigFile::default())?;
        Ok(true)
    }
}
