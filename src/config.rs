//! Host configuration: where images live and how tools are invoked.
//!
//! Resolution order:
//! 1. Built-in defaults (libvirt's stock image pool, `sudo`, `generic`)
//! 2. `VM_REGISTER_CONFIG` env var (path to a TOML file, must exist)
//! 3. Otherwise `<config dir>/vm-register/config.toml` if present
//! 4. `VM_REGISTER_IMAGES_DIR` / `VM_REGISTER_OS_VARIANT` env overrides
//!
//! ```toml
//! images_dir = "/srv/vm-images"
//! os_variant = "debian12"
//! block_size = "16M"
//! escalation = "doas"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_IMAGES_DIR: &str = "/var/lib/libvirt/images";
pub const DEFAULT_OS_VARIANT: &str = "generic";
pub const DEFAULT_BLOCK_SIZE: &str = "4M";
pub const DEFAULT_ESCALATION: &str = "sudo";

pub const CONFIG_ENV: &str = "VM_REGISTER_CONFIG";
pub const IMAGES_DIR_ENV: &str = "VM_REGISTER_IMAGES_DIR";
pub const OS_VARIANT_ENV: &str = "VM_REGISTER_OS_VARIANT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    /// Directory new disk images are written to.
    pub images_dir: PathBuf,
    /// Value passed to `virt-install --os-variant`.
    pub os_variant: String,
    /// `dd` block size for raw copies.
    pub block_size: String,
    /// Command used to elevate privilege for every tool invocation.
    pub escalation: String,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            os_variant: DEFAULT_OS_VARIANT.to_string(),
            block_size: DEFAULT_BLOCK_SIZE.to_string(),
            escalation: DEFAULT_ESCALATION.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    images_dir: Option<PathBuf>,
    os_variant: Option<String>,
    block_size: Option<String>,
    escalation: Option<String>,
}

impl ProvisionConfig {
    /// Load configuration from the environment and config files.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if !path.is_file() {
                bail!(
                    "{} points to non-existent config file: {}",
                    CONFIG_ENV,
                    path.display()
                );
            }
            config.apply_file(&path)?;
        } else if let Some(path) = default_config_path().filter(|p| p.is_file()) {
            config.apply_file(&path)?;
        }

        if let Some(dir) = env::var_os(IMAGES_DIR_ENV) {
            config.images_dir = PathBuf::from(dir);
        }
        if let Ok(variant) = env::var(OS_VARIANT_ENV) {
            config.os_variant = variant;
        }

        config.validate()?;
        Ok(config)
    }

    /// Overlay values from a TOML file.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config '{}'", path.display()))?;
        self.apply_toml(&contents)
            .with_context(|| format!("parsing config '{}'", path.display()))
    }

    fn apply_toml(&mut self, contents: &str) -> Result<()> {
        let parsed: ConfigToml = toml::from_str(contents)?;
        if let Some(dir) = parsed.images_dir {
            self.images_dir = dir;
        }
        if let Some(variant) = parsed.os_variant {
            self.os_variant = variant;
        }
        if let Some(block_size) = parsed.block_size {
            self.block_size = block_size;
        }
        if let Some(escalation) = parsed.escalation {
            self.escalation = escalation;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.images_dir.as_os_str().is_empty() {
            bail!("invalid config: images_dir must not be empty");
        }
        for (key, value) in [
            ("os_variant", &self.os_variant),
            ("block_size", &self.block_size),
            ("escalation", &self.escalation),
        ] {
            if value.trim().is_empty() {
                bail!("invalid config: {} must not be empty", key);
            }
        }
        Ok(())
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("vm-register").join("config.toml"))
}
