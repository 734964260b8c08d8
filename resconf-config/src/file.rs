use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Deserialization of resconf.toml
#[derive(Deserialize, Default, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Name of the schema catalog to parse with
    pub schema: Option<String>,

    /// Configuration file or directory to parse (relative paths are relative to this file)
    pub config: Option<Utf8PathBuf>,

    /// Name of the main file inside a configuration directory
    pub default_filename: Option<String>,

    /// Include tree directory, relative to the configuration directory
    pub include_dir: Option<String>,
}

impl ConfigFile {
    /// Load a configuration from the specified file
    ///
    pub fn load(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_context = || format!("Reading config file {path:?}");
        let config_data = std::fs::read_to_string(path).with_context(config_context)?;
        let mut file: ConfigFile = config_data
            .as_str()
            .try_into()
            .with_context(config_context)?;
        if let (Some(config), Some(directory)) = (&file.config, path.parent()) {
            if config.is_relative() {
                file.config = Some(directory.join(config));
            }
        }
        tracing::debug!("Loaded settings from {}", path);
        Ok(file)
    }
}

impl TryFrom<&str> for ConfigFile {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(toml::from_str(value)?)
    }
}
