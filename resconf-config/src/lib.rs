//! Settings for the resconf tool: which schema to parse with, and where the configuration lives
//!
//! Settings come from an optional `resconf.toml` ([ConfigFile]), overridden from the command
//! line ([Overrides]), and merge into a [Config]:
//!
//! ```
//! use resconf_config::{Config, ConfigFile, Overrides};
//!
//! let file = ConfigFile::try_from("schema = \"director\"\nconfig = \"/etc/bareos\"\n")?;
//! let overrides = Overrides {
//!     config: Some("/tmp/bareos-dir.conf".into()),
//!     ..Default::default()
//! };
//! let config = Config::merge(file, overrides)?;
//! assert_eq!(config.schema(), "director");
//! assert_eq!(config.config().as_str(), "/tmp/bareos-dir.conf");
//! # Ok::<(), anyhow::Error>(())
//! ```
use anyhow::{bail, Result};
use camino::{Utf8Path, Utf8PathBuf};

mod file;
pub use file::ConfigFile;

/// The schema catalog used when neither the settings file nor the command line names one
pub const DEFAULT_SCHEMA: &str = "director";

/// Settings given on the command line, each taking precedence over the settings file
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Overrides {
    pub schema: Option<String>,
    pub config: Option<Utf8PathBuf>,
}

/// Merged settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    schema: String,
    config: Utf8PathBuf,
    default_filename: Option<String>,
    include_dir: Option<String>,
}

impl Config {
    pub fn merge(file: ConfigFile, overrides: Overrides) -> Result<Self> {
        let Some(config) = overrides.config.or(file.config) else {
            bail!("No configuration given; pass a path or set \"config\" in the settings file");
        };
        let schema = overrides
            .schema
            .or(file.schema)
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_owned());
        Ok(Config {
            schema,
            config,
            default_filename: file.default_filename,
            include_dir: file.include_dir,
        })
    }

    /// Name of the schema catalog to parse with
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The configuration file or directory to parse
    pub fn config(&self) -> &Utf8Path {
        &self.config
    }

    pub fn default_filename(&self) -> Option<&str> {
        self.default_filename.as_deref()
    }

    pub fn include_dir(&self) -> Option<&str> {
        self.include_dir.as_deref()
    }
}
