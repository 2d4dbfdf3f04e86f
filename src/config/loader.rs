//! Generic loader for lists of items stored under a top-level key of a YAML
//! file.

use config::{Config, File, FileFormat};
use serde::de::DeserializeOwned;
use std::{fs, path::PathBuf};
use thiserror::Error;

/// Reads a YAML file and deserializes the list found under a given key.
pub struct ConfigLoader {
    path: PathBuf,
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The file could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid YAML or does not match the expected shape.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// The file does not have a `.yaml` or `.yml` extension.
    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(PathBuf),
}

impl ConfigLoader {
    /// Creates a new `ConfigLoader` for the given file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The file this loader reads.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the list stored under `key` (e.g. `"accounts"`).
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, LoaderError> {
        if !self.is_yaml_file() {
            return Err(LoaderError::UnsupportedFormat(self.path.clone()));
        }

        let contents = fs::read_to_string(&self.path)?;
        let config =
            Config::builder().add_source(File::from_str(&contents, FileFormat::Yaml)).build()?;
        let items = config.get(key)?;

        tracing::debug!(path = %self.path.display(), key, "Configuration list loaded.");
        Ok(items)
    }

    fn is_yaml_file(&self) -> bool {
        matches!(self.path.extension().and_then(|ext| ext.to_str()), Some("yaml") | Some("yml"))
    }
}
