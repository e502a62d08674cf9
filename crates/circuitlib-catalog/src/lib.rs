//! Component catalog construction.
//!
//! [`build_catalog`] acquires symbol and footprint libraries according to a
//! [`CatalogConfig`], indexes 3D models, and reconciles everything into a
//! flat list of [`Component`] entries that [`write_catalog`] persists as JSON.

pub mod config;
pub mod pipeline;
pub mod summary;

use circuitlib_fetch::AcquireError;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use circuitlib_eda::Component;
pub use config::{CatalogConfig, Source};
pub use pipeline::build_catalog;
pub use summary::Summary;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog build cancelled")]
    Cancelled,

    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Acquire(AcquireError),

    #[error("The {0} stage panicked")]
    StagePanicked(&'static str),

    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write catalog to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<AcquireError> for CatalogError {
    fn from(e: AcquireError) -> Self {
        match e {
            AcquireError::Cancelled => CatalogError::Cancelled,
            other => CatalogError::Acquire(other),
        }
    }
}

/// The result of a catalog build.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub components: Vec<Component>,
    pub summary: Summary,
}

impl Catalog {
    /// The catalog as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(&self.components)?)
    }
}

/// Write the catalog as a JSON array to `path`, creating parent directories.
pub fn write_catalog(catalog: &Catalog, path: &Path) -> Result<(), CatalogError> {
    let json = catalog.to_json()?;
    let write_error = |source| CatalogError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, json).map_err(write_error)?;
    log::info!(
        "Wrote {} components to {}",
        catalog.components.len(),
        path.display()
    );
    Ok(())
}
