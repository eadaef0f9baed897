use std::path::{Path, PathBuf};

use thiserror::Error;
use tutor_core::catalog::{Catalog, CatalogError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogLoadError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog {path} rejected: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}

/// Read a JSON curriculum file and build a validated catalog.
///
/// # Errors
///
/// Returns `CatalogLoadError::Io` if the file cannot be read and
/// `CatalogLoadError::Invalid` if it is malformed or fails integrity checks
/// (unknown prerequisites, cycles, duplicate ids).
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog, CatalogLoadError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog = Catalog::from_json(&json).map_err(|source| CatalogLoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), lessons = catalog.len(), "catalog loaded");
    Ok(catalog)
}
