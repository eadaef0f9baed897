#![forbid(unsafe_code)]

pub mod catalog_file;
pub mod json_file;
pub mod repository;
pub mod sqlite;

pub use catalog_file::{CatalogLoadError, load_catalog};
pub use json_file::JsonFileRepository;
pub use repository::{InMemoryRepository, ProgressRepository, Storage, StorageError};
