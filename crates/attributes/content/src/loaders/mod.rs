//! Content loaders for reading attribute data from files.
//!
//! Each loader turns one RON/TOML file into attribute-core types; the
//! [`ContentFactory`] ties them together for a whole data directory.

pub mod catalog;
pub mod character;
pub mod class;
pub mod factory;

pub use catalog::CatalogLoader;
pub use character::{CharacterLoader, CharacterRecord};
pub use class::ClassLoader;
pub use factory::{Content, ContentFactory};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
