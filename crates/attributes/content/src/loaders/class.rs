//! Character class loader.

use std::path::Path;

use attribute_core::CharacterClass;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Class catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassCatalog {
    pub classes: Vec<CharacterClass>,
}

/// Loader for character classes from RON files.
pub struct ClassLoader;

impl ClassLoader {
    /// Load every character class from a RON file.
    ///
    /// Class names must be unique; attribute designations are resolved later,
    /// when a system is built against a catalog.
    pub fn load(path: &Path) -> LoadResult<Vec<CharacterClass>> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Invalid class catalog {}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> LoadResult<Vec<CharacterClass>> {
        let catalog: ClassCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse class catalog RON: {}", e))?;

        for (index, class) in catalog.classes.iter().enumerate() {
            if catalog.classes[..index]
                .iter()
                .any(|other| other.name == class.name)
            {
                anyhow::bail!("Class '{}' is defined more than once", class.name);
            }
        }

        Ok(catalog.classes)
    }
}
