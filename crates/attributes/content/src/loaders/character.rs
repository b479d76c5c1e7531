//! Persisted character loader.

use std::path::Path;

use attribute_core::StoredAttribute;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Raw persisted state of one character: its class and stored values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub attributes: Vec<StoredAttribute>,
}

/// Loader for characters from RON files.
pub struct CharacterLoader;

impl CharacterLoader {
    pub fn load(path: &Path) -> LoadResult<CharacterRecord> {
        let content = read_file(path)?;
        ron::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse character RON {}: {}", path.display(), e)
        })
    }

    /// Load every `*.ron` character in a directory, ordered by file name.
    pub fn load_dir(dir: &Path) -> LoadResult<Vec<CharacterRecord>> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("Failed to read directory {}: {}", dir.display(), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| anyhow::anyhow!("Failed to read entry in {}: {}", dir.display(), e))?
                .path();
            if path.extension().is_some_and(|extension| extension == "ron") {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|path| Self::load(path)).collect()
    }

    /// Write a character back to disk, e.g. after stored values changed.
    pub fn save(path: &Path, record: &CharacterRecord) -> LoadResult<()> {
        let content = ron::ser::to_string_pretty(record, ron::ser::PrettyConfig::default())
            .map_err(|e| {
                anyhow::anyhow!("Failed to serialize character '{}': {}", record.name, e)
            })?;
        std::fs::write(path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write file {}: {}", path.display(), e))
    }
}
