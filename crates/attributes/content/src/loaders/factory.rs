//! Content factory for building attribute systems from data files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use attribute_core::{AttributeCatalog, CharacterClass, ItemAwareAttributeSystem};

use crate::loaders::{CatalogLoader, CharacterLoader, CharacterRecord, ClassLoader, LoadResult};

/// Content factory that loads all attribute content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── attributes.toml
/// ├── classes.ron
/// └── characters/
///     ├── arthur.ron
///     └── morgana.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load the attribute catalog from `attributes.toml`.
    pub fn load_catalog(&self) -> LoadResult<AttributeCatalog> {
        CatalogLoader::load(&self.data_dir.join("attributes.toml"))
    }

    /// Load character classes from `classes.ron`.
    pub fn load_classes(&self) -> LoadResult<Vec<CharacterClass>> {
        ClassLoader::load(&self.data_dir.join("classes.ron"))
    }

    /// Load a character from `characters/{name}.ron`.
    pub fn load_character(&self, name: &str) -> LoadResult<CharacterRecord> {
        let path = self.character_path(name);
        CharacterLoader::load(&path)
    }

    /// Persist a character to `characters/{name}.ron`.
    pub fn save_character(&self, name: &str, record: &CharacterRecord) -> LoadResult<()> {
        CharacterLoader::save(&self.character_path(name), record)
    }

    /// Load catalog and classes together.
    pub fn load(&self) -> LoadResult<Content> {
        let catalog = Arc::new(self.load_catalog()?);
        let classes = self
            .load_classes()?
            .into_iter()
            .map(|class| (class.name.clone(), class))
            .collect::<BTreeMap<_, _>>();

        tracing::debug!(
            data_dir = %self.data_dir.display(),
            attributes = catalog.len(),
            classes = classes.len(),
            "attribute content loaded"
        );

        Ok(Content { catalog, classes })
    }

    /// Load everything needed and build the attribute system of one character.
    pub fn build_character(&self, name: &str) -> LoadResult<ItemAwareAttributeSystem> {
        let content = self.load()?;
        let record = self.load_character(name)?;
        content.build_system(&record)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn character_path(&self, name: &str) -> PathBuf {
        self.data_dir.join("characters").join(format!("{}.ron", name))
    }
}

/// Catalog and classes shared by every character of a data directory.
#[derive(Debug, Clone)]
pub struct Content {
    pub catalog: Arc<AttributeCatalog>,
    pub classes: BTreeMap<String, CharacterClass>,
}

impl Content {
    pub fn class(&self, name: &str) -> Option<&CharacterClass> {
        self.classes.get(name)
    }

    /// Build the attribute system of a persisted character.
    pub fn build_system(&self, record: &CharacterRecord) -> LoadResult<ItemAwareAttributeSystem> {
        let class = self.class(&record.class).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown class '{}' for character '{}'",
                record.class,
                record.name
            )
        })?;

        ItemAwareAttributeSystem::new(Arc::clone(&self.catalog), &record.attributes, class)
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to build attributes for character '{}': {}",
                    record.name,
                    e
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
        assert_eq!(
            factory.character_path("arthur"),
            Path::new("/tmp/data/characters/arthur.ron")
        );
    }

    #[test]
    fn unknown_class_is_reported() {
        let content = Content {
            catalog: Arc::new(AttributeCatalog::default()),
            classes: BTreeMap::new(),
        };
        let record = CharacterRecord {
            name: "Arthur".into(),
            class: "Summoner".into(),
            attributes: Vec::new(),
        };

        let message = content.build_system(&record).unwrap_err().to_string();
        assert!(message.contains("Summoner"), "{message}");
    }
}
