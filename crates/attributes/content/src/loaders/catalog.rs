//! Attribute catalog loader.

use std::path::Path;

use attribute_core::{AttributeCatalog, AttributeDefinition};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Attribute catalog structure for TOML files.
///
/// ```toml
/// [[attributes]]
/// designation = "Strength"
///
/// [[attributes]]
/// designation = "AttackSpeed"
/// maximum = 150.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub attributes: Vec<AttributeDefinition>,
}

/// Loader for the attribute catalog from TOML files.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load the attribute catalog from a TOML file.
    ///
    /// Fails if a designation is defined more than once.
    pub fn load(path: &Path) -> LoadResult<AttributeCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Invalid attribute catalog {}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> LoadResult<AttributeCatalog> {
        let file: CatalogFile = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse attribute catalog TOML: {}", e))?;

        Ok(AttributeCatalog::new(file.attributes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attribute_core::CombinationRule;

    #[test]
    fn parses_caps_and_rules() {
        let catalog = CatalogLoader::parse(
            r#"
            [[attributes]]
            designation = "Strength"

            [[attributes]]
            designation = "AttackSpeed"
            maximum = 150.0

            [[attributes]]
            designation = "ResistanceFire"
            rule = "maximum"
            "#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 3);
        let speed = catalog.get(catalog.id("AttackSpeed").unwrap()).unwrap();
        assert_eq!(speed.maximum, Some(150.0));
        assert_eq!(speed.rule, CombinationRule::Standard);
        let fire = catalog.get(catalog.id("ResistanceFire").unwrap()).unwrap();
        assert_eq!(fire.rule, CombinationRule::Maximum);
    }

    #[test]
    fn duplicate_designation_fails() {
        let result = CatalogLoader::parse(
            r#"
            [[attributes]]
            designation = "Strength"

            [[attributes]]
            designation = "Strength"
            "#,
        );

        let message = result.unwrap_err().to_string();
        assert!(message.contains("Strength"), "{message}");
    }
}
