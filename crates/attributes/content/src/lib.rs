//! Data-driven attribute content and loaders.
//!
//! This crate reads the configuration the attribute engine is built from:
//! - Attribute catalog (data-driven via TOML)
//! - Character classes with base values and formulas (data-driven via RON)
//! - Persisted characters with their stored values (data-driven via RON)
//!
//! All loaders deserialize attribute-core types directly with serde.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    CatalogLoader, CharacterLoader, CharacterRecord, ClassLoader, Content, ContentFactory,
    LoadResult,
};
