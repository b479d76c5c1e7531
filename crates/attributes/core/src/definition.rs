//! Attribute definitions and the catalog they are drawn from.
//!
//! The catalog is fixed at configuration time and shared by every attribute
//! system built from it. Definitions are addressed by [`AttributeId`], the
//! position of the definition inside its catalog.

use std::collections::HashMap;

use crate::error::{AttributeError, Result};

/// Identity of one named numeric stat inside an [`AttributeCatalog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeId(pub u32);

impl AttributeId {
    /// Position of the definition inside its catalog.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// How the contributions of an aggregate are merged into one total.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum CombinationRule {
    /// `(Σ AddRaw) × (Π Multiplicate) + Σ AddFinal`
    #[default]
    Standard,
    /// Product of every contribution.
    Product,
    /// Largest contribution.
    Maximum,
    /// Smallest contribution.
    Minimum,
}

/// One named stat of the catalog.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeDefinition {
    /// Unique name, used by data files to reference the attribute.
    pub designation: String,

    /// Upper bound of the aggregate total, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub maximum: Option<f32>,

    /// How contributions are merged.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rule: CombinationRule,
}

impl AttributeDefinition {
    /// Create an uncapped definition with the standard combination rule.
    pub fn new(designation: impl Into<String>) -> Self {
        Self {
            designation: designation.into(),
            maximum: None,
            rule: CombinationRule::Standard,
        }
    }

    /// Cap the total of this attribute (builder pattern)
    pub fn with_maximum(mut self, maximum: f32) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Use a different combination rule (builder pattern)
    pub fn with_rule(mut self, rule: CombinationRule) -> Self {
        self.rule = rule;
        self
    }
}

/// Finite set of attribute definitions known at configuration time.
#[derive(Clone, Debug, Default)]
pub struct AttributeCatalog {
    definitions: Vec<AttributeDefinition>,
    by_designation: HashMap<String, AttributeId>,
}

impl AttributeCatalog {
    /// Build a catalog, rejecting duplicate designations.
    pub fn new(definitions: impl IntoIterator<Item = AttributeDefinition>) -> Result<Self> {
        let mut catalog = Self::default();
        for definition in definitions {
            catalog.define(definition)?;
        }
        Ok(catalog)
    }

    /// Append a definition and return its id.
    pub fn define(&mut self, definition: AttributeDefinition) -> Result<AttributeId> {
        if self.by_designation.contains_key(&definition.designation) {
            return Err(AttributeError::DuplicateAttribute(definition.designation));
        }

        let id = AttributeId(self.definitions.len() as u32);
        self.by_designation
            .insert(definition.designation.clone(), id);
        self.definitions.push(definition);
        Ok(id)
    }

    pub fn get(&self, id: AttributeId) -> Option<&AttributeDefinition> {
        self.definitions.get(id.index())
    }

    pub fn contains(&self, id: AttributeId) -> bool {
        id.index() < self.definitions.len()
    }

    /// Look up an attribute by designation.
    pub fn id(&self, designation: &str) -> Option<AttributeId> {
        self.by_designation.get(designation).copied()
    }

    /// Look up an attribute by designation, failing with `UnknownAttributeName`.
    pub fn resolve(&self, designation: &str) -> Result<AttributeId> {
        self.id(designation)
            .ok_or_else(|| AttributeError::UnknownAttributeName(designation.to_owned()))
    }

    /// Iterate over all definitions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (AttributeId, &AttributeDefinition)> {
        self.definitions
            .iter()
            .enumerate()
            .map(|(index, definition)| (AttributeId(index as u32), definition))
    }

    pub fn ids(&self) -> impl Iterator<Item = AttributeId> {
        (0..self.definitions.len() as u32).map(AttributeId)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
