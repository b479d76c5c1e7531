//! Character class configuration and persisted character values.
//!
//! A class supplies the constant contributions every character of that class
//! starts with and the formulas deriving secondary attributes from primary
//! ones. Both are data; [`AttributeSystem::new`](crate::AttributeSystem::new)
//! interprets them into elements.

use crate::element::AggregateType;
use crate::formula::Formula;

/// Constant contribution of a class to one attribute.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaseValue {
    pub attribute: String,
    pub value: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub aggregate: AggregateType,
}

/// Formula of a class contributing to one target attribute.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeCombination {
    pub target: String,
    pub formula: Formula,
    #[cfg_attr(feature = "serde", serde(default))]
    pub aggregate: AggregateType,
}

/// Raw persisted value of one attribute of a character.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoredAttribute {
    pub attribute: String,
    pub value: f32,
}

impl StoredAttribute {
    pub fn new(attribute: impl Into<String>, value: f32) -> Self {
        Self {
            attribute: attribute.into(),
            value,
        }
    }
}

/// Base values and combination formulas of a character class.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CharacterClass {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub base_values: Vec<BaseValue>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub combinations: Vec<AttributeCombination>,
}

impl CharacterClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a raw constant contribution (builder pattern)
    pub fn with_base_value(mut self, attribute: impl Into<String>, value: f32) -> Self {
        self.base_values.push(BaseValue {
            attribute: attribute.into(),
            value,
            aggregate: AggregateType::AddRaw,
        });
        self
    }

    /// Add a raw formula contribution (builder pattern)
    pub fn with_combination(mut self, target: impl Into<String>, formula: Formula) -> Self {
        self.combinations.push(AttributeCombination {
            target: target.into(),
            formula,
            aggregate: AggregateType::AddRaw,
        });
        self
    }
}
