//! Value elements - the numeric sources feeding attribute aggregates.
//!
//! An element is one of three variants:
//! - **Constant**: fixed value set at creation
//! - **Stored**: mutable cell (raw persisted stats), notifies subscribers on write
//! - **Combined**: an [`Operator`] over operands, recomputed on demand
//!
//! Operands are either other elements or the current total of another
//! attribute. Elements live in the arena of their owning
//! [`AttributeSystem`](crate::AttributeSystem) and are addressed by [`ElementId`].

use crate::definition::AttributeId;

slotmap::new_key_type! {
    /// Handle to one value element inside an attribute system's arena.
    pub struct ElementId;
}

/// How an element's value is merged into the aggregate it is registered in.
///
/// Only meaningful for the [`Standard`](crate::CombinationRule::Standard) rule:
/// `(Σ AddRaw) × (Π Multiplicate) + Σ AddFinal`
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
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AggregateType {
    /// Added to the raw sum (e.g. +50 Strength from an item)
    #[default]
    AddRaw,
    /// Multiplies the raw sum (e.g. 1.1 = +10%)
    Multiplicate,
    /// Added after multiplication
    AddFinal,
}

/// Formula operator of a combined element.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operator {
    Sum,
    Product,
    Minimum,
    Maximum,
    /// Sum of the operands scaled by `percent / 100`.
    Percentage(f32),
}

impl Operator {
    /// Apply the operator to operand values. No operands yield 0.
    pub fn apply(self, values: impl IntoIterator<Item = f32>) -> f32 {
        let values = values.into_iter();
        match self {
            Operator::Sum => values.sum(),
            Operator::Product => values.reduce(|acc, value| acc * value).unwrap_or(0.0),
            Operator::Minimum => values.reduce(f32::min).unwrap_or(0.0),
            Operator::Maximum => values.reduce(f32::max).unwrap_or(0.0),
            Operator::Percentage(percent) => values.sum::<f32>() * percent / 100.0,
        }
    }
}

/// Input of a combined element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operand {
    /// Value of another element.
    Element(ElementId),
    /// Current total of an attribute (including all its power-ups).
    Attribute(AttributeId),
}

/// A numeric source.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueElement {
    Constant(f32),
    Stored(f32),
    Combined {
        operator: Operator,
        operands: Vec<Operand>,
    },
}

impl ValueElement {
    pub fn combined(operator: Operator, operands: impl Into<Vec<Operand>>) -> Self {
        ValueElement::Combined {
            operator,
            operands: operands.into(),
        }
    }

    /// Operands of a combined element; empty for constants and stored cells.
    pub fn operands(&self) -> &[Operand] {
        match self {
            ValueElement::Combined { operands, .. } => operands,
            ValueElement::Constant(_) | ValueElement::Stored(_) => &[],
        }
    }

    /// Whether the value can ever change, i.e. whether it is worth observing.
    pub fn is_observable(&self) -> bool {
        !matches!(self, ValueElement::Constant(_))
    }
}
