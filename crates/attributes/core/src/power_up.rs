//! Disposable handles for externally sourced modifiers.
//!
//! A [`PowerUpWrapper`] is the only way an equipment or buff system adds a
//! contribution to an [`AttributeSystem`]: creating one registers its element,
//! disposing it undoes exactly that registration.

use crate::definition::AttributeId;
use crate::element::{AggregateType, ElementId, ValueElement};
use crate::error::{AttributeError, Result};
use crate::formula::Formula;
use crate::system::{AttributeSystem, Registration, SystemId};

/// One modifier as described by item or skill data.
///
/// ```text
/// ( attribute: "Strength", value: Constant(50.0), aggregate: AddRaw )
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerUpDefinition {
    pub attribute: String,
    pub value: Formula,
    #[cfg_attr(feature = "serde", serde(default))]
    pub aggregate: AggregateType,
}

impl PowerUpDefinition {
    pub fn new(attribute: impl Into<String>, value: Formula, aggregate: AggregateType) -> Self {
        Self {
            attribute: attribute.into(),
            value,
            aggregate,
        }
    }
}

/// A registered modifier that must be disposed exactly once.
///
/// The wrapper does not borrow its system; disposal takes the system
/// explicitly and checks that it is the one the wrapper was created against.
#[must_use = "a power-up stays registered until it is disposed"]
#[derive(Debug)]
pub struct PowerUpWrapper {
    owner: SystemId,
    element: ElementId,
    registration: Registration,
    disposed: bool,
}

impl PowerUpWrapper {
    /// Register `element` into the aggregate of `target`.
    ///
    /// The wrapper takes ownership of the element. If registration fails the
    /// element is released before the error is returned.
    pub fn new(
        system: &mut AttributeSystem,
        target: AttributeId,
        element: ElementId,
    ) -> Result<Self> {
        match system.register(target, element) {
            Ok(registration) => Ok(Self {
                owner: system.id(),
                element,
                registration,
                disposed: false,
            }),
            Err(error) => {
                system.release(element);
                Err(error)
            }
        }
    }

    /// Wrap a fixed value, e.g. `+50 Strength` or `×1.1 TotalDamage`.
    pub fn constant(
        system: &mut AttributeSystem,
        target: AttributeId,
        value: f32,
        aggregate_type: AggregateType,
    ) -> Result<Self> {
        let element = system.create_element(ValueElement::Constant(value), aggregate_type)?;
        Self::new(system, target, element)
    }

    /// Wrap a formula, e.g. `+5% of Energy` on `TotalDamage`.
    pub fn from_formula(
        system: &mut AttributeSystem,
        target: AttributeId,
        formula: &Formula,
        aggregate_type: AggregateType,
    ) -> Result<Self> {
        let element = system.compile_formula(formula, aggregate_type)?;
        Self::new(system, target, element)
    }

    pub fn from_definition(
        system: &mut AttributeSystem,
        definition: &PowerUpDefinition,
    ) -> Result<Self> {
        let target = system.catalog().resolve(&definition.attribute)?;
        Self::from_formula(system, target, &definition.value, definition.aggregate)
    }

    pub fn target(&self) -> AttributeId {
        self.registration.attribute
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn owner(&self) -> SystemId {
        self.owner
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Undo the registration and release the element.
    pub fn dispose(&mut self, system: &mut AttributeSystem) -> Result<()> {
        if system.id() != self.owner {
            return Err(AttributeError::ForeignPowerUp);
        }
        if self.disposed {
            return Err(AttributeError::DoubleDispose(self.target()));
        }
        self.disposed = true;
        system.deregister(&self.registration)
    }
}

impl Drop for PowerUpWrapper {
    fn drop(&mut self) {
        if !self.disposed {
            tracing::warn!(
                system = ?self.owner,
                attribute = ?self.registration.attribute,
                "power-up dropped while still registered"
            );
        }
    }
}
