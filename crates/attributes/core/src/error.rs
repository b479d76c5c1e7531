//! Error infrastructure for attribute-core.
//!
//! Every failure in this crate is a local construction or call error surfaced
//! synchronously to the caller (the configuration loader or the equipment
//! system). Nothing is retried internally: the errors describe caller misuse or
//! malformed configuration, never transient conditions.
//!
//! # Design Principles
//!
//! - **Single enum**: all engine operations report [`AttributeError`]
//! - **Severity Classification**: validation errors vs. programming errors
//! - **Stable codes**: [`AttributeError::error_code`] for metrics and tests

use crate::definition::AttributeId;
use crate::element::ElementId;
use crate::item_aware::{EffectId, ItemId};
use crate::power_up::PowerUpWrapper;

/// Severity level of an error, used for categorization and logging priority.
///
/// - **Validation**: Invalid input or configuration, reject without retry
/// - **Internal**: Broken ownership discipline (double dispose, foreign handles)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: unknown attribute, duplicate item, cyclic formula
    Validation,

    /// Internal error - a handle was used in a way its owner never allows.
    ///
    /// Examples: power-up disposed twice, power-up handed to another system
    /// These indicate bugs in the caller and should be investigated.
    Internal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }

    /// Returns true if this error indicates a bug in the caller.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Errors raised by the attribute engine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    /// The attribute id is not part of the system's catalog.
    #[error("attribute {0:?} is not part of the catalog")]
    UnknownAttribute(AttributeId),

    /// A data description referenced an attribute designation that does not exist.
    #[error("attribute '{0}' is not part of the catalog")]
    UnknownAttributeName(String),

    /// Two catalog entries share the same designation.
    #[error("attribute '{0}' is defined more than once")]
    DuplicateAttribute(String),

    /// The attribute is purely derived and has no stored value to write.
    #[error("attribute {0:?} has no stored value and cannot be written")]
    NotWritable(AttributeId),

    /// The element is not a stored cell and cannot be written.
    #[error("element {0:?} is not a stored value and cannot be written")]
    ElementNotWritable(ElementId),

    /// Registering the element would make the attribute depend on itself.
    #[error("registering into attribute {0:?} would create a dependency cycle")]
    CyclicDependency(AttributeId),

    /// The element handle does not refer to a live element.
    #[error("element {0:?} does not exist")]
    UnknownElement(ElementId),

    /// The membership token is not present in the attribute's aggregate.
    #[error("element is not registered in the aggregate of attribute {0:?}")]
    NotRegistered(AttributeId),

    /// The item already has a tracked power-up group.
    #[error("item {0:?} is already applied")]
    DuplicateItem(ItemId),

    /// The item has no tracked power-up group.
    #[error("item {0:?} is not applied")]
    UnknownItem(ItemId),

    /// The effect already has a tracked power-up group.
    #[error("effect {0:?} is already active")]
    DuplicateEffect(EffectId),

    /// The effect has no tracked power-up group.
    #[error("effect {0:?} is not active")]
    UnknownEffect(EffectId),

    /// The item-aware system was disposed and accepts no further modifiers.
    #[error("attribute system has been disposed")]
    Disposed,

    /// The power-up handle was already disposed.
    #[error("power-up on attribute {0:?} was already disposed")]
    DoubleDispose(AttributeId),

    /// The power-up handle was created by a different attribute system.
    #[error("power-up belongs to a different attribute system")]
    ForeignPowerUp,
}

impl AttributeError {
    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        use AttributeError::*;
        match self {
            DoubleDispose(_) | ForeignPowerUp | NotRegistered(_) => ErrorSeverity::Internal,

            UnknownAttribute(_)
            | UnknownAttributeName(_)
            | DuplicateAttribute(_)
            | NotWritable(_)
            | ElementNotWritable(_)
            | CyclicDependency(_)
            | UnknownElement(_)
            | DuplicateItem(_)
            | UnknownItem(_)
            | DuplicateEffect(_)
            | UnknownEffect(_)
            | Disposed => ErrorSeverity::Validation,
        }
    }

    /// Returns a static string identifier for this error variant.
    pub fn error_code(&self) -> &'static str {
        use AttributeError::*;
        match self {
            UnknownAttribute(_) => "ATTRIBUTE_UNKNOWN",
            UnknownAttributeName(_) => "ATTRIBUTE_UNKNOWN_NAME",
            DuplicateAttribute(_) => "ATTRIBUTE_DUPLICATE",
            NotWritable(_) => "ATTRIBUTE_NOT_WRITABLE",
            ElementNotWritable(_) => "ELEMENT_NOT_WRITABLE",
            CyclicDependency(_) => "ATTRIBUTE_CYCLIC_DEPENDENCY",
            UnknownElement(_) => "ELEMENT_UNKNOWN",
            NotRegistered(_) => "ELEMENT_NOT_REGISTERED",
            DuplicateItem(_) => "ITEM_DUPLICATE",
            UnknownItem(_) => "ITEM_UNKNOWN",
            DuplicateEffect(_) => "EFFECT_DUPLICATE",
            UnknownEffect(_) => "EFFECT_UNKNOWN",
            Disposed => "SYSTEM_DISPOSED",
            DoubleDispose(_) => "POWER_UP_DOUBLE_DISPOSE",
            ForeignPowerUp => "POWER_UP_FOREIGN",
        }
    }
}

/// Result alias used throughout attribute-core.
pub type Result<T> = core::result::Result<T, AttributeError>;

/// A power-up group refused by an item-aware system.
///
/// Wrappers owned by the refusing system are disposed before the error is
/// returned. Wrappers of other systems cannot be disposed there and are
/// handed back in `foreign`, still registered, for their owner to dispose.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ApplyError {
    pub error: AttributeError,
    pub foreign: Vec<PowerUpWrapper>,
}

impl ApplyError {
    pub fn into_foreign(self) -> Vec<PowerUpWrapper> {
        self.foreign
    }
}

impl From<AttributeError> for ApplyError {
    fn from(error: AttributeError) -> Self {
        Self {
            error,
            foreign: Vec::new(),
        }
    }
}

impl From<ApplyError> for AttributeError {
    fn from(rejected: ApplyError) -> Self {
        rejected.error
    }
}

/// Result of handing a power-up group to an item-aware system.
pub type ApplyResult = core::result::Result<(), ApplyError>;
