//! Character attribute engine.
//!
//! `attribute-core` computes the effective stats of a character from its
//! stored values, its class formulas and every active modifier. Each attribute
//! is an [`Aggregate`] of value elements; changes propagate through an explicit
//! subscription registry and totals are recombined lazily on read.
//! Externally sourced modifiers enter through [`PowerUpWrapper`] and are
//! tracked per source by [`ItemAwareAttributeSystem`].
pub mod aggregate;
pub mod class;
pub mod definition;
pub mod element;
pub mod error;
pub mod formula;
pub mod item_aware;
pub mod power_up;
pub mod subscription;
pub mod system;

pub use aggregate::{Aggregate, MembershipToken};
pub use class::{AttributeCombination, BaseValue, CharacterClass, StoredAttribute};
pub use definition::{AttributeCatalog, AttributeDefinition, AttributeId, CombinationRule};
pub use element::{AggregateType, ElementId, Operand, Operator, ValueElement};
pub use error::{ApplyError, ApplyResult, AttributeError, ErrorSeverity, Result};
pub use formula::Formula;
pub use item_aware::{EffectId, ItemAwareAttributeSystem, ItemId, LifecycleState};
pub use power_up::{PowerUpDefinition, PowerUpWrapper};
pub use subscription::{Node, Subscription, SubscriptionId, SubscriptionRegistry};
pub use system::{AttributeSystem, Registration, SystemId};
