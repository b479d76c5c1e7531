//! Per-attribute aggregate of contributing elements.
//!
//! An aggregate merges its members with the attribute's [`CombinationRule`]
//! and caches the result until something marks it dirty:
//!
//! ```text
//! Standard: total = min((Σ AddRaw) × (Π Multiplicate) + Σ AddFinal, maximum)
//! ```
//!
//! Members are addressed by [`MembershipToken`], never by element identity,
//! so removing a member twice is detected instead of removing a different
//! element that happens to look the same.

use std::cell::Cell;

use crate::definition::{AttributeDefinition, CombinationRule};
use crate::element::{AggregateType, ElementId};

/// Handle to one member slot of an aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MembershipToken(u64);

#[derive(Clone, Copy, Debug)]
struct Member {
    token: MembershipToken,
    element: ElementId,
}

/// Contributions of one attribute plus the cached total.
///
/// The cache lives in `Cell`s so that reads only need a shared reference;
/// an aggregate is therefore `Send` but not `Sync`.
#[derive(Debug)]
pub struct Aggregate {
    rule: CombinationRule,
    maximum: Option<f32>,
    members: Vec<Member>,
    next_token: u64,
    cached: Cell<f32>,
    dirty: Cell<bool>,
}

impl Aggregate {
    pub fn new(rule: CombinationRule, maximum: Option<f32>) -> Self {
        Self {
            rule,
            maximum,
            members: Vec::new(),
            next_token: 0,
            cached: Cell::new(0.0),
            dirty: Cell::new(true),
        }
    }

    pub fn from_definition(definition: &AttributeDefinition) -> Self {
        Self::new(definition.rule, definition.maximum)
    }

    pub fn rule(&self) -> CombinationRule {
        self.rule
    }

    /// Append a member and mark the aggregate dirty.
    pub fn add_element(&mut self, element: ElementId) -> MembershipToken {
        let token = MembershipToken(self.next_token);
        self.next_token += 1;
        self.members.push(Member { token, element });
        self.dirty.set(true);
        token
    }

    /// Remove the member behind `token`, keeping the order of the others.
    ///
    /// Returns `None` if the token is not present, which means the caller
    /// already removed it once.
    pub fn remove_element(&mut self, token: MembershipToken) -> Option<ElementId> {
        let position = self
            .members
            .iter()
            .position(|member| member.token == token)?;
        let member = self.members.remove(position);
        self.dirty.set(true);
        Some(member.element)
    }

    pub fn contains(&self, token: MembershipToken) -> bool {
        self.members.iter().any(|member| member.token == token)
    }

    /// Member elements in registration order.
    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.members.iter().map(|member| member.element)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Mark the cached total stale. Returns true if it was valid before.
    pub fn invalidate(&self) -> bool {
        !self.dirty.replace(true)
    }

    /// Current total, recombined only if dirty.
    ///
    /// `contribution` resolves a member element to its current value and
    /// aggregate type.
    pub fn total(&self, mut contribution: impl FnMut(ElementId) -> (f32, AggregateType)) -> f32 {
        if !self.dirty.get() {
            return self.cached.get();
        }

        let combined = self
            .rule
            .combine(self.members.iter().map(|member| contribution(member.element)));
        let total = match self.maximum {
            Some(maximum) => combined.min(maximum),
            None => combined,
        };

        self.cached.set(total);
        self.dirty.set(false);
        total
    }
}

impl CombinationRule {
    /// Merge contributions into one value. No contributions yield 0.
    pub fn combine(self, contributions: impl IntoIterator<Item = (f32, AggregateType)>) -> f32 {
        let contributions = contributions.into_iter();
        match self {
            CombinationRule::Standard => {
                let mut raw = 0.0;
                let mut multiplier = 1.0;
                let mut final_sum = 0.0;
                for (value, aggregate_type) in contributions {
                    match aggregate_type {
                        AggregateType::AddRaw => raw += value,
                        AggregateType::Multiplicate => multiplier *= value,
                        AggregateType::AddFinal => final_sum += value,
                    }
                }
                raw * multiplier + final_sum
            }
            CombinationRule::Product => contributions
                .map(|(value, _)| value)
                .reduce(|acc, value| acc * value)
                .unwrap_or(0.0),
            CombinationRule::Maximum => contributions
                .map(|(value, _)| value)
                .reduce(f32::max)
                .unwrap_or(0.0),
            CombinationRule::Minimum => contributions
                .map(|(value, _)| value)
                .reduce(f32::min)
                .unwrap_or(0.0),
        }
    }
}
