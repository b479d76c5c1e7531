//! Explicit change-notification registry.
//!
//! Every edge of the notification graph is a [`Subscription`] addressed by a
//! [`SubscriptionId`]. Owners keep the ids they created and hand them back on
//! teardown, so the number of live subscriptions is always auditable.
//!
//! ```text
//! Stored ──▶ Combined ──▶ Attribute ──▶ Combined ──▶ Attribute
//!  (write)    (element)    (dirty)       (element)    (dirty)
//! ```

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::definition::AttributeId;
use crate::element::{ElementId, Operand};

slotmap::new_key_type! {
    /// Token of one live subscription.
    pub struct SubscriptionId;
}

/// A vertex of the notification graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    Element(ElementId),
    Attribute(AttributeId),
}

impl From<Operand> for Node {
    fn from(operand: Operand) -> Self {
        match operand {
            Operand::Element(element) => Node::Element(element),
            Operand::Attribute(attribute) => Node::Attribute(attribute),
        }
    }
}

/// `listener` is notified whenever `source` changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub source: Node,
    pub listener: Node,
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: SlotMap<SubscriptionId, Subscription>,
    // Secondary index: source -> subscriptions on it, in subscription order.
    by_source: HashMap<Node, Vec<SubscriptionId>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, source: Node, listener: Node) -> SubscriptionId {
        let id = self
            .subscriptions
            .insert(Subscription { source, listener });
        self.by_source.entry(source).or_default().push(id);
        id
    }

    /// Release a subscription. Returns `None` if it was already released.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Option<Subscription> {
        let subscription = self.subscriptions.remove(id)?;
        if let Some(ids) = self.by_source.get_mut(&subscription.source) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_source.remove(&subscription.source);
            }
        }
        Some(subscription)
    }

    /// Nodes to notify when `source` changes.
    pub fn listeners(&self, source: Node) -> impl Iterator<Item = Node> + '_ {
        self.by_source
            .get(&source)
            .into_iter()
            .flatten()
            .filter_map(|id| self.subscriptions.get(*id))
            .map(|subscription| subscription.listener)
    }

    pub fn get(&self, id: SubscriptionId) -> Option<&Subscription> {
        self.subscriptions.get(id)
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
