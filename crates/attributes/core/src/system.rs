//! The attribute system of one character.
//!
//! [`AttributeSystem`] owns one [`Aggregate`] per catalog definition, the arena
//! of value elements feeding them and the registry of change subscriptions
//! between elements and attributes.
//!
//! # Propagation
//!
//! ```text
//! set_base_value(Strength)
//!      ↓  Stored cell written
//! [ Strength aggregate ]        dirty
//!      ↓  Combined element reads Strength
//! [ TotalDamage aggregate ]     dirty
//!      ↓  ...
//! ```
//!
//! Totals are recombined lazily on the next read. Every edge of the chain is a
//! subscription in the registry, so teardown can be audited with
//! [`AttributeSystem::live_subscriptions`].

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use slotmap::SlotMap;

use crate::aggregate::{Aggregate, MembershipToken};
use crate::class::{CharacterClass, StoredAttribute};
use crate::definition::{AttributeCatalog, AttributeId};
use crate::element::{AggregateType, ElementId, Operand, Operator, ValueElement};
use crate::error::{AttributeError, Result};
use crate::formula::Formula;
use crate::subscription::{Node, SubscriptionId, SubscriptionRegistry};

static NEXT_SYSTEM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an attribute system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u64);

impl SystemId {
    fn next() -> Self {
        Self(NEXT_SYSTEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handles needed to reverse one registration of an element into an aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Registration {
    pub attribute: AttributeId,
    pub token: MembershipToken,
    /// Present when the element can change and the aggregate observes it.
    pub subscription: Option<SubscriptionId>,
}

#[derive(Debug)]
struct ElementNode {
    element: ValueElement,
    aggregate_type: AggregateType,
    /// Subscriptions this element holds on its operands.
    upstream: Vec<SubscriptionId>,
    /// Combined elements using this one as operand plus aggregate memberships.
    dependents: u32,
    /// Owned by the system itself (stored cells, class values); never released.
    retained: bool,
}

/// Computes the effective attributes of one character.
///
/// Not `Sync`: reads fill the aggregate caches through `Cell`s. Concurrent
/// readers must go through the owner's synchronization boundary.
#[derive(Debug)]
pub struct AttributeSystem {
    id: SystemId,
    catalog: Arc<AttributeCatalog>,
    aggregates: Vec<Aggregate>,
    elements: SlotMap<ElementId, ElementNode>,
    subscriptions: SubscriptionRegistry,
    stored: BTreeMap<AttributeId, ElementId>,
    changed: BTreeSet<AttributeId>,
}

impl AttributeSystem {
    /// Build the system of one character.
    ///
    /// Wires, in this order:
    /// 1. every stored value as a `Stored` element
    /// 2. every class base value as a `Constant` element
    /// 3. every class combination formula as compiled `Combined` elements
    pub fn new(
        catalog: Arc<AttributeCatalog>,
        stored: &[StoredAttribute],
        class: &CharacterClass,
    ) -> Result<Self> {
        let aggregates = catalog
            .iter()
            .map(|(_, definition)| Aggregate::from_definition(definition))
            .collect();

        let mut system = Self {
            id: SystemId::next(),
            catalog,
            aggregates,
            elements: SlotMap::with_key(),
            subscriptions: SubscriptionRegistry::new(),
            stored: BTreeMap::new(),
            changed: BTreeSet::new(),
        };

        for entry in stored {
            let attribute = system.catalog.resolve(&entry.attribute)?;
            system.insert_stored(attribute, entry.value)?;
        }

        for base in &class.base_values {
            let attribute = system.catalog.resolve(&base.attribute)?;
            let element =
                system.insert_node(ValueElement::Constant(base.value), base.aggregate, true)?;
            system.register(attribute, element)?;
        }

        for combination in &class.combinations {
            let attribute = system.catalog.resolve(&combination.target)?;
            let element = system.compile(&combination.formula, combination.aggregate, true)?;
            system.register(attribute, element)?;
        }

        tracing::debug!(
            system = ?system.id,
            class = %class.name,
            attributes = system.catalog.len(),
            elements = system.elements.len(),
            subscriptions = system.subscriptions.len(),
            "attribute system created"
        );

        Ok(system)
    }

    pub fn id(&self) -> SystemId {
        self.id
    }

    pub fn catalog(&self) -> &Arc<AttributeCatalog> {
        &self.catalog
    }

    pub fn aggregate(&self, attribute: AttributeId) -> Result<&Aggregate> {
        self.aggregates
            .get(attribute.index())
            .ok_or(AttributeError::UnknownAttribute(attribute))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Current total of an attribute, recombined if dirty.
    pub fn get_value(&self, attribute: AttributeId) -> Result<f32> {
        self.aggregate(attribute)?;
        Ok(self.total(attribute))
    }

    /// Snapshot of every attribute total in catalog order.
    pub fn values(&self) -> Vec<(AttributeId, f32)> {
        self.catalog
            .ids()
            .map(|attribute| (attribute, self.total(attribute)))
            .collect()
    }

    /// Raw stored value of an attribute, `None` if it is purely derived.
    pub fn base_value(&self, attribute: AttributeId) -> Result<Option<f32>> {
        self.aggregate(attribute)?;
        Ok(self
            .stored
            .get(&attribute)
            .and_then(|element| self.elements.get(*element))
            .map(|node| self.node_value(node)))
    }

    /// Every raw stored value, for persistence.
    pub fn stored_values(&self) -> Vec<(AttributeId, f32)> {
        self.stored
            .iter()
            .filter_map(|(attribute, element)| {
                self.elements
                    .get(*element)
                    .map(|node| (*attribute, self.node_value(node)))
            })
            .collect()
    }

    pub fn element_value(&self, element: ElementId) -> Result<f32> {
        self.elements
            .get(element)
            .map(|node| self.node_value(node))
            .ok_or(AttributeError::UnknownElement(element))
    }

    /// Drain the attributes invalidated since the previous call.
    ///
    /// Lets the presentation layer push only the stats that may have changed.
    pub fn take_changed(&mut self) -> Vec<AttributeId> {
        std::mem::take(&mut self.changed).into_iter().collect()
    }

    /// Number of live subscriptions in the notification registry.
    pub fn live_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Number of elements alive in the arena.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    fn total(&self, attribute: AttributeId) -> f32 {
        let Some(aggregate) = self.aggregates.get(attribute.index()) else {
            return 0.0;
        };
        aggregate.total(|element| {
            self.elements
                .get(element)
                .map_or((0.0, AggregateType::AddRaw), |node| {
                    (self.node_value(node), node.aggregate_type)
                })
        })
    }

    fn node_value(&self, node: &ElementNode) -> f32 {
        match &node.element {
            ValueElement::Constant(value) | ValueElement::Stored(value) => *value,
            ValueElement::Combined { operator, operands } => operator.apply(
                operands
                    .iter()
                    .map(|operand| self.operand_value(*operand)),
            ),
        }
    }

    fn operand_value(&self, operand: Operand) -> f32 {
        match operand {
            Operand::Element(element) => self
                .elements
                .get(element)
                .map_or(0.0, |node| self.node_value(node)),
            Operand::Attribute(attribute) => self.total(attribute),
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Write the character's stored value of an attribute.
    pub fn set_base_value(&mut self, attribute: AttributeId, value: f32) -> Result<()> {
        self.aggregate(attribute)?;
        let element = *self
            .stored
            .get(&attribute)
            .ok_or(AttributeError::NotWritable(attribute))?;
        self.write(element, value)
    }

    /// Write a stored element created through [`create_element`](Self::create_element).
    pub fn set_element_value(&mut self, element: ElementId, value: f32) -> Result<()> {
        self.write(element, value)
    }

    fn write(&mut self, element: ElementId, value: f32) -> Result<()> {
        let node = self
            .elements
            .get_mut(element)
            .ok_or(AttributeError::UnknownElement(element))?;
        let ValueElement::Stored(cell) = &mut node.element else {
            return Err(AttributeError::ElementNotWritable(element));
        };
        *cell = value;
        self.invalidate(Node::Element(element));
        Ok(())
    }

    fn insert_stored(&mut self, attribute: AttributeId, value: f32) -> Result<()> {
        if let Some(element) = self.stored.get(&attribute).copied() {
            return self.write(element, value);
        }
        let element = self.insert_node(ValueElement::Stored(value), AggregateType::AddRaw, true)?;
        self.register(attribute, element)?;
        self.stored.insert(attribute, element);
        Ok(())
    }

    /// Mark everything that (transitively) listens to `source` dirty.
    fn invalidate(&mut self, source: Node) {
        let mut pending = vec![source];
        let mut visited = HashSet::new();
        while let Some(node) = pending.pop() {
            if !visited.insert(node) {
                continue;
            }
            if let Node::Attribute(attribute) = node {
                if let Some(aggregate) = self.aggregates.get(attribute.index()) {
                    aggregate.invalidate();
                }
                self.changed.insert(attribute);
                tracing::trace!(?attribute, "attribute invalidated");
            }
            pending.extend(self.subscriptions.listeners(node));
        }
    }

    // ========================================================================
    // Elements
    // ========================================================================

    /// Create an element owned by the caller.
    ///
    /// The element stays in the arena until the [`PowerUpWrapper`](crate::PowerUpWrapper)
    /// it is handed to is disposed.
    pub fn create_element(
        &mut self,
        element: ValueElement,
        aggregate_type: AggregateType,
    ) -> Result<ElementId> {
        self.insert_node(element, aggregate_type, false)
    }

    /// Compile a formula into caller-owned elements and return the root.
    pub fn compile_formula(
        &mut self,
        formula: &Formula,
        aggregate_type: AggregateType,
    ) -> Result<ElementId> {
        self.compile(formula, aggregate_type, false)
    }

    fn insert_node(
        &mut self,
        element: ValueElement,
        aggregate_type: AggregateType,
        retained: bool,
    ) -> Result<ElementId> {
        let mut observed = Vec::new();
        for operand in element.operands() {
            match *operand {
                Operand::Element(id) => {
                    let node = self
                        .elements
                        .get(id)
                        .ok_or(AttributeError::UnknownElement(id))?;
                    if node.element.is_observable() {
                        observed.push(Node::Element(id));
                    }
                }
                Operand::Attribute(attribute) => {
                    self.aggregate(attribute)?;
                    observed.push(Node::Attribute(attribute));
                }
            }
        }

        for operand in element.operands() {
            if let Operand::Element(id) = operand
                && let Some(node) = self.elements.get_mut(*id)
            {
                node.dependents += 1;
            }
        }

        let id = self.elements.insert(ElementNode {
            element,
            aggregate_type,
            upstream: Vec::new(),
            dependents: 0,
            retained,
        });
        let upstream = observed
            .into_iter()
            .map(|source| self.subscriptions.subscribe(source, Node::Element(id)))
            .collect();
        if let Some(node) = self.elements.get_mut(id) {
            node.upstream = upstream;
        }
        Ok(id)
    }

    fn compile(
        &mut self,
        formula: &Formula,
        aggregate_type: AggregateType,
        retained: bool,
    ) -> Result<ElementId> {
        let mut created = Vec::new();
        match self.compile_node(formula, aggregate_type, retained, &mut created) {
            Ok(root) => Ok(root),
            Err(error) => {
                // Children are created before their parents; drop parents first.
                for element in created.into_iter().rev() {
                    self.remove_node(element);
                }
                Err(error)
            }
        }
    }

    fn compile_node(
        &mut self,
        formula: &Formula,
        aggregate_type: AggregateType,
        retained: bool,
        created: &mut Vec<ElementId>,
    ) -> Result<ElementId> {
        let element = match formula {
            Formula::Constant(value) => ValueElement::Constant(*value),
            Formula::Attribute(designation) => ValueElement::combined(
                Operator::Sum,
                [Operand::Attribute(self.catalog.resolve(designation)?)],
            ),
            Formula::Sum(terms) => ValueElement::combined(
                Operator::Sum,
                self.compile_operands(terms, retained, created)?,
            ),
            Formula::Product(terms) => ValueElement::combined(
                Operator::Product,
                self.compile_operands(terms, retained, created)?,
            ),
            Formula::Min(terms) => ValueElement::combined(
                Operator::Minimum,
                self.compile_operands(terms, retained, created)?,
            ),
            Formula::Max(terms) => ValueElement::combined(
                Operator::Maximum,
                self.compile_operands(terms, retained, created)?,
            ),
            Formula::Percentage { percent, of } => ValueElement::combined(
                Operator::Percentage(*percent),
                self.compile_operands(std::slice::from_ref(of.as_ref()), retained, created)?,
            ),
        };

        let id = self.insert_node(element, aggregate_type, retained)?;
        created.push(id);
        Ok(id)
    }

    fn compile_operands(
        &mut self,
        terms: &[Formula],
        retained: bool,
        created: &mut Vec<ElementId>,
    ) -> Result<Vec<Operand>> {
        let mut operands = Vec::with_capacity(terms.len());
        for term in terms {
            let operand = match term {
                // Read attributes directly instead of wrapping them in a Sum node.
                Formula::Attribute(designation) => {
                    Operand::Attribute(self.catalog.resolve(designation)?)
                }
                _ => Operand::Element(self.compile_node(
                    term,
                    AggregateType::AddRaw,
                    retained,
                    created,
                )?),
            };
            operands.push(operand);
        }
        Ok(operands)
    }

    /// Remove one node and its upstream subscriptions, without cascading.
    fn remove_node(&mut self, element: ElementId) -> Option<ElementNode> {
        let node = self.elements.remove(element)?;
        for subscription in &node.upstream {
            self.subscriptions.unsubscribe(*subscription);
        }
        for operand in node.element.operands() {
            if let Operand::Element(id) = operand
                && let Some(operand_node) = self.elements.get_mut(*id)
            {
                operand_node.dependents = operand_node.dependents.saturating_sub(1);
            }
        }
        Some(node)
    }

    /// Free a caller-owned element and every operand only it referenced.
    pub(crate) fn release(&mut self, element: ElementId) {
        let mut pending = vec![element];
        while let Some(id) = pending.pop() {
            let releasable = self
                .elements
                .get(id)
                .is_some_and(|node| !node.retained && node.dependents == 0);
            if !releasable {
                continue;
            }
            if let Some(node) = self.remove_node(id) {
                pending.extend(node.element.operands().iter().filter_map(|operand| {
                    match operand {
                        Operand::Element(operand) => Some(*operand),
                        Operand::Attribute(_) => None,
                    }
                }));
            }
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Add an element to the aggregate of `attribute`.
    ///
    /// Fails with `CyclicDependency` if the element (transitively) reads the
    /// attribute it would contribute to; nothing is registered in that case.
    pub(crate) fn register(
        &mut self,
        attribute: AttributeId,
        element: ElementId,
    ) -> Result<Registration> {
        self.aggregate(attribute)?;
        let observable = self
            .elements
            .get(element)
            .ok_or(AttributeError::UnknownElement(element))?
            .element
            .is_observable();
        if self.depends_on(Node::Element(element), attribute) {
            return Err(AttributeError::CyclicDependency(attribute));
        }

        let token = self.aggregates[attribute.index()].add_element(element);
        if let Some(node) = self.elements.get_mut(element) {
            node.dependents += 1;
        }
        let subscription = observable.then(|| {
            self.subscriptions
                .subscribe(Node::Element(element), Node::Attribute(attribute))
        });
        self.invalidate(Node::Attribute(attribute));

        Ok(Registration {
            attribute,
            token,
            subscription,
        })
    }

    /// Reverse a registration and release the element if nothing else uses it.
    pub(crate) fn deregister(&mut self, registration: &Registration) -> Result<()> {
        let attribute = registration.attribute;
        let element = self
            .aggregates
            .get_mut(attribute.index())
            .ok_or(AttributeError::UnknownAttribute(attribute))?
            .remove_element(registration.token)
            .ok_or(AttributeError::NotRegistered(attribute))?;

        if let Some(subscription) = registration.subscription {
            self.subscriptions.unsubscribe(subscription);
        }
        if let Some(node) = self.elements.get_mut(element) {
            node.dependents = node.dependents.saturating_sub(1);
        }
        self.invalidate(Node::Attribute(attribute));
        self.release(element);
        Ok(())
    }

    /// Whether `start` reads `attribute`, following operands and aggregate members.
    fn depends_on(&self, start: Node, attribute: AttributeId) -> bool {
        let target = Node::Attribute(attribute);
        let mut pending = vec![start];
        let mut visited = HashSet::new();
        while let Some(node) = pending.pop() {
            if node == target {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            match node {
                Node::Element(element) => {
                    if let Some(node) = self.elements.get(element) {
                        pending.extend(node.element.operands().iter().copied().map(Node::from));
                    }
                }
                Node::Attribute(other) => {
                    if let Some(aggregate) = self.aggregates.get(other.index()) {
                        pending.extend(aggregate.elements().map(Node::Element));
                    }
                }
            }
        }
        false
    }
}
