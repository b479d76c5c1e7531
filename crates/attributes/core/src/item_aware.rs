//! Attribute system that tracks power-ups by their source.
//!
//! The equipment system groups the wrappers an item, item set or effect
//! contributes and hands the whole group over. Removing the source disposes
//! exactly that group:
//!
//! ```text
//! apply_item(sword, [+50 Strength, +10 TotalDamage])
//! apply_set_bonus([×1.1 TotalDamage])
//! apply_set_bonus([×1.2 TotalDamage])   // disposes ×1.1 first
//! remove_item(sword)                    // disposes +50 and +10
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::class::{CharacterClass, StoredAttribute};
use crate::definition::{AttributeCatalog, AttributeId};
use crate::error::{ApplyError, ApplyResult, AttributeError, Result};
use crate::power_up::PowerUpWrapper;
use crate::system::AttributeSystem;

/// Stable identity of an equipped item instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(pub u64);

/// Stable identity of an active transient effect (buff, debuff).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Active,
    /// Every tracked power-up was disposed; tracking mutations are rejected.
    Disposed,
}

/// [`AttributeSystem`] plus the power-up groups of items, set bonus and effects.
#[derive(Debug)]
pub struct ItemAwareAttributeSystem {
    system: AttributeSystem,
    item_power_ups: BTreeMap<ItemId, Vec<PowerUpWrapper>>,
    set_power_ups: Option<Vec<PowerUpWrapper>>,
    effect_power_ups: BTreeMap<EffectId, Vec<PowerUpWrapper>>,
    state: LifecycleState,
}

impl ItemAwareAttributeSystem {
    pub fn new(
        catalog: Arc<AttributeCatalog>,
        stored: &[StoredAttribute],
        class: &CharacterClass,
    ) -> Result<Self> {
        AttributeSystem::new(catalog, stored, class).map(Self::from_system)
    }

    pub fn from_system(system: AttributeSystem) -> Self {
        Self {
            system,
            item_power_ups: BTreeMap::new(),
            set_power_ups: None,
            effect_power_ups: BTreeMap::new(),
            state: LifecycleState::Active,
        }
    }

    pub fn system(&self) -> &AttributeSystem {
        &self.system
    }

    /// Mutable access for creating wrappers against this system.
    pub fn system_mut(&mut self) -> &mut AttributeSystem {
        &mut self.system
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn get_value(&self, attribute: AttributeId) -> Result<f32> {
        self.system.get_value(attribute)
    }

    pub fn set_base_value(&mut self, attribute: AttributeId, value: f32) -> Result<()> {
        self.system.set_base_value(attribute, value)
    }

    pub fn is_item_applied(&self, item: ItemId) -> bool {
        self.item_power_ups.contains_key(&item)
    }

    pub fn item_power_ups(&self, item: ItemId) -> Option<&[PowerUpWrapper]> {
        self.item_power_ups.get(&item).map(Vec::as_slice)
    }

    pub fn set_bonus(&self) -> Option<&[PowerUpWrapper]> {
        self.set_power_ups.as_deref()
    }

    pub fn is_effect_active(&self, effect: EffectId) -> bool {
        self.effect_power_ups.contains_key(&effect)
    }

    pub fn effect_power_ups(&self, effect: EffectId) -> Option<&[PowerUpWrapper]> {
        self.effect_power_ups.get(&effect).map(Vec::as_slice)
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Track the power-ups contributed by an equipped item.
    ///
    /// On error the group is refused as described by [`ApplyError`]: nothing
    /// stays registered in this system and foreign wrappers are handed back.
    pub fn apply_item(&mut self, item: ItemId, power_ups: Vec<PowerUpWrapper>) -> ApplyResult {
        let checked = self.ensure_accepts(&power_ups).and_then(|()| {
            if self.item_power_ups.contains_key(&item) {
                Err(AttributeError::DuplicateItem(item))
            } else {
                Ok(())
            }
        });
        if let Err(error) = checked {
            return Err(self.reject(error, power_ups));
        }

        tracing::debug!(?item, power_ups = power_ups.len(), "item applied");
        self.item_power_ups.insert(item, power_ups);
        Ok(())
    }

    /// Dispose every power-up of an item and forget it.
    pub fn remove_item(&mut self, item: ItemId) -> Result<()> {
        self.ensure_active()?;
        let power_ups = self
            .item_power_ups
            .remove(&item)
            .ok_or(AttributeError::UnknownItem(item))?;

        tracing::debug!(?item, power_ups = power_ups.len(), "item removed");
        self.dispose_group(power_ups)
    }

    // ========================================================================
    // Set bonus
    // ========================================================================

    /// Replace the active set bonus.
    ///
    /// The previous bonus is disposed in full before the new one is tracked.
    pub fn apply_set_bonus(&mut self, power_ups: Vec<PowerUpWrapper>) -> ApplyResult {
        if let Err(error) = self.ensure_accepts(&power_ups) {
            return Err(self.reject(error, power_ups));
        }

        let previous = self.set_power_ups.take();
        tracing::debug!(
            power_ups = power_ups.len(),
            replaced = previous.is_some(),
            "set bonus applied"
        );
        let disposed = match previous {
            Some(previous) => self.dispose_group(previous),
            None => Ok(()),
        };
        self.set_power_ups = Some(power_ups);
        disposed.map_err(ApplyError::from)
    }

    /// Dispose the active set bonus, if any.
    pub fn clear_set_bonus(&mut self) -> Result<()> {
        self.ensure_active()?;
        match self.set_power_ups.take() {
            Some(previous) => {
                tracing::debug!(power_ups = previous.len(), "set bonus cleared");
                self.dispose_group(previous)
            }
            None => Ok(()),
        }
    }

    // ========================================================================
    // Effects
    // ========================================================================

    /// Track the power-ups of a transient effect.
    pub fn apply_effect(
        &mut self,
        effect: EffectId,
        power_ups: Vec<PowerUpWrapper>,
    ) -> ApplyResult {
        let checked = self.ensure_accepts(&power_ups).and_then(|()| {
            if self.effect_power_ups.contains_key(&effect) {
                Err(AttributeError::DuplicateEffect(effect))
            } else {
                Ok(())
            }
        });
        if let Err(error) = checked {
            return Err(self.reject(error, power_ups));
        }

        tracing::debug!(?effect, power_ups = power_ups.len(), "effect applied");
        self.effect_power_ups.insert(effect, power_ups);
        Ok(())
    }

    pub fn remove_effect(&mut self, effect: EffectId) -> Result<()> {
        self.ensure_active()?;
        let power_ups = self
            .effect_power_ups
            .remove(&effect)
            .ok_or(AttributeError::UnknownEffect(effect))?;

        tracing::debug!(?effect, power_ups = power_ups.len(), "effect removed");
        self.dispose_group(power_ups)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Dispose every tracked power-up. Calling it again is a no-op.
    ///
    /// Keeps going past individual failures and returns the first one.
    pub fn dispose_all(&mut self) -> Result<()> {
        if self.state == LifecycleState::Disposed {
            return Ok(());
        }
        self.state = LifecycleState::Disposed;

        let mut groups: Vec<Vec<PowerUpWrapper>> = Vec::new();
        groups.extend(std::mem::take(&mut self.item_power_ups).into_values());
        groups.extend(self.set_power_ups.take());
        groups.extend(std::mem::take(&mut self.effect_power_ups).into_values());

        tracing::debug!(
            system = ?self.system.id(),
            groups = groups.len(),
            "disposing attribute system"
        );

        let mut first_error = None;
        for group in groups {
            if let Err(error) = self.dispose_group(group) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn ensure_active(&self) -> Result<()> {
        match self.state {
            LifecycleState::Active => Ok(()),
            LifecycleState::Disposed => Err(AttributeError::Disposed),
        }
    }

    /// Every wrapper of an accepted group must be live and owned by this system.
    fn ensure_accepts(&self, power_ups: &[PowerUpWrapper]) -> Result<()> {
        self.ensure_active()?;
        for power_up in power_ups {
            if power_up.owner() != self.system.id() {
                return Err(AttributeError::ForeignPowerUp);
            }
            if power_up.is_disposed() {
                return Err(AttributeError::DoubleDispose(power_up.target()));
            }
        }
        Ok(())
    }

    /// Dispose the refused wrappers this system owns and hand back the others.
    fn reject(&mut self, error: AttributeError, power_ups: Vec<PowerUpWrapper>) -> ApplyError {
        let id = self.system.id();
        let (foreign, owned): (Vec<_>, Vec<_>) = power_ups
            .into_iter()
            .partition(|power_up| power_up.owner() != id);
        let live = owned
            .into_iter()
            .filter(|power_up| !power_up.is_disposed())
            .collect();
        if let Err(dispose_error) = self.dispose_group(live) {
            tracing::warn!(
                code = dispose_error.error_code(),
                "refused power-ups were not fully disposed"
            );
        }

        tracing::debug!(
            code = error.error_code(),
            foreign = foreign.len(),
            "power-up group refused"
        );
        ApplyError { error, foreign }
    }

    fn dispose_group(&mut self, power_ups: Vec<PowerUpWrapper>) -> Result<()> {
        let mut first_error = None;
        for mut power_up in power_ups {
            if let Err(error) = power_up.dispose(&mut self.system) {
                tracing::warn!(
                    attribute = ?power_up.target(),
                    code = error.error_code(),
                    "failed to dispose power-up"
                );
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for ItemAwareAttributeSystem {
    fn drop(&mut self) {
        if let Err(error) = self.dispose_all() {
            tracing::warn!(code = error.error_code(), "disposal on drop failed");
        }
    }
}
