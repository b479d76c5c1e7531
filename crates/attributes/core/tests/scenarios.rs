use std::sync::Arc;

use attribute_core::{
    AggregateType, ApplyResult, AttributeCatalog, AttributeDefinition, AttributeError, AttributeId,
    CharacterClass, EffectId, Formula, ItemAwareAttributeSystem, ItemId, PowerUpDefinition,
    PowerUpWrapper, StoredAttribute,
};

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

fn catalog() -> Arc<AttributeCatalog> {
    Arc::new(
        AttributeCatalog::new([
            AttributeDefinition::new("Strength"),
            AttributeDefinition::new("Agility"),
            AttributeDefinition::new("Energy"),
            AttributeDefinition::new("TotalDamage"),
            AttributeDefinition::new("MaximumMana"),
            AttributeDefinition::new("SkillDamage"),
        ])
        .expect("catalog should be valid"),
    )
}

fn knight() -> CharacterClass {
    CharacterClass::new("Dark Knight")
        .with_combination(
            "TotalDamage",
            Formula::product([Formula::attribute("Strength"), Formula::Constant(2.0)]),
        )
        .with_combination(
            "MaximumMana",
            Formula::sum([
                Formula::percentage(150.0, Formula::attribute("Energy")),
                Formula::Constant(10.0),
            ]),
        )
        .with_combination(
            "SkillDamage",
            Formula::sum([
                Formula::percentage(10.0, Formula::attribute("TotalDamage")),
                Formula::attribute("Agility"),
            ]),
        )
}

fn character() -> ItemAwareAttributeSystem {
    ItemAwareAttributeSystem::new(
        catalog(),
        &[
            StoredAttribute::new("Strength", 100.0),
            StoredAttribute::new("Agility", 30.0),
            StoredAttribute::new("Energy", 20.0),
        ],
        &knight(),
    )
    .expect("character should build")
}

fn id(system: &ItemAwareAttributeSystem, designation: &str) -> AttributeId {
    system
        .system()
        .catalog()
        .id(designation)
        .expect("attribute should be defined")
}

fn value(system: &ItemAwareAttributeSystem, designation: &str) -> f32 {
    system
        .get_value(id(system, designation))
        .expect("attribute should be readable")
}

fn constant(
    system: &mut ItemAwareAttributeSystem,
    designation: &str,
    amount: f32,
    aggregate_type: AggregateType,
) -> PowerUpWrapper {
    let target = id(system, designation);
    PowerUpWrapper::constant(system.system_mut(), target, amount, aggregate_type)
        .expect("power-up should register")
}

/// Equip and unequip an item that raises a primary stat.
#[test]
fn item_bonus_flows_into_derived_damage() {
    let mut system = character();
    assert_close(value(&system, "Strength"), 100.0);
    assert_close(value(&system, "TotalDamage"), 200.0);

    let bonus = constant(&mut system, "Strength", 50.0, AggregateType::AddRaw);
    system
        .apply_item(ItemId(1), vec![bonus])
        .expect("item should apply");
    assert_close(value(&system, "Strength"), 150.0);
    assert_close(value(&system, "TotalDamage"), 300.0);

    system.remove_item(ItemId(1)).expect("item should be removed");
    assert_close(value(&system, "Strength"), 100.0);
    assert_close(value(&system, "TotalDamage"), 200.0);
}

/// A new set bonus supersedes the previous one instead of stacking.
#[test]
fn set_bonus_replacement_does_not_stack() {
    let mut system = character();

    let ten_percent = constant(&mut system, "TotalDamage", 1.1, AggregateType::Multiplicate);
    system
        .apply_set_bonus(vec![ten_percent])
        .expect("set bonus should apply");
    assert_close(value(&system, "TotalDamage"), 220.0);

    let twenty_percent = constant(&mut system, "TotalDamage", 1.2, AggregateType::Multiplicate);
    system
        .apply_set_bonus(vec![twenty_percent])
        .expect("set bonus should be replaced");
    assert_close(value(&system, "TotalDamage"), 240.0);
    assert_eq!(system.set_bonus().map(<[_]>::len), Some(1));

    system.clear_set_bonus().expect("set bonus should clear");
    assert_close(value(&system, "TotalDamage"), 200.0);
}

/// Writes to stored values reach every transitively dependent attribute.
#[test]
fn stored_write_reaches_nested_formulas() {
    let mut system = character();
    assert_close(value(&system, "SkillDamage"), 50.0);
    assert_close(value(&system, "MaximumMana"), 40.0);

    let strength = id(&system, "Strength");
    system
        .set_base_value(strength, 300.0)
        .expect("strength is stored");
    assert_close(value(&system, "TotalDamage"), 600.0);
    assert_close(value(&system, "SkillDamage"), 90.0);

    let agility = id(&system, "Agility");
    system
        .set_base_value(agility, 10.0)
        .expect("agility is stored");
    assert_close(value(&system, "SkillDamage"), 70.0);
    assert_close(value(&system, "MaximumMana"), 40.0);
}

/// Items, set bonus and effects stack, and each source comes off cleanly.
#[test]
fn mixed_sources_are_removed_independently() {
    let mut system = character();

    let sword = vec![
        constant(&mut system, "Strength", 50.0, AggregateType::AddRaw),
        constant(&mut system, "TotalDamage", 20.0, AggregateType::AddFinal),
    ];
    system.apply_item(ItemId(10), sword).expect("sword applies");

    let set = constant(&mut system, "TotalDamage", 1.5, AggregateType::Multiplicate);
    system.apply_set_bonus(vec![set]).expect("set applies");

    let definition = PowerUpDefinition::new(
        "TotalDamage",
        Formula::percentage(100.0, Formula::attribute("Energy")),
        AggregateType::AddRaw,
    );
    let buff = PowerUpWrapper::from_definition(system.system_mut(), &definition)
        .expect("buff registers");
    system
        .apply_effect(EffectId(7), vec![buff])
        .expect("effect applies");

    // (150 × 2 + 20) × 1.5 + 20
    assert_close(value(&system, "TotalDamage"), 500.0);

    system.remove_effect(EffectId(7)).expect("effect removed");
    assert_close(value(&system, "TotalDamage"), 470.0);

    system.remove_item(ItemId(10)).expect("sword removed");
    assert_close(value(&system, "TotalDamage"), 300.0);

    system.clear_set_bonus().expect("set cleared");
    assert_close(value(&system, "TotalDamage"), 200.0);
}

/// Disposing everything restores the bare character and is repeatable.
#[test]
fn dispose_all_is_idempotent_and_leaves_no_subscriptions() {
    let fresh = character();
    let baseline_subscriptions = fresh.system().live_subscriptions();
    let baseline_elements = fresh.system().element_count();

    let mut system = character();
    let gloves = vec![
        constant(&mut system, "Agility", 15.0, AggregateType::AddRaw),
        constant(&mut system, "Strength", 5.0, AggregateType::AddRaw),
    ];
    system.apply_item(ItemId(1), gloves).expect("gloves apply");
    let definition = PowerUpDefinition::new(
        "SkillDamage",
        Formula::product([Formula::attribute("Energy"), Formula::Constant(0.5)]),
        AggregateType::AddFinal,
    );
    let skill = PowerUpWrapper::from_definition(system.system_mut(), &definition)
        .expect("skill power-up registers");
    system
        .apply_effect(EffectId(1), vec![skill])
        .expect("effect applies");
    let set = constant(&mut system, "TotalDamage", 1.1, AggregateType::Multiplicate);
    system.apply_set_bonus(vec![set]).expect("set applies");
    assert!(system.system().live_subscriptions() > baseline_subscriptions);

    system.dispose_all().expect("first dispose succeeds");
    system.dispose_all().expect("second dispose is a no-op");

    assert_eq!(system.system().live_subscriptions(), baseline_subscriptions);
    assert_eq!(system.system().element_count(), baseline_elements);
    assert_eq!(system.system().values(), fresh.system().values());
}

/// A modifier that would read its own target is refused without side effects.
#[test]
fn cyclic_power_up_is_refused() {
    let mut system = character();
    let subscriptions = system.system().live_subscriptions();
    let elements = system.system().element_count();

    let definition = PowerUpDefinition::new(
        "Strength",
        Formula::percentage(5.0, Formula::attribute("SkillDamage")),
        AggregateType::AddRaw,
    );
    let result = PowerUpWrapper::from_definition(system.system_mut(), &definition);

    let strength = id(&system, "Strength");
    assert_eq!(
        result.map(|_| ()).unwrap_err(),
        AttributeError::CyclicDependency(strength)
    );
    assert_eq!(system.system().live_subscriptions(), subscriptions);
    assert_eq!(system.system().element_count(), elements);
    assert_close(value(&system, "Strength"), 100.0);
}

/// Ownership misuse of power-up handles is reported, not silently ignored.
#[test]
fn power_up_ownership_is_enforced() {
    let mut system = character();
    let mut other = character();
    let strength = id(&system, "Strength");

    let mut power_up =
        PowerUpWrapper::constant(system.system_mut(), strength, 10.0, AggregateType::AddRaw)
            .expect("power-up registers");

    assert_eq!(
        power_up.dispose(other.system_mut()),
        Err(AttributeError::ForeignPowerUp)
    );
    power_up
        .dispose(system.system_mut())
        .expect("owner disposes");
    assert_eq!(
        power_up.dispose(system.system_mut()),
        Err(AttributeError::DoubleDispose(strength))
    );
    assert_close(value(&system, "Strength"), 100.0);
}

/// The change log only names attributes that can have moved.
#[test]
fn change_log_tracks_invalidated_attributes() {
    let mut system = character();
    system.system_mut().take_changed();

    let energy = id(&system, "Energy");
    system.set_base_value(energy, 40.0).expect("energy is stored");

    let changed = system.system_mut().take_changed();
    assert!(changed.contains(&energy));
    assert!(changed.contains(&id(&system, "MaximumMana")));
    assert!(!changed.contains(&id(&system, "TotalDamage")));
    assert_close(value(&system, "MaximumMana"), 70.0);
}

#[derive(Clone, Copy, Debug)]
enum Source {
    Item,
    SetBonus,
    Effect,
}

const SOURCES: [Source; 3] = [Source::Item, Source::SetBonus, Source::Effect];

fn apply(
    system: &mut ItemAwareAttributeSystem,
    source: Source,
    group: Vec<PowerUpWrapper>,
) -> ApplyResult {
    match source {
        Source::Item => system.apply_item(ItemId(1), group),
        Source::SetBonus => system.apply_set_bonus(group),
        Source::Effect => system.apply_effect(EffectId(1), group),
    }
}

fn is_tracked(system: &ItemAwareAttributeSystem, source: Source) -> bool {
    match source {
        Source::Item => system.is_item_applied(ItemId(1)),
        Source::SetBonus => system.set_bonus().is_some(),
        Source::Effect => system.is_effect_active(EffectId(1)),
    }
}

/// Only live wrappers of the system itself can be tracked, by any source.
#[test]
fn disposed_wrappers_are_refused_by_every_source() {
    for source in SOURCES {
        let mut system = character();
        let baseline_subscriptions = system.system().live_subscriptions();
        let strength = id(&system, "Strength");

        let mut stale = constant(&mut system, "Strength", 5.0, AggregateType::AddRaw);
        stale
            .dispose(system.system_mut())
            .expect("first dispose succeeds");
        let live = constant(&mut system, "Strength", 8.0, AggregateType::AddRaw);

        let rejected = apply(&mut system, source, vec![live, stale])
            .expect_err("disposed wrapper must be refused");
        assert_eq!(
            rejected.error,
            AttributeError::DoubleDispose(strength),
            "{source:?}"
        );
        assert!(!is_tracked(&system, source), "{source:?}");
        assert_close(value(&system, "Strength"), 100.0);
        assert_eq!(
            system.system().live_subscriptions(),
            baseline_subscriptions,
            "{source:?}"
        );
        system.dispose_all().expect("nothing stale is tracked");
    }
}

/// Foreign wrappers come back undisposed so their owner can still remove them.
#[test]
fn foreign_wrappers_return_to_their_owner_from_every_source() {
    for source in SOURCES {
        let mut system = character();
        let mut owner = character();
        let baseline_elements = owner.system().element_count();
        let baseline_subscriptions = owner.system().live_subscriptions();

        let foreign = constant(&mut owner, "Strength", 5.0, AggregateType::AddRaw);
        let rejected = apply(&mut system, source, vec![foreign])
            .expect_err("foreign wrapper must be refused");
        assert_eq!(rejected.error, AttributeError::ForeignPowerUp, "{source:?}");
        assert!(!is_tracked(&system, source), "{source:?}");

        owner
            .apply_item(ItemId(2), rejected.into_foreign())
            .expect("owner takes its wrapper back");
        assert_close(value(&owner, "Strength"), 105.0);

        owner.dispose_all().expect("owner disposes everything");
        assert_close(value(&owner, "Strength"), 100.0);
        assert_eq!(owner.system().element_count(), baseline_elements);
        assert_eq!(
            owner.system().live_subscriptions(),
            baseline_subscriptions,
            "{source:?}"
        );
    }
}

/// Every tracked wrapper stays registered until its source is removed.
#[test]
fn tracked_wrappers_are_registered() {
    let mut system = character();
    let strength = id(&system, "Strength");

    for source in SOURCES {
        let power_up = constant(&mut system, "Strength", 10.0, AggregateType::AddRaw);
        apply(&mut system, source, vec![power_up]).expect("group applies");
    }
    assert_close(value(&system, "Strength"), 130.0);

    let groups = [
        system.item_power_ups(ItemId(1)).expect("item tracked"),
        system.set_bonus().expect("set bonus tracked"),
        system.effect_power_ups(EffectId(1)).expect("effect tracked"),
    ];
    for power_up in groups.into_iter().flatten() {
        assert!(!power_up.is_disposed());
        assert_eq!(power_up.target(), strength);
        assert!(system.system().element_value(power_up.element()).is_ok());
    }

    system.remove_effect(EffectId(1)).expect("effect removed");
    system.remove_item(ItemId(1)).expect("item removed");
    system.clear_set_bonus().expect("set bonus cleared");
    assert_close(value(&system, "Strength"), 100.0);
}
