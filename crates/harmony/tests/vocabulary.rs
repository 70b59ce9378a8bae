//! Registry-wide properties: every registered name round-trips through its
//! structure and its symbol, and modifiers never touch their input.

use harmony::{Chord, FactorSet, Interval, Modifier, Registry, TheoryConfig};

fn registry() -> Registry {
    Registry::build(&TheoryConfig::default()).expect("registry should build")
}

#[test]
fn every_chord_name_round_trips() {
    let registry = registry();
    for entry in registry.chord_entries() {
        let factors = registry
            .chord_factors(&entry.name)
            .unwrap_or_else(|| panic!("{} has no factors", entry.name));
        assert_eq!(
            registry.chord_name(&factors).as_deref(),
            Some(entry.name.as_str()),
            "name → factors → name for '{}'",
            entry.name
        );
    }
}

#[test]
fn every_chord_symbol_parses_back() {
    let registry = registry();
    for entry in registry.chord_entries() {
        let symbol = format!("D{}", entry.name);
        let chord = Chord::parse(&registry, &symbol)
            .unwrap_or_else(|e| panic!("failed to parse {symbol}: {e}"));
        assert_eq!(chord.factors(), &entry.factors, "{symbol}");
        assert_eq!(chord.symbol(), symbol);
    }
}

#[test]
fn every_scale_name_round_trips() {
    let registry = registry();
    for entry in registry.scale_entries() {
        let factors = registry.scale_factors(&entry.name).unwrap();
        assert_eq!(registry.scale_name(&factors), Some(entry.name.clone()));
    }
}

#[test]
fn rarity_stays_under_cap() {
    let registry = registry();
    let cap = registry.config().max_rarity;
    assert!(registry.chord_entries().iter().all(|e| e.rarity <= cap));
    let entries = registry.chord_entries();
    assert!(entries.windows(2).all(|w| w[0].rarity <= w[1].rarity));
}

#[test]
fn lower_cap_means_smaller_vocabulary() {
    let full = registry();
    let small = Registry::build(&TheoryConfig {
        max_rarity: 2,
        ..TheoryConfig::default()
    })
    .unwrap();
    assert!(small.chord_count() < full.chord_count());
}

#[test]
fn modifiers_are_pure() {
    let registry = registry();
    let edits = [
        Modifier::new().add(7, -1),
        Modifier::new().remove(5),
        Modifier::new().make(9, 1),
        Modifier::new().modify(3, -1),
    ];
    for entry in registry.chord_entries().into_iter().take(200) {
        let before = entry.factors.clone();
        for edit in &edits {
            let _ = edit.apply(&entry.factors);
        }
        assert_eq!(entry.factors, before);
    }
}

#[test]
fn interval_laws_hold_across_range() {
    for value in -40..=40 {
        let iv = Interval::new(value);
        assert_eq!((iv + (-iv)).value(), 0);
        assert_eq!(iv.invert().invert().value().rem_euclid(12), value.rem_euclid(12));
        if value >= 0 {
            assert_eq!((iv + 12).simple_degree(), iv.simple_degree(), "{iv}");
        }
    }
}

#[test]
fn distance_then_apply_reaches_target() {
    let registry = registry();
    let entries = registry.chord_entries();
    let target = FactorSet::parse("1,b3,b5,b7,9").unwrap();
    for entry in entries.iter().take(50) {
        let modifier = target.distance(&entry.factors);
        assert_eq!(modifier.apply(&entry.factors).unwrap(), target, "from {}", entry.name);
    }
}
