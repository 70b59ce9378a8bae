//! End-to-end matching scenarios against the built-in vocabulary.

use harmony::note::parse_notes;
use harmony::{Chord, Error, Registry, TheoryConfig};
use harmony_match::{
    cadence_score, exact_search, fuzzy_candidates, match_chords, match_chords_with, match_keys,
    parse_progression, CancelToken, MatchConfig,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn registry() -> Registry {
    Registry::build(&TheoryConfig::default()).expect("registry should build")
}

#[test]
fn major_seventh_from_unordered_notes() {
    let registry = registry();
    let notes = parse_notes("C E G B").unwrap();
    let results = match_chords(&registry, &notes, &MatchConfig::default()).unwrap();
    let best = &results[0];
    assert_eq!(best.candidate.symbol(), "Cmaj7");
    assert_eq!(best.precision(), 1.0);
    assert_eq!(best.recall(), 1.0);
}

#[test]
fn added_seventh_names_dominant() {
    let registry = registry();
    let chord = Chord::parse(&registry, "C").unwrap();
    let factors = harmony::Modifier::new().add(7, -1).apply(chord.factors()).unwrap();
    assert_eq!(factors, harmony::FactorSet::parse("1,3,5,b7").unwrap());
    assert_eq!(
        registry.chord_name_for_intervals(&factors.intervals()).as_deref(),
        Some("7")
    );
}

#[test]
fn a_minor_progression() {
    let registry = registry();
    let chords = parse_progression(&registry, "Am C D F Am E Am E").unwrap();
    let config = MatchConfig::default();
    let matches = match_keys(&registry, &chords, &config);
    let best = &matches[0];
    assert_eq!(best.key().name(), "A minor");
    assert_eq!(best.scores().recall, 1.0);
    assert_eq!(best.cadence, cadence_score(best.key(), &chords, config.pad_tonic));
    assert!(best.cadence > 0.0);
    for other in matches.iter().filter(|m| m.scores().ties_with(best.scores())) {
        assert!(other.cadence <= best.cadence, "{}", other.key());
    }
}

#[test]
fn inversion_wraps_modulo_size() {
    let registry = registry();
    let fifth = Chord::parse(&registry, "C/5").unwrap();
    let second = Chord::parse(&registry, "C/2").unwrap();
    assert_eq!(fifth.inversion(), 2);
    assert_eq!(fifth.notes(), second.notes());
    assert_eq!(fifth.symbol(), "C/G");
}

#[test]
fn exact_search_finds_every_small_chord() {
    let registry = registry();
    let config = MatchConfig {
        max_results: 1000,
        ..MatchConfig::default()
    };
    let root = "C".parse().unwrap();
    let mut missing = Vec::new();
    for entry in registry.chord_entries() {
        let chord = Chord::from_entry(entry.clone()).with_root(root);
        let mut notes = chord.notes().unwrap();
        let classes: BTreeSet<u8> = notes.iter().map(|n| n.pitch_class()).collect();
        if classes.len() > 5 {
            continue;
        }
        notes.reverse();

        let results = exact_search(&registry, &notes, &config, &CancelToken::new()).unwrap();
        let found = results.iter().any(|r| {
            r.candidate.name() == entry.name
                && r.candidate.root().map(|n| n.pitch_class()) == Some(0)
        });
        if !found {
            missing.push(format!("C{}", entry.name));
        }
    }
    assert!(missing.is_empty(), "not found among exact matches: {missing:?}");
}

#[test]
fn relaxing_thresholds_never_shrinks_results() {
    let registry = registry();
    let notes = parse_notes("C E G Bb D F#").unwrap();
    let strict = MatchConfig {
        min_precision: 0.8,
        min_recall: 0.8,
        min_likelihood: 0.5,
        min_consonance: 0.3,
        ..MatchConfig::default()
    };
    let looser = [
        MatchConfig { min_precision: 0.5, ..strict.clone() },
        MatchConfig { min_recall: 0.5, ..strict.clone() },
        MatchConfig { min_likelihood: 0.0, ..strict.clone() },
        MatchConfig { min_consonance: 0.0, ..strict.clone() },
        strict.relaxed(),
    ];
    let symbols = |config: &MatchConfig| -> BTreeSet<String> {
        fuzzy_candidates(&registry, &notes, config)
            .into_iter()
            .map(|r| r.candidate.symbol())
            .collect()
    };
    let base = symbols(&strict);
    for config in &looser {
        assert!(symbols(config).is_superset(&base));
    }
}

#[test]
fn cancellation_and_size_limits() {
    let registry = registry();
    let notes = parse_notes("C D E F G A").unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    assert_eq!(
        exact_search(&registry, &notes[..4], &MatchConfig::default(), &cancel),
        Err(Error::Cancelled)
    );

    let config = MatchConfig {
        allow_fuzzy: false,
        ..MatchConfig::default()
    };
    assert_eq!(
        match_chords_with(&registry, &notes, &config, &CancelToken::new()),
        Err(Error::SearchSize { size: 6, limit: 5 })
    );
    assert!(!match_chords(&registry, &notes, &MatchConfig::default()).unwrap().is_empty());
}
