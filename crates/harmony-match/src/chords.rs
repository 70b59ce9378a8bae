//! Chord identification from unordered notes.
//!
//! Small note sets are searched exactly: every ordering of the distinct
//! pitch classes is stacked upward from its first note and the resulting
//! interval signature is looked up in the registry. Larger sets, or sets the
//! exact search cannot name, are scored against every registered chord on
//! every input note as root.

use harmony::{Chord, Error, Interval, Note, Registry, Result, Structure};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

use crate::config::MatchConfig;
use crate::metrics::{chord_members, precision_recall, NoteWeights};
use crate::types::{rank, CancelToken, MatchResult, Scores};

/// Identify chords from notes, best match first.
pub fn match_chords(
    registry: &Registry,
    notes: &[Note],
    config: &MatchConfig,
) -> Result<Vec<MatchResult<Chord>>> {
    match_chords_with(registry, notes, config, &CancelToken::new())
}

/// [`match_chords`] with a cancellation token checked during exact search.
pub fn match_chords_with(
    registry: &Registry,
    notes: &[Note],
    config: &MatchConfig,
    cancel: &CancelToken,
) -> Result<Vec<MatchResult<Chord>>> {
    let size = distinct(notes).len();
    if size == 0 {
        return Ok(Vec::new());
    }
    if size <= config.exact_cutoff {
        let exact = exact_search(registry, notes, config, cancel)?;
        if !exact.is_empty() || !config.allow_fuzzy {
            debug!(size, results = exact.len(), "exact chord search");
            return Ok(exact);
        }
        debug!(size, "exact chord search found nothing, trying fuzzy");
    } else if !config.allow_fuzzy {
        return Err(Error::SearchSize {
            size,
            limit: config.exact_cutoff,
        });
    }
    cancel.check()?;
    Ok(fuzzy_search(registry, notes, config))
}

/// Identify chords from MIDI note numbers, spelled per the configuration.
pub fn match_chords_midi(
    registry: &Registry,
    midi: &[u8],
    config: &MatchConfig,
) -> Result<Vec<MatchResult<Chord>>> {
    let spelling = config.spelling.unwrap_or(registry.config().spelling);
    let notes: Vec<Note> = midi.iter().map(|&m| Note::from_midi(m, spelling)).collect();
    match_chords(registry, &notes, config)
}

/// Distinct pitch classes in input order, first spelling kept, octaves dropped.
fn distinct(notes: &[Note]) -> Vec<Note> {
    let mut seen = BTreeSet::new();
    notes
        .iter()
        .filter(|note| seen.insert(note.pitch_class()))
        .map(|note| note.without_octave())
        .collect()
}

/// Next lexicographic permutation of indices; false after the last one.
fn next_permutation(order: &mut [usize]) -> bool {
    let Some(pivot) = order.windows(2).rposition(|w| w[0] < w[1]) else {
        return false;
    };
    let Some(successor) = order.iter().rposition(|&v| v > order[pivot]) else {
        return false;
    };
    order.swap(pivot, successor);
    order[pivot + 1..].reverse();
    true
}

/// Intervals above the first note, each note stacked above the previous one.
fn stacked(notes: &[Note], order: &[usize]) -> Vec<Interval> {
    let mut value = 0;
    let mut previous = notes[order[0]].pitch_class();
    let mut intervals = vec![Interval::new(0)];
    for &index in &order[1..] {
        let current = notes[index].pitch_class();
        value += (i32::from(current) - i32::from(previous)).rem_euclid(12);
        intervals.push(Interval::new(value));
        previous = current;
    }
    intervals
}

/// Score a rooted chord against the input.
fn score(registry: &Registry, chord: &Chord, input: &NoteWeights, config: &MatchConfig) -> Scores {
    let (precision, recall) = precision_recall(input, &chord_members(chord), config);
    Scores {
        precision,
        recall,
        likelihood: chord.likelihood(registry.config().max_rarity),
        consonance: chord.consonance(&registry.config().consonance),
    }
}

/// Put the lowest input note in the bass when every note has an octave and
/// the lowest one is a chord tone other than the root.
fn voice(chord: Chord, notes: &[Note]) -> Chord {
    let lowest = notes
        .iter()
        .map(|note| note.midi().map(|midi| (midi, *note)))
        .collect::<Option<Vec<_>>>()
        .and_then(|pitched| pitched.into_iter().min_by_key(|(midi, _)| *midi))
        .map(|(_, note)| note.without_octave());
    match (lowest, chord.root()) {
        (Some(bass), Some(root)) if bass.pitch_class() != root.pitch_class() => {
            let in_chord = chord
                .pitch_classes()
                .is_some_and(|pcs| pcs.contains(&bass.pitch_class()));
            if in_chord {
                chord.clone().with_bass(bass).unwrap_or(chord)
            } else {
                chord
            }
        }
        _ => chord,
    }
}

/// Permutation search over the distinct input notes.
///
/// Every reading the registry names is returned once per root: the resolved
/// one (which may add an implied fifth) and every registered chord with the
/// same pitch classes, compound voicings included. Results are ranked and
/// truncated. Thresholds do not apply; the blacklist does.
pub fn exact_search(
    registry: &Registry,
    notes: &[Note],
    config: &MatchConfig,
    cancel: &CancelToken,
) -> Result<Vec<MatchResult<Chord>>> {
    let unique = distinct(notes);
    if unique.len() > config.exact_cutoff {
        return Err(Error::SearchSize {
            size: unique.len(),
            limit: config.exact_cutoff,
        });
    }
    if unique.is_empty() {
        return Ok(Vec::new());
    }
    let input = NoteWeights::from_notes(notes);
    let mut seen = BTreeSet::new();
    let mut results = Vec::new();
    let mut order: Vec<usize> = (0..unique.len()).collect();
    loop {
        cancel.check()?;
        let signature = stacked(&unique, &order);
        let root = unique[order[0]];

        // The resolved reading first, then every other name for the same
        // pitch classes above this root.
        let resolved = registry
            .resolve_chord_intervals(&signature)
            .name()
            .and_then(|name| registry.chord_entry(name));
        let readings = resolved
            .into_iter()
            .chain(registry.chord_entries_for_folded(&signature));
        for entry in readings {
            if config.blacklist.contains(&entry.name) || !seen.insert((root.pitch_class(), entry.name.clone())) {
                continue;
            }
            let chord = voice(Chord::from_entry(entry).with_root(root), notes);
            let scores = score(registry, &chord, &input, config);
            results.push(MatchResult::new(chord, scores));
        }
        if !next_permutation(&mut order) {
            break;
        }
    }
    rank(&mut results);
    results.truncate(config.max_results);
    Ok(results)
}

/// Every registered chord on every input root that passes the thresholds,
/// ranked but not truncated.
pub fn fuzzy_candidates(
    registry: &Registry,
    notes: &[Note],
    config: &MatchConfig,
) -> Vec<MatchResult<Chord>> {
    let roots = distinct(notes);
    let input = NoteWeights::from_notes(notes);
    let (roots, input) = (&roots, &input);
    let consonance_scale = registry.config().consonance;
    let max_rarity = registry.config().max_rarity;

    let mut results: Vec<MatchResult<Chord>> = registry
        .chord_entries()
        .into_par_iter()
        .filter(|entry| !config.blacklist.contains(&entry.name))
        .flat_map_iter(move |entry| {
            let chord = Chord::from_entry(entry);
            let likelihood = chord.likelihood(max_rarity);
            let consonance = chord.consonance(&consonance_scale);
            roots.iter().filter_map(move |&root| {
                let rooted = chord.clone().with_root(root);
                let (precision, recall) = precision_recall(input, &chord_members(&rooted), config);
                let scores = Scores {
                    precision,
                    recall,
                    likelihood,
                    consonance,
                };
                config
                    .accepts(rooted.name(), &scores)
                    .then(|| MatchResult::new(voice(rooted, notes), scores))
            })
        })
        .collect();
    rank(&mut results);
    results
}

/// Fuzzy search with one fully relaxed retry when nothing passes.
pub fn fuzzy_search(
    registry: &Registry,
    notes: &[Note],
    config: &MatchConfig,
) -> Vec<MatchResult<Chord>> {
    let mut results = fuzzy_candidates(registry, notes, config);
    if results.is_empty() {
        debug!("no chord passed the thresholds, retrying relaxed");
        results = fuzzy_candidates(registry, notes, &config.relaxed());
        if results.is_empty() {
            debug!("no chord candidates after relaxed retry");
        }
    }
    results.truncate(config.max_results);
    results
}
