//! Key identification from chord progressions or loose notes.
//!
//! Every chord root and bass is a candidate tonic and every registered scale
//! a candidate structure. Candidates are scored like chords, by weighted
//! precision and recall over the progression's notes. Keys that tie on both
//! are separated by how many cadences the progression makes in them.

use harmony::{Chord, Key, Note, Registry, Scale, Structure};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

use crate::cadence::cadence_score;
use crate::config::MatchConfig;
use crate::metrics::{key_members, precision_recall, NoteWeights};
use crate::types::{KeyMatch, MatchResult, Scores};

/// Note weights for a progression: one unit per chord tone, with every tone
/// of the first and last chords boosted.
fn progression_weights(chords: &[Chord], config: &MatchConfig) -> NoteWeights {
    let mut weights = NoteWeights::new();
    let last = chords.len().saturating_sub(1);
    for (index, chord) in chords.iter().enumerate() {
        let mut weight = 1.0;
        if index == 0 {
            weight += config.first_chord_boost;
        }
        if index == last {
            weight += config.last_chord_boost;
        }
        for note in chord.notes().unwrap_or_default() {
            weights.add(note, weight);
        }
    }
    weights
}

/// Roots then basses, distinct by pitch class, in progression order.
fn tonic_candidates(chords: &[Chord]) -> Vec<Note> {
    let mut seen = BTreeSet::new();
    let roots = chords.iter().filter_map(Chord::root);
    let basses = chords.iter().filter_map(Chord::bass);
    roots
        .chain(basses)
        .map(Note::without_octave)
        .filter(|note| seen.insert(note.pitch_class()))
        .collect()
}

/// Score every (tonic, scale) pair that passes the thresholds.
fn candidates(
    registry: &Registry,
    tonics: &[Note],
    weights: &NoteWeights,
    chords: &[Chord],
    config: &MatchConfig,
) -> Vec<KeyMatch> {
    let consonance_scale = registry.config().consonance;
    let max_rarity = registry.config().max_rarity;
    registry
        .scale_entries()
        .into_par_iter()
        .filter(|entry| !config.blacklist.contains(&entry.name))
        .flat_map_iter(move |entry| {
            let scale = Scale::from_entry(entry);
            let likelihood = scale.likelihood(max_rarity);
            let consonance = scale.consonance(&consonance_scale);
            tonics.iter().filter_map(move |&tonic| {
                let key = Key::new(tonic, scale.clone());
                let mut input = weights.clone();
                input.add(tonic, config.tonic_boost);
                let (precision, recall) = precision_recall(&input, &key_members(&key), config);
                let scores = Scores {
                    precision,
                    recall,
                    likelihood,
                    consonance,
                };
                if !config.accepts(key.scale().name(), &scores) {
                    return None;
                }
                let cadence = cadence_score(&key, chords, config.pad_tonic);
                Some(KeyMatch {
                    result: MatchResult::new(key, scores),
                    cadence,
                })
            })
        })
        .collect()
}

/// Rank by (recall, precision); within a tie, by cadence score, then
/// likelihood, then consonance.
fn rank_keys(matches: &mut [KeyMatch]) {
    // Recall and precision first; ties are settled group by group below.
    matches.sort_by(|a, b| a.scores().rank(b.scores()));
    let mut start = 0;
    while start < matches.len() {
        let lead = *matches[start].scores();
        let len = matches[start..]
            .iter()
            .take_while(|m| m.scores().ties_with(&lead))
            .count();
        // Stronger cadence, then commoner scale, then more consonant.
        matches[start..start + len].sort_by(|a, b| {
            let (x, y) = (a.scores(), b.scores());
            b.cadence
                .total_cmp(&a.cadence)
                .then(y.likelihood.total_cmp(&x.likelihood))
                .then(y.consonance.total_cmp(&x.consonance))
        });
        start += len;
    }
}

fn search(
    registry: &Registry,
    tonics: &[Note],
    weights: &NoteWeights,
    chords: &[Chord],
    config: &MatchConfig,
) -> Vec<KeyMatch> {
    let mut matches = candidates(registry, tonics, weights, chords, config);
    if matches.is_empty() {
        debug!("no key passed the thresholds, retrying relaxed");
        matches = candidates(registry, tonics, weights, chords, &config.relaxed());
        if matches.is_empty() {
            debug!("no key candidates after relaxed retry");
        }
    }
    rank_keys(&mut matches);
    matches.truncate(config.max_results);
    matches
}

/// Keys for a chord progression, best first.
pub fn match_keys(registry: &Registry, chords: &[Chord], config: &MatchConfig) -> Vec<KeyMatch> {
    let tonics = tonic_candidates(chords);
    let weights = progression_weights(chords, config);
    debug!(chords = chords.len(), tonics = tonics.len(), "matching keys");
    search(registry, &tonics, &weights, chords, config)
}

/// Keys for loose notes. Only the first note is tried as the tonic.
pub fn match_keys_from_notes(
    registry: &Registry,
    notes: &[Note],
    config: &MatchConfig,
) -> Vec<KeyMatch> {
    let tonics: Vec<Note> = notes.first().map(|n| n.without_octave()).into_iter().collect();
    let weights = NoteWeights::from_notes(notes);
    search(registry, &tonics, &weights, &[], config)
}
