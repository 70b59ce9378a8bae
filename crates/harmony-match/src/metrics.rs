//! Weighted precision and recall between an input note collection and a
//! candidate's members.
//!
//! Recall asks how much of the input the candidate explains; precision asks
//! how much of the candidate the input contains. Both weigh each member by
//! the multiplier for its degree, so a missing third costs more than a
//! missing fifth. Chromatic members can explain input notes but are never
//! expected to appear.

use harmony::{Chord, Key, Note};
use std::collections::BTreeMap;

use crate::config::MatchConfig;

/// Weight per pitch class of the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteWeights(BTreeMap<u8, f64>);

impl NoteWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// One unit per occurrence.
    pub fn from_notes(notes: &[Note]) -> Self {
        let mut weights = Self::new();
        for &note in notes {
            weights.add(note, 1.0);
        }
        weights
    }

    pub fn add(&mut self, note: Note, weight: f64) {
        *self.0.entry(note.pitch_class()).or_insert(0.0) += weight;
    }

    pub fn get(&self, pitch_class: u8) -> f64 {
        self.0.get(&pitch_class).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, pitch_class: u8) -> bool {
        self.0.contains_key(&pitch_class)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, f64)> + '_ {
        self.0.iter().map(|(&pc, &weight)| (pc, weight))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One pitch class a candidate contains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Membership {
    pub pitch_class: u8,
    pub degree: u8,
    /// Chromatic members are optional: they count toward recall only.
    pub required: bool,
}

/// Members of a rooted chord. Empty for a chord without a root.
pub fn chord_members(chord: &Chord) -> Vec<Membership> {
    let mut members: Vec<Membership> = chord
        .members()
        .unwrap_or_default()
        .into_iter()
        .map(|member| Membership {
            pitch_class: member.note.pitch_class(),
            degree: member.degree,
            required: true,
        })
        .collect();
    if let Some(bass) = chord.slash_bass() {
        let degree = chord
            .root()
            .map(|root| root.interval_to(bass).simple_degree() as u8)
            .unwrap_or(1);
        members.push(Membership {
            pitch_class: bass.pitch_class(),
            degree,
            required: true,
        });
    }
    members
}

/// Diatonic and chromatic members of a key.
pub fn key_members(key: &Key) -> Vec<Membership> {
    let diatonic = key.notes().into_iter().map(|note| (note, true));
    let chromatic = key.chromatic_notes().into_iter().map(|note| (note, false));
    diatonic
        .chain(chromatic)
        .filter_map(|(note, required)| {
            key.degree_of(note).map(|degree| Membership {
                pitch_class: note.pitch_class(),
                degree,
                required,
            })
        })
        .collect()
}

/// Weighted (precision, recall) of `members` against `input`.
pub fn precision_recall(input: &NoteWeights, members: &[Membership], config: &MatchConfig) -> (f64, f64) {
    let mut expected = 0.0;
    let mut found = 0.0;
    for member in members.iter().filter(|m| m.required) {
        let weight = config.degree_weight(member.degree);
        expected += weight;
        if input.contains(member.pitch_class) {
            found += weight;
        }
    }

    let mut total = 0.0;
    let mut explained = 0.0;
    for (pitch_class, weight) in input.iter() {
        let member = members
            .iter()
            .filter(|m| m.pitch_class == pitch_class)
            .max_by_key(|m| m.required);
        match member {
            Some(member) => {
                let weight = weight * config.degree_weight(member.degree);
                total += weight;
                explained += weight;
            }
            None => total += weight,
        }
    }

    (ratio(found, expected), ratio(explained, total))
}

fn ratio(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harmony::note::parse_notes;
    use harmony::{Registry, TheoryConfig};

    fn registry() -> Registry {
        Registry::build(&TheoryConfig::default()).unwrap()
    }

    fn weights(text: &str) -> NoteWeights {
        NoteWeights::from_notes(&parse_notes(text).unwrap())
    }

    fn chord(registry: &Registry, symbol: &str) -> Vec<Membership> {
        chord_members(&Chord::parse(registry, symbol).unwrap())
    }

    #[test]
    fn exact_chord_scores_one() {
        let registry = registry();
        let config = MatchConfig::default();
        let (precision, recall) =
            precision_recall(&weights("C E G B"), &chord(&registry, "Cmaj7"), &config);
        assert_eq!((precision, recall), (1.0, 1.0));
    }

    #[test]
    fn missing_third_costs_more_than_missing_fifth() {
        let registry = registry();
        let config = MatchConfig::default();
        let members = chord(&registry, "C");
        let (no_fifth, _) = precision_recall(&weights("C E"), &members, &config);
        let (no_third, _) = precision_recall(&weights("C G"), &members, &config);
        assert!(no_fifth > no_third);
        assert!((no_fifth - 3.0 / 3.5).abs() < 1e-9);
    }

    #[test]
    fn foreign_notes_lower_recall() {
        let registry = registry();
        let config = MatchConfig::default();
        let (precision, recall) =
            precision_recall(&weights("C E G D"), &chord(&registry, "C"), &config);
        assert_eq!(precision, 1.0);
        // C, E (x2) and G (x0.5) explained; D unexplained.
        assert!((recall - 3.5 / 4.5).abs() < 1e-9);
    }

    #[test]
    fn chromatic_tones_help_recall_only() {
        let registry = registry();
        let config = MatchConfig::default();
        let key = Key::parse(&registry, "A minor").unwrap();
        let members = key_members(&key);
        assert_eq!(members.iter().filter(|m| !m.required).count(), 2);

        let (precision, recall) = precision_recall(&weights("A B C D E F G G#"), &members, &config);
        assert_eq!((precision, recall), (1.0, 1.0));

        let (precision, recall) = precision_recall(&weights("A C E G#"), &members, &config);
        assert_eq!(recall, 1.0);
        assert!(precision < 1.0);
    }

    #[test]
    fn empty_input_scores_zero() {
        let registry = registry();
        let (precision, recall) =
            precision_recall(&NoteWeights::new(), &chord(&registry, "C"), &MatchConfig::default());
        assert_eq!((precision, recall), (0.0, 0.0));
    }
}
