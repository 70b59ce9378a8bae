//! Scales and keys.
//!
//! A `Scale` is a named factor structure with an optional tonic; a `Key` is a
//! scale that always has one.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chord::Chord;
use crate::factor::FactorSet;
use crate::interval::Interval;
use crate::note::Note;
use crate::registry::{NamedEntry, Registry};
use crate::scoring::Structure;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    name: String,
    factors: FactorSet,
    rarity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tonic: Option<Note>,
}

impl Scale {
    pub fn from_entry(entry: NamedEntry) -> Scale {
        Scale {
            name: entry.name,
            factors: entry.factors,
            rarity: entry.rarity,
            tonic: None,
        }
    }

    /// Parse `dorian`, `A harmonic minor` or `Am`. A bare tonic means major.
    pub fn parse(registry: &Registry, text: &str) -> Result<Scale> {
        let text = text.trim();
        if let Some(entry) = registry.scale_entry(text) {
            return Ok(Scale::from_entry(entry));
        }
        let Some((tonic, consumed)) = Note::parse_prefix(text) else {
            return Err(Error::parse(text, text));
        };
        let rest = text[consumed..].trim();
        let name = if rest.is_empty() { "major" } else { rest };
        let entry = registry
            .scale_entry(name)
            .ok_or_else(|| Error::parse(text, rest))?;
        Ok(Scale::from_entry(entry).with_tonic(tonic))
    }

    pub fn with_tonic(self, tonic: Note) -> Scale {
        Scale {
            tonic: Some(tonic),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factors(&self) -> &FactorSet {
        &self.factors
    }

    pub fn tonic(&self) -> Option<Note> {
        self.tonic
    }

    pub fn intervals(&self) -> Vec<Interval> {
        self.factors.intervals()
    }

    /// Diatonic notes from the tonic up.
    pub fn notes(&self) -> Option<Vec<Note>> {
        let tonic = self.tonic?;
        Some(self.intervals().into_iter().map(|iv| tonic.transpose(iv)).collect())
    }

    /// Chromatic tones that belong to the scale without being diatonic.
    pub fn chromatic_notes(&self) -> Option<Vec<Note>> {
        let tonic = self.tonic?;
        Some(
            self.factors
                .chromatic_intervals()
                .into_iter()
                .map(|iv| tonic.transpose(iv))
                .collect(),
        )
    }

    /// Rotate to start on the member at `index`. The result takes the
    /// registered name of the rotated structure when there is one.
    pub fn mode(&self, registry: &Registry, index: usize) -> Result<Scale> {
        let rotated = self.factors.mode(index)?;
        let position = index % self.factors.len().max(1);
        let tonic = match (self.tonic, self.intervals().get(position)) {
            (Some(tonic), Some(&interval)) => Some(tonic.transpose(interval)),
            _ => None,
        };
        let scale = match registry.scale_entry_for(&rotated) {
            Some(entry) => Scale::from_entry(entry),
            None => Scale {
                name: format!("{} mode {}", self.name, position + 1),
                factors: rotated,
                rarity: self.rarity + 1,
                tonic: None,
            },
        };
        Ok(Scale { tonic, ..scale })
    }
}

impl Structure for Scale {
    fn factor_set(&self) -> &FactorSet {
        &self.factors
    }

    fn rarity(&self) -> u32 {
        self.rarity
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tonic {
            Some(tonic) => write!(f, "{tonic} {}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A scale anchored on a tonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    tonic: Note,
    scale: Scale,
}

impl Key {
    pub fn new(tonic: Note, scale: Scale) -> Key {
        let tonic = tonic.without_octave();
        Key {
            tonic,
            scale: scale.with_tonic(tonic),
        }
    }

    /// Parse `A minor`, `Eb lydian` or `F#m`.
    pub fn parse(registry: &Registry, text: &str) -> Result<Key> {
        let scale = Scale::parse(registry, text)?;
        match scale.tonic {
            Some(tonic) => Ok(Key::new(tonic, scale)),
            None => Err(Error::parse(text, text.trim())),
        }
    }

    pub fn tonic(&self) -> Note {
        self.tonic
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn factors(&self) -> &FactorSet {
        &self.scale.factors
    }

    pub fn name(&self) -> String {
        self.scale.to_string()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.scale.notes().unwrap_or_default()
    }

    pub fn chromatic_notes(&self) -> Vec<Note> {
        self.scale.chromatic_notes().unwrap_or_default()
    }

    /// Whether the note is a diatonic or chromatic member.
    pub fn contains(&self, note: Note) -> bool {
        self.degree_of(note).is_some()
    }

    /// Scale degree of a note, if it is a member.
    pub fn degree_of(&self, note: Note) -> Option<u8> {
        let distance = i32::from(note.pitch_class()) - i32::from(self.tonic().pitch_class());
        self.factors().degree_of_semitone(distance)
    }

    /// Degree of a note relative to the tonic, using the default spelling of
    /// the distance when the note is not a member.
    pub fn root_degree(&self, note: Note) -> u8 {
        self.degree_of(note).unwrap_or_else(|| {
            let distance = i32::from(note.pitch_class()) - i32::from(self.tonic().pitch_class());
            Interval::new(distance.rem_euclid(12)).simple_degree() as u8
        })
    }

    /// Note on a diatonic degree.
    pub fn degree_note(&self, degree: u8) -> Option<Note> {
        let offset = self.factors().get(degree)?;
        Some(self.tonic().transpose(self.factors().interval_of(degree, offset)))
    }

    /// Diatonic chord built by stacking scale thirds on `degree`:
    /// a triad, or a seventh chord when `seventh` is set.
    pub fn chord_on(&self, registry: &Registry, degree: u8, seventh: bool) -> Result<Chord> {
        let notes = self.notes();
        let count = notes.len();
        if degree == 0 || usize::from(degree) > count {
            return Err(Error::InvalidFactor(format!(
                "{} has no degree {degree}",
                self.name()
            )));
        }
        let start = usize::from(degree) - 1;
        let voices = if seventh { 4 } else { 3 };
        let stacked: Vec<Note> = (0..voices).map(|i| notes[(start + 2 * i) % count]).collect();
        let root = stacked[0];
        let intervals: Vec<Interval> = stacked
            .iter()
            .map(|&note| root.interval_to(note))
            .collect();
        let entry = match registry.chord_entry_for_intervals(&intervals) {
            Some(entry) => entry,
            None => registry.name_chord(&FactorSet::from_intervals(&intervals)?),
        };
        Ok(Chord::from_entry(entry).with_root(root))
    }
}

impl Structure for Key {
    fn factor_set(&self) -> &FactorSet {
        &self.scale.factors
    }

    fn rarity(&self) -> u32 {
        self.scale.rarity
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scale)
    }
}
