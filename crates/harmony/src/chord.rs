//! Chords: a named factor structure, optionally rooted, inverted or slashed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::factor::{ChordQuality, FactorSet};
use crate::interval::Interval;
use crate::note::Note;
use crate::registry::{NamedEntry, Registry};
use crate::scoring::Structure;
use crate::{Error, Result};

/// Anything a chord can be built from.
#[derive(Debug, Clone, PartialEq)]
pub enum ChordInput {
    Name(String),
    Factors(FactorSet),
    Intervals(Vec<Interval>),
    Notes(Vec<Note>),
}

impl From<&str> for ChordInput {
    fn from(name: &str) -> Self {
        ChordInput::Name(name.to_string())
    }
}

impl From<FactorSet> for ChordInput {
    fn from(factors: FactorSet) -> Self {
        ChordInput::Factors(factors)
    }
}

impl From<Vec<Note>> for ChordInput {
    fn from(notes: Vec<Note>) -> Self {
        ChordInput::Notes(notes)
    }
}

/// A chord member: its note and the degree it plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub note: Note,
    pub degree: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    name: String,
    factors: FactorSet,
    rarity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<Note>,
    #[serde(default)]
    inversion: usize,
    /// A bass note outside the chord (`C/D`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bass: Option<Note>,
}

impl Chord {
    pub fn from_entry(entry: NamedEntry) -> Chord {
        Chord {
            name: entry.name,
            factors: entry.factors,
            rarity: entry.rarity,
            root: None,
            inversion: 0,
            bass: None,
        }
    }

    pub fn from_input(registry: &Registry, input: ChordInput) -> Result<Chord> {
        match input {
            ChordInput::Name(name) => Chord::parse(registry, &name),
            ChordInput::Factors(factors) => Ok(Chord::from_entry(registry.name_chord(&factors))),
            ChordInput::Intervals(intervals) => {
                let entry = match registry.chord_entry_for_intervals(&intervals) {
                    Some(entry) => entry,
                    None => registry.name_chord(&FactorSet::from_intervals(&intervals)?),
                };
                Ok(Chord::from_entry(entry))
            }
            ChordInput::Notes(notes) => Chord::from_notes(registry, &notes),
        }
    }

    /// Parse a chord symbol such as `C`, `F#m7`, `Bbmaj7/D`, `C/1` or a
    /// root-less suffix such as `maj7`.
    ///
    /// The whole suffix is tried first so names containing `/` (`6/9`)
    /// survive; otherwise the text after the last `/` is the bass. A number
    /// there selects an inversion, a chord tone selects the inversion with
    /// that tone in the bass, and any other note becomes a slash bass.
    pub fn parse(registry: &Registry, text: &str) -> Result<Chord> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::parse(text, text));
        }
        let (root, suffix) = match Note::parse_prefix(text) {
            Some((note, consumed)) => (Some(note), &text[consumed..]),
            None => (None, text),
        };
        let whole = match registry.parse_chord_suffix(suffix) {
            Ok(entry) => return Ok(Chord::from_entry(entry).with_root_opt(root)),
            Err(err) => err,
        };
        let Some(slash) = suffix.rfind('/') else {
            return Err(reframe(whole, text));
        };
        let (suffix, bass_text) = (&suffix[..slash], &suffix[slash + 1..]);
        let entry = registry.parse_chord_suffix(suffix).map_err(|err| reframe(err, text))?;
        let chord = Chord::from_entry(entry).with_root_opt(root);
        if let Ok(inversion) = bass_text.parse::<usize>() {
            return Ok(chord.with_inversion(inversion));
        }
        let bass: Note = bass_text.parse().map_err(|err| reframe(err, text))?;
        chord.with_bass(bass)
    }

    /// Identify a chord from its notes. Each distinct pitch class is tried as
    /// the root (the first note first); the first registered reading wins and
    /// the first note becomes the bass. Unregistered shapes are named relative
    /// to the first note.
    pub fn from_notes(registry: &Registry, notes: &[Note]) -> Result<Chord> {
        let mut unique: Vec<Note> = Vec::with_capacity(notes.len());
        for &note in notes {
            if !unique.iter().any(|n| n.pitch_class() == note.pitch_class()) {
                unique.push(note.without_octave());
            }
        }
        let Some(&bass) = unique.first() else {
            return Err(Error::InvalidFactor("a chord needs at least one note".into()));
        };
        let above = |root: Note| -> Vec<Interval> {
            let mut intervals: Vec<Interval> = unique
                .iter()
                .map(|n| {
                    let distance = i32::from(n.pitch_class()) - i32::from(root.pitch_class());
                    Interval::new(distance.rem_euclid(12))
                })
                .collect();
            intervals.sort_by_key(|iv| iv.value());
            intervals
        };
        for (index, &root) in unique.iter().enumerate() {
            if let Some(entry) = registry.chord_entry_for_intervals(&above(root)) {
                let chord = Chord::from_entry(entry).with_root(root);
                return if index == 0 { Ok(chord) } else { chord.with_bass(bass) };
            }
        }
        let factors = FactorSet::from_intervals(&above(bass))?;
        Ok(Chord::from_entry(registry.name_chord(&factors)).with_root(bass))
    }

    pub fn with_root(self, root: Note) -> Chord {
        Chord {
            root: Some(root),
            ..self
        }
    }

    fn with_root_opt(self, root: Option<Note>) -> Chord {
        Chord { root, ..self }
    }

    /// Select an inversion; indices wrap modulo the chord size.
    pub fn with_inversion(self, inversion: usize) -> Chord {
        let size = self.factors.len().max(1);
        Chord {
            inversion: inversion % size,
            bass: None,
            ..self
        }
    }

    /// Put `bass` in the bass. A chord tone selects the matching inversion;
    /// another note is added below the chord unless its degree clashes with
    /// an existing, differently altered degree.
    pub fn with_bass(self, bass: Note) -> Result<Chord> {
        let ambiguous = |chord: &Chord| Error::AmbiguousInversion {
            chord: chord.symbol(),
            bass: bass.to_string(),
        };
        let Some(root) = self.root else {
            return Err(ambiguous(&self));
        };
        let tones = self.chord_tones().unwrap_or_default();
        if let Some(index) = tones.iter().position(|n| n.pitch_class() == bass.pitch_class()) {
            return Ok(self.with_inversion(index));
        }
        let class = (root.without_octave().interval_to(bass.without_octave()).simple_degree() - 1) as u8;
        let degrees = self.factors.space().degrees() as u8;
        if self.factors.iter().any(|(degree, _)| (degree - 1) % degrees == class) {
            return Err(ambiguous(&self));
        }
        Ok(Chord {
            inversion: 0,
            bass: Some(bass),
            ..self
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factors(&self) -> &FactorSet {
        &self.factors
    }

    pub fn root(&self) -> Option<Note> {
        self.root
    }

    pub fn inversion(&self) -> usize {
        self.inversion
    }

    pub fn slash_bass(&self) -> Option<Note> {
        self.bass
    }

    pub fn size(&self) -> usize {
        self.factors.len()
    }

    pub fn intervals(&self) -> Vec<Interval> {
        self.factors.intervals()
    }

    pub fn quality(&self) -> ChordQuality {
        self.factors.quality()
    }

    /// Root-position members with their degrees, lowest first.
    pub fn members(&self) -> Option<Vec<Member>> {
        let root = self.root?;
        let mut members: Vec<(i32, Member)> = self
            .factors
            .iter()
            .map(|(degree, offset)| {
                let interval = self.factors.interval_of(degree, offset);
                let member = Member {
                    note: root.transpose(interval),
                    degree,
                };
                (interval.value(), member)
            })
            .collect();
        members.sort_by_key(|(value, _)| *value);
        Some(members.into_iter().map(|(_, member)| member).collect())
    }

    fn chord_tones(&self) -> Option<Vec<Note>> {
        self.members().map(|members| members.into_iter().map(|m| m.note).collect())
    }

    /// Notes from the bass up: the slash bass (if any), then the chord tones
    /// rotated to the current inversion.
    pub fn notes(&self) -> Option<Vec<Note>> {
        let mut tones = self.chord_tones()?;
        if !tones.is_empty() {
            let len = tones.len();
            tones.rotate_left(self.inversion % len);
        }
        if let Some(bass) = self.bass {
            tones.insert(0, bass);
        }
        Some(tones)
    }

    /// Sounding bass note.
    pub fn bass(&self) -> Option<Note> {
        self.notes().and_then(|notes| notes.first().copied())
    }

    pub fn pitch_classes(&self) -> Option<Vec<u8>> {
        self.notes().map(|notes| notes.iter().map(|n| n.pitch_class()).collect())
    }

    /// Full symbol, e.g. `Cmaj7/E`.
    pub fn symbol(&self) -> String {
        let mut symbol = match self.root {
            Some(root) => format!("{root}{}", self.name),
            None => self.name.clone(),
        };
        let bass = if self.bass.is_some() || self.inversion > 0 {
            self.bass()
        } else {
            None
        };
        if let Some(bass) = bass {
            symbol.push('/');
            symbol.push_str(&bass.without_octave().to_string());
        }
        symbol
    }
}

impl Structure for Chord {
    fn factor_set(&self) -> &FactorSet {
        &self.factors
    }

    fn rarity(&self) -> u32 {
        self.rarity
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Report parse errors against the full chord text.
fn reframe(err: Error, text: &str) -> Error {
    match err {
        Error::Parse { fragment, .. } => Error::parse(text, fragment),
        other => other,
    }
}
