//! Spelled notes: a letter, an accidental and an optional octave.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::interval::{Interval, Space};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

const NATURAL_PITCHES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Letter {
        Self::ALL[index.rem_euclid(7) as usize]
    }

    pub fn natural_pitch(self) -> i32 {
        NATURAL_PITCHES[self as usize]
    }

    pub fn from_char(c: char) -> Option<Letter> {
        match c {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        ['C', 'D', 'E', 'F', 'G', 'A', 'B'][self as usize]
    }
}

/// Preferred accidental when a pitch class has to be spelled from scratch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spelling {
    #[default]
    Sharps,
    Flats,
}

impl FromStr for Spelling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sharps" | "sharp" | "#" => Ok(Spelling::Sharps),
            "flats" | "flat" | "b" => Ok(Spelling::Flats),
            _ => Err(Error::parse(s, s)),
        }
    }
}

const SHARP_SPELLINGS: [(Letter, i8); 12] = [
    (Letter::C, 0),
    (Letter::C, 1),
    (Letter::D, 0),
    (Letter::D, 1),
    (Letter::E, 0),
    (Letter::F, 0),
    (Letter::F, 1),
    (Letter::G, 0),
    (Letter::G, 1),
    (Letter::A, 0),
    (Letter::A, 1),
    (Letter::B, 0),
];

const FLAT_SPELLINGS: [(Letter, i8); 12] = [
    (Letter::C, 0),
    (Letter::D, -1),
    (Letter::D, 0),
    (Letter::E, -1),
    (Letter::E, 0),
    (Letter::F, 0),
    (Letter::G, -1),
    (Letter::G, 0),
    (Letter::A, -1),
    (Letter::A, 0),
    (Letter::B, -1),
    (Letter::B, 0),
];

/// Render an accidental offset as `#`/`b` symbols.
pub fn accidental_string(offset: i32) -> String {
    if offset >= 0 {
        "#".repeat(offset as usize)
    } else {
        "b".repeat(offset.unsigned_abs() as usize)
    }
}

/// A spelled note. Octaves follow scientific pitch notation (C4 = MIDI 60).
///
/// Equality compares spelling; use [`Note::pitch_class`] for enharmonic checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    letter: Letter,
    accidental: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    octave: Option<i8>,
}

impl Note {
    pub fn new(letter: Letter, accidental: i8) -> Note {
        Note {
            letter,
            accidental,
            octave: None,
        }
    }

    pub fn with_octave(self, octave: i8) -> Note {
        Note {
            octave: Some(octave),
            ..self
        }
    }

    pub fn without_octave(self) -> Note {
        Note {
            octave: None,
            ..self
        }
    }

    pub fn from_pitch_class(pitch_class: i32, spelling: Spelling) -> Note {
        let table = match spelling {
            Spelling::Sharps => &SHARP_SPELLINGS,
            Spelling::Flats => &FLAT_SPELLINGS,
        };
        let (letter, accidental) = table[pitch_class.rem_euclid(12) as usize];
        Note::new(letter, accidental)
    }

    pub fn from_midi(midi: u8, spelling: Spelling) -> Note {
        let midi = i32::from(midi);
        let octave = (midi.div_euclid(12) - 1) as i8;
        Self::from_pitch_class(midi, spelling).with_octave(octave)
    }

    pub fn letter(self) -> Letter {
        self.letter
    }

    pub fn accidental(self) -> i8 {
        self.accidental
    }

    pub fn octave(self) -> Option<i8> {
        self.octave
    }

    /// Pitch class 0..12 with C = 0.
    pub fn pitch_class(self) -> u8 {
        self.unbounded_pitch().rem_euclid(12) as u8
    }

    /// MIDI number, when the note carries an octave.
    pub fn midi(self) -> Option<i32> {
        self.octave
            .map(|octave| (i32::from(octave) + 1) * 12 + self.unbounded_pitch())
    }

    fn unbounded_pitch(self) -> i32 {
        self.letter.natural_pitch() + i32::from(self.accidental)
    }

    /// Same letter, accidental moved by `delta`.
    pub fn alter(self, delta: i8) -> Note {
        Note {
            accidental: self.accidental.saturating_add(delta),
            ..self
        }
    }

    /// Transpose by an interval, spelling the result from the interval's degree.
    pub fn transpose(self, interval: Interval) -> Note {
        let target = self.unbounded_pitch() + interval.value();
        if interval.space() != Space::HEPTATONIC {
            let spelling = if self.accidental < 0 {
                Spelling::Flats
            } else {
                Spelling::Sharps
            };
            let spelled = Note::from_pitch_class(target, spelling);
            return match self.midi() {
                Some(midi) => {
                    let midi = midi + interval.value();
                    spelled.with_octave((midi.div_euclid(12) - 1) as i8)
                }
                None => spelled,
            };
        }
        let position = self.letter.index() + interval.step();
        let letter = Letter::from_index(position);
        let mut accidental = (target - letter.natural_pitch()).rem_euclid(12);
        if accidental > 6 {
            accidental -= 12;
        }
        let octave = self
            .octave
            .map(|octave| (i32::from(octave) + position.div_euclid(7)) as i8);
        Note {
            letter,
            accidental: accidental as i8,
            octave,
        }
    }

    /// Interval from this note up to `other`.
    ///
    /// With octaves on both notes the real distance is used; otherwise the
    /// ascending interval within one octave, spelled from the letters.
    pub fn interval_to(self, other: Note) -> Interval {
        if let (Some(low), Some(high)) = (self.midi(), other.midi()) {
            let position = |note: Note| {
                i32::from(note.octave.unwrap_or(0)) * 7 + note.letter.index()
            };
            let step = position(other) - position(self);
            return Interval::or_default(high - low, step, Space::HEPTATONIC);
        }
        let value = (other.unbounded_pitch() - self.unbounded_pitch()).rem_euclid(12);
        let step = (other.letter.index() - self.letter.index()).rem_euclid(7);
        [(value, step), (value + 12, step), (value, step + 7)]
            .into_iter()
            .find_map(|(value, step)| {
                Interval::with_degree(value, step + 1).ok()
            })
            .unwrap_or_else(|| Interval::new(value))
    }

    /// Parse a note at the start of `text`, returning it and the bytes consumed.
    ///
    /// The letter must be uppercase so chord suffixes like `add9` are not
    /// mistaken for roots. No octave is read.
    pub fn parse_prefix(text: &str) -> Option<(Note, usize)> {
        let mut chars = text.char_indices();
        let (_, first) = chars.next()?;
        let letter = Letter::from_char(first)?;
        let mut accidental: i8 = 0;
        let mut consumed = first.len_utf8();
        for (index, c) in chars {
            let delta = match c {
                '#' | '♯' => 1,
                'b' | '♭' => -1,
                'x' | '𝄪' => 2,
                '𝄫' => -2,
                _ => break,
            };
            accidental = accidental.checked_add(delta)?;
            consumed = index + c.len_utf8();
        }
        Some((Note::new(letter, accidental), consumed))
    }
}

impl FromStr for Note {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => return Err(Error::parse(s, s)),
        };
        let (note, consumed) =
            Note::parse_prefix(&capitalized).ok_or_else(|| Error::parse(s, trimmed))?;
        let rest = &capitalized[consumed..];
        if rest.is_empty() {
            return Ok(note);
        }
        rest.parse::<i8>()
            .map(|octave| note.with_octave(octave))
            .map_err(|_| Error::parse(s, rest))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.letter.as_char(),
            accidental_string(i32::from(self.accidental))
        )?;
        if let Some(octave) = self.octave {
            write!(f, "{octave}")?;
        }
        Ok(())
    }
}

/// Parse a whitespace- or comma-separated list of notes.
pub fn parse_notes(text: &str) -> Result<Vec<Note>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::parse)
        .collect()
}
