//! Cadence detection over chord progressions.
//!
//! A cadence is a root movement between two consecutive chords, read as
//! scale degrees of a key. The normalized cadence score separates keys that
//! explain a progression's notes equally well.

use harmony::{Chord, Key};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// V → I
    Authentic,
    /// IV → I
    Plagal,
    /// I → V
    Half,
    /// V → vi
    Deceptive,
}

impl Cadence {
    pub const ALL: [Cadence; 4] = [
        Cadence::Authentic,
        Cadence::Plagal,
        Cadence::Half,
        Cadence::Deceptive,
    ];

    /// Root degrees (from, to).
    pub fn movement(self) -> (u8, u8) {
        match self {
            Cadence::Authentic => (5, 1),
            Cadence::Plagal => (4, 1),
            Cadence::Half => (1, 5),
            Cadence::Deceptive => (5, 6),
        }
    }

    pub fn score(self) -> f64 {
        match self {
            Cadence::Authentic => 1.0,
            Cadence::Plagal => 0.75,
            Cadence::Half | Cadence::Deceptive => 0.5,
        }
    }

    pub fn from_movement(from: u8, to: u8) -> Option<Cadence> {
        Cadence::ALL.into_iter().find(|c| c.movement() == (from, to))
    }
}

/// A cadence found in a progression, `position` being the arriving chord.
/// The implied closing tonic sits at `chords.len()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadencePoint {
    pub cadence: Cadence,
    pub position: usize,
}

/// Root degrees of the rooted chords, plus the tonic when `pad` is set.
fn root_degrees(key: &Key, chords: &[Chord], pad: bool) -> Vec<(usize, u8)> {
    let mut degrees: Vec<(usize, u8)> = chords
        .iter()
        .enumerate()
        .filter_map(|(i, chord)| chord.root().map(|root| (i, key.root_degree(root))))
        .collect();
    if pad && !degrees.is_empty() {
        degrees.push((chords.len(), 1));
    }
    degrees
}

pub fn detect_cadences(key: &Key, chords: &[Chord], pad: bool) -> Vec<CadencePoint> {
    root_degrees(key, chords, pad)
        .windows(2)
        .filter_map(|pair| {
            let ((_, from), (position, to)) = (pair[0], pair[1]);
            Cadence::from_movement(from, to).map(|cadence| CadencePoint { cadence, position })
        })
        .collect()
}

/// Sum of cadence scores divided by the progression length (counting the
/// implied tonic when padded).
pub fn cadence_score(key: &Key, chords: &[Chord], pad: bool) -> f64 {
    let length = root_degrees(key, chords, pad).len();
    if length == 0 {
        return 0.0;
    }
    let total: f64 = detect_cadences(key, chords, pad)
        .iter()
        .map(|point| point.cadence.score())
        .sum();
    total / length as f64
}
