//! Canonical degree → alteration form of chords and scales.
//!
//! A [`FactorSet`] maps scale degrees (1, 3, 5, 7, 9, ...) to an accidental
//! offset from the natural interval of that degree. It is the key the name
//! registry indexes by, so two sets that spell the same structure compare
//! equal. Scales may also carry chromatic tones, written in parentheses
//! (`"1,2,b3,4,5,b6,b7,(6),(7)"`), which count as members but are not part
//! of the diatonic collection.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::interval::{Interval, Space};
use crate::modifier::Modifier;
use crate::note::accidental_string;
use crate::scoring::{self, ConsonanceScale};
use crate::{Error, Result};

/// Largest alteration a single degree may carry.
pub const MAX_FACTOR_OFFSET: i8 = 2;

/// Triad quality read from the third and fifth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
    Diminished,
    Augmented,
    Suspended,
    Indeterminate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactorSet {
    space: Space,
    factors: BTreeMap<u8, i8>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    chromatic: BTreeSet<(u8, i8)>,
}

/// Parse a single factor token such as `b3`, `#11` or `5`.
pub(crate) fn parse_factor_token(token: &str) -> Option<(u8, i8)> {
    let digits_at = token.find(|c: char| c.is_ascii_digit())?;
    let (accidentals, digits) = token.split_at(digits_at);
    let mut offset: i32 = 0;
    for c in accidentals.chars() {
        match c {
            'b' | '♭' => offset -= 1,
            '#' | '♯' => offset += 1,
            _ => return None,
        }
    }
    let degree: u8 = digits.parse().ok()?;
    if degree == 0 {
        return None;
    }
    Some((degree, i8::try_from(offset).ok()?))
}

fn factor_token(degree: u8, offset: i8) -> String {
    format!("{}{degree}", accidental_string(i32::from(offset)))
}

impl FactorSet {
    /// Heptatonic set from (degree, offset) pairs. Repeated degrees are an error.
    pub fn new(factors: impl IntoIterator<Item = (u8, i8)>) -> Result<FactorSet> {
        Self::with_space(Space::HEPTATONIC, factors)
    }

    pub fn with_space(space: Space, factors: impl IntoIterator<Item = (u8, i8)>) -> Result<FactorSet> {
        let mut map = BTreeMap::new();
        for (degree, offset) in factors {
            if map.insert(degree, offset).is_some() {
                return Err(Error::InvalidFactor(format!("degree {degree} given twice")));
            }
        }
        Self::from_parts(space, map, BTreeSet::new())
    }

    /// Validate and normalize. A natural 8 only survives when it completes
    /// an eight-degree collection, which moves the set into the octatonic
    /// space; otherwise it duplicates the root and is dropped.
    pub(crate) fn from_parts(
        space: Space,
        mut factors: BTreeMap<u8, i8>,
        chromatic: BTreeSet<(u8, i8)>,
    ) -> Result<FactorSet> {
        let mut space = space;
        if space.is_regular() && factors.contains_key(&8) {
            let eight_degrees = factors.len() >= 8 && factors.keys().all(|&degree| degree <= 8);
            if eight_degrees {
                space = Space::irregular(12, 8)?;
            } else if factors.get(&8) == Some(&0) {
                factors.remove(&8);
            }
        }
        if factors.is_empty() {
            return Err(Error::InvalidFactor("a factor set needs at least one degree".into()));
        }
        let all = factors
            .iter()
            .map(|(&degree, &offset)| (degree, offset))
            .chain(chromatic.iter().copied());
        for (degree, offset) in all {
            if degree == 0 {
                return Err(Error::InvalidFactor("degrees start at 1".into()));
            }
            if offset.abs() > MAX_FACTOR_OFFSET {
                return Err(Error::InvalidFactor(format!(
                    "{} alters degree {degree} too far",
                    factor_token(degree, offset)
                )));
            }
        }
        for &(degree, offset) in &chromatic {
            if factors.get(&degree) == Some(&offset) {
                return Err(Error::InvalidFactor(format!(
                    "chromatic {} duplicates a diatonic degree",
                    factor_token(degree, offset)
                )));
            }
        }
        Ok(FactorSet {
            space,
            factors,
            chromatic,
        })
    }

    /// Parse `"1,b3,5"`; parenthesized entries such as `(7)` are chromatic.
    pub fn parse(text: &str) -> Result<FactorSet> {
        let mut factors = BTreeMap::new();
        let mut chromatic = BTreeSet::new();
        let tokens = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty());
        for token in tokens {
            let (inner, is_chromatic) = match token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
                Some(inner) => (inner, true),
                None => (token, false),
            };
            let (degree, offset) = parse_factor_token(inner).ok_or_else(|| Error::parse(text, token))?;
            if is_chromatic {
                chromatic.insert((degree, offset));
            } else if factors.insert(degree, offset).is_some() {
                return Err(Error::InvalidFactor(format!(
                    "degree {degree} given twice in '{text}'"
                )));
            }
        }
        Self::from_parts(Space::HEPTATONIC, factors, chromatic)
    }

    /// Build from intervals above a root. When two intervals share a degree
    /// class, the first one wins.
    pub fn from_intervals(intervals: &[Interval]) -> Result<FactorSet> {
        let space = intervals.first().map(|iv| iv.space()).unwrap_or_default();
        let span = space.span();
        let mut factors = BTreeMap::new();
        let mut seen = BTreeSet::new();
        for &interval in intervals {
            let interval = if interval.value() < 0 {
                let octaves = (-interval.value() + span - 1) / span;
                interval.shift(octaves * span)
            } else {
                interval
            };
            if !seen.insert(interval.step().rem_euclid(space.degrees())) {
                continue;
            }
            let degree = u8::try_from(interval.step() + 1)
                .map_err(|_| Error::InvalidFactor(format!("{interval} is out of range")))?;
            let offset = i8::try_from(interval.offset())
                .map_err(|_| Error::InvalidFactor(format!("{interval} is out of range")))?;
            factors.insert(degree, offset);
        }
        Self::from_parts(space, factors, BTreeSet::new())
    }

    pub fn space(&self) -> Space {
        self.space
    }

    pub fn factors(&self) -> &BTreeMap<u8, i8> {
        &self.factors
    }

    pub fn chromatic(&self) -> &BTreeSet<(u8, i8)> {
        &self.chromatic
    }

    /// (degree, offset) pairs in degree order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, i8)> + '_ {
        self.factors.iter().map(|(&degree, &offset)| (degree, offset))
    }

    pub fn get(&self, degree: u8) -> Option<i8> {
        self.factors.get(&degree).copied()
    }

    pub fn contains(&self, degree: u8) -> bool {
        self.factors.contains_key(&degree)
    }

    /// Number of diatonic members.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub(crate) fn interval_of(&self, degree: u8, offset: i8) -> Interval {
        let step = i32::from(degree) - 1;
        let value = self.space.natural_value(step) + i32::from(offset);
        Interval::or_default(value, step, self.space)
    }

    /// Intervals above the root in ascending semitone order.
    pub fn intervals(&self) -> Vec<Interval> {
        let mut intervals: Vec<Interval> =
            self.iter().map(|(degree, offset)| self.interval_of(degree, offset)).collect();
        intervals.sort_by_key(|iv| (iv.value(), iv.step()));
        intervals
    }

    pub fn chromatic_intervals(&self) -> Vec<Interval> {
        let mut intervals: Vec<Interval> = self
            .chromatic
            .iter()
            .map(|&(degree, offset)| self.interval_of(degree, offset))
            .collect();
        intervals.sort_by_key(|iv| (iv.value(), iv.step()));
        intervals
    }

    /// Diatonic semitone values, sorted and deduplicated.
    pub fn semitones(&self) -> Vec<i32> {
        let mut values: Vec<i32> = self.intervals().into_iter().map(Interval::value).collect();
        values.dedup();
        values
    }

    /// Diatonic and chromatic semitone values together.
    pub fn all_semitones(&self) -> Vec<i32> {
        let mut values: Vec<i32> = self
            .intervals()
            .into_iter()
            .chain(self.chromatic_intervals())
            .map(Interval::value)
            .collect();
        values.sort_unstable();
        values.dedup();
        values
    }

    /// Diatonic semitone values folded into one octave.
    pub fn folded_semitones(&self) -> Vec<i32> {
        let span = self.space.span();
        let mut values: Vec<i32> = self.semitones().iter().map(|v| v.rem_euclid(span)).collect();
        values.sort_unstable();
        values.dedup();
        values
    }

    /// Scale degree of a pitch-class distance above the root, if it is a
    /// member. Diatonic degrees win over chromatic ones.
    pub fn degree_of_semitone(&self, semitone: i32) -> Option<u8> {
        let span = self.space.span();
        let target = semitone.rem_euclid(span);
        let diatonic = self.iter().find(|&(degree, offset)| {
            self.interval_of(degree, offset).value().rem_euclid(span) == target
        });
        diatonic
            .or_else(|| {
                self.chromatic.iter().copied().find(|&(degree, offset)| {
                    self.interval_of(degree, offset).value().rem_euclid(span) == target
                })
            })
            .map(|(degree, _)| (degree - 1) % self.space.degrees() as u8 + 1)
    }

    pub fn quality(&self) -> ChordQuality {
        let third = self.get(3);
        let fifth = self.get(5);
        match (third, fifth) {
            (Some(0), Some(1)) => ChordQuality::Augmented,
            (Some(-1), Some(-1)) => ChordQuality::Diminished,
            (Some(0), _) => ChordQuality::Major,
            (Some(-1), _) => ChordQuality::Minor,
            (None, _) if self.contains(2) || self.contains(4) => ChordQuality::Suspended,
            _ => ChordQuality::Indeterminate,
        }
    }

    /// The modifier that turns `other` into `self`.
    ///
    /// Chromatic tones and the interval space are not part of the distance.
    pub fn distance(&self, other: &FactorSet) -> Modifier {
        let mut modifier = Modifier::new();
        for (degree, offset) in other.iter() {
            match self.get(degree) {
                None => modifier = modifier.remove(degree),
                Some(target) if target != offset => {
                    modifier = modifier.modify(degree, target - offset)
                }
                Some(_) => {}
            }
        }
        for (degree, offset) in self.iter() {
            if !other.contains(degree) {
                modifier = modifier.add(degree, offset);
            }
        }
        modifier
    }

    pub fn apply(&self, modifier: &Modifier) -> Result<FactorSet> {
        modifier.apply(self)
    }

    /// Rotate so that the member at `index` (in ascending order) becomes the root.
    pub fn mode(&self, index: usize) -> Result<FactorSet> {
        let intervals = self.intervals();
        let count = intervals.len();
        let index = index % count.max(1);
        let base = intervals[index];
        let (span, degrees) = (self.space.span(), self.space.degrees());
        let rotated: Vec<Interval> = (0..count)
            .map(|i| {
                let position = index + i;
                let iv = intervals[position % count];
                let wrap = if position >= count { 1 } else { 0 };
                Interval::or_default(
                    iv.value() - base.value() + wrap * span,
                    iv.step() - base.step() + wrap * degrees,
                    self.space,
                )
            })
            .collect();
        Self::from_intervals(&rotated)
    }

    /// Mean pairwise consonance of the diatonic members.
    pub fn consonance(&self, scale: &ConsonanceScale) -> f64 {
        scoring::set_consonance(&self.semitones(), self.space.span(), scale)
    }
}

impl fmt::Display for FactorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let diatonic = self.iter().map(|(degree, offset)| factor_token(degree, offset));
        let chromatic = self
            .chromatic
            .iter()
            .map(|&(degree, offset)| format!("({})", factor_token(degree, offset)));
        let tokens: Vec<String> = diatonic.chain(chromatic).collect();
        write!(f, "{}", tokens.join(", "))
    }
}

impl FromStr for FactorSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FactorSet::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(text: &str) -> FactorSet {
        FactorSet::parse(text).unwrap()
    }

    #[test]
    fn parse_and_display() {
        let minor = set("1,b3,5");
        assert_eq!(minor.to_string(), "1, b3, 5");
        assert_eq!(minor.semitones(), vec![0, 3, 7]);
        assert_eq!(set("1 3 5 b7 #9").semitones(), vec![0, 4, 7, 10, 15]);
    }

    #[test]
    fn duplicate_degree_rejected() {
        assert!(matches!(
            FactorSet::parse("1,3,b3"),
            Err(Error::InvalidFactor(_))
        ));
        assert!(FactorSet::new([(1, 0), (1, 0)]).is_err());
    }

    #[test]
    fn parse_error_names_token() {
        match FactorSet::parse("1,3,x5") {
            Err(Error::Parse { fragment, .. }) => assert_eq!(fragment, "x5"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn natural_eighth_dropped() {
        assert_eq!(set("1,3,5,8"), set("1,3,5"));
    }

    #[test]
    fn eight_degrees_promote_to_octatonic() {
        let octatonic = set("1,2,3,4,5,6,7,8");
        assert_eq!(octatonic.space(), Space::irregular(12, 8).unwrap());
        assert_eq!(octatonic.semitones(), vec![0, 2, 3, 5, 6, 8, 9, 11]);
        let half_whole = set("1,b2,3,b4,5,b6,7,b8");
        assert_eq!(half_whole.semitones(), vec![0, 1, 3, 4, 6, 7, 9, 10]);
    }

    #[test]
    fn chromatic_members() {
        let minor = set("1,2,b3,4,5,b6,b7,(6),(7)");
        assert_eq!(minor.len(), 7);
        assert_eq!(minor.semitones(), vec![0, 2, 3, 5, 7, 8, 10]);
        assert_eq!(minor.all_semitones(), vec![0, 2, 3, 5, 7, 8, 9, 10, 11]);
        assert_eq!(minor.degree_of_semitone(11), Some(7));
        assert_eq!(minor.degree_of_semitone(8), Some(6));
        assert_eq!(minor.to_string(), "1, 2, b3, 4, 5, b6, b7, (6), (7)");
        assert!(FactorSet::parse("1,b3,5,(b3)").is_err());
    }

    #[test]
    fn from_intervals_first_wins() {
        let intervals = [Interval::new(0), Interval::new(4), Interval::new(7), Interval::new(12)];
        assert_eq!(FactorSet::from_intervals(&intervals).unwrap(), set("1,3,5"));
        let below = [Interval::new(0), Interval::new(-8)];
        assert_eq!(FactorSet::from_intervals(&below).unwrap(), set("1,3"));
    }

    #[test]
    fn qualities() {
        assert_eq!(set("1,3,5").quality(), ChordQuality::Major);
        assert_eq!(set("1,b3,5,b7").quality(), ChordQuality::Minor);
        assert_eq!(set("1,b3,b5").quality(), ChordQuality::Diminished);
        assert_eq!(set("1,3,#5").quality(), ChordQuality::Augmented);
        assert_eq!(set("1,4,5").quality(), ChordQuality::Suspended);
        assert_eq!(set("1,5").quality(), ChordQuality::Indeterminate);
    }

    #[test]
    fn distance_round_trips() {
        let major = set("1,3,5");
        let dominant_flat_nine = set("1,3,5,b7,b9");
        let half_diminished = set("1,b3,b5,b7");
        for (from, to) in [
            (&major, &dominant_flat_nine),
            (&dominant_flat_nine, &major),
            (&major, &half_diminished),
            (&half_diminished, &dominant_flat_nine),
        ] {
            let modifier = to.distance(from);
            assert_eq!(&modifier.apply(from).unwrap(), to);
        }
        assert!(major.distance(&major).is_empty());
    }

    #[test]
    fn modes_rotate() {
        let major = set("1,2,3,4,5,6,7");
        assert_eq!(major.mode(1).unwrap(), set("1,2,b3,4,5,6,b7"));
        assert_eq!(major.mode(5).unwrap(), set("1,2,b3,4,5,b6,b7"));
        assert_eq!(major.mode(7).unwrap(), major);
    }

    #[test]
    fn consonance_prefers_triads() {
        let scale = ConsonanceScale::default();
        assert!(set("1,3,5").consonance(&scale) > set("1,b2,b3").consonance(&scale));
    }
}
