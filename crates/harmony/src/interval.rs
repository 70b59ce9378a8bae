//! Semitone intervals spelled with a scale degree.
//!
//! An `Interval` pairs a signed semitone distance with a signed step count
//! (degree minus one, negative for descending intervals). Quality falls out
//! of how far the semitone value sits from the natural (major/perfect)
//! value of its degree. Regular intervals live in the 12-semitone,
//! 7-degree space; irregular spaces (octatonic and friends) follow the same
//! contract with a different span and degree count.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

use crate::scoring::{self, ConsonanceScale};
use crate::{Error, Result};

/// Natural semitone value of each heptatonic step.
const DIATONIC_VALUES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Default step for each semitone distance within an octave. The tritone
/// spells as a diminished fifth rather than an augmented fourth.
const DEFAULT_STEPS: [i32; 12] = [0, 1, 1, 2, 2, 3, 4, 4, 5, 5, 6, 6];

/// Furthest an explicit degree may sit from its natural semitone value.
pub const MAX_DEGREE_OFFSET: i32 = 3;

/// Modulus space for intervals: semitones per octave and degrees per octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Space {
    span: u8,
    degrees: u8,
}

impl Space {
    pub const HEPTATONIC: Space = Space { span: 12, degrees: 7 };

    /// A non-heptatonic space, e.g. `Space::irregular(12, 8)` for octatonic scales.
    pub fn irregular(span: u8, degrees: u8) -> Result<Space> {
        if degrees == 0 || span < degrees {
            return Err(Error::InvalidFactor(format!(
                "cannot fit {degrees} degrees into {span} semitones"
            )));
        }
        Ok(Space { span, degrees })
    }

    pub fn span(self) -> i32 {
        i32::from(self.span)
    }

    pub fn degrees(self) -> i32 {
        i32::from(self.degrees)
    }

    pub fn is_regular(self) -> bool {
        self == Space::HEPTATONIC
    }

    /// Semitone value of the natural interval `step` steps away.
    pub fn natural_value(self, step: i32) -> i32 {
        if step < 0 {
            return -self.natural_value(-step);
        }
        let octave = step / self.degrees();
        let within = step % self.degrees();
        let base = if self.is_regular() {
            DIATONIC_VALUES[within as usize]
        } else {
            (f64::from(within * self.span()) / f64::from(self.degrees())).round() as i32
        };
        base + octave * self.span()
    }

    /// Step a bare semitone distance spells as when no degree is given.
    pub fn default_step(self, value: i32) -> i32 {
        if value < 0 {
            return -self.default_step(-value);
        }
        let octave = value / self.span();
        let within = value % self.span();
        let base = if self.is_regular() {
            DEFAULT_STEPS[within as usize]
        } else {
            let step = (f64::from(within * self.degrees()) / f64::from(self.span())).round() as i32;
            step.min(self.degrees() - 1)
        };
        base + octave * self.degrees()
    }
}

impl Default for Space {
    fn default() -> Self {
        Space::HEPTATONIC
    }
}

/// Interval quality relative to the natural interval of the degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Perfect,
    Major,
    Minor,
    Augmented,
    Diminished,
    DoublyAugmented,
    DoublyDiminished,
}

impl Quality {
    pub fn abbreviation(self) -> &'static str {
        match self {
            Quality::Perfect => "P",
            Quality::Major => "M",
            Quality::Minor => "m",
            Quality::Augmented => "A",
            Quality::Diminished => "d",
            Quality::DoublyAugmented => "AA",
            Quality::DoublyDiminished => "dd",
        }
    }
}

/// A signed semitone distance with a spelled degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    value: i32,
    step: i32,
    space: Space,
}

fn degree_of_step(step: i32) -> i32 {
    if step >= 0 {
        step + 1
    } else {
        step - 1
    }
}

impl Interval {
    pub const UNISON: Interval = Interval {
        value: 0,
        step: 0,
        space: Space::HEPTATONIC,
    };

    /// Heptatonic interval with the default degree for `value`.
    pub fn new(value: i32) -> Interval {
        Self::default_in(value, Space::HEPTATONIC)
    }

    /// Interval in an arbitrary space with the default degree for `value`.
    pub fn in_space(value: i32, space: Space) -> Interval {
        Self::default_in(value, space)
    }

    /// Heptatonic interval with an explicit degree (negative for descending).
    pub fn with_degree(value: i32, degree: i32) -> Result<Interval> {
        Self::with_degree_in(value, degree, Space::HEPTATONIC)
    }

    pub fn with_degree_in(value: i32, degree: i32, space: Space) -> Result<Interval> {
        if degree == 0 {
            return Err(Error::InvalidInterval { value, degree });
        }
        let step = if degree > 0 { degree - 1 } else { degree + 1 };
        Self::from_step(value, step, space)
    }

    /// Validating constructor over raw steps.
    pub(crate) fn from_step(value: i32, step: i32, space: Space) -> Result<Interval> {
        let invalid = || Error::InvalidInterval {
            value,
            degree: degree_of_step(step),
        };
        // A unison-valued interval is always degree 1.
        if value == 0 && step != 0 {
            return Err(invalid());
        }
        if value != 0 && step != 0 && value.signum() != step.signum() {
            return Err(invalid());
        }
        let offset = value.abs() - space.natural_value(step.abs());
        if offset.abs() > MAX_DEGREE_OFFSET {
            return Err(invalid());
        }
        Ok(Interval { value, step, space })
    }

    /// `from_step`, falling back to the default spelling when the step does not fit.
    pub(crate) fn or_default(value: i32, step: i32, space: Space) -> Interval {
        Self::from_step(value, step, space).unwrap_or_else(|_| Self::default_in(value, space))
    }

    fn default_in(value: i32, space: Space) -> Interval {
        Interval {
            value,
            step: space.default_step(value),
            space,
        }
    }

    pub fn value(self) -> i32 {
        self.value
    }

    /// Degree number: 1 for unison, 3 for a third, -3 for a descending third.
    pub fn degree(self) -> i32 {
        degree_of_step(self.step)
    }

    /// Zero-based signed step count.
    pub fn step(self) -> i32 {
        self.step
    }

    pub fn space(self) -> Space {
        self.space
    }

    /// Degree folded into a single octave (1..=degrees per octave).
    pub fn simple_degree(self) -> i32 {
        self.step.abs() % self.space.degrees() + 1
    }

    /// Semitones away from the natural interval of this degree.
    pub fn offset(self) -> i32 {
        self.value.abs() - self.space.natural_value(self.step.abs())
    }

    pub fn quality(self) -> Quality {
        let offset = self.offset();
        let within = self.step.abs() % self.space.degrees();
        let perfect = if self.space.is_regular() {
            matches!(within, 0 | 3 | 4)
        } else {
            within == 0
        };
        if perfect {
            match offset {
                0 => Quality::Perfect,
                1 => Quality::Augmented,
                -1 => Quality::Diminished,
                o if o > 1 => Quality::DoublyAugmented,
                _ => Quality::DoublyDiminished,
            }
        } else {
            match offset {
                0 => Quality::Major,
                -1 => Quality::Minor,
                -2 => Quality::Diminished,
                1 => Quality::Augmented,
                o if o > 1 => Quality::DoublyAugmented,
                _ => Quality::DoublyDiminished,
            }
        }
    }

    /// Shift by a number of semitones. Whole-octave shifts keep the degree
    /// class; any other shift respells with the default degree.
    pub fn shift(self, semitones: i32) -> Interval {
        let value = self.value + semitones;
        let span = self.space.span();
        if semitones % span == 0 {
            let step = self.step + semitones / span * self.space.degrees();
            Self::or_default(value, step, self.space)
        } else {
            Self::default_in(value, self.space)
        }
    }

    /// Reduce into `octaves` octaves, keeping the direction.
    pub fn flatten_within(self, octaves: u32) -> Interval {
        if self.value < 0 {
            return -(-self).flatten_within(octaves);
        }
        let octaves = octaves.max(1) as i32;
        let folds = self.value / (self.space.span() * octaves);
        if folds == 0 {
            return self;
        }
        let value = self.value - folds * octaves * self.space.span();
        let step = self.step - folds * octaves * self.space.degrees();
        Self::or_default(value, step, self.space)
    }

    /// Reduce a compound interval to its simple form within one octave.
    pub fn flatten(self) -> Interval {
        self.flatten_within(1)
    }

    /// The complement that sums with this interval to an octave.
    pub fn invert(self) -> Interval {
        if self.value < 0 {
            return -(-self).invert();
        }
        let simple = self.flatten();
        if simple.value == 0 && simple.step == 0 && self.value > 0 {
            return Interval {
                value: 0,
                step: 0,
                space: self.space,
            };
        }
        Self::or_default(
            self.space.span() - simple.value,
            self.space.degrees() - simple.step,
            self.space,
        )
    }

    /// Just-intonation ratio as (numerator, denominator) in lowest terms.
    pub fn ratio(self) -> (u64, u64) {
        scoring::just_ratio(self.value, self.space.span())
    }

    pub fn consonance(self) -> f64 {
        self.consonance_with(&ConsonanceScale::default())
    }

    pub fn consonance_with(self, scale: &ConsonanceScale) -> f64 {
        scale.rescale(scoring::complexity(self.ratio()))
    }

    /// Short name such as `M3`, `P5` or `d5`.
    pub fn short_name(self) -> String {
        format!("{}{}", self.quality().abbreviation(), self.degree().abs())
    }
}

impl Neg for Interval {
    type Output = Interval;

    fn neg(self) -> Interval {
        Interval {
            value: -self.value,
            step: -self.step,
            space: self.space,
        }
    }
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, rhs: Interval) -> Interval {
        Interval::or_default(self.value + rhs.value, self.step + rhs.step, self.space)
    }
}

impl Sub for Interval {
    type Output = Interval;

    fn sub(self, rhs: Interval) -> Interval {
        self + (-rhs)
    }
}

impl Add<i32> for Interval {
    type Output = Interval;

    fn add(self, rhs: i32) -> Interval {
        self.shift(rhs)
    }
}

impl Sub<i32> for Interval {
    type Output = Interval;

    fn sub(self, rhs: i32) -> Interval {
        self.shift(-rhs)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value < 0 {
            write!(f, "-")?;
        }
        write!(f, "{}", self.short_name())
    }
}
