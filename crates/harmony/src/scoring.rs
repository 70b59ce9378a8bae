//! Consonance and likelihood scores.
//!
//! Consonance is the tuning complexity of a just-intonation ratio,
//! `log2(lcm(numerator, denominator))`, rescaled into 0..=1 between a floor
//! (perfectly consonant) and a ceiling (maximally dissonant). Likelihood is
//! derived from rarity tiers: tier 0 is the most common vocabulary.

use serde::{Deserialize, Serialize};

use crate::factor::FactorSet;

/// 5-limit just ratios for each semitone of the octave.
const JUST_RATIOS: [(u64, u64); 12] = [
    (1, 1),
    (16, 15),
    (9, 8),
    (6, 5),
    (5, 4),
    (4, 3),
    (45, 32),
    (3, 2),
    (8, 5),
    (5, 3),
    (9, 5),
    (15, 8),
];

/// Compound intervals beyond this many octaves share the top ratio.
const MAX_OCTAVES: u32 = 20;

/// Largest denominator used when approximating equal-tempered ratios.
const MAX_APPROX_DENOMINATOR: u64 = 128;

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

pub fn lcm(a: u64, b: u64) -> u64 {
    if a == 0 || b == 0 {
        return 0;
    }
    a / gcd(a, b) * b
}

/// Just ratio for a semitone distance in a space of `span` semitones per octave.
///
/// The 12-semitone space uses the 5-limit table; other spans approximate the
/// equal-tempered ratio with a continued fraction.
pub fn just_ratio(semitones: i32, span: i32) -> (u64, u64) {
    let semitones = semitones.unsigned_abs();
    let span = span.unsigned_abs().max(1);
    if span == 12 {
        let octaves = (semitones / 12).min(MAX_OCTAVES);
        let (num, den) = JUST_RATIOS[(semitones % 12) as usize];
        let num = num << octaves;
        let g = gcd(num, den);
        return (num / g, den / g);
    }
    approximate(
        2f64.powf(f64::from(semitones) / f64::from(span)),
        MAX_APPROX_DENOMINATOR,
    )
}

fn approximate(x: f64, max_denominator: u64) -> (u64, u64) {
    let (mut h0, mut h1) = (0u64, 1u64);
    let (mut k0, mut k1) = (1u64, 0u64);
    let mut frac = x;
    for _ in 0..32 {
        let a = frac.floor();
        let whole = a as u64;
        let h2 = whole * h1 + h0;
        let k2 = whole * k1 + k0;
        if k2 > max_denominator {
            break;
        }
        (h0, h1) = (h1, h2);
        (k0, k1) = (k1, k2);
        let rem = frac - a;
        if rem < 1e-9 {
            break;
        }
        frac = 1.0 / rem;
    }
    if k1 == 0 {
        (x.round() as u64, 1)
    } else {
        let g = gcd(h1, k1).max(1);
        (h1 / g, k1 / g)
    }
}

/// Tuning complexity of a ratio in bits.
pub fn complexity((num, den): (u64, u64)) -> f64 {
    (lcm(num, den).max(1) as f64).log2()
}

/// Bounds used to rescale raw complexity into a 0..=1 consonance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsonanceScale {
    pub floor: f64,
    pub ceiling: f64,
}

impl Default for ConsonanceScale {
    fn default() -> Self {
        Self {
            floor: 0.0,
            ceiling: 12.0,
        }
    }
}

impl ConsonanceScale {
    /// 1.0 at or below the floor, 0.0 at or above the ceiling.
    pub fn rescale(&self, complexity: f64) -> f64 {
        if self.ceiling <= self.floor {
            return if complexity <= self.floor { 1.0 } else { 0.0 };
        }
        (1.0 - (complexity - self.floor) / (self.ceiling - self.floor)).clamp(0.0, 1.0)
    }
}

/// Mean pairwise consonance of a set of semitone values.
///
/// Sets with fewer than two members are perfectly consonant.
pub fn set_consonance(values: &[i32], span: i32, scale: &ConsonanceScale) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, &low) in values.iter().enumerate() {
        for &high in &values[i + 1..] {
            total += scale.rescale(complexity(just_ratio(high - low, span)));
            pairs += 1;
        }
    }
    if pairs == 0 {
        1.0
    } else {
        total / pairs as f64
    }
}

/// Likelihood of a rarity tier: 1.0 for tier 0, falling toward 0 at the cap.
pub fn likelihood(rarity: u32, max_rarity: u32) -> f64 {
    let tiers = f64::from(max_rarity) + 1.0;
    (1.0 - f64::from(rarity) / tiers).clamp(0.0, 1.0)
}

/// Anything with a factor structure and a rarity tier can be scored.
pub trait Structure {
    fn factor_set(&self) -> &FactorSet;

    fn rarity(&self) -> u32;

    fn likelihood(&self, max_rarity: u32) -> f64 {
        likelihood(self.rarity(), max_rarity)
    }

    fn consonance(&self, scale: &ConsonanceScale) -> f64 {
        self.factor_set().consonance(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratios_reduce() {
        assert_eq!(just_ratio(7, 12), (3, 2));
        assert_eq!(just_ratio(12, 12), (2, 1));
        assert_eq!(just_ratio(19, 12), (3, 1));
        assert_eq!(just_ratio(-4, 12), (5, 4));
    }

    #[test]
    fn irregular_span_approximates() {
        assert_eq!(just_ratio(0, 19), (1, 1));
        let (num, den) = just_ratio(19, 19);
        assert_eq!((num, den), (2, 1));
        let (num, den) = just_ratio(11, 19);
        let approx = num as f64 / den as f64;
        assert!((approx - 2f64.powf(11.0 / 19.0)).abs() < 0.01);
    }

    #[test]
    fn rescale_clamps() {
        let scale = ConsonanceScale::default();
        assert_eq!(scale.rescale(0.0), 1.0);
        assert_eq!(scale.rescale(40.0), 0.0);
        assert!((scale.rescale(6.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn degenerate_scale() {
        let scale = ConsonanceScale {
            floor: 3.0,
            ceiling: 3.0,
        };
        assert_eq!(scale.rescale(2.0), 1.0);
        assert_eq!(scale.rescale(4.0), 0.0);
    }

    #[test]
    fn triads_are_more_consonant_than_clusters() {
        let scale = ConsonanceScale::default();
        let major = set_consonance(&[0, 4, 7], 12, &scale);
        let cluster = set_consonance(&[0, 1, 2], 12, &scale);
        assert!(major > cluster);
        assert_eq!(set_consonance(&[0], 12, &scale), 1.0);
    }

    #[test]
    fn likelihood_tiers() {
        assert_eq!(likelihood(0, 6), 1.0);
        assert!(likelihood(1, 6) > likelihood(2, 6));
        assert!(likelihood(6, 6) > 0.0);
        assert_eq!(likelihood(20, 6), 0.0);
    }
}
