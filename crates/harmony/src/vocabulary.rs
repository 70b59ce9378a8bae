//! Built-in vocabulary: rarity-ranked seed names and the tweaks used to
//! grow the chord vocabulary at bootstrap.
//!
//! Rarity tiers run from 0 (everyday) upward. Seeds are registered in tier
//! order, so the first name recorded for a structure is the most common one.

use crate::factor::ChordQuality;
use crate::modifier::{Expect, Modifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed {
    pub name: &'static str,
    pub factors: &'static str,
    pub rarity: u32,
}

const fn seed(name: &'static str, factors: &'static str, rarity: u32) -> Seed {
    Seed {
        name,
        factors,
        rarity,
    }
}

pub static CHORD_SEEDS: &[Seed] = &[
    seed("", "1,3,5", 0),
    seed("m", "1,b3,5", 0),
    seed("7", "1,3,5,b7", 0),
    seed("maj7", "1,3,5,7", 0),
    seed("m7", "1,b3,5,b7", 0),
    seed("dim", "1,b3,b5", 1),
    seed("aug", "1,3,#5", 1),
    seed("sus4", "1,4,5", 1),
    seed("sus2", "1,2,5", 1),
    seed("5", "1,5", 1),
    seed("6", "1,3,5,6", 1),
    seed("m6", "1,b3,5,6", 1),
    seed("9", "1,3,5,b7,9", 1),
    seed("maj9", "1,3,5,7,9", 1),
    seed("m9", "1,b3,5,b7,9", 1),
    seed("add9", "1,3,5,9", 1),
    seed("dim7", "1,b3,b5,bb7", 1),
    seed("m7b5", "1,b3,b5,b7", 1),
    seed("7sus4", "1,4,5,b7", 2),
    seed("mmaj7", "1,b3,5,7", 2),
    seed("69", "1,3,5,6,9", 2),
    seed("11", "1,3,5,b7,9,11", 2),
    seed("13", "1,3,5,b7,9,13", 2),
    seed("m11", "1,b3,5,b7,9,11", 2),
    seed("maj13", "1,3,5,7,9,13", 2),
    seed("aug7", "1,3,#5,b7", 2),
    seed("madd9", "1,b3,5,9", 2),
    seed("m13", "1,b3,5,b7,9,11,13", 3),
    seed("maj11", "1,3,5,7,9,11", 3),
    seed("augmaj7", "1,3,#5,7", 3),
    seed("m69", "1,b3,5,6,9", 3),
    seed("7sus2", "1,2,5,b7", 3),
    seed("mmaj9", "1,b3,5,7,9", 3),
];

pub static SCALE_SEEDS: &[Seed] = &[
    seed("major", "1,2,3,4,5,6,7", 0),
    seed("minor", "1,2,b3,4,5,b6,b7,(6),(7)", 0),
    seed("natural minor", "1,2,b3,4,5,b6,b7", 1),
    seed("harmonic minor", "1,2,b3,4,5,b6,7", 1),
    seed("melodic minor", "1,2,b3,4,5,6,7", 1),
    seed("dorian", "1,2,b3,4,5,6,b7", 1),
    seed("mixolydian", "1,2,3,4,5,6,b7", 1),
    seed("major pentatonic", "1,2,3,5,6", 1),
    seed("minor pentatonic", "1,b3,4,5,b7", 1),
    seed("phrygian", "1,b2,b3,4,5,b6,b7", 2),
    seed("lydian", "1,2,3,#4,5,6,7", 2),
    seed("blues", "1,b3,4,(b5),5,b7", 2),
    seed("harmonic major", "1,2,3,4,5,b6,7", 2),
    seed("locrian", "1,b2,b3,4,b5,b6,b7", 3),
    seed("whole tone", "1,2,3,#4,#5,b7", 3),
    seed("bebop dominant", "1,2,3,4,5,6,b7,(7)", 3),
    seed("phrygian dominant", "1,b2,3,4,5,b6,b7", 3),
    seed("lydian dominant", "1,2,3,#4,5,6,b7", 3),
    seed("super locrian", "1,b2,b3,b4,b5,b6,b7", 3),
    seed("octatonic", "1,2,3,4,5,6,7,8", 4),
    seed("half-whole diminished", "1,b2,3,b4,5,b6,7,b8", 4),
    seed("hungarian minor", "1,2,b3,#4,5,b6,7", 4),
];

/// Seed names never used as a base for tweak expansion.
pub static NON_MODIFIABLE: &[&str] = &["5", "dim", "aug", "dim7"];

/// A named edit applied to seed chords during expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Tweak {
    pub name: &'static str,
    pub rarity: u32,
    /// Replaces the third, so it is skipped on minor and diminished bases.
    pub suspends: bool,
    pub modifier: Modifier,
}

impl Tweak {
    fn new(name: &'static str, rarity: u32, modifier: Modifier) -> Tweak {
        Tweak {
            name,
            rarity,
            suspends: false,
            modifier,
        }
    }

    fn suspension(name: &'static str, rarity: u32, modifier: Modifier) -> Tweak {
        Tweak {
            suspends: true,
            ..Tweak::new(name, rarity, modifier)
        }
    }

    /// Whether this tweak may be tried on a base of the given quality.
    pub fn fits(&self, quality: ChordQuality) -> bool {
        !(self.suspends && matches!(quality, ChordQuality::Minor | ChordQuality::Diminished))
    }
}

/// Tweaks in the order expansion tries them.
pub fn tweaks() -> Vec<Tweak> {
    use Expect::{Absent, Offset, Present};
    vec![
        Tweak::suspension(
            "sus4",
            1,
            Modifier::new()
                .verify(3, Offset(0))
                .verify(4, Absent)
                .verify(11, Absent)
                .remove(3)
                .add(4, 0),
        ),
        Tweak::suspension(
            "sus2",
            2,
            Modifier::new()
                .verify(3, Offset(0))
                .verify(2, Absent)
                .verify(9, Absent)
                .remove(3)
                .add(2, 0),
        ),
        Tweak::new("add9", 1, Modifier::new().verify(2, Absent).add(9, 0)),
        Tweak::new("b5", 2, Modifier::new().verify(5, Offset(0)).modify(5, -1)),
        Tweak::new(
            "#5",
            2,
            Modifier::new()
                .verify(5, Offset(0))
                .verify(3, Offset(0))
                .modify(5, 1),
        ),
        Tweak::new(
            "b9",
            2,
            Modifier::new().verify(2, Absent).verify(7, Present).add(9, -1),
        ),
        Tweak::new(
            "#9",
            3,
            Modifier::new()
                .verify(2, Absent)
                .verify(3, Offset(0))
                .verify(7, Present)
                .add(9, 1),
        ),
        Tweak::new("add11", 2, Modifier::new().verify(4, Absent).add(11, 0)),
        Tweak::new(
            "#11",
            2,
            Modifier::new().verify(4, Absent).verify(5, Offset(0)).add(11, 1),
        ),
        Tweak::new(
            "b13",
            3,
            Modifier::new().verify(6, Absent).verify(7, Present).add(13, -1),
        ),
        Tweak::new("add13", 3, Modifier::new().verify(6, Absent).add(13, 0)),
        Tweak::new(
            "no5",
            3,
            Modifier::new()
                .verify(5, Offset(0))
                .verify(3, Present)
                .verify(7, Present)
                .remove(5),
        ),
        Tweak::new(
            "no3",
            4,
            Modifier::new().verify(3, Present).verify(7, Present).remove(3),
        ),
    ]
}

/// Name for `base` with `tweak` applied. Accidental tweaks on the bare major
/// triad are parenthesized so `C(b5)` is not read as a `Cb` root.
pub fn compose_name(base: &str, tweak: &str) -> String {
    if base.is_empty() && tweak.starts_with(['b', '#']) {
        format!("({tweak})")
    } else {
        format!("{base}{tweak}")
    }
}

/// Chord-suffix aliases mapped to canonical names.
pub static CHORD_ALIASES: &[(&str, &str)] = &[
    ("maj", ""),
    ("major", ""),
    ("M", ""),
    ("Maj", ""),
    ("M7", "maj7"),
    ("Maj7", "maj7"),
    ("major7", "maj7"),
    ("Δ", "maj7"),
    ("Δ7", "maj7"),
    ("M9", "maj9"),
    ("Δ9", "maj9"),
    ("min", "m"),
    ("minor", "m"),
    ("mi", "m"),
    ("-", "m"),
    ("o", "dim"),
    ("°", "dim"),
    ("o7", "dim7"),
    ("°7", "dim7"),
    ("+", "aug"),
    ("augmented", "aug"),
    ("ø", "m7b5"),
    ("ø7", "m7b5"),
    ("sus", "sus4"),
    ("6/9", "69"),
    ("mM7", "mmaj7"),
    ("m(maj7)", "mmaj7"),
    ("minmaj7", "mmaj7"),
    ("♭", "b"),
    ("♯", "#"),
];

/// Tokens kept whole before alias rewriting at any position.
pub static PROTECTED_TOKENS: &[&str] = &[
    "maj7", "maj9", "maj11", "maj13", "sus2", "sus4", "add9", "add11", "add13", "dim7", "m7b5",
    "mmaj7", "mmaj9", "no", "omit",
];

pub static SCALE_ALIASES: &[(&str, &str)] = &[
    ("ionian", "major"),
    ("maj", "major"),
    ("aeolian", "natural minor"),
    ("min", "minor"),
    ("m", "minor"),
    ("diminished", "octatonic"),
    ("whole-half diminished", "octatonic"),
    ("altered", "super locrian"),
    ("pentatonic", "major pentatonic"),
    ("mixo", "mixolydian"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factor::FactorSet;
    use std::collections::HashSet;

    #[test]
    fn seeds_parse_and_are_unique() {
        for seeds in [CHORD_SEEDS, SCALE_SEEDS] {
            let mut names = HashSet::new();
            for seed in seeds {
                assert!(FactorSet::parse(seed.factors).is_ok(), "{}", seed.name);
                assert!(names.insert(seed.name), "duplicate {}", seed.name);
            }
        }
    }

    #[test]
    fn tweak_names_are_unique() {
        let tweaks = tweaks();
        let names: HashSet<&str> = tweaks.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), tweaks.len());
    }

    #[test]
    fn suspensions_skip_minor() {
        let sus4 = &tweaks()[0];
        assert!(sus4.fits(ChordQuality::Major));
        assert!(!sus4.fits(ChordQuality::Minor));
        assert!(tweaks()[2].fits(ChordQuality::Minor));
    }

    #[test]
    fn names_compose() {
        assert_eq!(compose_name("", "b5"), "(b5)");
        assert_eq!(compose_name("", "sus4"), "sus4");
        assert_eq!(compose_name("7", "b9"), "7b9");
    }
}
