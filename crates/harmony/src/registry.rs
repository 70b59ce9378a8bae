//! Bidirectional name ↔ structure registry for chords and scales.
//!
//! Bootstrap runs in two passes. The first registers every seed in rarity
//! order. The second applies each tweak (and each ordered pair of distinct
//! tweaks) to every modifiable seed and registers novel results under a
//! composed name. A structure keeps the first name it was registered under,
//! and a name always maps to exactly one structure.
//!
//! Tables sit behind `RwLock`s so lookups can run from many threads while
//! names derived at lookup time are registered on the fly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::alias::AliasTable;
use crate::config::TheoryConfig;
use crate::factor::FactorSet;
use crate::interval::Interval;
use crate::modifier::Modifier;
use crate::scoring;
use crate::vocabulary::{self, Seed, Tweak, CHORD_SEEDS, NON_MODIFIABLE, SCALE_SEEDS};
use crate::{Error, Result};

/// A registered (or derived) name with its structure and rarity tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntry {
    pub name: String,
    pub factors: FactorSet,
    pub rarity: u32,
}

/// How an interval list was matched against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Exact semitone match.
    Registered(String),
    /// Matched after adding a perfect fifth the voicing left out.
    ImpliedFifth(String),
    /// Matched after folding compound intervals into one octave.
    Folded(String),
    /// No match. `root_index` is the input position whose rotation reads as
    /// a registered structure, or 0 when none does.
    Unknown { root_index: usize },
}

impl Resolution {
    pub fn name(&self) -> Option<&str> {
        match self {
            Resolution::Registered(name)
            | Resolution::ImpliedFifth(name)
            | Resolution::Folded(name) => Some(name),
            Resolution::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct Table {
    entries: Vec<NamedEntry>,
    by_name: HashMap<String, usize>,
    by_factors: HashMap<FactorSet, usize>,
    by_semitones: HashMap<Vec<i32>, usize>,
    by_folded: HashMap<Vec<i32>, Vec<usize>>,
}

impl Table {
    fn knows(&self, factors: &FactorSet) -> bool {
        self.by_factors.contains_key(factors) || self.by_semitones.contains_key(&factors.all_semitones())
    }

    /// Register a novel (name, structure) pair. Returns false when either side
    /// is already taken.
    fn insert(&mut self, name: String, factors: FactorSet, rarity: u32) -> bool {
        if self.by_name.contains_key(&name) || self.knows(&factors) {
            return false;
        }
        let index = self.entries.len();
        self.by_semitones.insert(factors.all_semitones(), index);
        self.by_folded.entry(factors.folded_semitones()).or_default().push(index);
        self.by_factors.insert(factors.clone(), index);
        self.by_name.insert(name.clone(), index);
        self.entries.push(NamedEntry {
            name,
            factors,
            rarity,
        });
        true
    }

    fn named(&self, name: &str) -> Option<&NamedEntry> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    fn structured(&self, factors: &FactorSet) -> Option<&NamedEntry> {
        self.by_factors.get(factors).map(|&index| &self.entries[index])
    }

    fn semitones(&self, values: &[i32]) -> Option<&NamedEntry> {
        self.by_semitones.get(values).map(|&index| &self.entries[index])
    }

    /// Every entry sharing a folded pitch-class set, most common first.
    fn folded_all(&self, values: &[i32]) -> Vec<&NamedEntry> {
        let mut entries: Vec<&NamedEntry> = self
            .by_folded
            .get(values)
            .into_iter()
            .flatten()
            .map(|&index| &self.entries[index])
            .collect();
        entries.sort_by_key(|entry| entry.rarity);
        entries
    }

    fn folded(&self, values: &[i32]) -> Option<&NamedEntry> {
        self.folded_all(values).into_iter().next()
    }

    /// Snapshot ordered by rarity, then registration order.
    fn by_rarity(&self) -> Vec<NamedEntry> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|entry| entry.rarity);
        entries
    }
}

fn read(lock: &RwLock<Table>) -> RwLockReadGuard<'_, Table> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(lock: &RwLock<Table>) -> RwLockWriteGuard<'_, Table> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn register_seeds(table: &mut Table, seeds: &[Seed]) -> Result<()> {
    let mut ordered: Vec<&Seed> = seeds.iter().collect();
    ordered.sort_by_key(|seed| seed.rarity);
    for seed in ordered {
        let factors = FactorSet::parse(seed.factors)
            .map_err(|err| Error::Registry(format!("seed '{}': {err}", seed.name)))?;
        if let Some(existing) = table.named(seed.name) {
            if existing.factors != factors || existing.rarity != seed.rarity {
                return Err(Error::Registry(format!(
                    "'{}' registered as [{}] and [{}]",
                    seed.name, existing.factors, factors
                )));
            }
            continue;
        }
        if !table.insert(seed.name.to_string(), factors, seed.rarity) {
            debug!(name = seed.name, "seed duplicates a registered structure");
        }
    }
    Ok(())
}

fn try_tweak(table: &mut Table, base: &NamedEntry, tweak: &Tweak, max_rarity: u32) -> Option<NamedEntry> {
    let rarity = base.rarity + tweak.rarity;
    if rarity > max_rarity || !tweak.fits(base.factors.quality()) {
        return None;
    }
    let factors = tweak.modifier.apply(&base.factors).ok()?;
    // No two degrees on one pitch class.
    if factors.folded_semitones().len() < factors.len() {
        return None;
    }
    let name = vocabulary::compose_name(&base.name, tweak.name);
    if !table.insert(name.clone(), factors.clone(), rarity) {
        return None;
    }
    Some(NamedEntry {
        name,
        factors,
        rarity,
    })
}

fn expand(table: &mut Table, max_rarity: u32) -> usize {
    let tweaks = vocabulary::tweaks();
    let bases: Vec<NamedEntry> = table
        .entries
        .iter()
        .filter(|entry| !NON_MODIFIABLE.contains(&entry.name.as_str()))
        .cloned()
        .collect();
    let mut added = 0;
    for base in &bases {
        for first in &tweaks {
            let Some(tweaked) = try_tweak(table, base, first, max_rarity) else {
                continue;
            };
            added += 1;
            for second in tweaks.iter().filter(|t| t.name != first.name) {
                if try_tweak(table, &tweaked, second, max_rarity).is_some() {
                    added += 1;
                }
            }
        }
    }
    added
}

/// Sorted, deduplicated semitone values of an interval list.
fn semitone_key(intervals: &[Interval]) -> Vec<i32> {
    let mut values: Vec<i32> = intervals.iter().map(|iv| iv.value()).collect();
    values.sort_unstable();
    values.dedup();
    values
}

fn fold(values: &[i32]) -> Vec<i32> {
    let mut folded: Vec<i32> = values.iter().map(|v| v.rem_euclid(12)).collect();
    folded.sort_unstable();
    folded.dedup();
    folded
}

fn with_fifth(values: &[i32]) -> Option<Vec<i32>> {
    if !values.contains(&0) || values.contains(&7) {
        return None;
    }
    let mut values = values.to_vec();
    values.push(7);
    values.sort_unstable();
    Some(values)
}

/// Name for a structure derived from `base` by modifier tokens.
fn derived_name(base: &str, tokens: &str) -> String {
    format!("{base}({tokens})")
}

#[derive(Debug)]
pub struct Registry {
    chords: RwLock<Table>,
    scales: RwLock<Table>,
    chord_aliases: AliasTable,
    scale_aliases: AliasTable,
    config: TheoryConfig,
}

impl Registry {
    pub fn build(config: &TheoryConfig) -> Result<Registry> {
        let mut chords = Table::default();
        let mut scales = Table::default();
        register_seeds(&mut chords, CHORD_SEEDS)?;
        register_seeds(&mut scales, SCALE_SEEDS)?;
        let seeded = chords.entries.len();
        let expanded = if config.precache_vocabulary {
            expand(&mut chords, config.max_rarity)
        } else {
            0
        };
        info!(
            seeded,
            expanded,
            scales = scales.entries.len(),
            "harmony registry built"
        );
        Ok(Registry {
            chords: RwLock::new(chords),
            scales: RwLock::new(scales),
            chord_aliases: AliasTable::chords(),
            scale_aliases: AliasTable::scales(),
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &TheoryConfig {
        &self.config
    }

    /// Likelihood of a rarity tier under this registry's rarity cap.
    pub fn likelihood(&self, rarity: u32) -> f64 {
        scoring::likelihood(rarity, self.config.max_rarity)
    }

    pub fn chord_count(&self) -> usize {
        read(&self.chords).entries.len()
    }

    pub fn scale_count(&self) -> usize {
        read(&self.scales).entries.len()
    }

    pub fn chord_name(&self, factors: &FactorSet) -> Option<String> {
        read(&self.chords).structured(factors).map(|entry| entry.name.clone())
    }

    pub fn chord_factors(&self, name: &str) -> Option<FactorSet> {
        read(&self.chords).named(name).map(|entry| entry.factors.clone())
    }

    pub fn chord_entry(&self, name: &str) -> Option<NamedEntry> {
        read(&self.chords).named(name).cloned()
    }

    pub fn chord_entry_for(&self, factors: &FactorSet) -> Option<NamedEntry> {
        read(&self.chords).structured(factors).cloned()
    }

    /// Exact lookup by semitone values above the root.
    pub fn chord_entry_for_intervals(&self, intervals: &[Interval]) -> Option<NamedEntry> {
        read(&self.chords).semitones(&semitone_key(intervals)).cloned()
    }

    /// Every registered chord with the same pitch classes above the root as
    /// `intervals`, whatever its voicing, most common first.
    pub fn chord_entries_for_folded(&self, intervals: &[Interval]) -> Vec<NamedEntry> {
        let folded = fold(&semitone_key(intervals));
        read(&self.chords)
            .folded_all(&folded)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn chord_name_for_intervals(&self, intervals: &[Interval]) -> Option<String> {
        self.chord_entry_for_intervals(intervals).map(|entry| entry.name)
    }

    /// All chord entries, most common first.
    pub fn chord_entries(&self) -> Vec<NamedEntry> {
        read(&self.chords).by_rarity()
    }

    pub fn scale_name(&self, factors: &FactorSet) -> Option<String> {
        read(&self.scales).structured(factors).map(|entry| entry.name.clone())
    }

    pub fn scale_factors(&self, name: &str) -> Option<FactorSet> {
        self.scale_entry(name).map(|entry| entry.factors)
    }

    /// Scale lookup by name or alias, case-insensitively.
    pub fn scale_entry(&self, name: &str) -> Option<NamedEntry> {
        let canonical = self.scale_aliases.canonicalize(name);
        read(&self.scales).named(&canonical).cloned()
    }

    pub fn scale_entry_for(&self, factors: &FactorSet) -> Option<NamedEntry> {
        read(&self.scales).structured(factors).cloned()
    }

    pub fn scale_entry_for_intervals(&self, intervals: &[Interval]) -> Option<NamedEntry> {
        read(&self.scales).semitones(&semitone_key(intervals)).cloned()
    }

    /// All scale entries, most common first.
    pub fn scale_entries(&self) -> Vec<NamedEntry> {
        read(&self.scales).by_rarity()
    }

    pub fn parse_scale_name(&self, text: &str) -> Result<NamedEntry> {
        self.scale_entry(text)
            .ok_or_else(|| Error::parse(text, text.trim()))
    }

    /// Match an interval list above its first member, relaxing step by step:
    /// exact, with an implied fifth, folded into one octave, folded with an
    /// implied fifth.
    pub fn resolve_chord_intervals(&self, intervals: &[Interval]) -> Resolution {
        let table = read(&self.chords);
        let values = semitone_key(intervals);

        // As voiced.
        if let Some(entry) = table.semitones(&values) {
            return Resolution::Registered(entry.name.clone());
        }
        if let Some(entry) = with_fifth(&values).and_then(|v| table.semitones(&v)) {
            return Resolution::ImpliedFifth(entry.name.clone());
        }

        // Within one octave.
        let folded = fold(&values);
        let folded_match = table
            .folded(&folded)
            .or_else(|| with_fifth(&folded).and_then(|v| table.folded(&v)));
        if let Some(entry) = folded_match {
            return Resolution::Folded(entry.name.clone());
        }

        // Nothing above the first note; look for another member that works
        // as a root.
        let root_index = intervals
            .iter()
            .position(|root| {
                let rotated: Vec<i32> = intervals
                    .iter()
                    .map(|iv| iv.value() - root.value())
                    .collect();
                let rotated = fold(&rotated);
                table.folded(&rotated).is_some()
                    || with_fifth(&rotated).is_some_and(|v| table.folded(&v).is_some())
            })
            .unwrap_or(0);
        Resolution::Unknown { root_index }
    }

    /// Resolve a chord suffix (the part after the root): exact name, alias
    /// form, then a registered base followed by modifier tokens.
    pub fn parse_chord_suffix(&self, suffix: &str) -> Result<NamedEntry> {
        if let Some(entry) = self.chord_entry(suffix) {
            return Ok(entry);
        }
        let canonical = self.chord_aliases.canonicalize(suffix);
        if let Some(entry) = self.chord_entry(&canonical) {
            return Ok(entry);
        }
        self.derive_from_suffix(suffix, &canonical)
    }

    fn derive_from_suffix(&self, original: &str, canonical: &str) -> Result<NamedEntry> {
        // Longest registered prefix first, then the commoner one.
        let mut bases: Vec<NamedEntry> = read(&self.chords)
            .entries
            .iter()
            .filter(|entry| canonical.starts_with(entry.name.as_str()))
            .cloned()
            .collect();
        bases.sort_by(|a, b| b.name.len().cmp(&a.name.len()).then(a.rarity.cmp(&b.rarity)));

        // The first base whose remainder parses as tokens wins; otherwise
        // report the first failure.
        let mut failure = None;
        for base in bases {
            let rest = &canonical[base.name.len()..];
            let applied = Modifier::parse_tokens(rest, &base.factors)
                .and_then(|modifier| Ok((modifier.apply(&base.factors)?, modifier.size())));
            match applied {
                Ok((factors, edits)) => {
                    let rarity = base.rarity + edits as u32;
                    return Ok(self.adopt(canonical.to_string(), factors, rarity));
                }
                Err(err) => {
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }
        Err(match failure {
            Some(Error::Parse { fragment, .. }) => Error::parse(original, fragment),
            Some(err) => err,
            None => Error::parse(original, original),
        })
    }

    /// Name an arbitrary structure: the registered name when there is one,
    /// otherwise the nearest registered relative plus modifier tokens.
    pub fn name_chord(&self, factors: &FactorSet) -> NamedEntry {
        if let Some(entry) = self.chord_entry_for(factors) {
            return entry;
        }
        let nearest = {
            let table = read(&self.chords);
            table
                .entries
                .iter()
                .map(|entry| (entry, factors.distance(&entry.factors)))
                .min_by_key(|(entry, modifier)| (modifier.size(), entry.rarity))
                .map(|(entry, modifier)| (entry.clone(), modifier))
        };
        match nearest {
            Some((base, modifier)) => {
                let name = derived_name(&base.name, &modifier.describe(&base.factors));
                let rarity = (base.rarity + modifier.size() as u32).min(self.config.max_rarity);
                self.adopt(name, factors.clone(), rarity)
            }
            None => NamedEntry {
                name: format!("({factors})"),
                factors: factors.clone(),
                rarity: self.config.max_rarity,
            },
        }
    }

    /// Register a name at runtime. Returns false when dynamic caching is off
    /// or either the name or the structure is already known.
    pub fn register_chord(&self, name: &str, factors: FactorSet, rarity: u32) -> bool {
        if !self.config.dynamic_caching {
            return false;
        }
        let registered = write(&self.chords).insert(name.to_string(), factors, rarity);
        if registered {
            debug!(name, rarity, "registered derived chord name");
        }
        registered
    }

    /// Return the registered entry for `factors` if there is one; otherwise
    /// remember the derived name (when caching) and return it.
    fn adopt(&self, name: String, factors: FactorSet, rarity: u32) -> NamedEntry {
        if let Some(entry) = self.chord_entry_for(&factors) {
            return entry;
        }
        self.register_chord(&name, factors.clone(), rarity);
        NamedEntry {
            name,
            factors,
            rarity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        Registry::build(&TheoryConfig::default()).unwrap()
    }

    fn set(text: &str) -> FactorSet {
        FactorSet::parse(text).unwrap()
    }

    fn intervals(values: &[i32]) -> Vec<Interval> {
        values.iter().map(|&v| Interval::new(v)).collect()
    }

    #[test]
    fn seeds_resolve_both_ways() {
        let registry = registry();
        assert_eq!(registry.chord_name(&set("1,3,5,b7")).as_deref(), Some("7"));
        assert_eq!(registry.chord_factors("m7"), Some(set("1,b3,5,b7")));
        assert_eq!(registry.scale_name(&set("1,2,3,4,5,6,7")).as_deref(), Some("major"));
        assert_eq!(registry.scale_entry("Aeolian").unwrap().name, "natural minor");
    }

    #[test]
    fn tweaks_expand_vocabulary() {
        let registry = registry();
        assert!(registry.chord_count() > CHORD_SEEDS.len());
        assert_eq!(registry.chord_factors("7b9"), Some(set("1,3,5,b7,b9")));
        assert_eq!(registry.chord_factors("(b5)"), Some(set("1,3,b5")));
        assert_eq!(registry.chord_factors("9sus4"), Some(set("1,4,5,b7,9")));
        assert!(registry.chord_factors("msus4").is_none());
    }

    #[test]
    fn pair_tweaks_use_second_tweak_name() {
        let registry = registry();
        assert_eq!(registry.chord_factors("7b9#11"), Some(set("1,3,5,b7,b9,#11")));
    }

    #[test]
    fn tweaks_never_stack_one_pitch_class() {
        let registry = registry();
        for entry in registry.chord_entries() {
            let factors = &entry.factors;
            assert_eq!(factors.folded_semitones().len(), factors.len(), "{}", entry.name);
        }
        for name in ["(b5)#11", "7b5#11", "7b13#5", "aug7sus4b13"] {
            assert!(registry.chord_factors(name).is_none(), "{name}");
        }
    }

    #[test]
    fn folded_lookup_lists_every_voicing() {
        let registry = registry();
        let names: Vec<String> = registry
            .chord_entries_for_folded(&intervals(&[0, 4, 7, 21]))
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names.first().map(String::as_str), Some("6"));
        assert!(names.iter().any(|name| name == "add13"));
        assert!(registry.chord_entries_for_folded(&intervals(&[0, 1, 2])).is_empty());
    }

    #[test]
    fn seeds_only_without_precache() {
        let config = TheoryConfig {
            precache_vocabulary: false,
            ..TheoryConfig::default()
        };
        let registry = Registry::build(&config).unwrap();
        assert_eq!(registry.chord_count(), CHORD_SEEDS.len());
    }

    #[test]
    fn registered_names_round_trip() {
        let registry = registry();
        for entry in registry.chord_entries() {
            let factors = registry.chord_factors(&entry.name).unwrap();
            assert_eq!(registry.chord_name(&factors), Some(entry.name.clone()));
        }
    }

    #[test]
    fn resolution_chain() {
        let registry = registry();
        assert_eq!(
            registry.resolve_chord_intervals(&intervals(&[0, 4, 7, 11])),
            Resolution::Registered("maj7".into())
        );
        assert_eq!(
            registry.resolve_chord_intervals(&intervals(&[0, 4])),
            Resolution::ImpliedFifth("".into())
        );
        assert_eq!(
            registry.resolve_chord_intervals(&intervals(&[0, 16, 19])),
            Resolution::Folded("".into())
        );
        assert_eq!(
            registry.resolve_chord_intervals(&intervals(&[0, 1, 2, 3])),
            Resolution::Unknown { root_index: 0 }
        );
    }

    #[test]
    fn unknown_reports_rotation_root() {
        let registry = registry();
        // E, G, C: no reading with E as the root.
        let input = intervals(&[0, 3, 8]);
        let Resolution::Unknown { root_index } = registry.resolve_chord_intervals(&input) else {
            panic!("E-G-C should not resolve above E");
        };
        assert_ne!(root_index, 0);
        let root = input[root_index].value();
        let rotated: Vec<Interval> = input
            .iter()
            .map(|iv| Interval::new((iv.value() - root).rem_euclid(12)))
            .collect();
        assert!(registry.resolve_chord_intervals(&rotated).name().is_some());
    }

    #[test]
    fn suffix_parsing() {
        let registry = registry();
        assert_eq!(registry.parse_chord_suffix("M7").unwrap().name, "maj7");
        assert_eq!(registry.parse_chord_suffix("6/9").unwrap().name, "69");
        let derived = registry.parse_chord_suffix("maj7(#11,no5)").unwrap();
        assert_eq!(derived.factors, set("1,3,7,#11"));
        assert_eq!(registry.parse_chord_suffix("7#5").unwrap().name, "aug7");
    }

    #[test]
    fn suffix_error_names_fragment() {
        let registry = registry();
        match registry.parse_chord_suffix("maj7zz") {
            Err(Error::Parse { input, fragment }) => {
                assert_eq!(input, "maj7zz");
                assert_eq!(fragment, "zz");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn derived_names_are_cached() {
        let registry = registry();
        let before = registry.chord_count();
        let factors = set("1,3,7,#11,13");
        let named = registry.name_chord(&factors);
        assert_eq!(registry.chord_count(), before + 1);
        assert_eq!(registry.chord_name(&factors), Some(named.name.clone()));
        assert_eq!(registry.parse_chord_suffix(&named.name).unwrap().factors, factors);
    }

    #[test]
    fn caching_can_be_disabled() {
        let config = TheoryConfig {
            dynamic_caching: false,
            ..TheoryConfig::default()
        };
        let registry = Registry::build(&config).unwrap();
        let before = registry.chord_count();
        let factors = set("1,3,7,#11,13");
        let first = registry.name_chord(&factors);
        let second = registry.name_chord(&factors);
        assert_eq!(first, second);
        assert_eq!(registry.chord_count(), before);
        assert_eq!(registry.parse_chord_suffix(&first.name).unwrap().factors, factors);
    }

    #[test]
    fn conflicting_seed_is_an_error() {
        let mut table = Table::default();
        let seeds = [
            Seed { name: "x", factors: "1,3,5", rarity: 0 },
            Seed { name: "x", factors: "1,b3,5", rarity: 0 },
        ];
        assert!(matches!(register_seeds(&mut table, &seeds), Err(Error::Registry(_))));
    }
}
