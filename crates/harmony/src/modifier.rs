//! Composable edits over factor sets.
//!
//! A modifier checks its expectations against the input, then removes,
//! adds, sets and shifts degrees in that order. Applying never mutates the
//! input set.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::factor::{parse_factor_token, FactorSet};
use crate::note::accidental_string;
use crate::{Error, Result};

/// What a modifier requires of a degree before it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    Present,
    Absent,
    Offset(i8),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifier {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    remove: BTreeSet<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    add: BTreeMap<u8, i8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    make: BTreeMap<u8, i8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    modify: BTreeMap<u8, i8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    verify: BTreeMap<u8, Expect>,
}

fn unmet(set: &FactorSet, degree: u8, requirement: &str) -> Error {
    Error::InvalidFactor(format!("degree {degree} must be {requirement} in [{set}]"))
}

impl Modifier {
    pub fn new() -> Modifier {
        Modifier::default()
    }

    /// Drop a degree; it must be present.
    pub fn remove(mut self, degree: u8) -> Modifier {
        self.remove.insert(degree);
        self
    }

    /// Add a degree; it must be absent.
    pub fn add(mut self, degree: u8, offset: i8) -> Modifier {
        self.add.insert(degree, offset);
        self
    }

    /// Set a degree to an offset whether or not it is present.
    pub fn make(mut self, degree: u8, offset: i8) -> Modifier {
        self.make.insert(degree, offset);
        self
    }

    /// Shift a present degree by `delta`.
    pub fn modify(mut self, degree: u8, delta: i8) -> Modifier {
        self.modify.insert(degree, delta);
        self
    }

    pub fn verify(mut self, degree: u8, expect: Expect) -> Modifier {
        self.verify.insert(degree, expect);
        self
    }

    /// True when the modifier would not change anything.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of individual edits.
    pub fn size(&self) -> usize {
        self.remove.len() + self.add.len() + self.make.len() + self.modify.len()
    }

    /// Check explicit and implicit expectations against `set`.
    pub fn check(&self, set: &FactorSet) -> Result<()> {
        for (&degree, &expect) in &self.verify {
            let actual = set.get(degree);
            let (met, requirement) = match expect {
                Expect::Present => (actual.is_some(), "present".to_string()),
                Expect::Absent => (actual.is_none(), "absent".to_string()),
                Expect::Offset(offset) => (
                    actual == Some(offset),
                    format!("{}{degree}", accidental_string(i32::from(offset))),
                ),
            };
            if !met {
                return Err(unmet(set, degree, &requirement));
            }
        }
        if let Some(&degree) = self.remove.iter().find(|&&d| !set.contains(d)) {
            return Err(unmet(set, degree, "present"));
        }
        if let Some(&degree) = self.add.keys().find(|&&d| set.contains(d)) {
            return Err(unmet(set, degree, "absent"));
        }
        if let Some(&degree) = self.modify.keys().find(|&&d| !set.contains(d)) {
            return Err(unmet(set, degree, "present"));
        }
        Ok(())
    }

    pub fn accepts(&self, set: &FactorSet) -> bool {
        self.check(set).is_ok()
    }

    pub fn apply(&self, set: &FactorSet) -> Result<FactorSet> {
        self.check(set)?;
        let mut factors = set.factors().clone();
        for degree in &self.remove {
            factors.remove(degree);
        }
        for (&degree, &offset) in self.add.iter().chain(&self.make) {
            factors.insert(degree, offset);
        }
        for (degree, &delta) in &self.modify {
            if let Some(offset) = factors.get_mut(degree) {
                *offset = offset.saturating_add(delta);
            }
        }
        FactorSet::from_parts(set.space(), factors, set.chromatic().clone())
    }

    /// Render as comma-separated tokens (`b9`, `add11`, `no5`) relative to `base`.
    pub fn describe(&self, base: &FactorSet) -> String {
        let mut tokens = Vec::with_capacity(self.size());
        for (&degree, &delta) in &self.modify {
            let offset = i32::from(base.get(degree).unwrap_or(0)) + i32::from(delta);
            tokens.push(format!("{}{degree}", accidental_string(offset)));
        }
        for (&degree, &offset) in &self.make {
            tokens.push(format!("{}{degree}", accidental_string(i32::from(offset))));
        }
        for (&degree, &offset) in &self.add {
            if offset == 0 {
                tokens.push(format!("add{degree}"));
            } else {
                tokens.push(format!("{}{degree}", accidental_string(i32::from(offset))));
            }
        }
        for degree in &self.remove {
            tokens.push(format!("no{degree}"));
        }
        tokens.join(",")
    }

    /// Parse modifier tokens against a base set. A bare factor token sets
    /// the degree when the base has it and adds it otherwise.
    pub fn parse_tokens(text: &str, base: &FactorSet) -> Result<Modifier> {
        let mut modifier = Modifier::new();
        for token in split_tokens(text)? {
            let bad = || Error::parse(text, token);
            if let Some(rest) = token.strip_prefix("omit").or_else(|| token.strip_prefix("no")) {
                let degree: u8 = rest.parse().map_err(|_| bad())?;
                modifier = modifier.remove(degree);
            } else if let Some(rest) = token.strip_prefix("add") {
                let (degree, offset) = parse_factor_token(rest).ok_or_else(bad)?;
                modifier = modifier.add(degree, offset);
            } else {
                let (degree, offset) = parse_factor_token(token).ok_or_else(bad)?;
                modifier = if base.contains(degree) {
                    modifier.make(degree, offset)
                } else {
                    modifier.add(degree, offset)
                };
            }
        }
        Ok(modifier)
    }
}

/// Split `b9#11`, `(b9,#11)` or `add9 no5` into individual tokens.
fn split_tokens(text: &str) -> Result<Vec<&str>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        if matches!(bytes[pos], b',' | b'(' | b')' | b' ') {
            pos += 1;
            continue;
        }
        let start = pos;
        let rest = &text[pos..];
        if rest.starts_with("add") {
            pos += 3;
        } else if rest.starts_with("omit") {
            pos += 4;
        } else if rest.starts_with("no") {
            pos += 2;
        }
        while let Some(c) = text[pos..].chars().next() {
            if matches!(c, 'b' | '#' | '♭' | '♯') {
                pos += c.len_utf8();
            } else {
                break;
            }
        }
        let digits = text[pos..].bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            let end = text[start..]
                .find([',', '(', ')', ' '])
                .map_or(text.len(), |offset| start + offset);
            let fragment = if end > start { &text[start..end] } else { &text[start..] };
            return Err(Error::parse(text, fragment));
        }
        pos += digits;
        tokens.push(&text[start..pos]);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(text: &str) -> FactorSet {
        FactorSet::parse(text).unwrap()
    }

    #[test]
    fn add_seventh() {
        let major = set("1,3,5");
        let dominant = Modifier::new().add(7, -1).apply(&major).unwrap();
        assert_eq!(dominant, set("1,3,5,b7"));
        assert_eq!(major, set("1,3,5"));
    }

    #[test]
    fn reapplying_an_add_fails() {
        let add_seventh = Modifier::new().add(7, -1);
        let dominant = add_seventh.apply(&set("1,3,5")).unwrap();
        assert!(matches!(add_seventh.apply(&dominant), Err(Error::InvalidFactor(_))));
    }

    #[test]
    fn verification_gates_application() {
        let suspend = Modifier::new()
            .verify(3, Expect::Offset(0))
            .verify(4, Expect::Absent)
            .remove(3)
            .add(4, 0);
        assert_eq!(suspend.apply(&set("1,3,5")).unwrap(), set("1,4,5"));
        assert!(!suspend.accepts(&set("1,b3,5")));
        assert!(!suspend.accepts(&set("1,3,4,5")));
    }

    #[test]
    fn removal_requires_presence() {
        assert!(Modifier::new().remove(7).apply(&set("1,3,5")).is_err());
        assert!(Modifier::new().modify(9, 1).apply(&set("1,3,5")).is_err());
    }

    #[test]
    fn make_overrides_or_inserts() {
        let modifier = Modifier::new().make(5, 1).make(9, -1);
        assert_eq!(modifier.apply(&set("1,3,5")).unwrap(), set("1,3,#5,b9"));
    }

    #[test]
    fn describe_and_parse_agree() {
        let base = set("1,3,5,7");
        let modifier = Modifier::new().remove(5).add(11, 1).add(9, 0);
        let text = modifier.describe(&base);
        assert_eq!(text, "add9,#11,no5");
        let parsed = Modifier::parse_tokens(&text, &base).unwrap();
        assert_eq!(parsed.apply(&base).unwrap(), modifier.apply(&base).unwrap());
    }

    #[test]
    fn parse_run_together_tokens() {
        let base = set("1,3,5,b7");
        let modifier = Modifier::parse_tokens("b9#11", &base).unwrap();
        assert_eq!(modifier.apply(&base).unwrap(), set("1,3,5,b7,b9,#11"));
        let flat_five = Modifier::parse_tokens("(b5)", &base).unwrap();
        assert_eq!(flat_five.apply(&base).unwrap(), set("1,3,b5,b7"));
    }

    #[test]
    fn parse_reports_bad_token() {
        let base = set("1,3,5");
        match Modifier::parse_tokens("b9,sharp11", &base) {
            Err(Error::Parse { fragment, .. }) => assert_eq!(fragment, "sharp11"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
