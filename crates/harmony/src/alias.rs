//! Alias normalization for chord suffixes and scale names.

use crate::vocabulary::{CHORD_ALIASES, PROTECTED_TOKENS, SCALE_ALIASES};

/// Longest-match alias rewriter.
///
/// Protected tokens are copied through untouched wherever they start, so
/// `maj7` is never split into `maj` + `7` and `no5` never loses its `o`.
#[derive(Debug, Clone)]
pub struct AliasTable {
    aliases: &'static [(&'static str, &'static str)],
    protected: &'static [&'static str],
    whole_name: bool,
}

impl AliasTable {
    /// Token-level aliases for chord suffixes.
    pub fn chords() -> AliasTable {
        AliasTable {
            aliases: CHORD_ALIASES,
            protected: PROTECTED_TOKENS,
            whole_name: false,
        }
    }

    /// Whole-name aliases for scales, compared case-insensitively.
    pub fn scales() -> AliasTable {
        AliasTable {
            aliases: SCALE_ALIASES,
            protected: &[],
            whole_name: true,
        }
    }

    pub fn canonicalize(&self, text: &str) -> String {
        if self.whole_name {
            let lowered = text.trim().to_lowercase();
            return self
                .aliases
                .iter()
                .find(|(alias, _)| *alias == lowered)
                .map_or(lowered, |(_, canonical)| canonical.to_string());
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            if let Some(token) = longest(self.protected.iter().copied(), rest) {
                out.push_str(token);
                rest = &rest[token.len()..];
                continue;
            }
            let alias = self
                .aliases
                .iter()
                .filter(|(alias, _)| rest.starts_with(*alias))
                .max_by_key(|(alias, _)| alias.len());
            if let Some((alias, canonical)) = alias {
                out.push_str(canonical);
                rest = &rest[alias.len()..];
                continue;
            }
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
        out
    }
}

fn longest<'a>(candidates: impl Iterator<Item = &'a str>, text: &str) -> Option<&'a str> {
    candidates
        .filter(|candidate| text.starts_with(*candidate))
        .max_by_key(|candidate| candidate.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chord_aliases() {
        let table = AliasTable::chords();
        assert_eq!(table.canonicalize("M7"), "maj7");
        assert_eq!(table.canonicalize("min7"), "m7");
        assert_eq!(table.canonicalize("-7"), "m7");
        assert_eq!(table.canonicalize("ø7"), "m7b5");
        assert_eq!(table.canonicalize("°7"), "dim7");
        assert_eq!(table.canonicalize("mM7"), "mmaj7");
        assert_eq!(table.canonicalize("6/9"), "69");
        assert_eq!(table.canonicalize("7sus"), "7sus4");
        assert_eq!(table.canonicalize("maj"), "");
    }

    #[test]
    fn protected_tokens_survive() {
        let table = AliasTable::chords();
        assert_eq!(table.canonicalize("maj7"), "maj7");
        assert_eq!(table.canonicalize("maj9#11"), "maj9#11");
        assert_eq!(table.canonicalize("7no5"), "7no5");
        assert_eq!(table.canonicalize("madd9"), "madd9");
        assert_eq!(table.canonicalize("m7b5"), "m7b5");
    }

    #[test]
    fn scale_aliases() {
        let table = AliasTable::scales();
        assert_eq!(table.canonicalize("Ionian"), "major");
        assert_eq!(table.canonicalize(" aeolian "), "natural minor");
        assert_eq!(table.canonicalize("Dorian"), "dorian");
    }
}
