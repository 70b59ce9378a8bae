//! Chord progressions from chord symbols or roman numerals.

use harmony::{Chord, Error, Key, Registry, Result};

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c == ',' || c == '|')
        .filter(|token| !token.is_empty())
}

/// Parse `Am C D F`, `Am, C | D`, and so on.
pub fn parse_progression(registry: &Registry, text: &str) -> Result<Vec<Chord>> {
    tokens(text).map(|token| Chord::parse(registry, token)).collect()
}

/// Parse roman numerals relative to `key`: `I vi ii7 V7`, `bVII`, `vii°`, `iiø7`.
pub fn parse_numerals(registry: &Registry, key: &Key, text: &str) -> Result<Vec<Chord>> {
    tokens(text)
        .map(|token| parse_numeral(registry, key, token))
        .collect()
}

const NUMERALS: [(&str, u8); 7] = [
    ("vii", 7),
    ("iii", 3),
    ("vi", 6),
    ("iv", 4),
    ("ii", 2),
    ("v", 5),
    ("i", 1),
];

/// One numeral: accidentals, the degree (upper case major, lower case minor),
/// an optional `°`/`o`, `ø` or `+` quality mark, then any chord suffix.
pub fn parse_numeral(registry: &Registry, key: &Key, token: &str) -> Result<Chord> {
    let mut rest = token;
    let mut accidental: i8 = 0;
    while let Some(c) = rest.chars().next() {
        let delta = match c {
            'b' | '♭' => -1,
            '#' | '♯' => 1,
            _ => break,
        };
        accidental = accidental.saturating_add(delta);
        rest = &rest[c.len_utf8()..];
    }

    let lowered = rest.to_ascii_lowercase();
    let (numeral, degree) = NUMERALS
        .iter()
        .find(|(numeral, _)| lowered.starts_with(*numeral))
        .copied()
        .ok_or_else(|| Error::parse(token, rest))?;
    let (letters, mut rest) = rest.split_at(numeral.len());
    let minor = if letters.chars().all(|c| c.is_ascii_uppercase()) {
        false
    } else if letters.chars().all(|c| c.is_ascii_lowercase()) {
        true
    } else {
        return Err(Error::parse(token, letters));
    };

    let mut mark = None;
    if let Some(c) = rest.chars().next().filter(|&c| matches!(c, '°' | 'o' | 'ø' | '+')) {
        mark = Some(c);
        rest = &rest[c.len_utf8()..];
    }
    let suffix = match (mark, rest) {
        (Some('°' | 'o'), "7") => "dim7".to_string(),
        (Some('°' | 'o'), ext) => format!("dim{ext}"),
        (Some('ø'), "" | "7") => "m7b5".to_string(),
        (Some('+'), ext) => format!("aug{ext}"),
        (Some(_), ext) => return Err(Error::parse(token, ext)),
        (None, ext) if minor => format!("m{ext}"),
        (None, ext) => ext.to_string(),
    };

    let entry = registry
        .parse_chord_suffix(&suffix)
        .map_err(|_| Error::parse(token, rest))?;
    let root = key
        .degree_note(degree)
        .ok_or_else(|| Error::parse(token, letters))?
        .alter(accidental);
    Ok(Chord::from_entry(entry).with_root(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use harmony::TheoryConfig;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        Registry::build(&TheoryConfig::default()).unwrap()
    }

    fn symbols(chords: &[Chord]) -> Vec<String> {
        chords.iter().map(Chord::symbol).collect()
    }

    #[test]
    fn chord_lists() {
        let registry = registry();
        let chords = parse_progression(&registry, "Am, C | Dm7  G7/B").unwrap();
        assert_eq!(symbols(&chords), ["Am", "C", "Dm7", "G7/B"]);
        assert!(parse_progression(&registry, "").unwrap().is_empty());
    }

    #[test]
    fn bad_chord_names_the_token() {
        let registry = registry();
        match parse_progression(&registry, "C Hm G") {
            Err(Error::Parse { input, .. }) => assert_eq!(input, "Hm"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn numerals_in_major() {
        let registry = registry();
        let key = Key::parse(&registry, "C major").unwrap();
        let chords = parse_numerals(&registry, &key, "I vi ii7 V7 bVII IVmaj7").unwrap();
        assert_eq!(symbols(&chords), ["C", "Am", "Dm7", "G7", "Bb", "Fmaj7"]);
    }

    #[test]
    fn numeral_quality_marks() {
        let registry = registry();
        let key = Key::parse(&registry, "C major").unwrap();
        let chords = parse_numerals(&registry, &key, "vii° viiø7 viio7 III+").unwrap();
        assert_eq!(symbols(&chords), ["Bdim", "Bm7b5", "Bdim7", "Eaug"]);
    }

    #[test]
    fn numerals_follow_the_key() {
        let registry = registry();
        let key = Key::parse(&registry, "A minor").unwrap();
        let chords = parse_numerals(&registry, &key, "i iv V7 VI").unwrap();
        assert_eq!(symbols(&chords), ["Am", "Dm", "E7", "F"]);
    }

    #[test]
    fn bad_numerals() {
        let registry = registry();
        let key = Key::parse(&registry, "C major").unwrap();
        assert!(parse_numeral(&registry, &key, "X").is_err());
        assert!(parse_numeral(&registry, &key, "Ii").is_err());
        assert!(parse_numeral(&registry, &key, "Vbogus").is_err());
    }
}
