//! Chord and key identification over a [`harmony::Registry`].
//!
//! ```no_run
//! use harmony::{note::parse_notes, Registry, TheoryConfig};
//! use harmony_match::{match_chords, MatchConfig};
//!
//! let registry = Registry::build(&TheoryConfig::default())?;
//! let notes = parse_notes("E G C B")?;
//! let best = &match_chords(&registry, &notes, &MatchConfig::default())?[0];
//! assert_eq!(best.candidate.symbol(), "Cmaj7");
//! # Ok::<(), harmony::Error>(())
//! ```

pub mod cadence;
pub mod chords;
pub mod config;
pub mod keys;
pub mod metrics;
pub mod progression;
pub mod types;

pub use cadence::{cadence_score, detect_cadences, Cadence, CadencePoint};
pub use chords::{exact_search, fuzzy_candidates, fuzzy_search, match_chords, match_chords_midi, match_chords_with};
pub use config::MatchConfig;
pub use keys::{match_keys, match_keys_from_notes};
pub use metrics::{precision_recall, Membership, NoteWeights};
pub use progression::{parse_numerals, parse_progression};
pub use types::{CancelToken, KeyMatch, MatchResult, Scores};
