//! Tonal theory core: intervals, factor sets, modifiers and a bidirectional
//! chord/scale name registry.
//!
//! ```no_run
//! use harmony::{Chord, Registry, TheoryConfig};
//!
//! let registry = Registry::build(&TheoryConfig::default())?;
//! let chord = Chord::parse(&registry, "Cmaj7/E")?;
//! assert_eq!(chord.inversion(), 1);
//! # Ok::<(), harmony::Error>(())
//! ```

pub mod alias;
pub mod chord;
pub mod config;
pub mod error;
pub mod factor;
pub mod interval;
pub mod modifier;
pub mod note;
pub mod registry;
pub mod scale;
pub mod scoring;
pub mod vocabulary;

pub use chord::{Chord, ChordInput, Member};
pub use config::TheoryConfig;
pub use error::{Error, Result};
pub use factor::{ChordQuality, FactorSet};
pub use interval::{Interval, Quality, Space};
pub use modifier::{Expect, Modifier};
pub use note::{Letter, Note, Spelling};
pub use registry::{NamedEntry, Registry, Resolution};
pub use scale::{Key, Scale};
pub use scoring::{ConsonanceScale, Structure};
