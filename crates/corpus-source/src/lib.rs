//! Corpus sources: named corpora exposing train/dev/test sentence streams.
//!
//! Every part is opened afresh on each call, so a file-backed source can be
//! iterated any number of times without holding the corpus in memory.

mod adapters;
mod config;
mod error;

use std::fmt;
use std::str::FromStr;

pub use adapters::{AdjustedForSpeech, ConlluCorpus, MemoryCorpus, UniversalDependencies};
pub use config::{
    CONFIG_FILE, CORPUS_DNAME, ROOT_ENV, StorageConfig, UD_DNAME, default_config_path, read_root,
};
pub use conllu_codec::Sentences;
pub use error::{Result, SourceError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Part {
    Train,
    Dev,
    Test,
}

impl Part {
    pub const ALL: [Part; 3] = [Part::Train, Part::Dev, Part::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Part::Train => "train",
            Part::Dev => "dev",
            Part::Test => "test",
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Part {
    type Err = SourceError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "train" => Ok(Part::Train),
            "dev" => Ok(Part::Dev),
            "test" => Ok(Part::Test),
            other => Err(SourceError::Config(format!("unknown corpus part {other:?}"))),
        }
    }
}

/// A named corpus. Parts a corpus lacks report
/// [`SourceError::PartNotAvailable`].
pub trait CorpusSource {
    fn name(&self) -> &str;

    fn train(&self) -> Result<Sentences> {
        Err(not_available(self.name(), Part::Train))
    }

    fn dev(&self) -> Result<Sentences> {
        Err(not_available(self.name(), Part::Dev))
    }

    fn test(&self) -> Result<Sentences> {
        Err(not_available(self.name(), Part::Test))
    }

    fn open(&self, part: Part) -> Result<Sentences> {
        match part {
            Part::Train => self.train(),
            Part::Dev => self.dev(),
            Part::Test => self.test(),
        }
    }
}

pub fn not_available(corpus: &str, part: Part) -> SourceError {
    SourceError::PartNotAvailable {
        corpus: corpus.to_string(),
        part,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nothing;

    impl CorpusSource for Nothing {
        fn name(&self) -> &str {
            "nothing"
        }
    }

    #[test]
    fn default_parts_are_unavailable() {
        let err = Nothing.open(Part::Dev).err().unwrap();
        assert_eq!(err.to_string(), "nothing does not have a dev part");
        assert!(matches!(
            Nothing.train(),
            Err(SourceError::PartNotAvailable { part: Part::Train, .. })
        ));
    }

    #[test]
    fn parts_parse() {
        assert_eq!("Train".parse::<Part>().unwrap(), Part::Train);
        assert_eq!(Part::Test.to_string(), "test");
        assert!("valid".parse::<Part>().is_err());
    }
}
