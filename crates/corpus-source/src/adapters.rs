use std::fs;
use std::path::{Path, PathBuf};

use conllu_codec::{FixOptions, LoadOptions, fix, load};
use conllu_types::Sentence;
use tracing::info;

use crate::config::StorageConfig;
use crate::error::{Result, SourceError};
use crate::{CorpusSource, Part, Sentences, not_available};

/// Corpus made of CoNLL-U files, one per part.
#[derive(Clone, Debug)]
pub struct ConlluCorpus {
    name: String,
    parts: [Option<PathBuf>; 3],
    options: LoadOptions,
}

impl ConlluCorpus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parts: [None, None, None],
            options: LoadOptions::default(),
        }
    }

    /// SynTagRus as laid out in the corpus storage.
    pub fn syntagrus(config: &StorageConfig) -> Self {
        let dname = "syntagrus";
        Self::new("SynTagRus")
            .with_part(Part::Train, config.corpus_path(dname, "ru_syntagrus-ud-train.conllu"))
            .with_part(Part::Dev, config.corpus_path(dname, "ru_syntagrus-ud-dev.conllu"))
            .with_part(Part::Test, config.corpus_path(dname, "ru_syntagrus-ud-test.conllu"))
    }

    pub fn with_part(mut self, part: Part, path: impl Into<PathBuf>) -> Self {
        self.parts[part as usize] = Some(path.into());
        self
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self, part: Part) -> Option<&Path> {
        self.parts[part as usize].as_deref()
    }

    fn load_part(&self, part: Part) -> Result<Sentences> {
        let path = self
            .path(part)
            .ok_or_else(|| not_available(&self.name, part))?;
        open_file(&self.name, part, path, &self.options)
    }
}

impl CorpusSource for ConlluCorpus {
    fn name(&self) -> &str {
        &self.name
    }

    fn train(&self) -> Result<Sentences> {
        self.load_part(Part::Train)
    }

    fn dev(&self) -> Result<Sentences> {
        self.load_part(Part::Dev)
    }

    fn test(&self) -> Result<Sentences> {
        self.load_part(Part::Test)
    }
}

/// A Universal Dependencies treebank under `<root>/corpus/_UD/<name>/`.
/// Parts are the files ending in `train.conllu`, `dev.conllu` and
/// `test.conllu`.
#[derive(Clone, Debug)]
pub struct UniversalDependencies {
    name: String,
    dir: PathBuf,
    options: LoadOptions,
}

impl UniversalDependencies {
    pub fn new(corpus_name: &str, config: &StorageConfig) -> Self {
        Self {
            name: corpus_name.to_string(),
            dir: config.ud_dir(corpus_name),
            options: LoadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `part`, if the treebank ships one.
    pub fn part_path(&self, part: Part) -> Result<Option<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(SourceError::MissingFile {
                corpus: self.name.clone(),
                path: self.dir.clone(),
            });
        }
        let suffix = format!("{part}.conllu");
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(&suffix))
            .collect();
        names.sort();
        Ok(names.into_iter().next().map(|name| self.dir.join(name)))
    }

    fn load_part(&self, part: Part) -> Result<Sentences> {
        let path = self
            .part_path(part)?
            .ok_or_else(|| not_available(&self.name, part))?;
        open_file(&self.name, part, &path, &self.options)
    }
}

impl CorpusSource for UniversalDependencies {
    fn name(&self) -> &str {
        &self.name
    }

    fn train(&self) -> Result<Sentences> {
        self.load_part(Part::Train)
    }

    fn dev(&self) -> Result<Sentences> {
        self.load_part(Part::Dev)
    }

    fn test(&self) -> Result<Sentences> {
        self.load_part(Part::Test)
    }
}

/// Sentences kept in memory; every call streams a copy.
#[derive(Clone, Debug, Default)]
pub struct MemoryCorpus {
    name: String,
    parts: [Option<Vec<Sentence>>; 3],
}

impl MemoryCorpus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parts: [None, None, None],
        }
    }

    pub fn with_part(mut self, part: Part, sentences: Vec<Sentence>) -> Self {
        self.parts[part as usize] = Some(sentences);
        self
    }

    fn stream(&self, part: Part) -> Result<Sentences> {
        let sentences = self.parts[part as usize]
            .clone()
            .ok_or_else(|| not_available(&self.name, part))?;
        Ok(Box::new(sentences.into_iter().map(Ok)))
    }
}

impl CorpusSource for MemoryCorpus {
    fn name(&self) -> &str {
        &self.name
    }

    fn train(&self) -> Result<Sentences> {
        self.stream(Part::Train)
    }

    fn dev(&self) -> Result<Sentences> {
        self.stream(Part::Dev)
    }

    fn test(&self) -> Result<Sentences> {
        self.stream(Part::Test)
    }
}

/// Any source with every part normalized for speech: punctuation-only
/// tokens dropped, forms and lemmas lowercased.
#[derive(Clone, Debug)]
pub struct AdjustedForSpeech<S> {
    inner: S,
}

impl<S: CorpusSource> AdjustedForSpeech<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn adjust(sentences: Sentences) -> Sentences {
        let options = FixOptions {
            adjust_for_speech: true,
            ..FixOptions::default()
        };
        Box::new(fix(sentences, options))
    }
}

impl<S: CorpusSource> CorpusSource for AdjustedForSpeech<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn train(&self) -> Result<Sentences> {
        self.inner.train().map(Self::adjust)
    }

    fn dev(&self) -> Result<Sentences> {
        self.inner.dev().map(Self::adjust)
    }

    fn test(&self) -> Result<Sentences> {
        self.inner.test().map(Self::adjust)
    }
}

fn open_file(corpus: &str, part: Part, path: &Path, options: &LoadOptions) -> Result<Sentences> {
    if !path.is_file() {
        return Err(SourceError::MissingFile {
            corpus: corpus.to_string(),
            path: path.to_path_buf(),
        });
    }
    info!("opening {corpus}:{part} at {}", path.display());
    Ok(load(path, options)?)
}
