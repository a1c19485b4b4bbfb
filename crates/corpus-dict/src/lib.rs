//! Corpus dictionary: frequency tables over an annotated corpus and the
//! tag, lemma and feature predictions derived from them.
//!
//! A dictionary is filled once from a corpus ([`CorpusDict::ingest`] and
//! friends), fitted ([`CorpusDict::fit`]) and then only queried. Every
//! label is interned with a dense id in first-seen order; the count tables
//! are keyed by those ids.
//!
//! # Example
//! ```
//! use conllu_codec::parse_str;
//! use corpus_dict::{CorpusDict, DictConfig};
//!
//! let corpus = "1\tКоты\tкот\tNOUN\t_\tNumber=Plur\t0\troot\t_\t_\n\n";
//! let config = DictConfig { cnt_thresh: 1, ..DictConfig::default() };
//! let dict = CorpusDict::from_corpus(parse_str(corpus), config)?;
//!
//! let tag = dict.predict_tag("Коты", true).unwrap();
//! assert_eq!((tag.value, tag.confidence), ("NOUN", 1.0));
//! assert_eq!(dict.predict_lemma("коты", "NOUN", false)?.value, "кот");
//! # Ok::<(), corpus_dict::DictError>(())
//! ```

mod affixes;
mod counts;
mod error;
mod fit;
mod ids;
mod ingest;
mod predict;
mod registry;
mod snapshot;
mod vote;

use std::collections::{BTreeMap, BTreeSet};

pub use affixes::{Affixes, find_affixes, is_alpha, is_lower, is_title};
pub use counts::{Counts, FeatCounts, ValCounts};
pub use error::{DictError, Result};
pub use ids::{DenseId, FeatId, LemmaId, TagId, ValId, WformId};
pub use ingest::{IngestStats, yo_variant};
pub use registry::Registry;
pub use snapshot::{SNAPSHOT_FORMAT, Snapshot};
pub use vote::vote;

use conllu_types::Sentence;
use fit::Fitted;

/// Label ranking entry: `(label, count, share)`.
pub type Ranked<'a> = (&'a str, u64, f64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DictConfig {
    /// Minimum number of observations before a word form's tag or feature
    /// value is trusted; also the margin at which confidences stop being
    /// discounted.
    pub cnt_thresh: u32,
    /// Share of observations the winning label needs to be trusted.
    pub ambiguity_thresh: f64,
    /// Also count word forms spelled with `ё` under their `е` spelling.
    pub yo_variants: bool,
}

impl Default for DictConfig {
    fn default() -> Self {
        Self {
            cnt_thresh: 20,
            ambiguity_thresh: 1.0,
            yo_variants: true,
        }
    }
}

/// A predicted label with its confidence in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction<T> {
    pub value: T,
    pub confidence: f64,
}

impl<T> Prediction<T> {
    pub fn new(value: T, confidence: f64) -> Self {
        Self { value, confidence }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CorpusDict {
    pub(crate) config: DictConfig,
    pub(crate) wforms: Registry<WformId>,
    pub(crate) lemmata: Registry<LemmaId>,
    pub(crate) tags: Registry<TagId>,
    pub(crate) feats: Registry<FeatId>,
    /// Per feature; id 0 is always `_`.
    pub(crate) feat_vals: Vec<Registry<ValId>>,
    pub(crate) counts: Counts,
    pub(crate) fitted: Fitted,
}

impl CorpusDict {
    pub fn new(config: DictConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Ingest `sentences` into a new dictionary and fit it.
    pub fn from_corpus<I>(sentences: I, config: DictConfig) -> Result<Self>
    where
        I: IntoIterator<Item = conllu_codec::Result<Sentence>>,
    {
        let mut dict = Self::new(config);
        dict.ingest(sentences, false)?;
        dict.fit();
        Ok(dict)
    }

    pub fn config(&self) -> &DictConfig {
        &self.config
    }

    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    pub fn is_empty(&self) -> bool {
        self.wforms.is_empty() && self.tags.is_empty()
    }

    pub fn tags(&self) -> BTreeSet<&str> {
        self.tags.labels().collect()
    }

    /// Every feature with the values seen for it, the absent `_` left out.
    pub fn feats(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        self.feats
            .iter()
            .map(|(feat, name)| {
                let vals = self.feat_vals[feat.index()]
                    .iter()
                    .filter(|(val, _)| *val != ValId::ABSENT)
                    .map(|(_, label)| label)
                    .collect();
                (name, vals)
            })
            .collect()
    }

    /// Features observed on word forms carrying `tag`.
    pub fn tag_feats(&self, tag: &str) -> Result<BTreeSet<&str>> {
        let tag = self.tag_id(tag)?;
        Ok(self
            .fitted
            .tag_feats(tag)
            .map(|feats| feats.iter().map(|feat| self.feats.label(*feat)).collect())
            .unwrap_or_default())
    }

    pub fn tags_freq(&self) -> Vec<Ranked<'_>> {
        self.fitted
            .tags_freq
            .iter()
            .map(|(tag, cnt, share)| (self.tags.label(*tag), *cnt, *share))
            .collect()
    }

    pub fn feats_freq(&self, tag: &str) -> Result<Vec<Ranked<'_>>> {
        let tag = self.tag_id(tag)?;
        Ok(self
            .fitted
            .feats_freq
            .get(tag.index())
            .map(|ranking| {
                ranking
                    .iter()
                    .map(|(feat, cnt, share)| (self.feats.label(*feat), *cnt, *share))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Values of `feat` under `tag`, most frequent first. Empty when the
    /// feature never occurs with the tag.
    pub fn feat_vals_freq(&self, tag: &str, feat: &str) -> Result<Vec<Ranked<'_>>> {
        let tag = self.tag_id(tag)?;
        let Some(feat) = self.feats.get(feat) else {
            return Ok(Vec::new());
        };
        let vals = &self.feat_vals[feat.index()];
        Ok(self
            .fitted
            .feat_vals_freq
            .get(tag.index())
            .and_then(|by_feat| by_feat.get(&feat))
            .map(|ranking| {
                ranking
                    .iter()
                    .map(|(val, cnt, share)| (vals.label(*val), *cnt, *share))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Most frequent tag of the whole corpus.
    pub fn most_common_tag(&self) -> Option<&str> {
        self.fitted.most_common_tag.map(|tag| self.tags.label(tag))
    }

    /// Whether lemmas of `tag` are mostly capitalized.
    pub fn is_capitalized_tag(&self, tag: &str) -> Result<bool> {
        let tag = self.tag_id(tag)?;
        Ok(self.fitted.capitalized.contains(&tag))
    }

    /// Whether `wform` was seen as a word form or, failing that, as a
    /// lemma, optionally restricted to `tag`. Lowercase spellings are
    /// tried as well.
    pub fn wform_is_known(&self, wform: &str, tag: Option<&str>) -> Result<bool> {
        let tag = tag.map(|tag| self.tag_id(tag)).transpose()?;
        let lower = wform.to_lowercase();
        if let Some(id) = self.wforms.get(wform).or_else(|| self.wforms.get(&lower)) {
            return Ok(match tag {
                Some(tag) => self.counts.wform_tag_total(id, tag) > 0,
                None => true,
            });
        }
        let Some(lemma) = self.lemmata.get(wform).or_else(|| self.lemmata.get(&lower)) else {
            return Ok(false);
        };
        Ok(match tag {
            Some(tag) => self.counts.lemma_has_tag(lemma, tag),
            None => true,
        })
    }

    pub(crate) fn tag_id(&self, tag: &str) -> Result<TagId> {
        self.tags.get(tag).ok_or_else(|| DictError::not_found("tag", tag))
    }

    pub(crate) fn feat_id(&self, feat: &str) -> Result<FeatId> {
        self.feats
            .get(feat)
            .ok_or_else(|| DictError::not_found("feature", feat))
    }

    /// Label of a feature value; the absent value is `None`.
    pub(crate) fn value_label(&self, feat: FeatId, val: ValId) -> Option<&str> {
        (val != ValId::ABSENT).then(|| self.feat_vals[feat.index()].label(val))
    }
}
