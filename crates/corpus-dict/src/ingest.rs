use std::path::Path;

use conllu_codec::{LoadOptions, load};
use conllu_types::{FeatMap, Sentence, Token};
use corpus_source::CorpusSource;
use tracing::{debug, info};
use unic_ucd_category::GeneralCategory;

use crate::affixes::is_lower;
use crate::error::{DictError, Result};
use crate::ids::{DenseId, FeatId, ValId};
use crate::registry::Registry;
use crate::CorpusDict;

/// What one ingestion pass counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub sentences: usize,
    /// Tokens that went into the count tables.
    pub tokens: usize,
    /// Extra `е` spellings counted for word forms written with `ё`.
    pub yo_variants: usize,
}

/// The `е` spelling of a word form written with `ё`, if it has one.
pub fn yo_variant(wform: &str) -> Option<String> {
    wform.contains(['ё', 'Ё']).then(|| wform.replace('ё', "е").replace('Ё', "Е"))
}

impl CorpusDict {
    /// Count every sentence of `sentences`. A dictionary that already holds
    /// a corpus is only extended with `append`.
    ///
    /// The dictionary must be [fitted](Self::fit) again before predictions
    /// reflect the new counts.
    pub fn ingest<I>(&mut self, sentences: I, append: bool) -> Result<IngestStats>
    where
        I: IntoIterator<Item = conllu_codec::Result<Sentence>>,
    {
        if !append && !self.is_empty() {
            return Err(DictError::NotEmpty);
        }
        let mut stats = IngestStats::default();
        for sentence in sentences {
            let sentence = sentence?;
            for token in &sentence.tokens {
                self.ingest_token(token, &mut stats);
            }
            stats.sentences += 1;
            if stats.sentences % 10_000 == 0 {
                debug!("ingested {} sentences", stats.sentences);
            }
        }
        info!(
            "dictionary ingested {} sentences, {} acceptable tokens (plus {} for yo letters)",
            stats.sentences, stats.tokens, stats.yo_variants
        );
        Ok(stats)
    }

    /// Ingest a CoNLL-U file, normalized on the way in.
    pub fn ingest_path<P: AsRef<Path>>(&mut self, path: P, append: bool) -> Result<IngestStats> {
        let path = path.as_ref();
        info!("ingesting {}", path.display());
        let sentences = load(path, &LoadOptions::default())?;
        self.ingest(sentences, append)
    }

    /// Ingest the train part of a corpus source.
    pub fn ingest_source(
        &mut self,
        source: &dyn CorpusSource,
        append: bool,
    ) -> Result<IngestStats> {
        info!("ingesting the train part of {}", source.name());
        let sentences = source.train()?;
        self.ingest(sentences, append)
    }

    fn ingest_token(&mut self, token: &Token, stats: &mut IngestStats) {
        let tag = token.upos();
        let feats = token.feats();
        let Some((wform, lemma, tag)) = acceptable(token) else {
            // Tags of unusable tokens still belong to the inventory.
            if let Some(tag) = tag {
                self.tags.register(tag);
                self.register_feats(feats);
            }
            return;
        };

        stats.tokens += 1;
        let mut variants = vec![wform.to_string()];
        if self.config.yo_variants {
            if let Some(variant) = yo_variant(wform) {
                stats.yo_variants += 1;
                variants.push(variant);
            }
        }
        let lower_lemma = is_lower(lemma);
        for variant in variants {
            let variant = if lower_lemma { variant.to_lowercase() } else { variant };
            let wform_id = self.wforms.register(&variant);
            let lemma_id = self.lemmata.register(lemma);
            let tag_id = self.tags.register(tag);
            let feat_ids = self.register_feats(feats);
            self.counts.record(wform_id, tag_id, lemma_id, &feat_ids);
        }
    }

    fn register_feats(&mut self, feats: Option<&FeatMap>) -> Vec<(FeatId, ValId)> {
        let Some(feats) = feats else {
            return Vec::new();
        };
        feats
            .iter()
            .map(|(feat, val)| {
                let feat_id = self.feats.register(feat);
                if feat_id.index() == self.feat_vals.len() {
                    let mut vals = Registry::new();
                    vals.register("_");
                    self.feat_vals.push(vals);
                }
                let val_id = self.feat_vals[feat_id.index()].register(val);
                (feat_id, val_id)
            })
            .collect()
    }
}

/// FORM, LEMMA and UPOS of a token usable for the count tables: not a
/// multiword span, both FORM and LEMMA present and free of decimal digits.
/// Other numeric characters (`²`, `½`, `Ⅻ`) are fine.
///
/// Untagged tokens are skipped: the count tables are keyed by tag.
fn acceptable(token: &Token) -> Option<(&str, &str, &str)> {
    let wform = token.form().filter(|form| !form.is_empty())?;
    let lemma = token.lemma().filter(|lemma| !lemma.is_empty())?;
    let tag = token.upos()?;
    if token.id().is_some_and(|id| id.contains('-')) {
        return None;
    }
    if wform.chars().chain(lemma.chars()).any(is_decimal) {
        return None;
    }
    Some((wform, lemma, tag))
}

fn is_decimal(c: char) -> bool {
    GeneralCategory::of(c) == GeneralCategory::DecimalNumber
}
