use std::collections::BTreeMap;

use crate::affixes::{is_alpha, is_lower, is_title};
use crate::counts::pick;
use crate::error::Result;
use crate::fit::Endings;
use crate::ids::{LemmaId, TagId, ValId};
use crate::{CorpusDict, Prediction};

/// Confidence of a lemma generated from the ending tables that turned out
/// to be a known lemma of the tag.
const KNOWN_GENERATED_LEMMA: f64 = 0.9;

impl CorpusDict {
    /// Tag of a word form. A trusted tag comes with confidence 1;
    /// otherwise the most frequent tag is scored by its margin over the
    /// runner-up. A capitalized first word also counts the observations of
    /// its lowercase spelling. `None` for unknown word forms.
    pub fn predict_tag(&self, wform: &str, is_first: bool) -> Option<Prediction<&str>> {
        let lower = wform.to_lowercase();
        let (wform_id, lower_id) = match self.wforms.get(wform) {
            Some(id) if is_first && is_title(wform) => (id, self.wforms.get(&lower)),
            Some(id) => (id, None),
            None => (self.wforms.get(&lower)?, None),
        };

        if lower_id.is_none() {
            if let Some(tag) = self.fitted.trusted_tags.get(&wform_id) {
                return Some(Prediction::new(self.tags.label(*tag), 1.0));
            }
        }
        let mut tag_cnts = self.counts.wform_tags(wform_id);
        if let Some(lower_id) = lower_id {
            for (tag, cnt) in self.counts.wform_tags(lower_id) {
                *tag_cnts.entry(tag).or_default() += cnt;
            }
        }
        let (tag, confidence) = pick(&tag_cnts, self.config.cnt_thresh)?;
        Some(Prediction::new(self.tags.label(tag), confidence))
    }

    /// Lemma of a word form with the given tag.
    ///
    /// A word form seen with the tag gets its most frequent lemma, scored
    /// like [`predict_tag`](Self::predict_tag). Otherwise candidates are
    /// generated from the tag's ending table, longest ending first: the
    /// first candidate that is a known lemma of the tag scores 0.9, else
    /// the first candidate at all scores 0. Failing both the word form is
    /// its own lemma with confidence 0.
    ///
    /// `_is_first` mirrors [`predict_tag`](Self::predict_tag); sentence
    /// position does not change the lemma.
    pub fn predict_lemma(
        &self,
        wform: &str,
        tag: &str,
        _is_first: bool,
    ) -> Result<Prediction<String>> {
        let tag = self.tag_id(tag)?;
        if is_alpha(wform) {
            let has_caps = !is_lower(wform);
            let lower = wform.to_lowercase();
            let lemma_cnts = self
                .lemma_counts(wform, tag)
                .or_else(|| has_caps.then(|| self.lemma_counts(&lower, tag)).flatten());

            if let Some(lemma_cnts) = lemma_cnts {
                if let Some((lemma, confidence)) = pick(lemma_cnts, self.config.cnt_thresh) {
                    return Ok(Prediction::new(self.lemmata.label(lemma).to_string(), confidence));
                }
            } else if let Some(endings) = self.fitted.endings.get(&tag).filter(|e| !e.is_empty()) {
                let mut generated = None;
                let known = self
                    .lemma_from_endings(wform, tag, endings, &mut generated)
                    .or_else(|| {
                        has_caps
                            .then(|| self.lemma_from_endings(&lower, tag, endings, &mut generated))
                            .flatten()
                    });
                if let Some(lemma) = known {
                    return Ok(Prediction::new(lemma, KNOWN_GENERATED_LEMMA));
                }
                if let Some(lemma) = generated {
                    return Ok(Prediction::new(lemma, 0.0));
                }
            }
        }
        Ok(Prediction::new(wform.to_string(), 0.0))
    }

    /// Value of `feat` for a word form with the given lemma and tag; `None`
    /// as the value means the feature is absent. A feature the tag never
    /// carries is certainly absent. Trusted values (by word form, then by
    /// lemma) score 1; otherwise the values seen with this word form,
    /// lemma and tag are scored with the absent bucket included.
    ///
    /// Returns `Ok(None)` for an unknown word form.
    pub fn predict_feat(
        &self,
        feat: &str,
        wform: &str,
        lemma: &str,
        tag: &str,
    ) -> Result<Option<Prediction<Option<&str>>>> {
        let feat = self.feat_id(feat)?;
        let tag = self.tag_id(tag)?;
        if !self.fitted.tag_feats(tag).is_some_and(|feats| feats.contains(&feat)) {
            return Ok(Some(Prediction::new(None, 1.0)));
        }
        let Some(wform_id) = self
            .wforms
            .get(wform)
            .or_else(|| self.wforms.get(&wform.to_lowercase()))
        else {
            return Ok(None);
        };
        let lemma_id = self.lemmata.get(lemma);

        let trusted = self
            .fitted
            .wform_feats
            .get(&wform_id)
            .and_then(|vals| vals.get(&feat))
            .or_else(|| {
                lemma_id
                    .and_then(|lemma| self.fitted.lemma_feats.get(&lemma))
                    .and_then(|vals| vals.get(&feat))
            });
        if let Some(val) = trusted {
            return Ok(Some(Prediction::new(self.value_label(feat, *val), 1.0)));
        }

        let tag_cnt = self.counts.wform_tag_total(wform_id, tag);
        let feat_cnts = lemma_id
            .and_then(|lemma| self.counts.wform_feat.get(&wform_id)?.get(&tag)?.get(&lemma))
            .filter(|feats| !feats.is_empty());
        let Some(feat_cnts) = feat_cnts else {
            let confidence = (tag_cnt as f64 / f64::from(self.config.cnt_thresh)).min(1.0);
            return Ok(Some(Prediction::new(None, confidence)));
        };

        let mut val_cnts = feat_cnts.get(&feat).cloned().unwrap_or_default();
        let recorded: u64 = val_cnts.values().sum();
        val_cnts.insert(ValId::ABSENT, tag_cnt.saturating_sub(recorded));
        Ok(pick(&val_cnts, self.config.cnt_thresh)
            .map(|(val, confidence)| Prediction::new(self.value_label(feat, val), confidence)))
    }

    fn lemma_counts(&self, wform: &str, tag: TagId) -> Option<&BTreeMap<LemmaId, u64>> {
        let wform = self.wforms.get(wform)?;
        self.counts
            .wform_tag
            .get(&wform)?
            .get(&tag)
            .filter(|lemmas| !lemmas.is_empty())
    }

    /// Walk the suffixes of `wform` from the longest and return the first
    /// generated lemma known under `tag`. The first candidate generated at
    /// all is kept in `generated`.
    fn lemma_from_endings(
        &self,
        wform: &str,
        tag: TagId,
        endings: &Endings,
        generated: &mut Option<String>,
    ) -> Option<String> {
        for (at, _) in wform.char_indices() {
            let Some(candidates) = endings.get(&wform[at..]) else {
                continue;
            };
            for (ending, _) in candidates {
                let lemma = format!("{}{ending}", &wform[..at]);
                let known = self
                    .lemmata
                    .get(&lemma)
                    .is_some_and(|id| self.counts.lemma_has_tag(id, tag));
                if known {
                    return Some(lemma);
                }
                if generated.is_none() && !lemma.is_empty() {
                    *generated = Some(lemma);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DictConfig, DictError};
    use conllu_codec::parse_str;

    fn corpus(tokens: &[(&str, &str, &str, &str, usize)]) -> String {
        let mut text = String::new();
        for (form, lemma, tag, feats, times) in tokens {
            for _ in 0..*times {
                text.push_str(&format!("1\t{form}\t{lemma}\t{tag}\t_\t{feats}\t0\troot\t_\t_\n\n"));
            }
        }
        text
    }

    fn dict(tokens: &[(&str, &str, &str, &str, usize)], cnt_thresh: u32) -> CorpusDict {
        let config = DictConfig {
            cnt_thresh,
            ..DictConfig::default()
        };
        CorpusDict::from_corpus(parse_str(&corpus(tokens)), config).unwrap()
    }

    #[test]
    fn tag_by_margin() {
        let dict = dict(
            &[
                ("стали", "стать", "VERB", "_", 3),
                ("стали", "сталь", "NOUN", "_", 1),
            ],
            4,
        );
        let tag = dict.predict_tag("стали", false).unwrap();
        assert_eq!(tag.value, "VERB");
        assert_eq!(tag.confidence, 2.0 * 0.5 / 3.0);
        assert_eq!(dict.predict_tag("Стали", false).unwrap().value, "VERB");
        assert!(dict.predict_tag("сталью", false).is_none());
    }

    #[test]
    fn title_case_first_word_merges_lowercase() {
        let dict = dict(
            &[("Вера", "Вера", "PROPN", "_", 2), ("вера", "вера", "NOUN", "_", 3)],
            1,
        );
        // trusted on its own
        assert_eq!(dict.predict_tag("Вера", false).unwrap(), Prediction::new("PROPN", 1.0));
        let first = dict.predict_tag("Вера", true).unwrap();
        assert_eq!(first.value, "NOUN");
        assert_eq!(first.confidence, 1.0 / 3.0);
    }

    #[test]
    fn lemma_from_counts_and_endings() {
        let dict = dict(
            &[
                ("кошки", "кошка", "NOUN", "_", 1),
                ("мышки", "мышка", "NOUN", "_", 1),
                ("книга", "книга", "NOUN", "_", 1),
            ],
            1,
        );
        let lemma = |wform: &str| dict.predict_lemma(wform, "NOUN", false).unwrap();
        assert_eq!(lemma("кошки"), Prediction::new("кошка".to_string(), 1.0));
        // unseen; the "и" → "а" ending yields the known "книга"
        assert_eq!(lemma("книги"), Prediction::new("книга".to_string(), 0.9));
        assert_eq!(lemma("Книги").value, "книга");
        assert_eq!(lemma("вилки"), Prediction::new("вилка".to_string(), 0.0));
        assert_eq!(lemma("из-за"), Prediction::new("из-за".to_string(), 0.0));
        assert_eq!(dict.predict_lemma("Книги", "NOUN", true).unwrap(), lemma("Книги"));
        assert!(matches!(
            dict.predict_lemma("кошки", "VERB", false),
            Err(DictError::NotFound { kind: "tag", .. })
        ));
    }

    #[test]
    fn feature_values() {
        let dict = dict(
            &[
                ("стол", "стол", "NOUN", "Case=Nom", 3),
                ("стол", "стол", "NOUN", "Case=Acc", 2),
                ("быстро", "быстро", "ADV", "_", 2),
                ("сто", "сто", "NUM", "_", 1),
            ],
            2,
        );
        let case = dict.predict_feat("Case", "стол", "стол", "NOUN").unwrap().unwrap();
        assert_eq!(case.value, Some("Nom"));
        assert_eq!(case.confidence, 1.0 * 0.5 / 3.0);
        assert_eq!(
            dict.predict_feat("Case", "быстро", "быстро", "ADV").unwrap(),
            Some(Prediction::new(None, 1.0))
        );
        assert_eq!(dict.predict_feat("Case", "столу", "стол", "NOUN").unwrap(), None);
        assert!(matches!(
            dict.predict_feat("Tense", "стол", "стол", "NOUN"),
            Err(DictError::NotFound { kind: "feature", .. })
        ));
    }

    #[test]
    fn feature_absent_bucket_and_unknown_lemma() {
        let dict = dict(
            &[
                ("бы", "бы", "PART", "Mood=Cnd", 1),
                ("бы", "бы", "PART", "_", 3),
                ("ли", "ли", "PART", "_", 1),
            ],
            2,
        );
        let mood = dict.predict_feat("Mood", "бы", "бы", "PART").unwrap().unwrap();
        assert_eq!(mood, Prediction::new(None, 2.0 / 3.0));
        // the lemma given is not the one recorded, so only the tag count speaks
        let mood = dict.predict_feat("Mood", "ли", "либо", "PART").unwrap().unwrap();
        assert_eq!(mood, Prediction::new(None, 0.5));
    }
}
