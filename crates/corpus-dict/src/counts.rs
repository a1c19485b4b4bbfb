use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{FeatId, LemmaId, TagId, ValId, WformId};

/// value → count
pub type ValCounts = BTreeMap<ValId, u64>;
/// feature → value → count
pub type FeatCounts = BTreeMap<FeatId, ValCounts>;

/// The raw observations of an ingested corpus.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// word form → tag → lemma → count
    pub wform_tag: BTreeMap<WformId, BTreeMap<TagId, BTreeMap<LemmaId, u64>>>,
    /// lemma → tag → count
    pub lemma_tag: BTreeMap<LemmaId, BTreeMap<TagId, u64>>,
    /// word form → tag → lemma → feature → value → count
    pub wform_feat: BTreeMap<WformId, BTreeMap<TagId, BTreeMap<LemmaId, FeatCounts>>>,
    /// lemma → tag → feature → value → count
    pub lemma_feat: BTreeMap<LemmaId, BTreeMap<TagId, FeatCounts>>,
}

impl Counts {
    /// Count one (word form, tag, lemma) observation with its features.
    /// The feature tables get an entry even when `feats` is empty.
    pub fn record(
        &mut self,
        wform: WformId,
        tag: TagId,
        lemma: LemmaId,
        feats: &[(FeatId, ValId)],
    ) {
        *self
            .wform_tag
            .entry(wform)
            .or_default()
            .entry(tag)
            .or_default()
            .entry(lemma)
            .or_default() += 1;
        *self.lemma_tag.entry(lemma).or_default().entry(tag).or_default() += 1;

        let wform_feats = self
            .wform_feat
            .entry(wform)
            .or_default()
            .entry(tag)
            .or_default()
            .entry(lemma)
            .or_default();
        let lemma_feats = self.lemma_feat.entry(lemma).or_default().entry(tag).or_default();
        for &(feat, val) in feats {
            *wform_feats.entry(feat).or_default().entry(val).or_default() += 1;
            *lemma_feats.entry(feat).or_default().entry(val).or_default() += 1;
        }
    }

    /// Observations of `wform` under `tag`, over all lemmas.
    pub fn wform_tag_total(&self, wform: WformId, tag: TagId) -> u64 {
        self.wform_tag
            .get(&wform)
            .and_then(|tags| tags.get(&tag))
            .map(|lemmas| lemmas.values().sum())
            .unwrap_or(0)
    }

    /// Per-tag totals of `wform`.
    pub fn wform_tags(&self, wform: WformId) -> BTreeMap<TagId, u64> {
        self.wform_tag
            .get(&wform)
            .map(|tags| {
                tags.iter()
                    .map(|(tag, lemmas)| (*tag, lemmas.values().sum()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn lemma_has_tag(&self, lemma: LemmaId, tag: TagId) -> bool {
        self.lemma_tag
            .get(&lemma)
            .and_then(|tags| tags.get(&tag))
            .is_some_and(|cnt| *cnt > 0)
    }
}

/// Entry with the highest count; ties go to the larger key.
pub fn arg_max<K: Copy + Ord>(counts: &BTreeMap<K, u64>) -> Option<(K, u64)> {
    counts
        .iter()
        .map(|(k, c)| (*k, *c))
        .max_by_key(|&(k, c)| (c, k))
}

/// Margin-weighted confidence of a winner over the runner-up, discounted
/// when the margin is below `cnt_thresh`.
pub fn margin_confidence(top: u64, runner_up: u64, cnt_thresh: u32) -> f64 {
    if top == 0 {
        return 0.0;
    }
    let margin = top.saturating_sub(runner_up) as f64;
    margin * (margin / f64::from(cnt_thresh)).min(1.0) / top as f64
}

/// Winner and confidence of a count table, the way every prediction
/// scores its candidates.
pub fn pick<K: Copy + Ord>(counts: &BTreeMap<K, u64>, cnt_thresh: u32) -> Option<(K, f64)> {
    let (winner, top) = arg_max(counts)?;
    let runner_up = counts
        .iter()
        .filter(|(k, _)| **k != winner)
        .map(|(_, c)| *c)
        .max()
        .unwrap_or(0);
    Some((winner, margin_confidence(top, runner_up, cnt_thresh)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_fills_all_tables() {
        let mut counts = Counts::default();
        let (w, t, l) = (WformId(0), TagId(0), LemmaId(0));
        counts.record(w, t, l, &[(FeatId(0), ValId(1))]);
        counts.record(w, t, l, &[]);
        assert_eq!(counts.wform_tag[&w][&t][&l], 2);
        assert_eq!(counts.lemma_tag[&l][&t], 2);
        assert_eq!(counts.wform_feat[&w][&t][&l][&FeatId(0)][&ValId(1)], 1);
        assert_eq!(counts.lemma_feat[&l][&t][&FeatId(0)][&ValId(1)], 1);
        assert_eq!(counts.wform_tag_total(w, t), 2);
        assert!(counts.lemma_has_tag(l, t));
        assert!(!counts.lemma_has_tag(l, TagId(1)));
    }

    #[test]
    fn confidence_formula() {
        assert_eq!(margin_confidence(40, 10, 20), 0.75);
        assert_eq!(margin_confidence(10, 0, 20), 0.5);
        assert_eq!(margin_confidence(5, 5, 20), 0.0);
    }

    #[test]
    fn ties_prefer_the_larger_key() {
        let counts = BTreeMap::from([(TagId(0), 3), (TagId(1), 3), (TagId(2), 1)]);
        assert_eq!(arg_max(&counts), Some((TagId(1), 3)));
        assert_eq!(pick(&counts, 20), Some((TagId(1), 0.0)));
        assert_eq!(pick(&BTreeMap::<TagId, u64>::new(), 20), None);
    }
}
