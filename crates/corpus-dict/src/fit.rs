use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::info;

use crate::affixes::{find_affixes, is_alpha, is_lower};
use crate::counts::{FeatCounts, arg_max};
use crate::ids::{DenseId, FeatId, LemmaId, TagId, ValId, WformId};
use crate::registry::Registry;
use crate::CorpusDict;

/// ending of a word form → lemma endings, most frequent first
pub(crate) type Endings = HashMap<String, Vec<(String, u64)>>;

/// `(id, count, share)`, sorted for display.
pub(crate) type Ranking<I> = Vec<(I, u64, f64)>;

/// Tables derived from the raw counts by [`CorpusDict::fit`].
#[derive(Clone, Debug, Default)]
pub(crate) struct Fitted {
    pub trusted_tags: HashMap<WformId, TagId>,
    pub tags_freq: Ranking<TagId>,
    pub most_common_tag: Option<TagId>,
    pub endings: HashMap<TagId, Endings>,
    pub capitalized: HashSet<TagId>,
    /// Indexed by tag id.
    pub tag_feats: Vec<BTreeSet<FeatId>>,
    pub feats_freq: Vec<Ranking<FeatId>>,
    pub feat_vals_freq: Vec<HashMap<FeatId, Ranking<ValId>>>,
    pub wform_feats: HashMap<WformId, HashMap<FeatId, ValId>>,
    pub lemma_feats: HashMap<LemmaId, HashMap<FeatId, ValId>>,
}

impl Fitted {
    pub fn tag_feats(&self, tag: TagId) -> Option<&BTreeSet<FeatId>> {
        self.tag_feats.get(tag.index())
    }
}

impl CorpusDict {
    /// Derive the prediction tables from the counts with the configured
    /// thresholds.
    pub fn fit(&mut self) {
        self.fitted = Fitter { dict: self }.run();
        info!(
            "dictionary fitted: {} trusted tags, {} word forms and {} lemmas with trusted features",
            self.fitted.trusted_tags.len(),
            self.fitted.wform_feats.len(),
            self.fitted.lemma_feats.len()
        );
    }

    /// Store new thresholds, then [`fit`](Self::fit).
    pub fn fit_with(&mut self, cnt_thresh: u32, ambiguity_thresh: f64) {
        self.config.cnt_thresh = cnt_thresh;
        self.config.ambiguity_thresh = ambiguity_thresh;
        self.fit();
    }
}

struct Fitter<'a> {
    dict: &'a CorpusDict,
}

impl Fitter<'_> {
    fn run(&self) -> Fitted {
        let (trusted_tags, tags_freq) = self.tags();
        let most_common_tag = tags_freq.first().map(|(tag, _, _)| *tag);
        let tag_feats = self.tag_feats();
        let (feats_freq, feat_vals_freq) = self.feat_rankings();
        let wform_feats = self.wform_feats(&tag_feats);
        let lemma_feats = self.lemma_feats(&tag_feats);
        Fitted {
            trusted_tags,
            tags_freq,
            most_common_tag,
            endings: self.endings(),
            capitalized: self.capitalized(),
            tag_feats,
            feats_freq,
            feat_vals_freq,
            wform_feats,
            lemma_feats,
        }
    }

    fn trusted(&self, total: u64, winner: u64) -> bool {
        let config = &self.dict.config;
        total > 0
            && total >= u64::from(config.cnt_thresh)
            && winner as f64 / total as f64 >= config.ambiguity_thresh
    }

    fn tags(&self) -> (HashMap<WformId, TagId>, Ranking<TagId>) {
        let counts = &self.dict.counts;
        let mut trusted = HashMap::new();
        let mut totals: BTreeMap<TagId, u64> = BTreeMap::new();
        for wform in counts.wform_tag.keys() {
            let tag_cnts = counts.wform_tags(*wform);
            for (tag, cnt) in &tag_cnts {
                *totals.entry(*tag).or_default() += cnt;
            }
            if let Some((tag, cnt)) = arg_max(&tag_cnts) {
                if self.trusted(tag_cnts.values().sum(), cnt) {
                    trusted.insert(*wform, tag);
                }
            }
        }
        let total: u64 = totals.values().sum();
        let mut ranking = rank(&totals, total);
        sort_ranking(&mut ranking, &self.dict.tags);
        (trusted, ranking)
    }

    /// For every (word form, tag, lemma) of letters only, the endings left
    /// once the common stem is cut at each of its positions.
    fn endings(&self) -> HashMap<TagId, Endings> {
        let dict = self.dict;
        let mut tables: HashMap<TagId, HashMap<String, BTreeMap<String, u64>>> = HashMap::new();
        for (wform, tags) in &dict.counts.wform_tag {
            let wform = dict.wforms.label(*wform);
            if !is_alpha(wform) {
                continue;
            }
            for (tag, lemmas) in tags {
                for lemma in lemmas.keys() {
                    let lemma = dict.lemmata.label(*lemma);
                    if !is_alpha(lemma) {
                        continue;
                    }
                    let found = find_affixes(wform, lemma, true);
                    if found.wform_common.is_empty() || found.wform_prefix != found.lemma_prefix {
                        continue;
                    }
                    let table = tables.entry(*tag).or_default();
                    let stem_len = found.wform_common.chars().count();
                    for cut in 0..=stem_len {
                        let wform_ending: String = found
                            .wform_common
                            .chars()
                            .skip(cut)
                            .chain(found.wform_suffix.chars())
                            .collect();
                        let lemma_ending: String = found
                            .lemma_common
                            .chars()
                            .skip(cut)
                            .chain(found.lemma_suffix.chars())
                            .collect();
                        *table
                            .entry(wform_ending)
                            .or_default()
                            .entry(lemma_ending)
                            .or_default() += 1;
                    }
                }
            }
        }
        tables
            .into_iter()
            .map(|(tag, table)| {
                let table = table
                    .into_iter()
                    .map(|(ending, lemma_endings)| {
                        let mut ranked: Vec<(String, u64)> = lemma_endings.into_iter().collect();
                        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
                        (ending, ranked)
                    })
                    .collect();
                (tag, table)
            })
            .collect()
    }

    /// Tags whose lemmas are more often capitalized than not.
    fn capitalized(&self) -> HashSet<TagId> {
        let dict = self.dict;
        let mut lower: HashMap<TagId, u64> = HashMap::new();
        let mut upper: HashMap<TagId, u64> = HashMap::new();
        for (lemma, tags) in &dict.counts.lemma_tag {
            let lemma = dict.lemmata.label(*lemma);
            if !is_alpha(lemma) {
                continue;
            }
            let side = if is_lower(lemma) { &mut lower } else { &mut upper };
            for tag in tags.keys() {
                *side.entry(*tag).or_default() += 1;
            }
        }
        upper
            .into_iter()
            .filter(|(tag, cnt)| *cnt > lower.get(tag).copied().unwrap_or(0))
            .map(|(tag, _)| tag)
            .collect()
    }

    fn tag_feats(&self) -> Vec<BTreeSet<FeatId>> {
        let mut tag_feats = vec![BTreeSet::new(); self.dict.tags.len()];
        for tags in self.dict.counts.wform_feat.values() {
            for (tag, lemmas) in tags {
                for feats in lemmas.values() {
                    tag_feats[tag.index()].extend(feats.keys().copied());
                }
            }
        }
        tag_feats
    }

    fn feat_rankings(&self) -> (Vec<Ranking<FeatId>>, Vec<HashMap<FeatId, Ranking<ValId>>>) {
        let dict = self.dict;
        let mut per_tag: Vec<FeatCounts> = vec![FeatCounts::new(); dict.tags.len()];
        for tags in dict.counts.wform_feat.values() {
            for (tag, lemmas) in tags {
                for feats in lemmas.values() {
                    add_feat_counts(&mut per_tag[tag.index()], feats);
                }
            }
        }

        let mut feats_freq = Vec::with_capacity(per_tag.len());
        let mut feat_vals_freq = Vec::with_capacity(per_tag.len());
        for feats in per_tag {
            let total: u64 = feats.values().flat_map(|vals| vals.values()).sum();
            let feat_totals: BTreeMap<FeatId, u64> = feats
                .iter()
                .map(|(feat, vals)| (*feat, vals.values().sum()))
                .collect();
            let mut ranking = rank(&feat_totals, total);
            sort_ranking(&mut ranking, &dict.feats);

            let vals_ranking = feats
                .iter()
                .map(|(feat, vals)| {
                    let mut ranked = rank(vals, feat_totals[feat]);
                    sort_ranking(&mut ranked, &dict.feat_vals[feat.index()]);
                    (*feat, ranked)
                })
                .collect();
            feats_freq.push(ranking);
            feat_vals_freq.push(vals_ranking);
        }
        (feats_freq, feat_vals_freq)
    }

    fn wform_feats(
        &self,
        tag_feats: &[BTreeSet<FeatId>],
    ) -> HashMap<WformId, HashMap<FeatId, ValId>> {
        let counts = &self.dict.counts;
        let mut trusted = HashMap::new();
        for (wform, tags) in &counts.wform_feat {
            let mut feat_cnts = FeatCounts::new();
            for (tag, lemmas) in tags {
                let lemma_cnts = counts.wform_tag.get(wform).and_then(|t| t.get(tag));
                for (lemma, feats) in lemmas {
                    let seen = lemma_cnts
                        .and_then(|l| l.get(lemma))
                        .copied()
                        .unwrap_or(0);
                    add_with_absent(&mut feat_cnts, &tag_feats[tag.index()], feats, seen);
                }
            }
            let values = self.trusted_values(&feat_cnts);
            if !values.is_empty() {
                trusted.insert(*wform, values);
            }
        }
        trusted
    }

    fn lemma_feats(
        &self,
        tag_feats: &[BTreeSet<FeatId>],
    ) -> HashMap<LemmaId, HashMap<FeatId, ValId>> {
        let counts = &self.dict.counts;
        let mut trusted = HashMap::new();
        for (lemma, tags) in &counts.lemma_feat {
            let mut feat_cnts = FeatCounts::new();
            for (tag, feats) in tags {
                let seen = counts
                    .lemma_tag
                    .get(lemma)
                    .and_then(|t| t.get(tag))
                    .copied()
                    .unwrap_or(0);
                add_with_absent(&mut feat_cnts, &tag_feats[tag.index()], feats, seen);
            }
            let values = self.trusted_values(&feat_cnts);
            if !values.is_empty() {
                trusted.insert(*lemma, values);
            }
        }
        trusted
    }

    fn trusted_values(&self, feat_cnts: &FeatCounts) -> HashMap<FeatId, ValId> {
        feat_cnts
            .iter()
            .filter_map(|(feat, vals)| {
                let (val, cnt) = arg_max(vals)?;
                self.trusted(vals.values().sum(), cnt).then_some((*feat, val))
            })
            .collect()
    }
}

fn add_feat_counts(into: &mut FeatCounts, feats: &FeatCounts) {
    for (feat, vals) in feats {
        let slot = into.entry(*feat).or_default();
        for (val, cnt) in vals {
            *slot.entry(*val).or_default() += cnt;
        }
    }
}

/// Add `feats` recorded over `seen` observations, filling the absent
/// bucket for observations that lacked a feature the tag can carry.
fn add_with_absent(
    into: &mut FeatCounts,
    tag_feats: &BTreeSet<FeatId>,
    feats: &FeatCounts,
    seen: u64,
) {
    for (feat, vals) in feats {
        let slot = into.entry(*feat).or_default();
        let mut recorded = 0;
        for (val, cnt) in vals {
            *slot.entry(*val).or_default() += cnt;
            recorded += cnt;
        }
        if seen > recorded {
            *slot.entry(ValId::ABSENT).or_default() += seen - recorded;
        }
    }
    for feat in tag_feats.iter().filter(|feat| !feats.contains_key(feat)) {
        *into
            .entry(*feat)
            .or_default()
            .entry(ValId::ABSENT)
            .or_default() += seen;
    }
}

fn rank<I: Copy>(counts: &BTreeMap<I, u64>, total: u64) -> Ranking<I> {
    counts
        .iter()
        .map(|(id, cnt)| (*id, *cnt, *cnt as f64 / total as f64))
        .collect()
}

/// Descending count, ties by descending label.
fn sort_ranking<I: DenseId>(ranking: &mut [(I, u64, f64)], labels: &Registry<I>) {
    ranking.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| labels.label(b.0).cmp(labels.label(a.0)))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DictConfig;
    use conllu_codec::parse_str;

    fn line(id: usize, form: &str, lemma: &str, tag: &str, feats: &str) -> String {
        format!("{id}\t{form}\t{lemma}\t{tag}\t_\t{feats}\t0\troot\t_\t_\n")
    }

    fn corpus(tokens: &[(&str, &str, &str, &str, usize)]) -> String {
        let mut text = String::new();
        for (form, lemma, tag, feats, times) in tokens {
            for _ in 0..*times {
                text.push_str(&line(1, form, lemma, tag, feats));
                text.push('\n');
            }
        }
        text
    }

    fn fitted(text: &str, cnt_thresh: u32, ambiguity_thresh: f64) -> CorpusDict {
        let config = DictConfig {
            cnt_thresh,
            ambiguity_thresh,
            yo_variants: true,
        };
        CorpusDict::from_corpus(parse_str(text), config).unwrap()
    }

    #[test]
    fn trusted_tags_need_count_and_agreement() {
        let text = corpus(&[
            ("стали", "стать", "VERB", "_", 3),
            ("стали", "сталь", "NOUN", "Case=Gen", 1),
            ("дом", "дом", "NOUN", "Case=Nom", 2),
        ]);
        let dict = fitted(&text, 2, 0.75);
        let trusted: BTreeMap<&str, &str> = dict
            .fitted
            .trusted_tags
            .iter()
            .map(|(w, t)| (dict.wforms.label(*w), dict.tags.label(*t)))
            .collect();
        assert_eq!(trusted, BTreeMap::from([("дом", "NOUN"), ("стали", "VERB")]));

        let dict = fitted(&text, 5, 0.75);
        assert!(dict.fitted.trusted_tags.is_empty());
        let mut dict = fitted(&text, 2, 0.9);
        assert_eq!(dict.fitted.trusted_tags.len(), 1);
        dict.fit_with(2, 0.5);
        assert_eq!(dict.fitted.trusted_tags.len(), 2);
        assert_eq!(dict.config.cnt_thresh, 2);
    }

    #[test]
    fn ending_tables() {
        let text = corpus(&[
            ("кошки", "кошка", "NOUN", "_", 1),
            ("мышки", "мышка", "NOUN", "_", 1),
            ("Коля", "Николай", "PROPN", "_", 1),
        ]);
        let dict = fitted(&text, 1, 1.0);
        let noun = dict.tags.get("NOUN").unwrap();
        let table = &dict.fitted.endings[&noun];
        assert_eq!(table["и"], [("а".to_string(), 2)]);
        assert_eq!(table["ки"], [("ка".to_string(), 2)]);
        assert_eq!(table["шки"], [("шка".to_string(), 2)]);
        assert_eq!(table["кошки"], [("кошка".to_string(), 1)]);
        // prefixes differ: "" vs "нико"
        let propn = dict.tags.get("PROPN").unwrap();
        assert!(!dict.fitted.endings.contains_key(&propn));
    }

    #[test]
    fn absent_bucket_counts_missing_features() {
        let text = corpus(&[
            ("бы", "бы", "PART", "Mood=Cnd", 1),
            ("бы", "бы", "PART", "_", 3),
        ]);
        let dict = fitted(&text, 1, 0.7);
        let wform = dict.wforms.get("бы").unwrap();
        let mood = dict.feats.get("Mood").unwrap();
        assert_eq!(dict.fitted.wform_feats[&wform][&mood], ValId::ABSENT);

        let dict = fitted(&text, 1, 0.8);
        assert!(dict.fitted.wform_feats.is_empty());
        assert!(dict.fitted.lemma_feats.is_empty());
    }
}
