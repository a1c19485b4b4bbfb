use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::counts::{Counts, FeatCounts};
use crate::error::{DictError, Result};
use crate::ids::{DenseId, FeatId, LemmaId, TagId, ValId, WformId};
use crate::registry::Registry;
use crate::{CorpusDict, DictConfig};

pub const SNAPSHOT_FORMAT: u32 = 1;

/// Everything needed to rebuild a dictionary: thresholds, label
/// registries and the raw count tables. Fitted tables are recomputed on
/// restore.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format: u32,
    pub cnt_thresh: u32,
    pub ambiguity_thresh: f64,
    pub wforms: BTreeMap<String, WformId>,
    pub lemmata: BTreeMap<String, LemmaId>,
    pub tags: BTreeMap<String, TagId>,
    pub feats: BTreeMap<String, FeatId>,
    /// Indexed by feature id.
    pub feat_vals: Vec<BTreeMap<String, ValId>>,
    pub counts: Counts,
}

impl CorpusDict {
    pub fn backup(&self) -> Snapshot {
        Snapshot {
            format: SNAPSHOT_FORMAT,
            cnt_thresh: self.config.cnt_thresh,
            ambiguity_thresh: self.config.ambiguity_thresh,
            wforms: self.wforms.to_map(),
            lemmata: self.lemmata.to_map(),
            tags: self.tags.to_map(),
            feats: self.feats.to_map(),
            feat_vals: self.feat_vals.iter().map(Registry::to_map).collect(),
            counts: self.counts.clone(),
        }
    }

    /// Rebuild a dictionary from `snapshot` and fit it.
    pub fn restore(snapshot: Snapshot) -> Result<Self> {
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(DictError::InvalidSnapshot(format!(
                "unsupported format {}",
                snapshot.format
            )));
        }
        let feats = Registry::from_map(snapshot.feats, "feature")?;
        if snapshot.feat_vals.len() != feats.len() {
            return Err(DictError::InvalidSnapshot(format!(
                "{} features but {} value registries",
                feats.len(),
                snapshot.feat_vals.len()
            )));
        }
        let feat_vals = snapshot
            .feat_vals
            .into_iter()
            .map(|vals| {
                let vals = Registry::from_map(vals, "feature value")?;
                if vals.get("_") != Some(ValId::ABSENT) {
                    return Err(DictError::InvalidSnapshot(
                        "feature values must start with `_`".to_string(),
                    ));
                }
                Ok(vals)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut dict = CorpusDict {
            config: DictConfig {
                cnt_thresh: snapshot.cnt_thresh,
                ambiguity_thresh: snapshot.ambiguity_thresh,
                ..DictConfig::default()
            },
            wforms: Registry::from_map(snapshot.wforms, "word form")?,
            lemmata: Registry::from_map(snapshot.lemmata, "lemma")?,
            tags: Registry::from_map(snapshot.tags, "tag")?,
            feats,
            feat_vals,
            counts: snapshot.counts,
            fitted: Default::default(),
        };
        dict.check_counts()?;
        dict.fit();
        Ok(dict)
    }

    pub fn backup_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut out, &self.backup())?;
        out.flush()?;
        info!("dictionary saved to {}", path.display());
        Ok(())
    }

    pub fn restore_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let snapshot: Snapshot = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        info!("dictionary restored from {}", path.display());
        Self::restore(snapshot)
    }

    /// Every id in the count tables must be registered.
    fn check_counts(&self) -> Result<()> {
        fn check<I: DenseId>(id: I, registry: &Registry<I>, what: &str) -> Result<()> {
            if id.index() < registry.len() {
                Ok(())
            } else {
                Err(DictError::InvalidSnapshot(format!(
                    "count table refers to unknown {what} id {}",
                    id.index()
                )))
            }
        }
        let check_feats = |feats: &FeatCounts| -> Result<()> {
            for (feat, vals) in feats {
                check(*feat, &self.feats, "feature")?;
                for val in vals.keys() {
                    check(*val, &self.feat_vals[feat.index()], "feature value")?;
                }
            }
            Ok(())
        };

        let counts = &self.counts;
        for (wform, tags) in &counts.wform_tag {
            check(*wform, &self.wforms, "word form")?;
            for (tag, lemmas) in tags {
                check(*tag, &self.tags, "tag")?;
                for lemma in lemmas.keys() {
                    check(*lemma, &self.lemmata, "lemma")?;
                }
            }
        }
        for (lemma, tags) in &counts.lemma_tag {
            check(*lemma, &self.lemmata, "lemma")?;
            for tag in tags.keys() {
                check(*tag, &self.tags, "tag")?;
            }
        }
        for (wform, tags) in &counts.wform_feat {
            check(*wform, &self.wforms, "word form")?;
            for (tag, lemmas) in tags {
                check(*tag, &self.tags, "tag")?;
                for (lemma, feats) in lemmas {
                    check(*lemma, &self.lemmata, "lemma")?;
                    check_feats(feats)?;
                }
            }
        }
        for (lemma, tags) in &counts.lemma_feat {
            check(*lemma, &self.lemmata, "lemma")?;
            for (tag, feats) in tags {
                check(*tag, &self.tags, "tag")?;
                check_feats(feats)?;
            }
        }
        Ok(())
    }
}
