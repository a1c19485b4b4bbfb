use std::collections::{BTreeMap, HashMap};

use crate::error::{DictError, Result};
use crate::ids::DenseId;

/// Interned labels with dense ids in first-seen order. Ids are never
/// reused or removed.
#[derive(Clone, Debug)]
pub struct Registry<I> {
    labels: Vec<String>,
    ids: HashMap<String, I>,
}

impl<I> Default for Registry<I> {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            ids: HashMap::new(),
        }
    }
}

impl<I: DenseId> Registry<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<I> {
        self.ids.get(label).copied()
    }

    /// Label of a registered id.
    pub fn label(&self, id: I) -> &str {
        &self.labels[id.index()]
    }

    /// Id of `label`, registering it when unseen.
    pub fn register(&mut self, label: &str) -> I {
        if let Some(id) = self.ids.get(label) {
            return *id;
        }
        let id = I::from(self.labels.len() as u32);
        self.labels.push(label.to_string());
        self.ids.insert(label.to_string(), id);
        id
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &str)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| (I::from(i as u32), label.as_str()))
    }

    pub fn to_map(&self) -> BTreeMap<String, I> {
        self.ids.iter().map(|(label, id)| (label.clone(), *id)).collect()
    }

    /// Rebuild from a label→id mapping. The ids must be exactly
    /// `0..map.len()`.
    pub fn from_map(map: BTreeMap<String, I>, what: &str) -> Result<Self> {
        let mut slots: Vec<Option<String>> = vec![None; map.len()];
        for (label, id) in &map {
            let slot = slots.get_mut(id.index()).ok_or_else(|| {
                DictError::InvalidSnapshot(format!("{what} id {} is out of range", id.index()))
            })?;
            if slot.is_some() {
                return Err(DictError::InvalidSnapshot(format!(
                    "{what} id {} is used twice",
                    id.index()
                )));
            }
            *slot = Some(label.clone());
        }
        // Every slot is filled: n distinct ids below n.
        let labels = slots.into_iter().flatten().collect();
        Ok(Self {
            labels,
            ids: map.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TagId;

    #[test]
    fn ids_follow_first_sight() {
        let mut tags: Registry<TagId> = Registry::new();
        assert_eq!(tags.register("NOUN"), TagId(0));
        assert_eq!(tags.register("VERB"), TagId(1));
        assert_eq!(tags.register("NOUN"), TagId(0));
        assert_eq!(tags.label(TagId(1)), "VERB");
        assert_eq!(tags.get("ADJ"), None);
        assert_eq!(tags.labels().collect::<Vec<_>>(), ["NOUN", "VERB"]);
    }

    #[test]
    fn rebuilds_from_map() {
        let mut tags: Registry<TagId> = Registry::new();
        for tag in ["X", "A", "M"] {
            tags.register(tag);
        }
        let back = Registry::from_map(tags.to_map(), "tag").unwrap();
        assert_eq!(back.labels().collect::<Vec<_>>(), ["X", "A", "M"]);

        let gap = BTreeMap::from([("A".to_string(), TagId(0)), ("B".to_string(), TagId(2))]);
        assert!(matches!(
            Registry::from_map(gap, "tag"),
            Err(DictError::InvalidSnapshot(_))
        ));
        let twice = BTreeMap::from([("A".to_string(), TagId(1)), ("B".to_string(), TagId(1))]);
        assert!(Registry::from_map(twice, "tag").is_err());
    }
}
