use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use conllu_types::{FORM, FeatMap, Field, ID, Metadata, Sentence};
use tracing::info;

use crate::error::{CodecError, Result};
use crate::reader::ConlluReader;
use crate::writer::meta_lines;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeOptions {
    /// Keep the first corpus' metadata untouched.
    pub ignore_new_meta: bool,
    /// Fail whenever both corpora carry different non-empty values.
    /// `FORM` mismatches fail regardless.
    pub stop_on_error: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            ignore_new_meta: false,
            stop_on_error: true,
        }
    }
}

/// Sentence-by-sentence merge of two corpora over the same text. Stops at
/// the end of the shorter one.
pub struct Merge<L, R> {
    left: L,
    right: R,
    options: MergeOptions,
}

pub fn merge<L, R>(left: L, right: R, options: MergeOptions) -> Merge<L::IntoIter, R::IntoIter>
where
    L: IntoIterator<Item = Result<Sentence>>,
    R: IntoIterator<Item = Result<Sentence>>,
{
    Merge {
        left: left.into_iter(),
        right: right.into_iter(),
        options,
    }
}

/// Merge two CoNLL-U files as loaded, without normalization.
pub fn merge_files<P1, P2>(
    first: P1,
    second: P2,
    encoding: &str,
    options: MergeOptions,
) -> Result<Merge<ConlluReader<BufReader<File>>, ConlluReader<BufReader<File>>>>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    info!(
        "merging {} with {}",
        first.as_ref().display(),
        second.as_ref().display()
    );
    let left = ConlluReader::open_with_encoding(first, encoding)?;
    let right = ConlluReader::open_with_encoding(second, encoding)?;
    Ok(merge(left, right, options))
}

impl<L, R> Iterator for Merge<L, R>
where
    L: Iterator<Item = Result<Sentence>>,
    R: Iterator<Item = Result<Sentence>>,
{
    type Item = Result<Sentence>;

    fn next(&mut self) -> Option<Self::Item> {
        let left = match self.left.next()? {
            Ok(sentence) => sentence,
            Err(err) => return Some(Err(err)),
        };
        let right = match self.right.next()? {
            Ok(sentence) => sentence,
            Err(err) => return Some(Err(err)),
        };
        Some(merge_sentence(left, &right, self.options))
    }
}

/// Fold `right` into `left`.
pub fn merge_sentence(
    mut left: Sentence,
    right: &Sentence,
    options: MergeOptions,
) -> Result<Sentence> {
    let strict = options.stop_on_error;

    if !options.ignore_new_meta {
        for (key, value2) in right.meta.iter() {
            let Some(value2) = value2 else {
                continue;
            };
            if strict {
                if let Some(Some(value1)) = left.meta.get(key) {
                    if value1 != value2 {
                        return Err(conflict(
                            format!("values of meta {key:?}"),
                            value1,
                            value2,
                            &left.meta,
                            &right.meta,
                        ));
                    }
                }
            }
            left.meta.insert(key, Some(value2.clone()));
        }
    }

    for (token1, token2) in left.tokens.iter_mut().zip(&right.tokens) {
        for (key, field2) in token2.iter() {
            if field2.is_null() {
                continue;
            }
            match token1.get_mut(key) {
                Some(Field::Map(map1)) => match field2 {
                    Field::Map(map2) => {
                        merge_feats(key, map1, map2, strict, &left.meta, &right.meta)?
                    }
                    Field::Text(value2) => {
                        if strict {
                            return Err(conflict(
                                format!("types of field {key:?}"),
                                &render(map1),
                                value2.as_deref().unwrap_or("_"),
                                &left.meta,
                                &right.meta,
                            ));
                        }
                    }
                },
                Some(Field::Text(Some(value1))) => match field2 {
                    Field::Map(map2) => {
                        if strict {
                            return Err(conflict(
                                format!("types of field {key:?}"),
                                value1,
                                &render(map2),
                                &left.meta,
                                &right.meta,
                            ));
                        }
                    }
                    Field::Text(Some(value2)) => {
                        if value1 != value2 {
                            let tolerated = key == ID && options.ignore_new_meta;
                            if (strict && !tolerated) || key == FORM {
                                return Err(conflict(
                                    format!("values of field {key:?}"),
                                    value1,
                                    value2,
                                    &left.meta,
                                    &right.meta,
                                ));
                            }
                            *value1 = value2.clone();
                        }
                    }
                    Field::Text(None) => {}
                },
                _ => {
                    if key == FORM {
                        return Err(conflict(
                            format!("values of field {key:?}"),
                            "_",
                            field2.as_text().unwrap_or_default(),
                            &left.meta,
                            &right.meta,
                        ));
                    }
                    token1.set(key, field2.clone());
                }
            }
        }
    }
    Ok(left)
}

fn merge_feats(
    column: &str,
    map1: &mut FeatMap,
    map2: &FeatMap,
    strict: bool,
    meta1: &Metadata,
    meta2: &Metadata,
) -> Result<()> {
    for (key, value2) in map2.iter() {
        if strict {
            if let Some(value1) = map1.get(key) {
                if value1 != value2 {
                    return Err(conflict(
                        format!("values of feat \"{column}:{key}\""),
                        value1,
                        value2,
                        meta1,
                        meta2,
                    ));
                }
            }
        }
        map1.insert(key, value2.clone());
    }
    Ok(())
}

fn render(map: &FeatMap) -> String {
    map.iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("|")
}

fn conflict(
    what: String,
    left: &str,
    right: &str,
    meta1: &Metadata,
    meta2: &Metadata,
) -> CodecError {
    CodecError::MergeConflict {
        what,
        left: left.to_string(),
        right: right.to_string(),
        meta_left: meta_lines(meta1).join(" "),
        meta_right: meta_lines(meta2).join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_str;

    fn merged(first: &str, second: &str, options: MergeOptions) -> Result<Vec<Sentence>> {
        merge(parse_str(first), parse_str(second), options).collect()
    }

    const TAGGED: &str = "# sent_id = 1\n# text = Мама мыла\n\
                          1\tМама\tмама\tNOUN\t_\tCase=Nom\t_\t_\t_\t_\n\
                          2\tмыла\tмыть\tVERB\t_\t_\t_\t_\t_\t_\n\n";
    const PARSED: &str = "# sent_id = 1\n# parser = v2\n\
                          1\tМама\t_\t_\t_\tAnimacy=Anim\t2\tnsubj\t_\t_\n\
                          2\tмыла\t_\t_\t_\t_\t0\troot\t_\tSpaceAfter=No\n\n";

    #[test]
    fn folds_fields_and_metadata() {
        let out = merged(TAGGED, PARSED, MergeOptions::default()).unwrap();
        let s = &out[0];
        assert_eq!(s.meta.get("parser"), Some(&Some("v2".to_string())));
        assert_eq!(s.tokens[0].lemma(), Some("мама"));
        assert_eq!(s.tokens[0].head(), Some("2"));
        let feats = s.tokens[0].feats().unwrap();
        assert_eq!(feats.get("Case").map(String::as_str), Some("Nom"));
        assert_eq!(feats.get("Animacy").map(String::as_str), Some("Anim"));
        assert!(s.tokens[1].misc().unwrap().contains_key("SpaceAfter"));
    }

    #[test]
    fn ignore_new_meta_keeps_first() {
        let options = MergeOptions {
            ignore_new_meta: true,
            ..MergeOptions::default()
        };
        let out = merged(TAGGED, PARSED, options).unwrap();
        assert!(!out[0].meta.contains_key("parser"));
    }

    #[test]
    fn form_mismatch_always_fails() {
        let other = PARSED.replace("мыла", "мыл");
        let options = MergeOptions {
            stop_on_error: false,
            ..MergeOptions::default()
        };
        let err = merged(TAGGED, &other, options).unwrap_err();
        match err {
            CodecError::MergeConflict { what, left, right, meta_left, .. } => {
                assert_eq!(what, "values of field \"FORM\"");
                assert_eq!(left, "мыла");
                assert_eq!(right, "мыл");
                assert!(meta_left.contains("sent_id = 1"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn strict_mode_rejects_different_values() {
        let other = PARSED.replace("Animacy=Anim", "Case=Gen");
        assert!(matches!(
            merged(TAGGED, &other, MergeOptions::default()),
            Err(CodecError::MergeConflict { .. })
        ));

        let lenient = MergeOptions {
            stop_on_error: false,
            ..MergeOptions::default()
        };
        let out = merged(TAGGED, &other, lenient).unwrap();
        let case = out[0].tokens[0].feats().unwrap().get("Case").cloned();
        assert_eq!(case.as_deref(), Some("Gen"));
    }

    #[test]
    fn strict_metadata_conflict() {
        let other = PARSED.replace("sent_id = 1", "sent_id = 9");
        let err = merged(TAGGED, &other, MergeOptions::default()).unwrap_err();
        assert!(err.to_string().contains("values of meta \"sent_id\""), "{err}");
    }

    #[test]
    fn ids_may_differ_when_metadata_is_ignored() {
        let other = PARSED.replacen("1\tМама", "7\tМама", 1);
        let options = MergeOptions {
            ignore_new_meta: true,
            stop_on_error: true,
        };
        let out = merged(TAGGED, &other, options).unwrap();
        assert_eq!(out[0].tokens[0].id(), Some("7"));
        assert!(merged(TAGGED, &other, MergeOptions::default()).is_err());
    }
}
