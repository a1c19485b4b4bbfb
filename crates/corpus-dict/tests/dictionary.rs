use std::fs;

use conllu_codec::parse_str;
use corpus_dict::{CorpusDict, DictConfig, DictError, Prediction};
use corpus_source::{ConlluCorpus, MemoryCorpus, Part};
use tempfile::tempdir;

/// "искусства" is mostly a NOUN, mostly of "искусство", mostly genitive,
/// yet never unanimously so.
fn art_corpus() -> String {
    let mut text = String::new();
    let mut push = |form: &str, lemma: &str, tag: &str, feats: &str, times: usize| {
        for _ in 0..times {
            text.push_str(&format!("1\t{form}\t{lemma}\t{tag}\t_\t{feats}\t0\troot\t_\t_\n\n"));
        }
    };
    push("искусства", "искусство", "NOUN", "Case=Gen", 80);
    push("искусства", "искусств", "NOUN", "Case=Nom", 20);
    push("Искусства", "искусствовать", "VERB", "_", 25);
    push("искусство", "искусство", "NOUN", "Case=Nom", 5);
    text
}

fn art_dict() -> CorpusDict {
    CorpusDict::from_corpus(parse_str(&art_corpus()), DictConfig::default()).unwrap()
}

type ArtPredictions = (Prediction<String>, Prediction<String>, Prediction<Option<String>>);

fn art_predictions(dict: &CorpusDict) -> ArtPredictions {
    let tag = dict.predict_tag("искусства", false).unwrap();
    let lemma = dict.predict_lemma("искусства", "NOUN", false).unwrap();
    let feat = dict
        .predict_feat("Case", "искусства", "искусство", "NOUN")
        .unwrap()
        .unwrap();
    (
        Prediction::new(tag.value.to_string(), tag.confidence),
        lemma,
        Prediction::new(feat.value.map(str::to_string), feat.confidence),
    )
}

#[test]
fn margin_scored_predictions() {
    let dict = art_dict();
    let (tag, lemma, feat) = art_predictions(&dict);
    assert_eq!(tag, Prediction::new("NOUN".to_string(), 0.75));
    assert_eq!(lemma, Prediction::new("искусство".to_string(), 0.75));
    assert_eq!(feat, Prediction::new(Some("Gen".to_string()), 0.75));
    assert_eq!(dict.most_common_tag(), Some("NOUN"));
}

#[test]
fn snapshot_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dict.json");
    let dict = art_dict();
    dict.backup_to(&path).unwrap();

    let restored = CorpusDict::restore_from(&path).unwrap();
    assert_eq!(restored.counts(), dict.counts());
    assert_eq!(restored.backup(), dict.backup());
    assert_eq!(art_predictions(&restored), art_predictions(&dict));
    assert_eq!(restored.tags_freq(), dict.tags_freq());

    fs::write(&path, "{\"format\": 1}").unwrap();
    assert!(matches!(CorpusDict::restore_from(&path), Err(DictError::Json(_))));
}

#[test]
fn ingests_sources_and_files() {
    let dir = tempdir().unwrap();
    let train = dir.path().join("train.conllu");
    fs::write(&train, art_corpus()).unwrap();

    let mut from_file = CorpusDict::new(DictConfig::default());
    let stats = from_file.ingest_path(&train, false).unwrap();
    assert_eq!((stats.sentences, stats.tokens, stats.yo_variants), (130, 130, 0));

    let corpus = ConlluCorpus::new("art").with_part(Part::Train, &train);
    let mut from_source = CorpusDict::new(DictConfig::default());
    from_source.ingest_source(&corpus, false).unwrap();
    assert_eq!(from_source.counts(), from_file.counts());

    let no_train = MemoryCorpus::new("empty").with_part(Part::Test, Vec::new());
    let err = CorpusDict::default().ingest_source(&no_train, false).unwrap_err();
    assert!(matches!(err, DictError::Source(_)), "{err}");
}

#[test]
fn appending_a_second_corpus() {
    let mut dict = art_dict();
    assert!(!dict.is_empty());
    let more = "1\tискусства\tискусство\tNOUN\t_\tCase=Gen\t0\troot\t_\t_\n\n";
    assert!(matches!(dict.ingest(parse_str(more), false), Err(DictError::NotEmpty)));
    dict.ingest(parse_str(more), true).unwrap();
    dict.fit();
    let lemma = dict.predict_lemma("искусства", "NOUN", false).unwrap();
    assert_eq!(lemma.confidence, 61.0 / 81.0);
}
