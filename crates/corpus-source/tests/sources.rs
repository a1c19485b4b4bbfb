use std::fs;

use conllu_codec::Result as CodecResult;
use conllu_types::Sentence;
use corpus_source::{
    AdjustedForSpeech, ConlluCorpus, CorpusSource, MemoryCorpus, Part, SourceError,
    StorageConfig, UniversalDependencies,
};
use tempfile::tempdir;

const TRAIN: &str = "1\tКошка\tкошка\tNOUN\t_\t_\t0\troot\t_\t_\n\
                     2\t!\t!\tPUNCT\t_\t_\t1\tpunct\t_\t_\n\n";
const TEST: &str = "1\tПёс\tпёс\tNOUN\t_\t_\t0\troot\t_\t_\n\n";

fn collect(source: &dyn CorpusSource, part: Part) -> Vec<Sentence> {
    source
        .open(part)
        .unwrap()
        .collect::<CodecResult<_>>()
        .unwrap()
}

#[test]
fn conllu_corpus_reopens_parts() {
    let dir = tempdir().unwrap();
    let train = dir.path().join("train.conllu");
    fs::write(&train, TRAIN).unwrap();
    let corpus = ConlluCorpus::new("toy").with_part(Part::Train, &train);

    let first = collect(&corpus, Part::Train);
    let second = collect(&corpus, Part::Train);
    assert_eq!(first, second);
    assert_eq!(first[0].text(), Some("Кошка !"));
    assert!(matches!(
        corpus.dev().err().unwrap(),
        SourceError::PartNotAvailable { part: Part::Dev, .. }
    ));
}

#[test]
fn missing_file_is_reported() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::new(dir.path());
    let corpus = ConlluCorpus::syntagrus(&config);
    let err = corpus.train().err().unwrap();
    match err {
        SourceError::MissingFile { corpus, path } => {
            assert_eq!(corpus, "SynTagRus");
            assert!(path.ends_with("corpus/syntagrus/ru_syntagrus-ud-train.conllu"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn universal_dependencies_finds_parts() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::new(dir.path());
    let ud = UniversalDependencies::new("UD_Russian-Toy", &config);
    assert!(matches!(ud.train().err().unwrap(), SourceError::MissingFile { .. }));

    fs::create_dir_all(ud.dir()).unwrap();
    fs::write(ud.dir().join("ru_toy-ud-train.conllu"), TRAIN).unwrap();
    fs::write(ud.dir().join("ru_toy-ud-test.conllu"), TEST).unwrap();
    fs::write(ud.dir().join("README.md"), "toy").unwrap();

    assert_eq!(collect(&ud, Part::Train).len(), 1);
    assert_eq!(collect(&ud, Part::Test)[0].tokens[0].form(), Some("Пёс"));
    assert!(matches!(
        ud.dev().err().unwrap(),
        SourceError::PartNotAvailable { part: Part::Dev, .. }
    ));
}

#[test]
fn speech_adapter_wraps_any_source() {
    let sentences: Vec<Sentence> = conllu_codec::parse_str(TRAIN)
        .collect::<CodecResult<_>>()
        .unwrap();
    let memory = MemoryCorpus::new("memory").with_part(Part::Train, sentences);
    let speech = AdjustedForSpeech::new(memory);

    assert_eq!(speech.name(), "memory");
    let out = collect(&speech, Part::Train);
    assert_eq!(out[0].tokens.len(), 1);
    assert_eq!(out[0].tokens[0].form(), Some("кошка"));
    assert_eq!(out[0].text(), Some("кошка"));
    assert!(speech.test().is_err());
}
