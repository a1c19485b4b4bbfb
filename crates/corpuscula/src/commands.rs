use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::iter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use conllu_codec::{
    ConlluWriter, FixOptions, LoadOptions, MergeOptions, fix, from_sentence, load, merge_files,
};
use conllu_types::{FEATS, FeatMap, Field, LEMMA, MISC, Sentence, UPOS, std_columns};
use corpus_dict::{CorpusDict, DictConfig, Prediction};
use corpus_source::{
    ConlluCorpus, CorpusSource, Part, StorageConfig, UniversalDependencies, default_config_path,
};
use tracing::info;

use crate::cli::{Cli, Commands, dict_config, fix_options, merge_options};

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Fix {
            input,
            output,
            split_multi,
            speech,
            encoding,
        } => {
            let out = open_output(output.as_deref())?;
            let written = fix_corpus(&input, &encoding, fix_options(split_multi, speech), out)?;
            info!("{written} sentences written");
        }
        Commands::Merge {
            first,
            second,
            output,
            ignore_new_meta,
            lenient,
            encoding,
        } => {
            let out = open_output(output.as_deref())?;
            let options = merge_options(ignore_new_meta, lenient);
            let written = merge_corpora(&first, &second, &encoding, options, out)?;
            info!("{written} sentences written");
        }
        Commands::BuildDict {
            input,
            ud,
            output,
            cnt_thresh,
            ambiguity_thresh,
            no_yo,
        } => {
            let config = dict_config(cnt_thresh, ambiguity_thresh, no_yo);
            let dict = match (input, ud) {
                (Some(input), _) => build_dict(&training_file(&input), config)?,
                (None, Some(name)) => {
                    let storage = StorageConfig::resolve(cli.root)?;
                    build_dict(&UniversalDependencies::new(&name, &storage), config)?
                }
                (None, None) => anyhow::bail!("nothing to build the dictionary from"),
            };
            dict.backup_to(&output)
                .with_context(|| format!("failed to write {}", output.display()))?;
        }
        Commands::Predict { dict, tag, words } => {
            let dict = CorpusDict::restore_from(&dict)
                .with_context(|| format!("failed to load dictionary {}", dict.display()))?;
            let sentence = annotate(&dict, &words, tag.as_deref())?;
            let mut writer = ConlluWriter::new(io::stdout().lock());
            writer.write_sentence(&sentence)?;
            writer.flush()?;
        }
        Commands::Storage { set_root } => {
            let root = storage(cli.root, set_root, default_config_path().as_deref())?;
            println!("{}", root.display());
        }
    }
    Ok(())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

/// Normalize `input` into `out`. Returns the number of sentences written.
pub fn fix_corpus<W: Write>(
    input: &Path,
    encoding: &str,
    options: FixOptions,
    out: W,
) -> Result<usize> {
    let load_options = LoadOptions {
        encoding: encoding.to_string(),
        fix: true,
        fix_options: options,
    };
    let sentences = load(input, &load_options)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let mut writer = ConlluWriter::new(out);
    let written = writer
        .write_all(sentences)
        .with_context(|| format!("failed to fix {}", input.display()))?;
    writer.flush()?;
    Ok(written)
}

pub fn merge_corpora<W: Write>(
    first: &Path,
    second: &Path,
    encoding: &str,
    options: MergeOptions,
    out: W,
) -> Result<usize> {
    let merged = merge_files(first, second, encoding, options)?;
    let mut writer = ConlluWriter::new(out);
    let written = writer.write_all(merged).with_context(|| {
        format!("failed to merge {} with {}", first.display(), second.display())
    })?;
    writer.flush()?;
    Ok(written)
}

/// A single file treated as the train part of a corpus named after it.
pub fn training_file(path: &Path) -> ConlluCorpus {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "corpus".to_string());
    ConlluCorpus::new(name).with_part(Part::Train, path)
}

pub fn build_dict(source: &dyn CorpusSource, config: DictConfig) -> Result<CorpusDict> {
    let mut dict = CorpusDict::new(config);
    dict.ingest_source(source, false)
        .with_context(|| format!("failed to ingest {}", source.name()))?;
    dict.fit();
    Ok(dict)
}

/// Annotate `words` as one sentence: UPOS, LEMMA and FEATS come from the
/// dictionary, their confidences go to MISC. A given `tag` replaces tag
/// prediction; words with no tag stay unannotated.
pub fn annotate<I, W>(dict: &CorpusDict, words: I, tag: Option<&str>) -> Result<Sentence>
where
    I: IntoIterator<Item = W>,
    W: AsRef<str>,
{
    let columns = std_columns();
    let tokens = from_sentence(words, columns.as_slice());
    let mut fixed = fix(iter::once(Ok(Sentence::from_tokens(tokens))), FixOptions::default());
    let mut sentence = fixed.next().context("no sentence to annotate")??;

    for (i, token) in sentence.tokens.iter_mut().enumerate() {
        let Some(form) = token.form().map(str::to_string) else {
            continue;
        };
        let predicted = match tag {
            Some(tag) => Some(Prediction::new(tag, 1.0)),
            None => dict.predict_tag(&form, i == 0),
        };
        let Some(tag) = predicted else {
            continue;
        };
        let lemma = dict.predict_lemma(&form, tag.value, i == 0)?;
        let mut feats = FeatMap::new();
        for feat in dict.tag_feats(tag.value)? {
            let value = dict
                .predict_feat(feat, &form, &lemma.value, tag.value)?
                .and_then(|prediction| prediction.value);
            if let Some(value) = value {
                feats.insert(feat, value.to_string());
            }
        }

        token.set_text(UPOS, Some(tag.value.to_string()));
        token.set_text(LEMMA, Some(lemma.value.clone()));
        token.set(FEATS, Field::Map(feats));
        if let Some(misc) = token.map_mut(MISC) {
            misc.insert("TagConf", format!("{:.2}", tag.confidence));
            misc.insert("LemmaConf", format!("{:.2}", lemma.confidence));
        }
    }
    Ok(sentence)
}

/// Store `set_root` in `config_file` when given; otherwise resolve the
/// storage root. Returns the root in effect.
pub fn storage(
    root: Option<PathBuf>,
    set_root: Option<PathBuf>,
    config_file: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(new_root) = set_root {
        let file = config_file.context("no home directory to keep the storage config in")?;
        StorageConfig::new(&new_root).save(file)?;
        return Ok(new_root);
    }
    let config = StorageConfig::resolve_with(root, |key| std::env::var(key).ok(), config_file)?;
    Ok(config.root().to_path_buf())
}
