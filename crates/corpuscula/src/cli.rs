use std::path::PathBuf;

use clap::{Parser, Subcommand};
use conllu_codec::{FixOptions, MergeOptions};
use corpus_dict::DictConfig;

#[derive(Debug, Parser)]
#[command(name = "corpuscula")]
#[command(about = "CoNLL-U corpus tools and corpus dictionary")]
pub struct Cli {
    /// Corpus storage root. Defaults to $CORPUSCULA_ROOT, then ~/.corpuscula.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Renumber tokens and fill in sent_id and text.
    Fix {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Replace multiword tokens by their parts.
        #[arg(long, default_value_t = false)]
        split_multi: bool,
        /// Drop punctuation and lowercase forms and lemmas.
        #[arg(long, default_value_t = false)]
        speech: bool,
        #[arg(long, default_value = "utf-8")]
        encoding: String,
    },
    /// Fold the annotation of a second corpus into the first.
    Merge {
        first: PathBuf,
        second: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        ignore_new_meta: bool,
        /// Only conflicting word forms are errors.
        #[arg(long, default_value_t = false)]
        lenient: bool,
        #[arg(long, default_value = "utf-8")]
        encoding: String,
    },
    /// Count a corpus into a dictionary snapshot.
    BuildDict {
        /// CoNLL-U training file.
        #[arg(required_unless_present = "ud")]
        input: Option<PathBuf>,
        /// Universal Dependencies treebank in the corpus storage instead.
        #[arg(long, conflicts_with = "input")]
        ud: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 20)]
        cnt_thresh: u32,
        #[arg(long, default_value_t = 1.0)]
        ambiguity_thresh: f64,
        /// Do not count `ё` word forms under their `е` spelling.
        #[arg(long, default_value_t = false)]
        no_yo: bool,
    },
    /// Tag, lemmatize and add features to a sentence with a dictionary.
    Predict {
        #[arg(long)]
        dict: PathBuf,
        /// Use this tag for every word instead of predicting it.
        #[arg(long)]
        tag: Option<String>,
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Show the corpus storage root, or store a new one.
    Storage {
        #[arg(long)]
        set_root: Option<PathBuf>,
    },
}

pub fn fix_options(split_multi: bool, speech: bool) -> FixOptions {
    FixOptions {
        split_multi,
        adjust_for_speech: speech,
    }
}

pub fn merge_options(ignore_new_meta: bool, lenient: bool) -> MergeOptions {
    MergeOptions {
        ignore_new_meta,
        stop_on_error: !lenient,
    }
}

pub fn dict_config(cnt_thresh: u32, ambiguity_thresh: f64, no_yo: bool) -> DictConfig {
    DictConfig {
        cnt_thresh,
        ambiguity_thresh,
        yo_variants: !no_yo,
    }
}
