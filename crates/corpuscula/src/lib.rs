//! Command-line front end over the CoNLL-U codec, the corpus sources and
//! the corpus dictionary.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{annotate, build_dict, fix_corpus, merge_corpora, run, storage, training_file};
