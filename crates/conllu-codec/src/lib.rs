//! CoNLL-U and CoNLL-U Plus codec.
//!
//! Everything here streams: [`ConlluReader`] pulls one sentence at a time,
//! [`Fixer`] and [`Merge`] are iterator adapters over
//! `Result<Sentence, CodecError>` items and [`ConlluWriter`] writes sentences
//! as they arrive.
//!
//! ```rust
//! use conllu_codec::{FixOptions, fix, parse_str, to_string};
//!
//! let text = "3\tМама\tмама\tNOUN\t_\t_\t4\tnsubj\t_\t_\n\
//!             4\tмыла\tмыть\tVERB\t_\t_\t0\troot\t_\t_\n";
//! let out = to_string(fix(parse_str(text), FixOptions::default())).unwrap();
//! assert!(out.starts_with("# sent_id = 1\n# text = Мама мыла\n1\tМама"));
//! assert!(out.contains("\t2\tnsubj\t"));
//! ```

mod build;
mod error;
mod fix;
mod merge;
mod reader;
mod writer;

use std::path::Path;

use conllu_types::Sentence;

pub use build::{from_sentence, from_sentences};
pub use error::{CodecError, Result};
pub use fix::{FixOptions, Fixer, fix, restore_text};
pub use merge::{Merge, MergeOptions, merge, merge_files, merge_sentence};
pub use reader::{ConlluReader, parse_str, resolve_encoding};
pub use writer::{ConlluWriter, meta_lines, save, to_string};

/// Boxed sentence stream, as returned by [`load`].
pub type Sentences = Box<dyn Iterator<Item = Result<Sentence>>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOptions {
    /// Encoding label, see [`resolve_encoding`].
    pub encoding: String,
    /// Pipe the sentences through [`fix`].
    pub fix: bool,
    pub fix_options: FixOptions,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            fix: true,
            fix_options: FixOptions::default(),
        }
    }
}

/// Open a CoNLL-U file as a lazy sentence stream.
pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Sentences> {
    let reader = ConlluReader::open_with_encoding(path, &options.encoding)?;
    Ok(if options.fix {
        Box::new(fix(reader, options.fix_options))
    } else {
        Box::new(reader)
    })
}
