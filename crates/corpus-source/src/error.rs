use std::path::PathBuf;

use conllu_codec::CodecError;
use thiserror::Error;

use crate::Part;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{corpus} does not have a {part} part")]
    PartNotAvailable { corpus: String, part: Part },
    #[error("{corpus}: {} is not found, download the corpus first", .path.display())]
    MissingFile { corpus: String, path: PathBuf },
    #[error("invalid storage configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T, E = SourceError> = std::result::Result<T, E>;
