use conllu_types::IdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("line {line}: malformed {column} value {value:?}")]
    Format {
        line: usize,
        column: String,
        value: String,
    },
    #[error("{0}")]
    Precondition(String),
    #[error(
        "{what} are not equal:\n  value 1: {left:?}\n  value 2: {right:?}\n  \
         meta 1: {meta_left}\n  meta 2: {meta_right}"
    )]
    MergeConflict {
        what: String,
        left: String,
        right: String,
        meta_left: String,
        meta_right: String,
    },
    #[error(transparent)]
    InvalidId(#[from] IdError),
    #[error("unsupported text encoding {0:?}")]
    Encoding(String),
    #[error("failed to read corpus: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = CodecError> = std::result::Result<T, E>;
