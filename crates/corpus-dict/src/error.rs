use conllu_codec::CodecError;
use corpus_source::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictError {
    #[error("unknown {kind} {label:?}")]
    NotFound { kind: &'static str, label: String },
    #[error("the dictionary already holds a corpus; ingest with append to extend it")]
    NotEmpty,
    #[error("invalid dictionary snapshot: {0}")]
    InvalidSnapshot(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl DictError {
    pub(crate) fn not_found(kind: &'static str, label: &str) -> Self {
        DictError::NotFound {
            kind,
            label: label.to_string(),
        }
    }
}

pub type Result<T, E = DictError> = std::result::Result<T, E>;
