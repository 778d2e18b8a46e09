use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("reading conversation {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing conversation document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty {0} identifier")]
    EmptyIdentifier(&'static str),
    #[error("duplicate topic {file}/{topic}")]
    DuplicateTopic { file: String, topic: String },
    #[error("duplicate actor id {0}")]
    DuplicateActor(String),
}
