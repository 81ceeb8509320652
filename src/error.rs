use crate::lexer::Span;
use crate::marker::SinkError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A recoverable problem in one statement, reported through the error callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub span: Span,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Syntax(SyntaxError),

    #[error("giving up after {count} syntax errors")]
    TooManyErrors { count: usize },

    #[error("marker sink failed: {0}")]
    Sink(#[source] SinkError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
