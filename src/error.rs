use std::{io, path::PathBuf};

use oxc_span::Span;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("malformed syntax tree: {message} at {span:?}")]
    Structural { message: String, span: Span },

    #[error("invalid configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn structural(message: impl Into<String>, span: Span) -> Self {
        Error::Structural {
            message: message.into(),
            span,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
