//! Literal-or-file query resolution.

use crate::error::{FrameError, Result};
use crate::path::PathNormalizer;
use std::path::Path;

/// Where the executable query text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    /// The argument itself is the query.
    Literal(String),
    /// The argument named a file; `contents` is its full text.
    File { path: String, contents: String },
}

impl QuerySource {
    /// Decides whether `query` names an existing file and, if so, reads it.
    ///
    /// The decision is made only by checking the normalized path on disk. A
    /// path that does not exist is treated as literal SQL and left for the
    /// database to reject.
    pub fn resolve(query: &str, normalizer: &PathNormalizer) -> Result<Self> {
        let candidate = normalizer.normalize(query);
        let path = Path::new(&candidate);

        if !path.is_file() {
            return Ok(Self::Literal(query.to_string()));
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| FrameError::query_file(candidate.clone(), &e))?;

        Ok(Self::File {
            path: candidate,
            contents,
        })
    }

    /// The text to send to the database.
    pub fn text(&self) -> &str {
        match self {
            Self::Literal(text) => text,
            Self::File { contents, .. } => contents,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Literal(_) => "variable string",
            Self::File { .. } => "file",
        }
    }
}
