//! Content error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to load content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// A file or directory could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A document is not valid YAML or JSON, or does not match the schema.
    #[error("cannot parse {name}: {message}")]
    Parse {
        /// File name of the document.
        name: String,
        /// Parser message.
        message: String,
    },

    /// The directory holds no content documents.
    #[error("no content documents in {0}")]
    Empty(PathBuf),

    /// The documents parsed but reference each other inconsistently.
    #[error("invalid content: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
