//! Error type shared by every stage of the rooting pipeline.
//!
//! Library code returns [`QuintetError`]; the binary maps each kind to its own
//! exit code.
//!
//! # Error Categories
//!
//! - **InvalidInput**: malformed tree text, or trees over different taxa
//! - **TopologyMismatch**: taxon mapping between trees of different shape
//! - **MappingError**: a taxon map that is not a bijection
//! - **UnmappableQuintet**: a relabelled quintet matching no catalog entry
//! - **CatalogLoad**: missing or malformed reference topologies
//! - **Io**: file system operations with path context

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuintetError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("topology mismatch: {0}")]
    TopologyMismatch(String),

    #[error("taxon map is not a bijection: {0}")]
    MappingError(String),

    /// Relabelling keeps a resolved quintet resolved, so this only fires when the
    /// catalog itself is inconsistent.
    #[error("relabelled quintet {0} matches no canonical quintet")]
    UnmappableQuintet(usize),

    #[error("could not load quintet catalog: {0}")]
    CatalogLoad(String),

    #[error("I/O error during {operation} on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl QuintetError {
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        QuintetError::Io {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Short name of the error kind, as reported by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            QuintetError::InvalidInput(_) => "InvalidInput",
            QuintetError::TopologyMismatch(_) => "TopologyMismatch",
            QuintetError::MappingError(_) => "MappingError",
            QuintetError::UnmappableQuintet(_) => "UnmappableQuintet",
            QuintetError::CatalogLoad(_) => "CatalogLoadError",
            QuintetError::Io { .. } => "Io",
        }
    }
}

pub type Result<T> = std::result::Result<T, QuintetError>;
