//! Error types for the batch driver

use std::path::PathBuf;

use daoweave_model::ModelError;
use daoweave_reconcile::ReconcileError;
use daoweave_syntax::SyntaxError;

/// Main daoweave error type
#[derive(Debug, thiserror::Error)]
pub enum WeaveError {
    /// Source text could not be parsed
    #[error("parse error: {0}")]
    Syntax(#[from] SyntaxError),

    /// Entity could not be modelled
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Generated members could not be reconciled
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Reading or writing a file failed
    #[error("cannot access {path}: {source}")]
    Io {
        /// File or directory
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl WeaveError {
    /// Create I/O error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short category name used in reports
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax(_) => "parse",
            Self::Model(ModelError::AmbiguousImport { .. }) => "ambiguous-import",
            Self::Model(ModelError::Drift { .. }) => "drift",
            Self::Model(_) => "validation",
            Self::Reconcile(ReconcileError::OwnershipConflict { .. }) => "ownership-conflict",
            Self::Reconcile(ReconcileError::MissingConstructor { .. }) => "validation",
            Self::Reconcile(_) => "internal",
            Self::Io { .. } => "io",
            Self::Config(_) => "config",
        }
    }
}

/// Result type alias for the batch driver
pub type WeaveResult<T> = Result<T, WeaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        let conflict: WeaveError = ReconcileError::conflict("Method getAge()", "A.java", 3).into();
        assert_eq!(conflict.kind(), "ownership-conflict");

        let ambiguous: WeaveError = ModelError::ambiguous_import("Thing", 9).into();
        assert_eq!(ambiguous.kind(), "ambiguous-import");

        let io = WeaveError::io("A.java", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(io.kind(), "io");
        assert!(io.to_string().starts_with("cannot access A.java"));
    }

    #[test]
    fn model_messages_are_not_wrapped() {
        let err: WeaveError = ModelError::validation("Note", "Duplicate property name id (line 4)").into();
        assert_eq!(err.to_string(), "Entity Note: Duplicate property name id (line 4)");
    }
}
