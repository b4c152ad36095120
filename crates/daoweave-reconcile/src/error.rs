//! Error types for the reconciliation engine

use std::path::PathBuf;

use daoweave_artifact::EditError;
use daoweave_syntax::SyntaxError;

/// Errors raised while reconciling generated members with a source file
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// An unmarked member occupies the identity of a generated one
    #[error(
        "Can't replace {place} in {path}:{line} with generated version. If you would like to keep \
         it, it should be explicitly marked with @Keep annotation. Otherwise please mark it with \
         @Generated annotation"
    )]
    OwnershipConflict {
        /// Member description, e.g. `Method getName()`
        place: String,
        /// Source file
        path: PathBuf,
        /// 1-based line
        line: usize,
    },

    /// A generated fragment could not be formatted
    #[error("generated code is not valid: {0}")]
    Format(#[from] SyntaxError),

    /// Queued edits could not be applied
    #[error("cannot apply edits: {0}")]
    OverlappingEdits(#[from] EditError),

    /// A `@Keep` entity lacks the all-fields constructor
    #[error(
        "Can't find constructor for entity {entity} with all persistent fields. Note parameter \
         names of such constructor should be equal to field names"
    )]
    MissingConstructor {
        /// Entity class name
        entity: String,
    },
}

impl ReconcileError {
    /// Create ownership conflict error
    pub fn conflict(place: impl Into<String>, path: impl Into<PathBuf>, line: usize) -> Self {
        Self::OwnershipConflict {
            place: place.into(),
            path: path.into(),
            line,
        }
    }
}

/// Result type alias for reconciliation
pub type ReconcileResult<T> = Result<T, ReconcileError>;
