//! Error types for model extraction

use std::path::PathBuf;

use daoweave_artifact::CodeHash;

/// Errors raised while building an [`crate::EntityModel`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Unqualified type name that imports on demand make ambiguous
    #[error(
        "Can't resolve qualified name for {name}. Try to do not use imports on demand or \
         specify qualified name explicitly (line {line})"
    )]
    AmbiguousImport {
        /// Name as written
        name: String,
        /// 1-based line of the use
        line: usize,
    },

    /// A `@Generated(hash = ...)` member was edited after generation
    #[error(
        "{place} (see {path}:{line}) has been changed after generation (recorded hash {recorded}, \
         current hash {actual}).\nPlease either mark it with @Keep annotation instead of @Generated \
         to keep it untouched,\nor use @Generated (without hash) to allow to replace it."
    )]
    Drift {
        /// Human readable member description, e.g. `Constructor Note(Long)`
        place: String,
        /// Source file
        path: PathBuf,
        /// 1-based line of the member
        line: usize,
        /// Hash recorded in the annotation
        recorded: CodeHash,
        /// Hash of the member as it is now
        actual: CodeHash,
    },

    /// Malformed annotation use or inconsistent entity definition
    #[error("Entity {entity}: {message}")]
    Validation {
        /// Entity class name
        entity: String,
        /// What is wrong
        message: String,
    },

    /// An inner class used as field or converter type is not static
    #[error(
        "Inner class {name} in entity {entity} should be static, as it is used as a property \
         or converter type (line {line})"
    )]
    NonStaticInnerClass {
        /// Entity class name
        entity: String,
        /// Inner class simple name
        name: String,
        /// 1-based line of the use
        line: usize,
    },

    /// A persistent field has a type with no storage mapping
    #[error(
        "Field type \"{ty}\" is not supported for {entity}.{field}. Consider making the target \
         an @Entity, or use @Convert or @Transient on the field"
    )]
    UnsupportedType {
        /// Entity class name
        entity: String,
        /// Field name
        field: String,
        /// Type as written
        ty: String,
    },
}

impl ModelError {
    /// Create validation error
    pub fn validation(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create ambiguous import error
    pub fn ambiguous_import(name: impl Into<String>, line: usize) -> Self {
        Self::AmbiguousImport {
            name: name.into(),
            line,
        }
    }
}

/// Result type alias for model extraction
pub type ModelResult<T> = Result<T, ModelError>;
