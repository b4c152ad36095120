//! Error types for the Java front end

/// Errors raised while parsing sources or formatting generated fragments
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    /// Grammar could not be loaded into the parser
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// Parser gave up without producing a tree
    #[error("parse failed")]
    ParseFailed,

    /// Source is not syntactically valid Java
    #[error("syntax error at {line}:{column}: {snippet}")]
    Invalid {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// Offending source line, trimmed
        snippet: String,
    },

    /// A generated fragment could not be formatted
    #[error("cannot format generated code ({message}):\n{fragment}")]
    Format {
        /// What went wrong
        message: String,
        /// Fragment as handed to the formatter
        fragment: String,
    },
}

impl SyntaxError {
    /// Create format error
    pub fn format(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
            fragment: fragment.into(),
        }
    }
}

/// Result type alias for front-end operations
pub type SyntaxResult<T> = Result<T, SyntaxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_display_names_position() {
        let err = SyntaxError::Invalid {
            line: 3,
            column: 7,
            snippet: "int a".to_string(),
        };
        assert_eq!(err.to_string(), "syntax error at 3:7: int a");
    }

    #[test]
    fn format_error_includes_fragment() {
        let err = SyntaxError::format("unbalanced braces", "void a() {");
        assert!(err.to_string().contains("void a() {"));
    }
}
