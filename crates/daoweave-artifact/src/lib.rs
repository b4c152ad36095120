//! daoweave Artifact Primitives
//!
//! Text-level building blocks shared by every other daoweave crate.
//!
//! # Core Concepts
//!
//! - [`canonicalize`]: layout-insensitive, comment-sensitive normal form of a snippet
//! - [`CodeHash`]: non-negative fingerprint recorded in `@Generated(hash = ...)`
//! - [`FormattingProfile`]: indentation and line width detected from a file
//! - [`EditList`]: insertions, replacements and removals applied in one pass
//!
//! # Example
//!
//! ```rust
//! use daoweave_artifact::{embed_hash, CodeHash};
//!
//! let (code, hash) = embed_hash("@Generated(hash = HASH_STUB)\npublic Note() {\n}");
//! assert_eq!(hash, CodeHash::compute(&code));
//! assert_eq!(hash.value(), 1272611929);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod canonical;
mod edit;
mod formatting;
mod hash;

pub use canonical::{canonicalize, is_same_code, strip_generated};
pub use edit::{EditError, EditList, TextEdit};
pub use formatting::{
    FormattingOverride, FormattingProfile, IndentChar, Tabulation, MIN_LINE_WIDTH,
};
pub use hash::{code_hash, embed_hash, CodeHash, HashError, HASH_STUB};

/// Commonly used items
pub mod prelude {
    pub use crate::{
        canonicalize, code_hash, embed_hash, CodeHash, EditList, FormattingProfile, Tabulation,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn embedded_hash_round_trips(body in "[a-z]{1,8}( [a-z]{1,8}){0,4}") {
            let template = format!("@Generated(hash = {HASH_STUB})\npublic void {body}() {{\n}}");
            let (code, hash) = embed_hash(&template);
            prop_assert_eq!(CodeHash::compute(&code), hash);
            prop_assert_eq!(code_hash(&template), hash);
        }

        #[test]
        fn reindenting_keeps_hash(indent in "[ \t]{0,8}", body in "[a-z]{1,6}") {
            let flat = format!("void {body}() {{\nreturn;\n}}");
            let indented = format!("{indent}void {body}()\n{indent}{{\n{indent}{indent}return;\n{indent}}}\n");
            prop_assert_eq!(canonicalize(&flat), canonicalize(&indented));
            prop_assert_eq!(CodeHash::compute(&flat), CodeHash::compute(&indented));
        }
    }

    #[test]
    fn edit_list_applies_hashed_insert() {
        let source = "class A {\n}\n";
        let (member, _) = embed_hash("@Generated(hash = HASH_STUB)\nint a;");
        let mut edits = EditList::new();
        edits.insert(9, format!("\n    {member}"));
        let out = edits.apply(source).unwrap();
        assert!(out.contains("@Generated(hash = "));
        assert!(!out.contains(HASH_STUB));
    }
}
