//! daoweave Java Front End
//!
//! Parses entity sources with tree-sitter and lowers them into owned
//! declaration nodes.
//!
//! # Core Concepts
//!
//! - [`SourceTree`]: package, imports and the first top-level class of a file
//! - [`MemberNode`]: one class body declaration, addressed by [`NodeId`]
//! - [`FragmentFormatter`]: re-indents generated members for a target file
//!
//! # Example
//!
//! ```rust
//! use daoweave_syntax::{MemberKind, SourceTree};
//!
//! let tree = SourceTree::parse("package a;\n@Entity\nclass Note {\n    private Long id;\n}\n").unwrap();
//! assert_eq!(tree.package_name(), "a");
//! let field = tree.members().next().unwrap();
//! assert_eq!(field.kind, MemberKind::Field);
//! assert_eq!(field.name, "id");
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod error;
mod format;
mod node;
mod tree;

pub use error::{SyntaxError, SyntaxResult};
pub use format::FragmentFormatter;
pub use node::{
    package_of, simple_name, AnnotationNode, AnnotationValue, ClassDecl, Declarator, ImportDecl,
    InnerType, KeepMarker, MemberKind, MemberNode, Modifiers, NodeId, PackageDecl, Parameter,
    TypeNode,
};
pub use tree::SourceTree;

/// Commonly used items
pub mod prelude {
    pub use crate::{
        AnnotationNode, AnnotationValue, ClassDecl, FragmentFormatter, MemberKind, MemberNode,
        NodeId, SourceTree, SyntaxError, TypeNode,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
