//! daoweave Entity Model
//!
//! Extracts the semantic model of an annotated entity source.
//!
//! # Core Concepts
//!
//! - [`EntityModel`]: fields, relations, indexes and generatable members of one entity
//! - [`OwnershipHint`]: `None`, `Keep` or `Generated(hash)` per member
//! - [`ModelExtractor`]: classification, validation and the drift check
//! - [`Dialect`]: the annotation vocabulary with its table of argument defaults
//!
//! # Example
//!
//! ```rust
//! use daoweave_model::{Extraction, ModelExtractor};
//! use daoweave_syntax::SourceTree;
//!
//! let source = "package a;\n\
//!     import org.greenrobot.greendao.annotation.Entity;\n\
//!     @Entity\n\
//!     public class Note {\n    private Long id;\n    private int age;\n}\n";
//! let tree = SourceTree::parse(source).unwrap();
//! let Extraction::Entity(model) = ModelExtractor::new("Note.java").extract(tree).unwrap() else {
//!     panic!("not an entity");
//! };
//! assert_eq!(model.fields.len(), 2);
//! assert!(model.fields[1].is_not_null);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod annotations;
mod error;
mod extract;
mod resolve;
mod types;

pub use annotations::{AnnotationReader, Constants, DefaultValue, Dialect, DIALECT_PACKAGE, NOT_NULL_NAMES};
pub use error::{ModelError, ModelResult};
pub use extract::{parse_order_spec, Extraction, ModelExtractor};
pub use resolve::{NameResolver, BUILT_IN_TYPES};
pub use types::{
    Constructor, CustomType, Direction, EntityModel, Generatable, IdSpec, JoinProperty, Method, Order,
    OrderProperty, OwnershipHint, PersistentField, PropertyIndex, TableIndex, ToMany, ToManyLink, ToOne,
    ToOneJoin, TransientField, Variable, VariableType,
};

/// Commonly used items
pub mod prelude {
    pub use crate::{
        EntityModel, Extraction, Generatable, ModelError, ModelExtractor, OwnershipHint, Variable,
        VariableType,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
