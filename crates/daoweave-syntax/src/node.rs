//! Owned declaration nodes
//!
//! Everything the model extractor and the reconciliation engine need from a
//! Java source, lowered out of the tree-sitter tree so that no borrow of the
//! parser state outlives parsing. Members live in an arena and are addressed
//! by [`NodeId`].

use std::fmt::{self, Display, Formatter};
use std::ops::Range;

/// Stable identity of a class member within one [`crate::SourceTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Id of the arena slot at `index`
    #[inline]
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Arena index
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of class body declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// `int a;`
    Field,
    /// `Note() {}`
    Constructor,
    /// `void a() {}`
    Method,
    /// Nested class, interface, enum or record
    Type,
    /// Instance or static initializer block
    Initializer,
}

impl MemberKind {
    /// Human readable name used in messages
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Constructor => "constructor",
            Self::Method => "method",
            Self::Type => "type",
            Self::Initializer => "initializer",
        }
    }
}

/// Modifier keywords of a declaration, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    keywords: Vec<String>,
}

impl Modifiers {
    pub(crate) fn push(&mut self, keyword: &str) {
        self.keywords.push(keyword.to_string());
    }

    /// Check for a keyword such as `static`
    #[inline]
    #[must_use]
    pub fn has(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    /// `static` present
    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.has("static")
    }

    /// `transient` present
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.has("transient")
    }

    /// All keywords
    #[inline]
    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Literal value of an annotation argument or a constant initializer
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// `"text"`, escapes resolved
    Str(String),
    /// `true` / `false`
    Bool(bool),
    /// Integer literal, possibly negated
    Int(i64),
    /// `Foo.class`
    Class(TypeNode),
    /// Reference to a constant, e.g. `COLUMN` or `Constants.COLUMN`
    Name(String),
    /// `{ a, b }`
    Array(Vec<AnnotationValue>),
    /// Nested annotation
    Annotation(Box<AnnotationNode>),
    /// Any other expression, as written
    Other(String),
}

impl AnnotationValue {
    /// Short description of the value's shape, used in messages
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "int",
            Self::Class(_) => "class literal",
            Self::Name(_) => "constant reference",
            Self::Array(_) => "array",
            Self::Annotation(_) => "annotation",
            Self::Other(_) => "expression",
        }
    }
}

/// One annotation as written in the source
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationNode {
    /// Name as written, simple or qualified
    pub name: String,
    /// Arguments in source order; a single unnamed argument is keyed `value`
    pub args: Vec<(String, AnnotationValue)>,
    /// `true` for `@Name(...)`, even with an empty list
    pub has_argument_list: bool,
    /// Byte range of the whole annotation
    pub range: Range<usize>,
    /// 1-based line
    pub line: usize,
}

impl AnnotationNode {
    /// Last segment of the name
    #[inline]
    #[must_use]
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    /// Check if the name is qualified
    #[inline]
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.name.contains('.')
    }

    /// Argument by name
    #[must_use]
    pub fn arg(&self, key: &str) -> Option<&AnnotationValue> {
        self.args.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// A type as written, with generic arguments and array dimensions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeNode {
    /// Full spelling without whitespace, e.g. `List<Order>` or `byte[]`
    pub spelling: String,
    /// Element type name without arguments or dimensions, e.g. `List`
    pub base: String,
    /// Generic arguments
    pub args: Vec<TypeNode>,
    /// Array dimensions
    pub dims: usize,
    /// Primitive element type (`int`, `boolean`, ...)
    pub primitive: bool,
    /// 1-based line
    pub line: usize,
}

impl TypeNode {
    /// Primitive and not an array
    #[inline]
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.primitive && self.dims == 0
    }
}

/// Method or constructor parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Declared type
    pub ty: TypeNode,
    /// Parameter name
    pub name: String,
}

/// One variable of a field declaration (`int a = 1, b;` has two)
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    /// Variable name
    pub name: String,
    /// Extra dimensions written after the name
    pub dims: usize,
    /// Initializer, lowered like an annotation value
    pub value: Option<AnnotationValue>,
}

/// A class body declaration
#[derive(Debug, Clone, PartialEq)]
pub struct MemberNode {
    /// Arena identity
    pub id: NodeId,
    /// Declaration kind
    pub kind: MemberKind,
    /// Member name (first variable for fields)
    pub name: String,
    /// Modifier keywords
    pub modifiers: Modifiers,
    /// Annotations in source order
    pub annotations: Vec<AnnotationNode>,
    /// Field type or method return type
    pub ty: Option<TypeNode>,
    /// Field variables
    pub declarators: Vec<Declarator>,
    /// Method or constructor parameters
    pub parameters: Vec<Parameter>,
    /// Byte range of the declaration node
    pub range: Range<usize>,
    /// Byte range including a directly preceding javadoc
    pub extent: Range<usize>,
    /// 1-based line of the declaration (after any javadoc)
    pub line: usize,
    /// Leading whitespace of the line where [`Self::extent`] starts
    pub indent: String,
}

impl MemberNode {
    /// Find annotation by simple name
    #[must_use]
    pub fn annotation(&self, simple: &str) -> Option<&AnnotationNode> {
        self.annotations.iter().find(|a| a.simple_name() == simple)
    }
}

/// `import a.b.C;`, `import a.b.*;`, `import static a.B.c;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Imported name without `.*`
    pub name: String,
    /// `import static`
    pub is_static: bool,
    /// On-demand import (`.*`)
    pub wildcard: bool,
    /// Byte range of the declaration
    pub range: Range<usize>,
    /// 1-based line
    pub line: usize,
}

impl ImportDecl {
    /// Last segment of the imported name
    #[inline]
    #[must_use]
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    /// Check if this import makes `qualified` visible by its simple name
    #[must_use]
    pub fn covers(&self, qualified: &str) -> bool {
        if self.is_static {
            return false;
        }
        if self.wildcard {
            package_of(qualified) == self.name
        } else {
            self.name == qualified
        }
    }
}

/// `package a.b;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDecl {
    /// Dotted package name
    pub name: String,
    /// Byte range of the declaration
    pub range: Range<usize>,
}

/// Nested type declared directly in the class body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerType {
    /// Simple name
    pub name: String,
    /// Declared `static`, or implicitly static (interface, enum, record)
    pub is_static: bool,
    /// 1-based line
    pub line: usize,
}

/// Sentinel line comment of the legacy keep-fields section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepMarker {
    /// `// KEEP FIELDS`
    Start(usize),
    /// `// KEEP FIELDS END`
    End(usize),
}

/// First top-level class of a compilation unit
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// Simple name
    pub name: String,
    /// Modifier keywords
    pub modifiers: Modifiers,
    /// Class annotations
    pub annotations: Vec<AnnotationNode>,
    /// Byte range of the whole declaration
    pub range: Range<usize>,
    /// Byte range of the body, braces included
    pub body: Range<usize>,
    /// Leading whitespace of the declaration line
    pub indent: String,
    /// 1-based line
    pub line: usize,
    /// Members in source order
    pub members: Vec<NodeId>,
    /// Nested type declarations
    pub inner_types: Vec<InnerType>,
    /// Legacy keep-fields sentinels in source order
    pub keep_markers: Vec<KeepMarker>,
}

/// Last dot-separated segment of `name`
#[inline]
#[must_use]
pub fn simple_name(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(_, last)| last)
}

/// Everything before the last dot of `name`, or `""`
#[inline]
#[must_use]
pub fn package_of(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(pkg, _)| pkg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import(name: &str, wildcard: bool, is_static: bool) -> ImportDecl {
        ImportDecl {
            name: name.to_string(),
            is_static,
            wildcard,
            range: 0..0,
            line: 1,
        }
    }

    #[test]
    fn simple_and_package_names() {
        assert_eq!(simple_name("java.util.List"), "List");
        assert_eq!(simple_name("List"), "List");
        assert_eq!(package_of("java.util.List"), "java.util");
        assert_eq!(package_of("List"), "");
    }

    #[test]
    fn exact_import_covers_only_its_name() {
        let i = import("java.util.List", false, false);
        assert!(i.covers("java.util.List"));
        assert!(!i.covers("java.util.Map"));
    }

    #[test]
    fn wildcard_import_covers_package_members() {
        let i = import("java.util", true, false);
        assert!(i.covers("java.util.Map"));
        assert!(!i.covers("java.util.concurrent.Future"));
    }

    #[test]
    fn static_import_covers_nothing() {
        let i = import("a.B.c", false, true);
        assert!(!i.covers("a.B.c"));
    }

    #[test]
    fn modifiers_lookup() {
        let mut m = Modifiers::default();
        m.push("private");
        m.push("static");
        assert!(m.is_static());
        assert!(!m.is_transient());
        assert_eq!(m.keywords().len(), 2);
    }
}
