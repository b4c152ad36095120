//! Annotation dialect and typed argument access
//!
//! Every dialect annotation has a declarative table of argument defaults.
//! [`AnnotationReader`] reads an argument from the parsed node when present
//! (resolving references to inline constants of the entity class) and
//! falls back to the table otherwise.

use std::collections::HashMap;

use daoweave_syntax::{AnnotationNode, AnnotationValue, ImportDecl, MemberKind, SourceTree, TypeNode};

use crate::error::{ModelError, ModelResult};

/// Package of the annotation dialect
pub const DIALECT_PACKAGE: &str = "org.greenrobot.greendao.annotation";

/// Simple names accepted as not-null markers from any package
pub const NOT_NULL_NAMES: [&str; 2] = ["NotNull", "NonNull"];

/// Annotations of the dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `@Entity`
    Entity,
    /// `@Id`
    Id,
    /// `@Property`
    Property,
    /// `@Index`
    Index,
    /// `@Unique`
    Unique,
    /// `@NotNull`
    NotNull,
    /// `@Transient`
    Transient,
    /// `@Convert`
    Convert,
    /// `@ToOne`
    ToOne,
    /// `@ToMany`
    ToMany,
    /// `@JoinProperty`
    JoinProperty,
    /// `@JoinEntity`
    JoinEntity,
    /// `@OrderBy`
    OrderBy,
    /// `@Keep`
    Keep,
    /// `@Generated`
    Generated,
}

/// Default of an absent argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// String default
    Str(&'static str),
    /// Boolean default
    Bool(bool),
    /// Integer default
    Int(i64),
    /// Empty array
    EmptyArray,
    /// Argument must be given
    Required,
}

impl Dialect {
    /// Every dialect annotation
    pub const ALL: [Self; 15] = [
        Self::Entity,
        Self::Id,
        Self::Property,
        Self::Index,
        Self::Unique,
        Self::NotNull,
        Self::Transient,
        Self::Convert,
        Self::ToOne,
        Self::ToMany,
        Self::JoinProperty,
        Self::JoinEntity,
        Self::OrderBy,
        Self::Keep,
        Self::Generated,
    ];

    /// Annotation simple name
    #[must_use]
    pub const fn simple_name(self) -> &'static str {
        match self {
            Self::Entity => "Entity",
            Self::Id => "Id",
            Self::Property => "Property",
            Self::Index => "Index",
            Self::Unique => "Unique",
            Self::NotNull => "NotNull",
            Self::Transient => "Transient",
            Self::Convert => "Convert",
            Self::ToOne => "ToOne",
            Self::ToMany => "ToMany",
            Self::JoinProperty => "JoinProperty",
            Self::JoinEntity => "JoinEntity",
            Self::OrderBy => "OrderBy",
            Self::Keep => "Keep",
            Self::Generated => "Generated",
        }
    }

    /// Annotation qualified name
    #[must_use]
    pub fn qualified_name(self) -> String {
        format!("{DIALECT_PACKAGE}.{}", self.simple_name())
    }

    /// Look up by simple name
    #[must_use]
    pub fn from_simple_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.simple_name() == name)
    }

    /// Argument defaults
    #[must_use]
    pub const fn defaults(self) -> &'static [(&'static str, DefaultValue)] {
        use DefaultValue::{Bool, EmptyArray, Int, Required, Str};
        match self {
            Self::Entity => &[
                ("nameInDb", Str("")),
                ("indexes", EmptyArray),
                ("createInDb", Bool(true)),
                ("schema", Str("default")),
                ("active", Bool(false)),
                ("generateConstructors", Bool(true)),
                ("generateGettersSetters", Bool(true)),
            ],
            Self::Id => &[("autoincrement", Bool(false))],
            Self::Property => &[("nameInDb", Str(""))],
            Self::Index => &[("value", Str("")), ("name", Str("")), ("unique", Bool(false))],
            Self::Convert => &[("converter", Required), ("columnType", Required)],
            Self::ToOne => &[("joinProperty", Str(""))],
            Self::ToMany => &[("referencedJoinProperty", Str("")), ("joinProperties", EmptyArray)],
            Self::JoinProperty => &[("name", Required), ("referencedName", Required)],
            Self::JoinEntity => &[
                ("entity", Required),
                ("sourceProperty", Required),
                ("targetProperty", Required),
            ],
            Self::OrderBy => &[("value", Str(""))],
            Self::Generated => &[("hash", Int(-1))],
            Self::Unique | Self::NotNull | Self::Transient | Self::Keep => &[],
        }
    }

    /// Default of one argument, `None` for an unknown argument
    #[must_use]
    pub fn default_of(self, key: &str) -> Option<DefaultValue> {
        self.defaults().iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    /// Match a member annotation against the dialect
    ///
    /// An unqualified name is accepted unless an explicit import binds it to
    /// another package. Not-null markers are accepted from any package.
    #[must_use]
    pub fn of(node: &AnnotationNode, imports: &[ImportDecl]) -> Option<Self> {
        let simple = node.simple_name();
        if NOT_NULL_NAMES.contains(&simple) {
            return Some(Self::NotNull);
        }
        let dialect = Self::from_simple_name(simple)?;
        if node.is_qualified() {
            return (node.name == dialect.qualified_name()).then_some(dialect);
        }
        let foreign = imports
            .iter()
            .any(|i| !i.is_static && !i.wildcard && i.simple_name() == simple && i.name != dialect.qualified_name());
        (!foreign).then_some(dialect)
    }
}

/// Inline constants of the entity class: static fields with literal initializers
#[derive(Debug, Clone, Default)]
pub struct Constants {
    values: HashMap<String, AnnotationValue>,
}

impl Constants {
    /// Collect constants from the class of `tree`
    #[must_use]
    pub fn collect(tree: &SourceTree) -> Self {
        let mut values = HashMap::new();
        let Some(class) = tree.class() else {
            return Self { values };
        };
        for member in tree.members() {
            if member.kind != MemberKind::Field || !member.modifiers.is_static() {
                continue;
            }
            for declarator in &member.declarators {
                let Some(value) = &declarator.value else {
                    continue;
                };
                if matches!(
                    value,
                    AnnotationValue::Str(_) | AnnotationValue::Bool(_) | AnnotationValue::Int(_)
                ) {
                    values.insert(declarator.name.clone(), value.clone());
                    values.insert(format!("{}.{}", class.name, declarator.name), value.clone());
                }
            }
        }
        Self { values }
    }

    /// Value of a constant by simple or class-qualified name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AnnotationValue> {
        self.values.get(name)
    }
}

/// Typed access to the arguments of one dialect annotation
#[derive(Debug, Clone, Copy)]
pub struct AnnotationReader<'a> {
    node: &'a AnnotationNode,
    dialect: Dialect,
    constants: &'a Constants,
    entity: &'a str,
}

impl<'a> AnnotationReader<'a> {
    /// Create reader
    #[must_use]
    pub fn new(node: &'a AnnotationNode, dialect: Dialect, constants: &'a Constants, entity: &'a str) -> Self {
        Self {
            node,
            dialect,
            constants,
            entity,
        }
    }

    /// Underlying node
    #[inline]
    #[must_use]
    pub fn node(&self) -> &'a AnnotationNode {
        self.node
    }

    /// Argument as written, constant references resolved
    fn present(&self, key: &str, expected: &str) -> ModelResult<Option<&'a AnnotationValue>> {
        match self.node.arg(key) {
            None => Ok(None),
            Some(AnnotationValue::Name(name)) => self
                .constants
                .get(name)
                .map(Some)
                .ok_or_else(|| self.mismatch(key, expected, "constant reference")),
            Some(value) => Ok(Some(value)),
        }
    }

    fn default(&self, key: &str) -> ModelResult<DefaultValue> {
        match self.dialect.default_of(key) {
            Some(DefaultValue::Required) | None => Err(ModelError::validation(
                self.entity,
                format!(
                    "Missing required argument {key} of @{} (line {})",
                    self.dialect.simple_name(),
                    self.node.line
                ),
            )),
            Some(value) => Ok(value),
        }
    }

    fn mismatch(&self, key: &str, expected: &str, found: &str) -> ModelError {
        ModelError::validation(
            self.entity,
            format!(
                "Value for {key} of @{} should be of type {expected}, found {found} (line {}). \
                 Note: only inline constants are supported",
                self.dialect.simple_name(),
                self.node.line
            ),
        )
    }

    /// String argument
    ///
    /// # Errors
    /// Returns error on a value of another shape or a missing required argument
    pub fn string(&self, key: &str) -> ModelResult<String> {
        match self.present(key, "String")? {
            Some(AnnotationValue::Str(s)) => Ok(s.clone()),
            Some(other) => Err(self.mismatch(key, "String", other.shape())),
            None => match self.default(key)? {
                DefaultValue::Str(s) => Ok(s.to_string()),
                _ => Err(self.mismatch(key, "String", "default")),
            },
        }
    }

    /// Boolean argument
    ///
    /// # Errors
    /// Returns error on a value of another shape or a missing required argument
    pub fn boolean(&self, key: &str) -> ModelResult<bool> {
        match self.present(key, "boolean")? {
            Some(AnnotationValue::Bool(b)) => Ok(*b),
            Some(other) => Err(self.mismatch(key, "boolean", other.shape())),
            None => match self.default(key)? {
                DefaultValue::Bool(b) => Ok(b),
                _ => Err(self.mismatch(key, "boolean", "default")),
            },
        }
    }

    /// Integer argument
    ///
    /// # Errors
    /// Returns error on a value of another shape or a missing required argument
    pub fn int(&self, key: &str) -> ModelResult<i64> {
        match self.present(key, "int")? {
            Some(AnnotationValue::Int(v)) => Ok(*v),
            Some(other) => Err(self.mismatch(key, "int", other.shape())),
            None => match self.default(key)? {
                DefaultValue::Int(v) => Ok(v),
                _ => Err(self.mismatch(key, "int", "default")),
            },
        }
    }

    /// Class literal argument
    ///
    /// # Errors
    /// Returns error on a value of another shape or a missing argument
    pub fn class(&self, key: &str) -> ModelResult<&'a TypeNode> {
        match self.present(key, "Class")? {
            Some(AnnotationValue::Class(ty)) => Ok(ty),
            Some(other) => Err(self.mismatch(key, "Class", other.shape())),
            None => {
                self.default(key)?;
                Err(self.mismatch(key, "Class", "default"))
            }
        }
    }

    /// Nested annotations of an annotation-array argument
    ///
    /// A single nested annotation without braces is accepted as a one-element array.
    ///
    /// # Errors
    /// Returns error on a value of another shape
    pub fn annotations(&self, key: &str) -> ModelResult<Vec<&'a AnnotationNode>> {
        match self.present(key, "annotation array")? {
            Some(AnnotationValue::Annotation(nested)) => Ok(vec![nested.as_ref()]),
            Some(AnnotationValue::Array(items)) => items
                .iter()
                .map(|item| match item {
                    AnnotationValue::Annotation(nested) => Ok(nested.as_ref()),
                    other => Err(self.mismatch(key, "annotation", other.shape())),
                })
                .collect(),
            Some(other) => Err(self.mismatch(key, "annotation array", other.shape())),
            None => {
                self.default(key)?;
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daoweave_syntax::SourceTree;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = r#"package a;

import javax.persistence.Id;

@Entity(nameInDb = TABLE, active = true)
class Note {
    static final String TABLE = "NOTES";
    static final boolean AUTO = true;

    @Id
    @org.greenrobot.greendao.annotation.Property(nameInDb = Note.COLUMN)
    @Convert(converter = Conv.class)
    @NonNull
    @ToMany(joinProperties = @JoinProperty(name = "a", referencedName = "b"))
    @Generated
    private Long id;

    static final String COLUMN = "ID";
}
"#;

    fn tree() -> SourceTree {
        SourceTree::parse(SOURCE).unwrap()
    }

    #[test]
    fn defaults_table_covers_entity_flags() {
        assert_eq!(Dialect::Entity.default_of("schema"), Some(DefaultValue::Str("default")));
        assert_eq!(Dialect::Entity.default_of("createInDb"), Some(DefaultValue::Bool(true)));
        assert_eq!(Dialect::Generated.default_of("hash"), Some(DefaultValue::Int(-1)));
        assert_eq!(Dialect::Keep.default_of("value"), None);
    }

    #[test]
    fn dialect_matching_respects_imports() {
        let tree = tree();
        let field = tree.members().find(|m| m.name == "id").unwrap();
        let kinds: Vec<_> = field.annotations.iter().map(|a| Dialect::of(a, tree.imports())).collect();
        assert_eq!(
            kinds,
            [
                None,
                Some(Dialect::Property),
                Some(Dialect::Convert),
                Some(Dialect::NotNull),
                Some(Dialect::ToMany),
                Some(Dialect::Generated),
            ]
        );
    }

    #[test]
    fn reads_values_with_constants_and_defaults() {
        let tree = tree();
        let constants = Constants::collect(&tree);
        let entity = &tree.class().unwrap().annotations[0];
        let reader = AnnotationReader::new(entity, Dialect::Entity, &constants, "Note");
        assert_eq!(reader.string("nameInDb").unwrap(), "NOTES");
        assert!(reader.boolean("active").unwrap());
        assert_eq!(reader.string("schema").unwrap(), "default");
        assert!(reader.annotations("indexes").unwrap().is_empty());

        let field = tree.members().find(|m| m.name == "id").unwrap();
        let property = AnnotationReader::new(&field.annotations[1], Dialect::Property, &constants, "Note");
        assert_eq!(property.string("nameInDb").unwrap(), "ID");

        let generated = AnnotationReader::new(&field.annotations[5], Dialect::Generated, &constants, "Note");
        assert_eq!(generated.int("hash").unwrap(), -1);
    }

    #[test]
    fn single_nested_annotation_reads_as_array() {
        let tree = tree();
        let constants = Constants::collect(&tree);
        let field = tree.members().find(|m| m.name == "id").unwrap();
        let reader = AnnotationReader::new(&field.annotations[4], Dialect::ToMany, &constants, "Note");
        let joins = reader.annotations("joinProperties").unwrap();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].simple_name(), "JoinProperty");
    }

    #[test]
    fn missing_required_argument_is_an_error() {
        let tree = tree();
        let constants = Constants::collect(&tree);
        let field = tree.members().find(|m| m.name == "id").unwrap();
        let reader = AnnotationReader::new(&field.annotations[2], Dialect::Convert, &constants, "Note");
        assert!(reader.class("converter").is_ok());
        let err = reader.class("columnType").unwrap_err();
        assert!(err.to_string().contains("Missing required argument columnType"));
    }

    #[test]
    fn wrong_shape_mentions_inline_constants() {
        let tree = tree();
        let constants = Constants::collect(&tree);
        let entity = &tree.class().unwrap().annotations[0];
        let reader = AnnotationReader::new(entity, Dialect::Entity, &constants, "Note");
        let err = reader.boolean("nameInDb").unwrap_err();
        assert!(err.to_string().contains("only inline constants are supported"));
    }
}
