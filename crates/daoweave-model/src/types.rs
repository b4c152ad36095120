//! Entity model types
//!
//! An [`EntityModel`] is built once per source file and consumed by the
//! generation planner and the reconciliation session. It owns the
//! [`SourceTree`] it was extracted from; members refer back to their
//! declarations by [`NodeId`].

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use daoweave_artifact::CodeHash;
use daoweave_syntax::{simple_name, NodeId, SourceTree};

/// Resolved type of a field or parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableType {
    /// Fully qualified name, `[]` appended per array dimension
    pub name: String,
    /// Spelling in the source, e.g. `List<Order>`
    pub spelling: String,
    /// Primitive, non-array type
    pub is_primitive: bool,
    /// Generic arguments, `None` for a raw or non-generic type
    pub type_arguments: Option<Vec<VariableType>>,
}

impl VariableType {
    /// Create non-generic type
    pub fn new(name: impl Into<String>, spelling: impl Into<String>, is_primitive: bool) -> Self {
        Self {
            name: name.into(),
            spelling: spelling.into(),
            is_primitive,
            type_arguments: None,
        }
    }

    /// Add generic arguments
    #[must_use]
    pub fn with_type_arguments(mut self, args: Vec<VariableType>) -> Self {
        self.type_arguments = Some(args);
        self
    }

    /// Last segment of [`Self::name`]
    #[inline]
    #[must_use]
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    /// Spelling usable in generated code without imports for generic arguments
    #[must_use]
    pub fn simple_spelling(&self) -> String {
        match &self.type_arguments {
            Some(args) if !args.is_empty() => {
                let args: Vec<String> = args.iter().map(Self::simple_spelling).collect();
                format!("{}<{}>", self.simple_name(), args.join(", "))
            }
            _ => self.simple_name().to_string(),
        }
    }

    /// Single type argument of a generic type
    #[must_use]
    pub fn single_argument(&self) -> Option<&VariableType> {
        match self.type_arguments.as_deref() {
            Some([arg]) => Some(arg),
            _ => None,
        }
    }
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Typed name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    /// Resolved type
    pub ty: VariableType,
    /// Variable name
    pub name: String,
}

impl Variable {
    /// Create variable
    pub fn new(ty: VariableType, name: impl Into<String>) -> Self {
        Self {
            ty,
            name: name.into(),
        }
    }
}

/// Who owns a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnershipHint {
    /// Unmarked member
    #[default]
    None,
    /// `@Keep`: never touched
    Keep,
    /// `@Generated`: owned by the engine; `None` is the hash-less sentinel
    Generated(Option<CodeHash>),
}

impl OwnershipHint {
    /// `@Keep`
    #[inline]
    #[must_use]
    pub const fn is_keep(self) -> bool {
        matches!(self, Self::Keep)
    }

    /// `@Generated`, with or without hash
    #[inline]
    #[must_use]
    pub const fn is_generated(self) -> bool {
        matches!(self, Self::Generated(_))
    }
}

/// Member that the engine may generate
pub trait Generatable {
    /// Declaration in the source tree
    fn member(&self) -> NodeId;

    /// Ownership marker
    fn hint(&self) -> OwnershipHint;

    /// 1-based line
    fn line(&self) -> usize;

    /// Description for messages, e.g. `Constructor Note(Long, String)`
    fn describe(&self) -> String;
}

/// `@Id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdSpec {
    /// `autoincrement = true`
    pub autoincrement: bool,
}

/// `@Index` on a field
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyIndex {
    /// Explicit index name
    pub name: Option<String>,
    /// `unique = true`
    pub unique: bool,
}

/// `@Convert(converter = ..., columnType = ...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomType {
    /// Converter class
    pub converter: VariableType,
    /// Type stored in the database
    pub column_type: VariableType,
}

/// Field mapped to a column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentField {
    /// Name and type
    pub variable: Variable,
    /// `@Id`
    pub id: Option<IdSpec>,
    /// `@Index`
    pub index: Option<PropertyIndex>,
    /// Primitive or annotated not-null
    pub is_not_null: bool,
    /// `@Property(nameInDb = ...)`
    pub column_name: Option<String>,
    /// `@Convert`
    pub custom_type: Option<CustomType>,
    /// `@Unique`
    pub unique: bool,
    /// Declaration
    pub member: NodeId,
    /// 1-based line
    pub line: usize,
}

impl PersistentField {
    /// Field name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.variable.name
    }
}

/// Field excluded from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientField {
    /// Name and type
    pub variable: Variable,
    /// Ownership
    pub hint: OwnershipHint,
    /// Declaration
    pub member: NodeId,
    /// 1-based line
    pub line: usize,
}

impl Generatable for TransientField {
    fn member(&self) -> NodeId {
        self.member
    }

    fn hint(&self) -> OwnershipHint {
        self.hint
    }

    fn line(&self) -> usize {
        self.line
    }

    fn describe(&self) -> String {
        format!("Field '{}'", self.variable.name)
    }
}

fn describe_parameters(parameters: &[Variable]) -> String {
    parameters
        .iter()
        .map(|p| p.ty.simple_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check a parameter list against expected types, by qualified or simple name
fn parameters_match(parameters: &[Variable], types: &[VariableType]) -> bool {
    parameters.len() == types.len()
        && parameters
            .iter()
            .zip(types)
            .all(|(p, t)| p.ty.name == t.name || p.ty.simple_name() == t.simple_name())
}

/// Declared constructor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    /// Class name
    pub name: String,
    /// Parameters in order
    pub parameters: Vec<Variable>,
    /// Ownership
    pub hint: OwnershipHint,
    /// Declaration
    pub member: NodeId,
    /// 1-based line
    pub line: usize,
}

impl Constructor {
    /// Check parameter types
    #[must_use]
    pub fn has_signature(&self, types: &[VariableType]) -> bool {
        parameters_match(&self.parameters, types)
    }
}

impl Generatable for Constructor {
    fn member(&self) -> NodeId {
        self.member
    }

    fn hint(&self) -> OwnershipHint {
        self.hint
    }

    fn line(&self) -> usize {
        self.line
    }

    fn describe(&self) -> String {
        format!("Constructor {}({})", self.name, describe_parameters(&self.parameters))
    }
}

/// Declared method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Parameters in order
    pub parameters: Vec<Variable>,
    /// Ownership
    pub hint: OwnershipHint,
    /// Declaration
    pub member: NodeId,
    /// 1-based line
    pub line: usize,
}

impl Method {
    /// Check name and parameter types
    #[must_use]
    pub fn has_signature(&self, name: &str, types: &[VariableType]) -> bool {
        self.name == name && parameters_match(&self.parameters, types)
    }
}

impl Generatable for Method {
    fn member(&self) -> NodeId {
        self.member
    }

    fn hint(&self) -> OwnershipHint {
        self.hint
    }

    fn line(&self) -> usize {
        self.line
    }

    fn describe(&self) -> String {
        format!("Method {}({})", self.name, describe_parameters(&self.parameters))
    }
}

/// How a to-one relation finds its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToOneJoin {
    /// `@ToOne(joinProperty = "fk")`
    ForeignKey(String),
    /// Bare `@ToOne`: the relation owns an implicit column
    Column {
        /// `@Property(nameInDb = ...)`
        name: Option<String>,
        /// `@NotNull`
        not_null: bool,
        /// `@Unique`
        unique: bool,
    },
}

/// `@ToOne` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToOne {
    /// Name and target type
    pub variable: Variable,
    /// Join
    pub join: ToOneJoin,
    /// Declaration
    pub member: NodeId,
    /// 1-based line
    pub line: usize,
}

/// `@JoinProperty(name, referencedName)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinProperty {
    /// Property of this entity
    pub name: String,
    /// Property of the target entity
    pub referenced_name: String,
}

/// Linking strategy of a to-many relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToManyLink {
    /// `referencedJoinProperty`
    MappedBy(String),
    /// `joinProperties = { ... }`
    JoinProperties(Vec<JoinProperty>),
    /// `@JoinEntity(entity, sourceProperty, targetProperty)`
    JoinEntity {
        /// Join entity
        entity: VariableType,
        /// Join entity property referencing this entity
        source_property: String,
        /// Join entity property referencing the target
        target_property: String,
    },
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// `ASC`
    #[default]
    Asc,
    /// `DESC`
    Desc,
}

/// Property with direction, used by indexes and ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderProperty {
    /// Property name
    pub name: String,
    /// Direction
    pub direction: Direction,
}

/// `@OrderBy`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    /// Empty `@OrderBy`
    ByPrimaryKey,
    /// `@OrderBy("a ASC, b DESC")`
    Properties(Vec<OrderProperty>),
}

/// `@ToMany` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToMany {
    /// Name and `List<Target>` type
    pub variable: Variable,
    /// Linking strategy
    pub link: ToManyLink,
    /// Ordering
    pub order: Option<Order>,
    /// Declaration
    pub member: NodeId,
    /// 1-based line
    pub line: usize,
}

impl ToMany {
    /// Element type of the list
    #[must_use]
    pub fn target(&self) -> Option<&VariableType> {
        self.variable.ty.single_argument()
    }
}

/// Multi-column index declared on the entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIndex {
    /// Explicit index name
    pub name: Option<String>,
    /// Columns in order
    pub properties: Vec<OrderProperty>,
    /// `unique = true`
    pub unique: bool,
}

/// Semantic model of one entity source file
#[derive(Debug, Clone)]
pub struct EntityModel {
    /// Class simple name
    pub name: String,
    /// Package, `""` for the default package
    pub package: String,
    /// Schema name
    pub schema: String,
    /// `@Entity(active = true)`
    pub active: bool,
    /// `@Entity(nameInDb = ...)`
    pub table_name: Option<String>,
    /// Persistent fields in declaration order
    pub fields: Vec<PersistentField>,
    /// Transient fields in declaration order
    pub transient_fields: Vec<TransientField>,
    /// Unmarked fields inside the legacy KEEP FIELDS section
    pub legacy_transient_fields: Vec<TransientField>,
    /// Declared constructors
    pub constructors: Vec<Constructor>,
    /// Declared methods
    pub methods: Vec<Method>,
    /// To-one relations
    pub to_ones: Vec<ToOne>,
    /// To-many relations
    pub to_manys: Vec<ToMany>,
    /// Entity-level indexes
    pub indexes: Vec<TableIndex>,
    /// `@Keep` on the class
    pub keep_source: bool,
    /// `@Entity(createInDb = ...)`
    pub create_table: bool,
    /// `@Entity(generateConstructors = ...)`
    pub generate_constructors: bool,
    /// `@Entity(generateGettersSetters = ...)`
    pub generate_getters_setters: bool,
    /// First not-null annotation spelling seen, e.g. `@NonNull`
    pub not_null_annotation: Option<String>,
    /// Last field declaration of any kind
    pub last_field: Option<NodeId>,
    /// Parsed source
    pub source: SourceTree,
    /// Source file
    pub path: PathBuf,
}

impl EntityModel {
    /// `package.Name`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    /// Source file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persistent field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&PersistentField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// `@Id` field
    #[must_use]
    pub fn primary_key(&self) -> Option<&PersistentField> {
        self.fields.iter().find(|f| f.id.is_some())
    }

    /// Check for any relation
    #[inline]
    #[must_use]
    pub fn has_relations(&self) -> bool {
        !self.to_ones.is_empty() || !self.to_manys.is_empty()
    }

    /// Active entity: explicit flag or relations present
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active || self.has_relations()
    }

    /// Check if `qualified` names a type nested in this entity
    #[must_use]
    pub fn is_inner_class(&self, qualified: &str) -> bool {
        qualified
            .strip_prefix(&self.qualified_name())
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|rest| !rest.is_empty())
    }

    /// Variables of the all-fields constructor, in declaration order
    pub fn constructor_fields(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.fields.iter().map(|f| &f.variable)
    }

    /// `@Keep` constructors and methods
    #[must_use]
    pub fn kept_members(&self) -> usize {
        let constructors = self.constructors.iter().filter(|c| c.hint.is_keep()).count();
        constructors + self.methods.iter().filter(|m| m.hint.is_keep()).count()
    }

    /// Every generatable member
    pub fn generatables(&self) -> impl Iterator<Item = &dyn Generatable> + '_ {
        self.transient_fields
            .iter()
            .map(|f| f as &dyn Generatable)
            .chain(self.constructors.iter().map(|c| c as &dyn Generatable))
            .chain(self.methods.iter().map(|m| m as &dyn Generatable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(name: &str) -> VariableType {
        VariableType::new(name, simple_name(name), false)
    }

    fn method(name: &str, params: &[&str]) -> Method {
        Method {
            name: name.to_string(),
            parameters: params
                .iter()
                .enumerate()
                .map(|(i, t)| Variable::new(ty(t), format!("p{i}")))
                .collect(),
            hint: OwnershipHint::None,
            member: NodeId::from_index(0),
            line: 1,
        }
    }

    #[test]
    fn signature_matches_by_qualified_or_simple_name() {
        let m = method("setText", &["java.lang.String"]);
        assert!(m.has_signature("setText", &[ty("java.lang.String")]));
        assert!(m.has_signature("setText", &[ty("String")]));
        assert!(!m.has_signature("setText", &[ty("java.lang.Long")]));
        assert!(!m.has_signature("getText", &[ty("java.lang.String")]));
        assert!(!m.has_signature("setText", &[]));
    }

    #[test]
    fn simple_spelling_drops_packages() {
        let list = ty("java.util.List").with_type_arguments(vec![ty("org.example.Order")]);
        assert_eq!(list.simple_spelling(), "List<Order>");
        assert_eq!(list.single_argument().unwrap().simple_name(), "Order");
    }

    #[test]
    fn describe_lists_parameter_types() {
        let m = method("update", &["java.lang.Long", "int"]);
        assert_eq!(m.describe(), "Method update(Long, int)");
    }

    #[test]
    fn ownership_predicates() {
        assert!(OwnershipHint::Keep.is_keep());
        assert!(OwnershipHint::Generated(None).is_generated());
        assert!(!OwnershipHint::None.is_generated());
    }
}
