//! Model extractor
//!
//! Walks the lowered class body once, classifies every field and records
//! constructors and methods with their ownership hints. Validation and the
//! drift check run after the walk, when every declaration is known.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use daoweave_artifact::CodeHash;
use daoweave_syntax::{AnnotationNode, ClassDecl, KeepMarker, MemberKind, MemberNode, NodeId, SourceTree, TypeNode};

use crate::annotations::{AnnotationReader, Constants, Dialect};
use crate::error::{ModelError, ModelResult};
use crate::resolve::NameResolver;
use crate::types::{
    Constructor, CustomType, Direction, EntityModel, IdSpec, JoinProperty, Method, Order,
    OrderProperty, OwnershipHint, PersistentField, PropertyIndex, TableIndex, ToMany, ToManyLink, ToOne,
    ToOneJoin, TransientField, Variable, VariableType,
};

/// Types with a built-in column mapping
const STORABLE_TYPES: [&str; 17] = [
    "boolean",
    "byte",
    "short",
    "int",
    "long",
    "float",
    "double",
    "char",
    "java.lang.Boolean",
    "java.lang.Byte",
    "java.lang.Short",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Float",
    "java.lang.Double",
    "java.lang.String",
    "java.util.Date",
];

/// Outcome of [`ModelExtractor::extract`]
#[derive(Debug)]
pub enum Extraction {
    /// The class is an entity
    Entity(Box<EntityModel>),
    /// No top-level class, or no entity marker
    NotAnEntity,
}

impl Extraction {
    /// The model, if any
    #[must_use]
    pub fn into_entity(self) -> Option<EntityModel> {
        match self {
            Self::Entity(model) => Some(*model),
            Self::NotAnEntity => None,
        }
    }
}

/// Builds [`EntityModel`]s for the sources of one package directory
#[derive(Debug, Clone)]
pub struct ModelExtractor {
    path: PathBuf,
    siblings: Vec<String>,
}

impl ModelExtractor {
    /// Create extractor for the source at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            siblings: Vec::new(),
        }
    }

    /// Class names declared by the other files of the same package
    #[must_use]
    pub fn with_siblings(mut self, siblings: impl IntoIterator<Item = String>) -> Self {
        self.siblings = siblings.into_iter().collect();
        self
    }

    /// Source file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extract the entity model of `tree`
    ///
    /// # Errors
    /// - [`ModelError::AmbiguousImport`] for unresolvable type names
    /// - [`ModelError::Validation`] for malformed annotation use
    /// - [`ModelError::NonStaticInnerClass`] / [`ModelError::UnsupportedType`]
    /// - [`ModelError::Drift`] if a hashed generated member was edited
    pub fn extract(&self, tree: SourceTree) -> ModelResult<Extraction> {
        let Some(class) = tree.class() else {
            return Ok(Extraction::NotAnEntity);
        };
        let resolver = NameResolver::new(tree.package_name(), &class.name, tree.imports(), &self.siblings)
            .with_inner_types(class.inner_types.iter().map(|t| t.name.as_str()));

        let mut marker = None;
        for annotation in &class.annotations {
            if resolver.is_entity_marker(annotation)? {
                marker = Some(annotation);
                break;
            }
        }
        let Some(marker) = marker else {
            tracing::debug!(path = %self.path.display(), class = %class.name, "not an entity");
            return Ok(Extraction::NotAnEntity);
        };

        let constants = Constants::collect(&tree);
        let walk = Walk {
            tree: &tree,
            class,
            resolver: &resolver,
            constants: &constants,
            entity: &class.name,
        };
        let parts = walk.run(marker)?;

        let model = parts.into_model(tree, self.path.clone());
        self.validate(&model)?;
        if !model.keep_source {
            self.check_drift(&model)?;
        }
        tracing::debug!(
            entity = %model.name,
            fields = model.fields.len(),
            transient = model.transient_fields.len(),
            to_one = model.to_ones.len(),
            to_many = model.to_manys.len(),
            "extracted entity model"
        );
        Ok(Extraction::Entity(Box::new(model)))
    }

    fn validate(&self, model: &EntityModel) -> ModelResult<()> {
        let entity = model.name.as_str();
        let invalid = |message: String| ModelError::validation(entity, message);

        let mut names = HashSet::new();
        for field in &model.fields {
            if !names.insert(field.name()) {
                return Err(invalid(format!("Duplicate property name {} (line {})", field.name(), field.line)));
            }
            if field.unique && field.index.is_some() {
                return Err(invalid(format!(
                    "Field {} has both @Unique and @Index; @Unique already creates an index (line {})",
                    field.name(),
                    field.line
                )));
            }
        }

        let ids: Vec<_> = model.fields.iter().filter(|f| f.id.is_some()).collect();
        if ids.len() > 1 {
            return Err(invalid(format!(
                "Only a single @Id field is supported, found {} (line {})",
                ids.len(),
                ids[1].line
            )));
        }
        if let Some(id) = ids.first() {
            let autoincrement = id.id.is_some_and(|spec| spec.autoincrement);
            if autoincrement && !matches!(id.variable.ty.name.as_str(), "long" | "java.lang.Long") {
                return Err(invalid(format!(
                    "@Id(autoincrement = true) requires a long or Long primary key, {} is {} (line {})",
                    id.name(),
                    id.variable.ty.simple_name(),
                    id.line
                )));
            }
        }

        for to_one in &model.to_ones {
            if let ToOneJoin::ForeignKey(fk) = &to_one.join {
                if model.field(fk).is_none() {
                    return Err(invalid(format!(
                        "joinProperty {fk} of @ToOne {} is not a persistent field (line {})",
                        to_one.variable.name, to_one.line
                    )));
                }
            }
        }

        for to_many in &model.to_manys {
            if let ToManyLink::JoinProperties(joins) = &to_many.link {
                if let Some(join) = joins.iter().find(|j| model.field(&j.name).is_none()) {
                    return Err(invalid(format!(
                        "@JoinProperty name {} of @ToMany {} is not a persistent field (line {})",
                        join.name, to_many.variable.name, to_many.line
                    )));
                }
            }
        }

        for index in &model.indexes {
            if let Some(unknown) = index.properties.iter().find(|p| model.field(&p.name).is_none()) {
                return Err(invalid(format!("Index refers to unknown property {}", unknown.name)));
            }
        }

        let inner: Vec<_> = model
            .source
            .class()
            .map(|c| c.inner_types.clone())
            .unwrap_or_default();
        let prefix = format!("{}.", model.qualified_name());
        let mut inner_uses: Vec<(&VariableType, usize)> = Vec::new();
        for field in &model.fields {
            inner_uses.push((&field.variable.ty, field.line));
            if let Some(custom) = &field.custom_type {
                inner_uses.push((&custom.converter, field.line));
            }
        }
        for (ty, line) in inner_uses {
            let Some(rest) = ty.name.strip_prefix(&prefix) else {
                continue;
            };
            let outer = rest.split('.').next().unwrap_or(rest).trim_end_matches("[]");
            if inner.iter().any(|t| t.name == outer && !t.is_static) {
                return Err(ModelError::NonStaticInnerClass {
                    entity: entity.to_string(),
                    name: outer.to_string(),
                    line,
                });
            }
        }

        for field in &model.fields {
            let ty = &field.variable.ty;
            let storable = field.custom_type.is_some()
                || STORABLE_TYPES.contains(&ty.name.as_str())
                || ty.name == "byte[]";
            if !storable {
                return Err(ModelError::UnsupportedType {
                    entity: entity.to_string(),
                    field: field.name().to_string(),
                    ty: ty.spelling.clone(),
                });
            }
        }

        Ok(())
    }

    fn check_drift(&self, model: &EntityModel) -> ModelResult<()> {
        let mut checked = HashSet::new();
        for member in model.generatables() {
            let OwnershipHint::Generated(Some(recorded)) = member.hint() else {
                continue;
            };
            if !checked.insert(member.member()) {
                continue;
            }
            let actual = CodeHash::compute(model.source.member_text(member.member()));
            if actual != recorded {
                return Err(ModelError::Drift {
                    place: member.describe(),
                    path: self.path.clone(),
                    line: member.line(),
                    recorded,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Everything collected from the class body, before the tree moves into the model
#[derive(Default)]
struct Parts {
    name: String,
    package: String,
    schema: String,
    active: bool,
    table_name: Option<String>,
    create_table: bool,
    generate_constructors: bool,
    generate_getters_setters: bool,
    keep_source: bool,
    fields: Vec<PersistentField>,
    transient_fields: Vec<TransientField>,
    legacy_transient_fields: Vec<TransientField>,
    constructors: Vec<Constructor>,
    methods: Vec<Method>,
    to_ones: Vec<ToOne>,
    to_manys: Vec<ToMany>,
    indexes: Vec<TableIndex>,
    not_null_annotation: Option<String>,
    last_field: Option<NodeId>,
}

impl Parts {
    fn into_model(self, source: SourceTree, path: PathBuf) -> EntityModel {
        EntityModel {
            name: self.name,
            package: self.package,
            schema: self.schema,
            active: self.active,
            table_name: self.table_name,
            fields: self.fields,
            transient_fields: self.transient_fields,
            legacy_transient_fields: self.legacy_transient_fields,
            constructors: self.constructors,
            methods: self.methods,
            to_ones: self.to_ones,
            to_manys: self.to_manys,
            indexes: self.indexes,
            keep_source: self.keep_source,
            create_table: self.create_table,
            generate_constructors: self.generate_constructors,
            generate_getters_setters: self.generate_getters_setters,
            not_null_annotation: self.not_null_annotation,
            last_field: self.last_field,
            source,
            path,
        }
    }
}

/// Dialect annotations of one member, cleared for every member
#[derive(Default)]
struct Scratch<'a> {
    found: Vec<(Dialect, &'a AnnotationNode)>,
}

impl<'a> Scratch<'a> {
    fn collect(member: &'a MemberNode, tree: &SourceTree) -> Self {
        let found = member
            .annotations
            .iter()
            .filter_map(|a| Dialect::of(a, tree.imports()).map(|d| (d, a)))
            .collect();
        Self { found }
    }

    fn get(&self, dialect: Dialect) -> Option<&'a AnnotationNode> {
        self.found.iter().find(|(d, _)| *d == dialect).map(|(_, a)| *a)
    }

    fn has(&self, dialect: Dialect) -> bool {
        self.get(dialect).is_some()
    }

    fn is_empty(&self) -> bool {
        self.found.is_empty()
    }
}

struct Walk<'a> {
    tree: &'a SourceTree,
    class: &'a ClassDecl,
    resolver: &'a NameResolver<'a>,
    constants: &'a Constants,
    entity: &'a str,
}

impl<'a> Walk<'a> {
    fn reader(&self, node: &'a AnnotationNode, dialect: Dialect) -> AnnotationReader<'a> {
        AnnotationReader::new(node, dialect, self.constants, self.entity)
    }

    fn invalid(&self, message: String) -> ModelError {
        ModelError::validation(self.entity, message)
    }

    fn run(&self, marker: &'a AnnotationNode) -> ModelResult<Parts> {
        let entity = self.reader(marker, Dialect::Entity);
        let table_name = entity.string("nameInDb")?;
        let mut parts = Parts {
            name: self.class.name.clone(),
            package: self.tree.package_name().to_string(),
            schema: entity.string("schema")?,
            active: entity.boolean("active")?,
            table_name: (!table_name.is_empty()).then_some(table_name),
            create_table: entity.boolean("createInDb")?,
            generate_constructors: entity.boolean("generateConstructors")?,
            generate_getters_setters: entity.boolean("generateGettersSetters")?,
            keep_source: self
                .class
                .annotations
                .iter()
                .any(|a| Dialect::of(a, self.tree.imports()) == Some(Dialect::Keep)),
            ..Parts::default()
        };
        for index in entity.annotations("indexes")? {
            parts.indexes.push(self.table_index(index)?);
        }

        let legacy = legacy_range(&self.class.keep_markers);
        for &id in &self.class.members {
            let member = self.tree.member(id);
            let scratch = Scratch::collect(member, self.tree);
            match member.kind {
                MemberKind::Field => {
                    self.field(member, &scratch, legacy, &mut parts)?;
                    parts.last_field = Some(id);
                }
                MemberKind::Constructor => parts.constructors.push(Constructor {
                    name: member.name.clone(),
                    parameters: self.parameters(member)?,
                    hint: self.hint(&scratch)?,
                    member: id,
                    line: member.line,
                }),
                MemberKind::Method => parts.methods.push(Method {
                    name: member.name.clone(),
                    parameters: self.parameters(member)?,
                    hint: self.hint(&scratch)?,
                    member: id,
                    line: member.line,
                }),
                MemberKind::Type | MemberKind::Initializer => {}
            }
        }
        Ok(parts)
    }

    fn hint(&self, scratch: &Scratch<'a>) -> ModelResult<OwnershipHint> {
        if scratch.has(Dialect::Keep) {
            return Ok(OwnershipHint::Keep);
        }
        let Some(generated) = scratch.get(Dialect::Generated) else {
            return Ok(OwnershipHint::None);
        };
        let recorded = self.reader(generated, Dialect::Generated).int("hash")?;
        CodeHash::from_recorded(recorded)
            .map(OwnershipHint::Generated)
            .map_err(|e| self.invalid(format!("{e} in @Generated (line {})", generated.line)))
    }

    fn parameters(&self, member: &MemberNode) -> ModelResult<Vec<Variable>> {
        member
            .parameters
            .iter()
            .map(|p| Ok(Variable::new(self.resolver.resolve_type(&p.ty)?, p.name.clone())))
            .collect()
    }

    fn field_type(&self, ty: &TypeNode, extra_dims: usize) -> ModelResult<VariableType> {
        if extra_dims == 0 {
            return self.resolver.resolve_type(ty);
        }
        let mut ty = ty.clone();
        ty.dims += extra_dims;
        ty.spelling.push_str(&"[]".repeat(extra_dims));
        self.resolver.resolve_type(&ty)
    }

    fn field(
        &self,
        member: &'a MemberNode,
        scratch: &Scratch<'a>,
        legacy: Option<(usize, usize)>,
        parts: &mut Parts,
    ) -> ModelResult<()> {
        let Some(ty) = &member.ty else {
            return Ok(());
        };
        let hint = self.hint(scratch)?;
        let transient =
            scratch.has(Dialect::Transient) || member.modifiers.is_transient() || member.modifiers.is_static();

        for declarator in &member.declarators {
            let variable = Variable::new(self.field_type(ty, declarator.dims)?, declarator.name.clone());

            if transient {
                parts.transient_fields.push(TransientField {
                    variable,
                    hint,
                    member: member.id,
                    line: member.line,
                });
                continue;
            }

            let in_legacy = legacy.is_some_and(|(start, end)| member.line > start && member.line < end);
            if in_legacy && scratch.is_empty() {
                tracing::warn!(
                    entity = %self.entity,
                    field = %variable.name,
                    line = member.line,
                    "field in legacy KEEP FIELDS section is treated as @Transient; mark it explicitly"
                );
                parts.legacy_transient_fields.push(TransientField {
                    variable,
                    hint,
                    member: member.id,
                    line: member.line,
                });
                continue;
            }

            if let Some(spelling) = self.not_null_spelling(scratch) {
                parts.not_null_annotation.get_or_insert(spelling);
            }

            let to_one = scratch.get(Dialect::ToOne);
            let to_many = scratch.get(Dialect::ToMany);
            match (to_one, to_many) {
                (Some(_), Some(_)) => {
                    return Err(self.invalid(format!(
                        "Field {} can't be annotated with both @ToOne and @ToMany (line {})",
                        variable.name, member.line
                    )))
                }
                (Some(node), None) => parts.to_ones.push(self.to_one(variable, node, scratch, member)?),
                (None, Some(node)) => parts.to_manys.push(self.to_many(variable, node, scratch, member)?),
                (None, None) => parts.fields.push(self.persistent(variable, scratch, member)?),
            }
        }
        Ok(())
    }

    fn not_null_spelling(&self, scratch: &Scratch<'a>) -> Option<String> {
        scratch.get(Dialect::NotNull).map(|node| format!("@{}", node.name))
    }

    fn persistent(&self, variable: Variable, scratch: &Scratch<'a>, member: &MemberNode) -> ModelResult<PersistentField> {
        let id = scratch
            .get(Dialect::Id)
            .map(|node| {
                self.reader(node, Dialect::Id)
                    .boolean("autoincrement")
                    .map(|autoincrement| IdSpec { autoincrement })
            })
            .transpose()?;

        let column_name = match scratch.get(Dialect::Property) {
            Some(node) => Some(self.reader(node, Dialect::Property).string("nameInDb")?),
            None => None,
        }
        .filter(|name| !name.is_empty());

        let index = match scratch.get(Dialect::Index) {
            Some(node) => {
                let reader = self.reader(node, Dialect::Index);
                if !reader.string("value")?.is_empty() {
                    return Err(self.invalid(format!(
                        "setting value on @Index is not supported if @Index is used on the properties (line {})",
                        node.line
                    )));
                }
                let name = reader.string("name")?;
                Some(PropertyIndex {
                    name: (!name.is_empty()).then_some(name),
                    unique: reader.boolean("unique")?,
                })
            }
            None => None,
        };

        let custom_type = match scratch.get(Dialect::Convert) {
            Some(node) => {
                let reader = self.reader(node, Dialect::Convert);
                Some(CustomType {
                    converter: self.resolver.resolve_type(reader.class("converter")?)?,
                    column_type: self.resolver.resolve_type(reader.class("columnType")?)?,
                })
            }
            None => None,
        };

        Ok(PersistentField {
            is_not_null: variable.ty.is_primitive || scratch.has(Dialect::NotNull),
            variable,
            id,
            index,
            column_name,
            custom_type,
            unique: scratch.has(Dialect::Unique),
            member: member.id,
            line: member.line,
        })
    }

    fn reject_column_markers(&self, relation: &str, scratch: &Scratch<'a>, member: &MemberNode, allowed: &[Dialect]) -> ModelResult<()> {
        const COLUMN_MARKERS: [Dialect; 6] = [
            Dialect::Id,
            Dialect::Property,
            Dialect::Index,
            Dialect::Unique,
            Dialect::NotNull,
            Dialect::Convert,
        ];
        if let Some((dialect, _)) = scratch
            .found
            .iter()
            .find(|(d, _)| COLUMN_MARKERS.contains(d) && !allowed.contains(d))
        {
            return Err(self.invalid(format!(
                "@{} can't be used together with @{relation} on {} (line {})",
                dialect.simple_name(),
                member.name,
                member.line
            )));
        }
        Ok(())
    }

    fn to_one(&self, variable: Variable, node: &'a AnnotationNode, scratch: &Scratch<'a>, member: &MemberNode) -> ModelResult<ToOne> {
        let fk = self.reader(node, Dialect::ToOne).string("joinProperty")?;
        let join = if fk.is_empty() {
            self.reject_column_markers("ToOne", scratch, member, &[Dialect::Property, Dialect::NotNull, Dialect::Unique])?;
            let name = match scratch.get(Dialect::Property) {
                Some(property) => Some(self.reader(property, Dialect::Property).string("nameInDb")?),
                None => None,
            };
            ToOneJoin::Column {
                name: name.filter(|n| !n.is_empty()),
                not_null: scratch.has(Dialect::NotNull),
                unique: scratch.has(Dialect::Unique),
            }
        } else {
            self.reject_column_markers("ToOne", scratch, member, &[])?;
            ToOneJoin::ForeignKey(fk)
        };
        Ok(ToOne {
            variable,
            join,
            member: member.id,
            line: member.line,
        })
    }

    fn to_many(&self, variable: Variable, node: &'a AnnotationNode, scratch: &Scratch<'a>, member: &MemberNode) -> ModelResult<ToMany> {
        self.reject_column_markers("ToMany", scratch, member, &[])?;
        if variable.ty.simple_name() != "List" || variable.ty.single_argument().is_none() {
            return Err(self.invalid(format!(
                "@ToMany field {} should be of type java.util.List<TargetEntity>, found {} (line {})",
                variable.name, variable.ty.spelling, member.line
            )));
        }

        let reader = self.reader(node, Dialect::ToMany);
        let mapped_by = reader.string("referencedJoinProperty")?;
        let joins = reader.annotations("joinProperties")?;
        let join_entity = scratch.get(Dialect::JoinEntity);

        let mut links = Vec::new();
        if !mapped_by.is_empty() {
            links.push(ToManyLink::MappedBy(mapped_by));
        }
        if !joins.is_empty() {
            let joins = joins
                .into_iter()
                .map(|join| {
                    let reader = self.reader(join, Dialect::JoinProperty);
                    Ok(JoinProperty {
                        name: reader.string("name")?,
                        referenced_name: reader.string("referencedName")?,
                    })
                })
                .collect::<ModelResult<Vec<_>>>()?;
            links.push(ToManyLink::JoinProperties(joins));
        }
        if let Some(join_entity) = join_entity {
            let reader = self.reader(join_entity, Dialect::JoinEntity);
            links.push(ToManyLink::JoinEntity {
                entity: self.resolver.resolve_type(reader.class("entity")?)?,
                source_property: reader.string("sourceProperty")?,
                target_property: reader.string("targetProperty")?,
            });
        }
        if links.len() != 1 {
            return Err(self.invalid(format!(
                "@ToMany {} needs exactly one of referencedJoinProperty, joinProperties or @JoinEntity, found {} (line {})",
                variable.name,
                links.len(),
                member.line
            )));
        }

        let order = match scratch.get(Dialect::OrderBy) {
            Some(order_by) => {
                let spec = self.reader(order_by, Dialect::OrderBy).string("value")?;
                if spec.trim().is_empty() {
                    Some(Order::ByPrimaryKey)
                } else {
                    Some(Order::Properties(
                        parse_order_spec(&spec).map_err(|e| self.invalid(format!("{e} (line {})", order_by.line)))?,
                    ))
                }
            }
            None => None,
        };

        Ok(ToMany {
            variable,
            link: links.remove(0),
            order,
            member: member.id,
            line: member.line,
        })
    }

    fn table_index(&self, node: &'a AnnotationNode) -> ModelResult<TableIndex> {
        let reader = self.reader(node, Dialect::Index);
        let spec = reader.string("value")?;
        let properties = parse_order_spec(&spec).map_err(|e| self.invalid(format!("{e} (line {})", node.line)))?;
        let name = reader.string("name")?;
        Ok(TableIndex {
            name: (!name.is_empty()).then_some(name),
            properties,
            unique: reader.boolean("unique")?,
        })
    }
}

/// Lines strictly between the first `// KEEP FIELDS` and `// KEEP FIELDS END`
fn legacy_range(markers: &[KeepMarker]) -> Option<(usize, usize)> {
    let start = markers.iter().find_map(|m| match m {
        KeepMarker::Start(line) => Some(*line),
        KeepMarker::End(_) => None,
    })?;
    let end = markers.iter().find_map(|m| match m {
        KeepMarker::End(line) => Some(*line),
        KeepMarker::Start(_) => None,
    })?;
    (end > start).then_some((start, end))
}

/// Parse `"a, b DESC"` into properties with directions
///
/// # Errors
/// Returns a message for an empty spec, an empty entry or an unknown direction
pub fn parse_order_spec(spec: &str) -> Result<Vec<OrderProperty>, String> {
    if spec.trim().is_empty() {
        return Err("empty property list".to_string());
    }
    spec.split(',')
        .map(|entry| {
            let mut tokens = entry.split_whitespace();
            let name = tokens
                .next()
                .ok_or_else(|| format!("empty entry in property list \"{spec}\""))?;
            let direction = match tokens.next() {
                None => Direction::Asc,
                Some(d) if d.eq_ignore_ascii_case("ASC") => Direction::Asc,
                Some(d) if d.eq_ignore_ascii_case("DESC") => Direction::Desc,
                Some(d) => return Err(format!("unknown order {d} for {name}, expected ASC or DESC")),
            };
            if let Some(extra) = tokens.next() {
                return Err(format!("unexpected token {extra} in \"{}\"", entry.trim()));
            }
            Ok(OrderProperty {
                name: name.to_string(),
                direction,
            })
        })
        .collect()
}
