//! Generation planner
//!
//! Decides which members an entity needs and issues the session's define
//! calls for them, in a fixed order: constructors, accessors, then the
//! members of active entities. Relation members need their target
//! entities, looked up in an [`EntityIndex`] over every model of the batch.

use std::collections::{HashMap, HashSet};

use daoweave_artifact::{FormattingProfile, HASH_STUB};
use daoweave_model::{
    Dialect, EntityModel, ModelError, PersistentField, ToMany, ToManyLink, ToOne, ToOneJoin, VariableType,
};
use daoweave_reconcile::ReconcileSession;

use crate::config::WeaveConfig;
use crate::error::WeaveResult;

/// Ownership annotation import
pub const GENERATED_IMPORT: &str = "org.greenrobot.greendao.annotation.Generated";

/// Exception thrown by active entity members
pub const DAO_EXCEPTION_IMPORT: &str = "org.greenrobot.greendao.DaoException";

const DETACHED: &str = "throw new DaoException(\"Entity is detached from DAO context\");";

/// Every entity of a batch, by qualified name
#[derive(Debug, Default)]
pub struct EntityIndex<'m> {
    entities: HashMap<String, &'m EntityModel>,
    failed: HashSet<String>,
}

impl<'m> EntityIndex<'m> {
    /// Index models by qualified name
    pub fn new(models: impl IntoIterator<Item = &'m EntityModel>) -> Self {
        Self {
            entities: models.into_iter().map(|m| (m.qualified_name(), m)).collect(),
            failed: HashSet::new(),
        }
    }

    /// Record entities of the batch that could not be loaded
    #[must_use]
    pub fn with_failed(mut self, qualified: impl IntoIterator<Item = String>) -> Self {
        self.failed.extend(qualified);
        self
    }

    /// Check if `qualified` is an entity that failed to load
    #[must_use]
    pub fn is_failed(&self, qualified: &str) -> bool {
        self.failed.contains(qualified)
    }

    /// Look up an entity
    #[must_use]
    pub fn get(&self, qualified: &str) -> Option<&'m EntityModel> {
        self.entities.get(qualified).copied()
    }

    /// Number of entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Result of reconciling one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// New file content, `None` when nothing changed
    pub text: Option<String>,
    /// `@Keep` members left untouched
    pub kept_members: usize,
    /// Whole class is `@Keep`
    pub kept_class: bool,
}

/// Issues define calls for entities
#[derive(Debug, Clone, Copy)]
pub struct GenerationPlanner<'a> {
    config: &'a WeaveConfig,
    index: &'a EntityIndex<'a>,
}

impl<'a> GenerationPlanner<'a> {
    /// Create planner
    #[must_use]
    pub fn new(config: &'a WeaveConfig, index: &'a EntityIndex<'a>) -> Self {
        Self { config, index }
    }

    /// Package of the DAO classes serving `model`
    #[must_use]
    pub fn dao_package(&self, model: &EntityModel) -> String {
        self.config
            .dao_package_for(&model.schema)
            .map_or_else(|| model.package.clone(), str::to_string)
    }

    /// Formatting profile for `model`'s file
    #[must_use]
    pub fn profile(&self, model: &EntityModel) -> FormattingProfile {
        FormattingProfile::detect(model.source.text(), self.config.formatting.as_ref())
    }

    /// Plan and commit one entity
    ///
    /// # Errors
    /// Validation, ownership and formatting errors of this entity
    pub fn reconcile(&self, model: &EntityModel) -> WeaveResult<Reconciled> {
        let mut session = ReconcileSession::new(model, self.profile(model));
        self.plan(&mut session)?;
        let text = session.commit()?;
        Ok(Reconciled {
            text,
            kept_members: model.kept_members(),
            kept_class: model.keep_source,
        })
    }

    /// Issue every define call for the session's entity
    ///
    /// # Errors
    /// Validation, ownership and formatting errors of this entity
    pub fn plan(&self, session: &mut ReconcileSession<'_>) -> WeaveResult<()> {
        let model = session.model();
        if model.keep_source {
            session.check_keep_class()?;
            tracing::info!(entity = %model.name, "kept source of @Keep class");
            return Ok(());
        }

        session.annotate_legacy_keep_fields();
        session.ensure_import(GENERATED_IMPORT);

        if model.generate_constructors && self.config.generate_constructors {
            self.constructors(session)?;
        }
        if model.generate_getters_setters && self.config.generate_getters_setters {
            accessors(session)?;
        }
        if model.is_active() {
            self.active_members(session)?;
        }
        Ok(())
    }

    fn constructors(&self, session: &mut ReconcileSession<'_>) -> WeaveResult<()> {
        let model = session.model();
        let user_no_arg = model
            .constructors
            .iter()
            .any(|c| c.parameters.is_empty() && !c.hint.is_generated());
        if model.fields.is_empty() && user_no_arg {
            return Ok(());
        }

        let needs_not_null = model.fields.iter().any(|f| f.is_not_null && !f.variable.ty.is_primitive);
        let not_null = needs_not_null.then(|| not_null_annotation(session));
        let types: Vec<VariableType> = model.fields.iter().map(|f| f.variable.ty.clone()).collect();
        session.define_constructor(&types, || all_fields_constructor(model, not_null.as_deref()))?;

        if !model.fields.is_empty() && !user_no_arg {
            session.define_constructor(&[], || no_arg_constructor(&model.name))?;
        }
        Ok(())
    }

    fn active_members(&self, session: &mut ReconcileSession<'_>) -> WeaveResult<()> {
        let model = session.model();
        let dao_package = self.dao_package(model);
        let session_type = dao_type(&dao_package, "DaoSession");
        let entity_dao = dao_type(&dao_package, &format!("{}Dao", model.name));

        session.ensure_import(DAO_EXCEPTION_IMPORT);
        session.ensure_import(&session_type.name);
        session.ensure_import(&entity_dao.name);

        session.define_field("daoSession", &session_type, Some("Used to resolve relations"))?;
        session.define_field("myDao", &entity_dao, Some("Used for active entity operations."))?;

        for to_one in &model.to_ones {
            self.to_one(session, to_one)?;
        }
        for to_many in &model.to_manys {
            self.to_many(session, to_many)?;
        }

        for operation in ["delete", "refresh", "update"] {
            session.define_method(operation, &[], || active_operation(operation))?;
        }
        session.define_method("__setDaoSession", std::slice::from_ref(&session_type), || {
            dao_session_setter(&entity_dao.spelling)
        })?;
        Ok(())
    }

    fn target(&self, model: &EntityModel, ty: &VariableType, relation: &str) -> WeaveResult<&'a EntityModel> {
        match self.index.get(&ty.name) {
            Some(target) if target.schema == model.schema => Ok(target),
            Some(target) => Err(ModelError::validation(
                &model.name,
                format!(
                    "Relation {relation} targets {} of schema {}, but {} belongs to schema {}",
                    target.name, target.schema, model.name, model.schema
                ),
            )
            .into()),
            None if self.index.is_failed(&ty.name) => Err(ModelError::validation(
                &model.name,
                format!("Relation {relation} targets {}, which failed to load", ty.name),
            )
            .into()),
            None => Err(ModelError::validation(
                &model.name,
                format!("Relation {relation} targets {}, which is not an entity", ty.name),
            )
            .into()),
        }
    }

    fn to_one(&self, session: &mut ReconcileSession<'_>, to_one: &ToOne) -> WeaveResult<()> {
        let model = session.model();
        let name = to_one.variable.name.as_str();
        let target = self.target(model, &to_one.variable.ty, name)?;
        let target_dao = dao_type(&self.dao_package(target), &format!("{}Dao", target.name));
        session.ensure_import(&target_dao.name);

        let relation = ToOneTemplate {
            name,
            cap: capitalize(name),
            target: &to_one.variable.ty.spelling,
            target_dao: &target_dao.spelling,
        };
        let setter_types = std::slice::from_ref(&to_one.variable.ty);

        match &to_one.join {
            ToOneJoin::ForeignKey(fk) => {
                let fk_field = model.field(fk).ok_or_else(|| {
                    ModelError::validation(&model.name, format!("Can't find {fk} in {} for @ToOne relation", model.name))
                })?;
                let pk = target.primary_key().ok_or_else(|| {
                    ModelError::validation(
                        &model.name,
                        format!("Target {} of relation {name} has no primary key", target.name),
                    )
                })?;
                session.define_field(&format!("{name}__resolvedKey"), &boxed(&fk_field.variable.ty), None)?;
                session.define_method(&format!("get{}", relation.cap), &[], || relation.key_getter(fk_field))?;
                let not_null = fk_field.is_not_null.then(|| not_null_annotation(session));
                session.define_method(&format!("set{}", relation.cap), setter_types, || {
                    relation.key_setter(fk_field, pk, not_null.as_deref())
                })?;
            }
            ToOneJoin::Column { not_null: required, .. } => {
                let refreshed = VariableType::new("boolean", "boolean", true);
                session.define_field(&format!("{name}__refreshed"), &refreshed, None)?;
                session.define_method(&format!("get{}", relation.cap), &[], || relation.refresh_getter())?;
                session.define_method(&format!("peak{}", relation.cap), &[], || relation.peek())?;
                let annotation = (*required).then(|| not_null_annotation(session));
                session.define_method(&format!("set{}", relation.cap), setter_types, || {
                    relation.refresh_setter(annotation.as_deref())
                })?;
            }
        }
        Ok(())
    }

    fn to_many(&self, session: &mut ReconcileSession<'_>, to_many: &ToMany) -> WeaveResult<()> {
        let model = session.model();
        let name = to_many.variable.name.as_str();
        let target_ty = to_many.target().ok_or_else(|| {
            ModelError::validation(&model.name, format!("Can't determine target entity of to-many relation {name}"))
        })?;
        let target = self.target(model, target_ty, name)?;
        let target_dao = dao_type(&self.dao_package(target), &format!("{}Dao", target.name));
        session.ensure_import(&target_dao.name);

        let arguments = match &to_many.link {
            ToManyLink::JoinProperties(joins) => joins.iter().map(|j| j.name.as_str()).collect::<Vec<_>>().join(", "),
            ToManyLink::MappedBy(_) | ToManyLink::JoinEntity { .. } => model
                .primary_key()
                .map(|pk| pk.name().to_string())
                .ok_or_else(|| {
                    ModelError::validation(&model.name, format!("To-many relation {name} requires a primary key"))
                })?,
        };
        let cap = capitalize(name);
        let getter = format!(
            "/**\n\
             * To-many relationship, resolved on first access (and after reset).\n\
             * Changes to to-many relations are not persisted, make changes to the target entity.\n\
             */\n\
             @Generated(hash = {HASH_STUB})\n\
             public {list} get{cap}() {{\n\
             if ({name} == null) {{\n\
             final DaoSession daoSession = this.daoSession;\n\
             if (daoSession == null) {{\n\
             {DETACHED}\n\
             }}\n\
             {dao} targetDao = daoSession.get{dao}();\n\
             {list} {name}New = targetDao._query{entity}_{cap}({arguments});\n\
             synchronized (this) {{\n\
             if ({name} == null) {{\n\
             {name} = {name}New;\n\
             }}\n\
             }}\n\
             }}\n\
             return {name};\n\
             }}",
            list = to_many.variable.ty.spelling,
            dao = target_dao.spelling,
            entity = model.name,
        );
        let reset = format!(
            "/** Resets a to-many relationship, making the next get call to query for a fresh result. */\n\
             @Generated(hash = {HASH_STUB})\n\
             public synchronized void reset{cap}() {{\n\
             {name} = null;\n\
             }}"
        );
        session.define_method(&format!("get{cap}"), &[], || getter)?;
        session.define_method(&format!("reset{cap}"), &[], || reset)?;
        Ok(())
    }
}

fn accessors(session: &mut ReconcileSession<'_>) -> WeaveResult<()> {
    let model = session.model();
    for field in &model.fields {
        let name = field.name();
        let cap = capitalize(name);
        let ty = &field.variable.ty;
        session.define_method_if_missing(&format!("get{cap}"), &[], || {
            format!("public {} get{cap}() {{\nreturn this.{name};\n}}", ty.spelling)
        })?;
        session.define_method_if_missing(&format!("set{cap}"), std::slice::from_ref(ty), || {
            format!("public void set{cap}({} {name}) {{\nthis.{name} = {name};\n}}", ty.spelling)
        })?;
    }
    Ok(())
}

/// Spelling of the file's not-null annotation, importing the dialect one if the file has none
fn not_null_annotation(session: &mut ReconcileSession<'_>) -> String {
    if let Some(annotation) = &session.model().not_null_annotation {
        return annotation.clone();
    }
    session.ensure_import(&Dialect::NotNull.qualified_name());
    format!("@{}", Dialect::NotNull.simple_name())
}

fn all_fields_constructor(model: &EntityModel, not_null: Option<&str>) -> String {
    let parameters: Vec<String> = model
        .fields
        .iter()
        .map(|f| {
            let ty = &f.variable.ty;
            match not_null {
                Some(annotation) if f.is_not_null && !ty.is_primitive => {
                    format!("{annotation} {} {}", ty.spelling, f.name())
                }
                _ => format!("{} {}", ty.spelling, f.name()),
            }
        })
        .collect();
    let body: String = model
        .fields
        .iter()
        .map(|f| format!("this.{0} = {0};\n", f.name()))
        .collect();
    format!(
        "@Generated(hash = {HASH_STUB})\npublic {}({}) {{\n{body}}}",
        model.name,
        parameters.join(", ")
    )
}

fn no_arg_constructor(entity: &str) -> String {
    format!("@Generated(hash = {HASH_STUB})\npublic {entity}() {{\n}}")
}

fn active_operation(operation: &str) -> String {
    format!(
        "/**\n\
         * Convenient call for {{@link org.greenrobot.greendao.AbstractDao#{operation}(Object)}}.\n\
         * Entity must attached to an entity context.\n\
         */\n\
         @Generated(hash = {HASH_STUB})\n\
         public void {operation}() {{\n\
         if (myDao == null) {{\n\
         {DETACHED}\n\
         }}\n\
         myDao.{operation}(this);\n\
         }}"
    )
}

fn dao_session_setter(dao: &str) -> String {
    format!(
        "/** called by internal mechanisms, do not call yourself. */\n\
         @Generated(hash = {HASH_STUB})\n\
         public void __setDaoSession(DaoSession daoSession) {{\n\
         this.daoSession = daoSession;\n\
         myDao = daoSession != null ? daoSession.get{dao}() : null;\n\
         }}"
    )
}

struct ToOneTemplate<'t> {
    name: &'t str,
    cap: String,
    target: &'t str,
    target_dao: &'t str,
}

impl ToOneTemplate<'_> {
    fn key_getter(&self, fk: &PersistentField) -> String {
        let Self {
            name, cap, target, target_dao: dao,
        } = self;
        format!(
            "/** To-one relationship, resolved on first access. */\n\
             @Generated(hash = {HASH_STUB})\n\
             public {target} get{cap}() {{\n\
             {key} __key = this.{fk};\n\
             if ({name}__resolvedKey == null || !{name}__resolvedKey.equals(__key)) {{\n\
             final DaoSession daoSession = this.daoSession;\n\
             if (daoSession == null) {{\n\
             {DETACHED}\n\
             }}\n\
             {dao} targetDao = daoSession.get{dao}();\n\
             {target} {name}New = targetDao.load(__key);\n\
             synchronized (this) {{\n\
             {name} = {name}New;\n\
             {name}__resolvedKey = __key;\n\
             }}\n\
             }}\n\
             return {name};\n\
             }}",
            key = fk.variable.ty.spelling,
            fk = fk.name(),
        )
    }

    fn key_setter(&self, fk: &PersistentField, pk: &PersistentField, not_null: Option<&str>) -> String {
        let Self { name, cap, target, .. } = self;
        let fk_name = fk.name();
        let pk_getter = format!("get{}()", capitalize(pk.name()));
        let (parameter, guard, assign) = match not_null {
            Some(annotation) => (
                format!("{annotation} {target} {name}"),
                null_guard(name, fk_name),
                format!("{fk_name} = {name}.{pk_getter};"),
            ),
            None => (
                format!("{target} {name}"),
                String::new(),
                format!("{fk_name} = {name} == null ? null : {name}.{pk_getter};"),
            ),
        };
        format!(
            "/** called by internal mechanisms, do not call yourself. */\n\
             @Generated(hash = {HASH_STUB})\n\
             public void set{cap}({parameter}) {{\n\
             {guard}synchronized (this) {{\n\
             this.{name} = {name};\n\
             {assign}\n\
             {name}__resolvedKey = {fk_name};\n\
             }}\n\
             }}"
        )
    }

    fn refresh_getter(&self) -> String {
        let Self {
            name, cap, target, target_dao: dao,
        } = self;
        format!(
            "/** To-one relationship, resolved on first access. */\n\
             @Generated(hash = {HASH_STUB})\n\
             public {target} get{cap}() {{\n\
             if ({name} != null || !{name}__refreshed) {{\n\
             if (daoSession == null) {{\n\
             {DETACHED}\n\
             }}\n\
             {dao} targetDao = daoSession.get{dao}();\n\
             targetDao.refresh({name});\n\
             {name}__refreshed = true;\n\
             }}\n\
             return {name};\n\
             }}"
        )
    }

    fn peek(&self) -> String {
        let Self { name, cap, target, .. } = self;
        format!(
            "/** To-one relationship, returned entity is not refreshed and may carry only the PK property. */\n\
             @Generated(hash = {HASH_STUB})\n\
             public {target} peak{cap}() {{\n\
             return {name};\n\
             }}"
        )
    }

    fn refresh_setter(&self, not_null: Option<&str>) -> String {
        let Self { name, cap, target, .. } = self;
        let (parameter, guard) = match not_null {
            Some(annotation) => (format!("{annotation} {target} {name}"), null_guard(name, name)),
            None => (format!("{target} {name}"), String::new()),
        };
        format!(
            "/** called by internal mechanisms, do not call yourself. */\n\
             @Generated(hash = {HASH_STUB})\n\
             public void set{cap}({parameter}) {{\n\
             {guard}synchronized (this) {{\n\
             this.{name} = {name};\n\
             {name}__refreshed = true;\n\
             }}\n\
             }}"
        )
    }
}

fn null_guard(name: &str, property: &str) -> String {
    format!(
        "if ({name} == null) {{\n\
         throw new DaoException(\"To-one property '{property}' has not-null constraint; cannot set to-one to null\");\n\
         }}\n"
    )
}

fn dao_type(package: &str, class: &str) -> VariableType {
    let name = if package.is_empty() {
        class.to_string()
    } else {
        format!("{package}.{class}")
    };
    VariableType::new(name, class, false)
}

/// Wrapper of a primitive type, other types unchanged
fn boxed(ty: &VariableType) -> VariableType {
    let wrapper = match ty.name.as_str() {
        "boolean" => "Boolean",
        "byte" => "Byte",
        "short" => "Short",
        "int" => "Integer",
        "long" => "Long",
        "float" => "Float",
        "double" => "Double",
        "char" => "Character",
        _ => return ty.clone(),
    };
    VariableType::new(format!("java.lang.{wrapper}"), wrapper, false)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
