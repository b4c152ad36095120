//! Reconciliation session
//!
//! A [`ReconcileSession`] is opened on one [`EntityModel`]. Every `define_*`
//! call either confirms an existing generated member, queues its
//! replacement, queues an insertion, or refuses to touch a member the
//! engine does not own. Nothing is written until [`ReconcileSession::commit`]
//! turns the queue into one [`EditList`] over the original text.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use daoweave_artifact::{embed_hash, is_same_code, EditList, FormattingProfile, HASH_STUB};
use daoweave_model::{Dialect, EntityModel, Generatable, OwnershipHint, VariableType};
use daoweave_syntax::{package_of, ClassDecl, FragmentFormatter, MemberKind, NodeId, SourceTree};
use indexmap::IndexSet;

use crate::error::{ReconcileError, ReconcileResult};

/// Outcome of a `define_*` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Existing generated member already has the requested content
    Unchanged,
    /// Existing generated member is replaced in place
    Replaced,
    /// New member is inserted
    Inserted,
    /// `@Keep` member left untouched
    Protected,
    /// Unmarked member left untouched by [`ReconcileSession::define_method_if_missing`]
    UserDefined,
    /// The whole entity is `@Keep`
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Anchor {
    After(NodeId),
    BodyStart,
}

#[derive(Debug, Clone)]
struct Insertion {
    anchor: Anchor,
    kind: MemberKind,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    Strict,
    IfMissing,
}

/// Existing member matched by a define call
struct Existing {
    member: NodeId,
    hint: OwnershipHint,
    place: String,
    line: usize,
}

impl Existing {
    fn of(member: &dyn Generatable) -> Self {
        Self {
            member: member.member(),
            hint: member.hint(),
            place: member.describe(),
            line: member.line(),
        }
    }
}

const fn kind_rank(kind: MemberKind) -> u8 {
    match kind {
        MemberKind::Field => 0,
        MemberKind::Constructor => 1,
        MemberKind::Method => 2,
        MemberKind::Type | MemberKind::Initializer => 3,
    }
}

/// Edit session over one entity source
#[derive(Debug)]
pub struct ReconcileSession<'m> {
    model: &'m EntityModel,
    formatter: FragmentFormatter,
    indent: String,
    kept: HashSet<NodeId>,
    consumed: HashSet<NodeId>,
    replacements: Vec<(NodeId, String)>,
    insertions: Vec<Insertion>,
    new_anchors: HashMap<MemberKind, Anchor>,
    annotations: Vec<(usize, String)>,
    imports: IndexSet<String>,
}

impl<'m> ReconcileSession<'m> {
    /// Open a session
    #[must_use]
    pub fn new(model: &'m EntityModel, profile: FormattingProfile) -> Self {
        let indent = member_indent(&model.source, &profile);
        Self {
            model,
            formatter: FragmentFormatter::new(profile),
            indent,
            kept: HashSet::new(),
            consumed: HashSet::new(),
            replacements: Vec::new(),
            insertions: Vec::new(),
            new_anchors: HashMap::new(),
            annotations: Vec::new(),
            imports: IndexSet::new(),
        }
    }

    /// Model under reconciliation
    #[inline]
    #[must_use]
    pub fn model(&self) -> &'m EntityModel {
        self.model
    }

    /// Queue an import unless the name is already visible
    ///
    /// Returns `true` if an import was queued.
    pub fn ensure_import(&mut self, qualified: &str) -> bool {
        if self.model.keep_source {
            return false;
        }
        let qualified = qualified.trim_end_matches("[]");
        let package = package_of(qualified);
        if package.is_empty()
            || package == self.model.package
            || package == "java.lang"
            || self.model.is_inner_class(qualified)
            || self.model.source.imports().iter().any(|i| i.covers(qualified))
        {
            return false;
        }
        let added = self.imports.insert(qualified.to_string());
        if added {
            tracing::debug!(entity = %self.model.name, import = %qualified, "adding import");
        }
        added
    }

    /// Require a constructor with the given parameter types
    ///
    /// Falls back to an unclaimed `@Generated` constructor of the same arity
    /// class (with or without parameters) when no signature matches.
    ///
    /// # Errors
    /// - [`ReconcileError::OwnershipConflict`] if an unmarked constructor has the signature
    /// - [`ReconcileError::Format`] if the generated code is not valid
    pub fn define_constructor(
        &mut self,
        parameter_types: &[VariableType],
        generator: impl FnOnce() -> String,
    ) -> ReconcileResult<Decision> {
        if self.model.keep_source {
            return Ok(Decision::Skipped);
        }
        let constructors = &self.model.constructors;
        let existing = constructors
            .iter()
            .find(|c| !self.consumed.contains(&c.member) && c.has_signature(parameter_types))
            .or_else(|| {
                constructors.iter().find(|c| {
                    !self.consumed.contains(&c.member)
                        && c.hint.is_generated()
                        && c.parameters.is_empty() == parameter_types.is_empty()
                })
            })
            .map(|c| Existing::of(c));
        self.materialize(existing, MemberKind::Constructor, Policy::Strict, generator)
    }

    /// Require a method with the given name and parameter types
    ///
    /// # Errors
    /// - [`ReconcileError::OwnershipConflict`] if an unmarked method has the signature
    /// - [`ReconcileError::Format`] if the generated code is not valid
    pub fn define_method(
        &mut self,
        name: &str,
        parameter_types: &[VariableType],
        generator: impl FnOnce() -> String,
    ) -> ReconcileResult<Decision> {
        let existing = self.find_method(name, parameter_types);
        self.materialize(existing, MemberKind::Method, Policy::Strict, generator)
    }

    /// Like [`Self::define_method`], but an unmarked method with the signature is left alone
    ///
    /// # Errors
    /// [`ReconcileError::Format`] if the generated code is not valid
    pub fn define_method_if_missing(
        &mut self,
        name: &str,
        parameter_types: &[VariableType],
        generator: impl FnOnce() -> String,
    ) -> ReconcileResult<Decision> {
        let existing = self.find_method(name, parameter_types);
        self.materialize(existing, MemberKind::Method, Policy::IfMissing, generator)
    }

    fn find_method(&self, name: &str, parameter_types: &[VariableType]) -> Option<Existing> {
        self.model
            .methods
            .iter()
            .find(|m| m.has_signature(name, parameter_types))
            .map(|m| Existing::of(m))
    }

    /// Require a generated transient field
    ///
    /// # Errors
    /// - [`ReconcileError::OwnershipConflict`] if an unmarked transient field has the name
    /// - [`ReconcileError::Format`] if the generated code is not valid
    pub fn define_field(&mut self, name: &str, ty: &VariableType, doc: Option<&str>) -> ReconcileResult<Decision> {
        let existing = self
            .model
            .transient_fields
            .iter()
            .find(|f| f.variable.name == name)
            .map(|f| Existing::of(f));
        let template = field_template(name, ty, doc);
        self.materialize(existing, MemberKind::Field, Policy::Strict, || template)
    }

    fn materialize(
        &mut self,
        existing: Option<Existing>,
        kind: MemberKind,
        policy: Policy,
        generator: impl FnOnce() -> String,
    ) -> ReconcileResult<Decision> {
        if self.model.keep_source {
            return Ok(Decision::Skipped);
        }
        let model = self.model;
        let entity = model.name.as_str();

        if let Some(old) = existing {
            self.consumed.insert(old.member);
            match old.hint {
                OwnershipHint::Keep => {
                    self.kept.insert(old.member);
                    tracing::info!(entity, member = %old.place, "kept because of @Keep");
                    return Ok(Decision::Protected);
                }
                OwnershipHint::None if policy == Policy::IfMissing => {
                    self.kept.insert(old.member);
                    tracing::debug!(entity, member = %old.place, "leaving user-defined member");
                    return Ok(Decision::UserDefined);
                }
                OwnershipHint::None => {
                    return Err(ReconcileError::conflict(old.place, model.path(), old.line));
                }
                OwnershipHint::Generated(_) => {
                    self.kept.insert(old.member);
                    let (code, _) = embed_hash(&generator());
                    let source = &model.source;
                    if is_same_code(source.member_text(old.member), &code) {
                        tracing::debug!(entity, member = %old.place, "generated member is up to date");
                        return Ok(Decision::Unchanged);
                    }
                    let indent = source.member(old.member).indent.as_str();
                    let formatted = self.formatter.format_at(&code, indent)?;
                    let text = formatted.strip_prefix(indent).unwrap_or(&formatted).to_string();
                    tracing::debug!(entity, member = %old.place, "replacing generated member");
                    self.replacements.push((old.member, text));
                    return Ok(Decision::Replaced);
                }
            }
        }

        let (code, hash) = embed_hash(&generator());
        let anchor = self.anchor_for(kind);
        let text = self.formatter.format_at(&code, &self.indent)?;
        tracing::debug!(entity, kind = kind.describe(), %hash, "inserting generated member");
        self.insertions.push(Insertion { anchor, kind, text });
        self.new_anchors.insert(kind, anchor);
        Ok(Decision::Inserted)
    }

    fn anchor_for(&self, kind: MemberKind) -> Anchor {
        let chain: &[MemberKind] = match kind {
            MemberKind::Field => &[MemberKind::Field],
            MemberKind::Constructor => &[MemberKind::Constructor, MemberKind::Field],
            _ => &[MemberKind::Method, MemberKind::Constructor, MemberKind::Field],
        };
        for k in chain {
            if let Some(anchor) = self.new_anchors.get(k) {
                return *anchor;
            }
            if let Some(id) = self.last_existing(*k) {
                return Anchor::After(id);
            }
        }
        if kind == MemberKind::Method {
            if let Some(last) = self.class().and_then(|c| c.members.last()) {
                return Anchor::After(*last);
            }
        }
        Anchor::BodyStart
    }

    fn class(&self) -> Option<&'m ClassDecl> {
        self.model.source.class()
    }

    fn last_existing(&self, kind: MemberKind) -> Option<NodeId> {
        let source = &self.model.source;
        self.class()?
            .members
            .iter()
            .rev()
            .find(|id| source.member(**id).kind == kind)
            .copied()
    }

    /// Add `@Transient` to the fields of the legacy KEEP FIELDS section
    ///
    /// Returns the number of annotated declarations.
    pub fn annotate_legacy_keep_fields(&mut self) -> usize {
        if self.model.keep_source || self.model.legacy_transient_fields.is_empty() {
            return 0;
        }
        let mut seen = HashSet::new();
        for field in &self.model.legacy_transient_fields {
            if !seen.insert(field.member) {
                continue;
            }
            let member = self.model.source.member(field.member);
            tracing::warn!(
                entity = %self.model.name,
                field = %field.variable.name,
                line = field.line,
                "marking legacy KEEP FIELDS field with @Transient"
            );
            self.annotations
                .push((member.range.start, format!("@Transient\n{}", member.indent)));
        }
        self.ensure_import(&Dialect::Transient.qualified_name());
        seen.len()
    }

    /// Verify that a `@Keep` entity has its all-fields constructor
    ///
    /// # Errors
    /// [`ReconcileError::MissingConstructor`] if no constructor takes every
    /// persistent field, by name, in declaration order
    pub fn check_keep_class(&self) -> ReconcileResult<()> {
        let model = self.model;
        if !model.keep_source || !model.generate_constructors || model.fields.is_empty() {
            return Ok(());
        }
        let found = model.constructors.iter().any(|c| {
            c.parameters.len() == model.fields.len()
                && c.parameters.iter().zip(&model.fields).all(|(p, f)| {
                    p.name == f.name()
                        && (p.ty.name == f.variable.ty.name || p.ty.simple_name() == f.variable.ty.simple_name())
                })
        });
        if found {
            Ok(())
        } else {
            Err(ReconcileError::MissingConstructor {
                entity: model.name.clone(),
            })
        }
    }

    /// Apply queued edits and remove stale generated members
    ///
    /// Returns `None` when the text would not change.
    ///
    /// # Errors
    /// [`ReconcileError::OverlappingEdits`] if queued edits collide
    pub fn commit(self) -> ReconcileResult<Option<String>> {
        let source = &self.model.source;
        let text = source.text();
        let Some(class) = source.class() else {
            return Ok(None);
        };
        if self.model.keep_source {
            return Ok(None);
        }

        let mut removed: HashSet<NodeId> = HashSet::new();
        for member in self.model.generatables() {
            let id = member.member();
            if member.hint().is_generated() && !self.kept.contains(&id) && removed.insert(id) {
                tracing::debug!(entity = %self.model.name, member = %member.describe(), "removing stale generated member");
            }
        }

        let mut edits = EditList::new();
        for (id, replacement) in &self.replacements {
            edits.replace(source.member(*id).extent.clone(), replacement.clone());
        }
        let mut removals: Vec<NodeId> = removed.iter().copied().collect();
        removals.sort();
        for id in removals {
            edits.remove(removal_range(text, &source.member(id).extent));
        }
        for (offset, annotation) in &self.annotations {
            edits.insert(*offset, annotation.clone());
        }

        let survivor = |anchor: Anchor| match anchor {
            Anchor::After(id) if removed.contains(&id) => class
                .members
                .iter()
                .position(|m| *m == id)
                .and_then(|p| class.members[..p].iter().rev().find(|m| !removed.contains(m)))
                .map_or(Anchor::BodyStart, |m| Anchor::After(*m)),
            other => other,
        };
        let offset_of = |anchor: Anchor| match anchor {
            Anchor::After(id) => source.member(id).extent.end,
            Anchor::BodyStart => class.body.start,
        };
        let mut placed: Vec<(Anchor, &Insertion)> =
            self.insertions.iter().map(|i| (survivor(i.anchor), i)).collect();
        placed.sort_by_key(|(anchor, insertion)| (offset_of(*anchor), kind_rank(insertion.kind)));

        let mut at_body_start = Vec::new();
        for (anchor, insertion) in placed {
            match anchor {
                Anchor::After(id) => {
                    edits.insert(source.member(id).extent.end, format!("\n\n{}", insertion.text));
                }
                Anchor::BodyStart => at_body_start.push(insertion.text.as_str()),
            }
        }
        if !at_body_start.is_empty() {
            let has_survivor = class.members.iter().any(|m| !removed.contains(m));
            edits.insert(class.body.start + 1, body_start_block(text, class, &at_body_start, has_survivor));
        }

        if let Some((offset, block)) = import_block(source, &self.imports) {
            edits.insert(offset, block);
        }

        let updated = edits.apply(text)?;
        if updated == text {
            tracing::debug!(entity = %self.model.name, "no changes");
            return Ok(None);
        }
        Ok(Some(updated))
    }
}

fn member_indent(source: &SourceTree, profile: &FormattingProfile) -> String {
    let Some(class) = source.class() else {
        return profile.tabulation.unit();
    };
    class
        .members
        .iter()
        .map(|id| source.member(*id).indent.as_str())
        .find(|indent| !indent.is_empty())
        .map_or_else(|| format!("{}{}", class.indent, profile.tabulation.unit()), str::to_string)
}

fn field_template(name: &str, ty: &VariableType, doc: Option<&str>) -> String {
    let mut code = String::new();
    if let Some(doc) = doc {
        code.push_str(&format!("/** {doc} */\n"));
    }
    code.push_str(&format!(
        "@Generated(hash = {HASH_STUB})\nprivate transient {} {name};",
        ty.simple_spelling()
    ));
    code
}

/// Span removed with a member: whole lines when the member owns them, plus one preceding blank line
fn removal_range(text: &str, extent: &Range<usize>) -> Range<usize> {
    let line_start = text[..extent.start].rfind('\n').map_or(0, |i| i + 1);
    if !text[line_start..extent.start].trim().is_empty() {
        return extent.clone();
    }

    let rest = &text[extent.end..];
    let trailing = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    let mut end = extent.end;
    if rest[trailing..].starts_with("\r\n") {
        end += trailing + 2;
    } else if rest[trailing..].starts_with('\n') {
        end += trailing + 1;
    } else {
        return extent.clone();
    }

    let mut start = line_start;
    if start > 0 {
        let before = &text[..start - 1];
        let prev_start = before.rfind('\n').map_or(0, |i| i + 1);
        if prev_start > 0 && text[prev_start..start].trim().is_empty() {
            start = prev_start;
        }
    }
    start..end
}

fn body_start_block(text: &str, class: &ClassDecl, members: &[&str], has_survivor: bool) -> String {
    let after = &text[class.body.start + 1..];
    let suffix = if after.starts_with('\n') || after.starts_with("\r\n") {
        if has_survivor {
            "\n".to_string()
        } else {
            String::new()
        }
    } else {
        format!("\n{}", class.indent)
    };
    format!("\n{}{suffix}", members.join("\n\n"))
}

fn import_block(source: &SourceTree, imports: &IndexSet<String>) -> Option<(usize, String)> {
    if imports.is_empty() {
        return None;
    }
    let lines: Vec<String> = imports.iter().map(|i| format!("import {i};")).collect();
    if let Some(last) = source.imports().last() {
        let block: String = lines.iter().map(|l| format!("\n{l}")).collect();
        return Some((last.range.end, block));
    }
    if let Some(package) = source.package() {
        return Some((package.range.end, format!("\n\n{}", lines.join("\n"))));
    }
    Some((0, format!("{}\n\n", lines.join("\n"))))
}
