//! tree-sitter front end
//!
//! [`SourceTree::parse`] runs the Java grammar over a compilation unit and
//! lowers the package, imports and the first top-level class into owned
//! nodes. Syntax errors abort lowering: a tree with an `ERROR` or `MISSING`
//! node is never handed to the model extractor.

use std::ops::Range;

use tree_sitter::{Node, Parser};

use crate::error::{SyntaxError, SyntaxResult};
use crate::node::{
    AnnotationNode, AnnotationValue, ClassDecl, Declarator, ImportDecl, InnerType, KeepMarker,
    MemberKind, MemberNode, Modifiers, NodeId, PackageDecl, Parameter, TypeNode,
};

const KEEP_FIELDS_START: &str = "// KEEP FIELDS";
const KEEP_FIELDS_END: &str = "// KEEP FIELDS END";

/// Create a parser loaded with the Java grammar
pub(crate) fn java_parser() -> SyntaxResult<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| SyntaxError::ParserInit(e.to_string()))?;
    Ok(parser)
}

/// Parse `text` and report the first syntax error, if any
pub(crate) fn check_syntax(text: &str) -> SyntaxResult<()> {
    let mut parser = java_parser()?;
    let tree = parser.parse(text, None).ok_or(SyntaxError::ParseFailed)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(first_error(root, text));
    }
    Ok(())
}

/// Lowered compilation unit
///
/// Holds the original text; every range in the lowered nodes indexes into it.
#[derive(Debug, Clone)]
pub struct SourceTree {
    text: String,
    package: Option<PackageDecl>,
    imports: Vec<ImportDecl>,
    class: Option<ClassDecl>,
    members: Vec<MemberNode>,
    line_starts: Vec<usize>,
}

impl SourceTree {
    /// Parse a Java compilation unit
    ///
    /// # Errors
    /// - [`SyntaxError::Invalid`] if the source has a syntax error
    /// - [`SyntaxError::ParserInit`] / [`SyntaxError::ParseFailed`] if the parser fails
    pub fn parse(text: impl Into<String>) -> SyntaxResult<Self> {
        let text = text.into();
        let mut parser = java_parser()?;
        let tree = parser.parse(&text, None).ok_or(SyntaxError::ParseFailed)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(first_error(root, &text));
        }

        let mut lowering = Lowering::new(&text);
        let mut package = None;
        let mut imports = Vec::new();
        let mut class = None;
        for child in children(root) {
            match child.kind() {
                "package_declaration" => package = Some(lowering.package(child)),
                "import_declaration" => imports.push(lowering.import(child)),
                "class_declaration" if class.is_none() => class = Some(lowering.class(child)),
                _ => {}
            }
        }
        let members = lowering.members;
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Ok(Self {
            text,
            package,
            imports,
            class,
            members,
            line_starts,
        })
    }

    /// Original source text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Package declaration
    #[inline]
    #[must_use]
    pub fn package(&self) -> Option<&PackageDecl> {
        self.package.as_ref()
    }

    /// Package name, `""` for the default package
    #[inline]
    #[must_use]
    pub fn package_name(&self) -> &str {
        self.package.as_ref().map_or("", |p| p.name.as_str())
    }

    /// Import declarations in source order
    #[inline]
    #[must_use]
    pub fn imports(&self) -> &[ImportDecl] {
        &self.imports
    }

    /// First top-level class
    #[inline]
    #[must_use]
    pub fn class(&self) -> Option<&ClassDecl> {
        self.class.as_ref()
    }

    /// Member by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&MemberNode> {
        self.members.get(id.index())
    }

    /// Member by id
    ///
    /// # Panics
    /// Panics if `id` was not produced by this tree
    #[inline]
    #[must_use]
    pub fn member(&self, id: NodeId) -> &MemberNode {
        &self.members[id.index()]
    }

    /// Class members in source order
    pub fn members(&self) -> impl Iterator<Item = &MemberNode> + '_ {
        self.members.iter()
    }

    /// Source text of `range`
    #[inline]
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> &str {
        &self.text[range]
    }

    /// Source text of a member, javadoc included
    #[must_use]
    pub fn member_text(&self, id: NodeId) -> &str {
        self.get(id).map_or("", |m| &self.text[m.extent.clone()])
    }

    /// 1-based line containing byte `offset`
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn first_error(root: Node<'_>, text: &str) -> SyntaxError {
    let mut stack = vec![root];
    let mut found = root;
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            found = node;
            break;
        }
        for child in children(node).into_iter().rev() {
            if child.has_error() || child.is_missing() {
                stack.push(child);
            }
        }
    }
    let position = found.start_position();
    let snippet = text
        .lines()
        .nth(position.row)
        .map(|l| l.trim().chars().take(80).collect())
        .unwrap_or_default();
    SyntaxError::Invalid {
        line: position.row + 1,
        column: position.column + 1,
        snippet,
    }
}

fn is_comment(kind: &str) -> bool {
    matches!(kind, "line_comment" | "block_comment" | "comment")
}

/// Text without any whitespace, used for names and type spellings
fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Leading whitespace of the line containing `offset`
fn line_indent(src: &str, offset: usize) -> String {
    let line_start = src[..offset].rfind('\n').map_or(0, |i| i + 1);
    src[line_start..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

struct Lowering<'s> {
    src: &'s str,
    members: Vec<MemberNode>,
}

impl<'s> Lowering<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            members: Vec::new(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        &self.src[node.byte_range()]
    }

    fn field_text(&self, node: Node<'_>, field: &str) -> String {
        node.child_by_field_name(field)
            .map(|n| compact(self.text(n)))
            .unwrap_or_default()
    }

    fn package(&self, node: Node<'_>) -> PackageDecl {
        let name = children(node)
            .into_iter()
            .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
            .map(|c| compact(self.text(c)))
            .unwrap_or_default();
        PackageDecl {
            name,
            range: node.byte_range(),
        }
    }

    fn import(&self, node: Node<'_>) -> ImportDecl {
        let mut import = ImportDecl {
            name: String::new(),
            is_static: false,
            wildcard: false,
            range: node.byte_range(),
            line: node.start_position().row + 1,
        };
        for child in children(node) {
            match child.kind() {
                "static" => import.is_static = true,
                "asterisk" => import.wildcard = true,
                "identifier" | "scoped_identifier" => import.name = compact(self.text(child)),
                _ => {}
            }
        }
        import
    }

    fn modifiers(&self, node: Node<'_>) -> (Modifiers, Vec<AnnotationNode>) {
        let mut modifiers = Modifiers::default();
        let mut annotations = Vec::new();
        let Some(list) = children(node).into_iter().find(|c| c.kind() == "modifiers") else {
            return (modifiers, annotations);
        };
        for m in children(list) {
            match m.kind() {
                "marker_annotation" | "annotation" => annotations.push(self.annotation(m)),
                keyword if !m.is_named() => modifiers.push(keyword),
                _ => {}
            }
        }
        (modifiers, annotations)
    }

    fn class(&mut self, node: Node<'_>) -> ClassDecl {
        let (modifiers, annotations) = self.modifiers(node);
        let body = node.child_by_field_name("body");
        let mut class = ClassDecl {
            name: self.field_text(node, "name"),
            modifiers,
            annotations,
            range: node.byte_range(),
            body: body.map_or(node.end_byte()..node.end_byte(), |b| b.byte_range()),
            indent: line_indent(self.src, node.start_byte()),
            line: node.start_position().row + 1,
            members: Vec::new(),
            inner_types: Vec::new(),
            keep_markers: Vec::new(),
        };
        let Some(body) = body else {
            return class;
        };

        let mut pending_doc: Option<Range<usize>> = None;
        for child in children(body) {
            let kind = match child.kind() {
                "field_declaration" => MemberKind::Field,
                "constructor_declaration" | "compact_constructor_declaration" => MemberKind::Constructor,
                "method_declaration" => MemberKind::Method,
                "class_declaration" | "interface_declaration" | "enum_declaration"
                | "record_declaration" | "annotation_type_declaration" => MemberKind::Type,
                "block" | "static_initializer" => MemberKind::Initializer,
                comment if is_comment(comment) => {
                    let text = self.text(child);
                    let line = child.start_position().row + 1;
                    if text.starts_with("/**") {
                        pending_doc = Some(child.byte_range());
                    } else {
                        pending_doc = None;
                        let trimmed = text.trim_start();
                        if trimmed.starts_with(KEEP_FIELDS_END) {
                            class.keep_markers.push(KeepMarker::End(line));
                        } else if trimmed.starts_with(KEEP_FIELDS_START) {
                            class.keep_markers.push(KeepMarker::Start(line));
                        }
                    }
                    continue;
                }
                ";" => {
                    pending_doc = None;
                    continue;
                }
                _ => continue,
            };
            let id = self.member(child, kind, pending_doc.take());
            if kind == MemberKind::Type {
                let member = &self.members[id.index()];
                let implicit_static = child.kind() != "class_declaration";
                class.inner_types.push(InnerType {
                    name: member.name.clone(),
                    is_static: implicit_static || member.modifiers.is_static(),
                    line: member.line,
                });
            }
            class.members.push(id);
        }
        class
    }

    fn member(&mut self, node: Node<'_>, kind: MemberKind, doc: Option<Range<usize>>) -> NodeId {
        let id = NodeId::from_index(self.members.len());
        let (modifiers, annotations) = self.modifiers(node);
        let range = node.byte_range();
        let start = doc.map_or(range.start, |d| d.start);
        let mut member = MemberNode {
            id,
            kind,
            name: String::new(),
            modifiers,
            annotations,
            ty: None,
            declarators: Vec::new(),
            parameters: Vec::new(),
            extent: start..range.end,
            range,
            line: node.start_position().row + 1,
            indent: line_indent(self.src, start),
        };

        match kind {
            MemberKind::Field => {
                member.ty = node.child_by_field_name("type").map(|t| self.type_node(t));
                let mut cursor = node.walk();
                let declarators: Vec<Node<'_>> =
                    node.children_by_field_name("declarator", &mut cursor).collect();
                member.declarators = declarators.into_iter().map(|d| self.declarator(d)).collect();
                member.name = member
                    .declarators
                    .first()
                    .map(|d| d.name.clone())
                    .unwrap_or_default();
            }
            MemberKind::Constructor | MemberKind::Method => {
                member.name = self.field_text(node, "name");
                member.ty = node.child_by_field_name("type").map(|t| self.type_node(t));
                member.parameters = node
                    .child_by_field_name("parameters")
                    .map(|p| self.parameters(p))
                    .unwrap_or_default();
            }
            MemberKind::Type => member.name = self.field_text(node, "name"),
            MemberKind::Initializer => {}
        }

        self.members.push(member);
        id
    }

    fn declarator(&self, node: Node<'_>) -> Declarator {
        Declarator {
            name: self.field_text(node, "name"),
            dims: node
                .child_by_field_name("dimensions")
                .map_or(0, |d| self.text(d).matches('[').count()),
            value: node.child_by_field_name("value").map(|v| self.value(v)),
        }
    }

    fn parameters(&self, node: Node<'_>) -> Vec<Parameter> {
        let mut params = Vec::new();
        for child in children(node) {
            match child.kind() {
                "formal_parameter" => {
                    let Some(ty) = child.child_by_field_name("type") else {
                        continue;
                    };
                    let mut ty = self.type_node(ty);
                    if let Some(dims) = child.child_by_field_name("dimensions") {
                        ty.dims += self.text(dims).matches('[').count();
                    }
                    params.push(Parameter {
                        ty,
                        name: self.field_text(child, "name"),
                    });
                }
                "spread_parameter" => {
                    let parts = children(child);
                    let ty = parts.iter().find(|c| is_type_kind(c.kind())).map(|t| self.type_node(*t));
                    let name = parts
                        .iter()
                        .find(|c| c.kind() == "variable_declarator")
                        .map(|d| self.field_text(*d, "name"))
                        .unwrap_or_default();
                    if let Some(mut ty) = ty {
                        ty.dims += 1;
                        ty.spelling.push_str("[]");
                        params.push(Parameter { ty, name });
                    }
                }
                _ => {}
            }
        }
        params
    }

    fn type_node(&self, node: Node<'_>) -> TypeNode {
        let spelling = compact(self.text(node));
        let line = node.start_position().row + 1;
        match node.kind() {
            "integral_type" | "floating_point_type" | "boolean_type" | "void_type" => TypeNode {
                base: spelling.clone(),
                spelling,
                args: Vec::new(),
                dims: 0,
                primitive: true,
                line,
            },
            "array_type" => {
                let element = node.child_by_field_name("element").map(|e| self.type_node(e));
                let dims = node
                    .child_by_field_name("dimensions")
                    .map_or(1, |d| self.text(d).matches('[').count());
                let mut ty = element.unwrap_or_else(|| TypeNode {
                    spelling: String::new(),
                    base: spelling.clone(),
                    args: Vec::new(),
                    dims: 0,
                    primitive: false,
                    line,
                });
                ty.dims += dims;
                ty.spelling = spelling;
                ty
            }
            "generic_type" => {
                let parts = children(node);
                let base = parts
                    .iter()
                    .find(|c| matches!(c.kind(), "type_identifier" | "scoped_type_identifier"))
                    .map(|c| compact(self.text(*c)))
                    .unwrap_or_else(|| spelling.clone());
                let args = parts
                    .iter()
                    .find(|c| c.kind() == "type_arguments")
                    .map(|list| {
                        children(*list)
                            .into_iter()
                            .filter(|c| c.is_named() && !is_comment(c.kind()))
                            .map(|c| self.type_node(c))
                            .collect()
                    })
                    .unwrap_or_default();
                TypeNode {
                    spelling,
                    base,
                    args,
                    dims: 0,
                    primitive: false,
                    line,
                }
            }
            "annotated_type" => children(node)
                .into_iter()
                .filter(|c| is_type_kind(c.kind()))
                .last()
                .map_or_else(
                    || TypeNode {
                        base: spelling.clone(),
                        spelling: spelling.clone(),
                        args: Vec::new(),
                        dims: 0,
                        primitive: false,
                        line,
                    },
                    |t| self.type_node(t),
                ),
            _ => TypeNode {
                base: spelling.clone(),
                spelling,
                args: Vec::new(),
                dims: 0,
                primitive: false,
                line,
            },
        }
    }

    fn annotation(&self, node: Node<'_>) -> AnnotationNode {
        let mut args = Vec::new();
        if let Some(list) = node.child_by_field_name("arguments") {
            for arg in children(list) {
                if !arg.is_named() || is_comment(arg.kind()) {
                    continue;
                }
                if arg.kind() == "element_value_pair" {
                    let key = self.field_text(arg, "key");
                    if let Some(value) = arg.child_by_field_name("value") {
                        args.push((key, self.value(value)));
                    }
                } else {
                    args.push(("value".to_string(), self.value(arg)));
                }
            }
        }
        AnnotationNode {
            name: self.field_text(node, "name"),
            args,
            has_argument_list: node.kind() == "annotation",
            range: node.byte_range(),
            line: node.start_position().row + 1,
        }
    }

    fn value(&self, node: Node<'_>) -> AnnotationValue {
        let text = self.text(node);
        match node.kind() {
            "string_literal" => AnnotationValue::Str(unquote(text)),
            "true" => AnnotationValue::Bool(true),
            "false" => AnnotationValue::Bool(false),
            "decimal_integer_literal" | "hex_integer_literal" | "octal_integer_literal"
            | "binary_integer_literal" => parse_int(text)
                .map_or_else(|| AnnotationValue::Other(text.to_string()), AnnotationValue::Int),
            "unary_expression" => {
                let operator = node.child_by_field_name("operator").map(|o| self.text(o));
                let operand = node.child_by_field_name("operand").map(|o| self.value(o));
                match (operator, operand) {
                    (Some("-"), Some(AnnotationValue::Int(v))) => AnnotationValue::Int(-v),
                    (Some("+"), Some(AnnotationValue::Int(v))) => AnnotationValue::Int(v),
                    (Some("!"), Some(AnnotationValue::Bool(b))) => AnnotationValue::Bool(!b),
                    _ => AnnotationValue::Other(text.to_string()),
                }
            }
            "parenthesized_expression" => children(node)
                .into_iter()
                .find(|c| c.is_named() && !is_comment(c.kind()))
                .map_or_else(|| AnnotationValue::Other(text.to_string()), |inner| self.value(inner)),
            "class_literal" => children(node)
                .into_iter()
                .find(|c| c.is_named() && !is_comment(c.kind()))
                .map_or_else(
                    || AnnotationValue::Other(text.to_string()),
                    |t| AnnotationValue::Class(self.type_node(t)),
                ),
            "identifier" | "field_access" | "scoped_identifier" => AnnotationValue::Name(compact(text)),
            "element_value_array_initializer" | "array_initializer" => AnnotationValue::Array(
                children(node)
                    .into_iter()
                    .filter(|c| c.is_named() && !is_comment(c.kind()))
                    .map(|c| self.value(c))
                    .collect(),
            ),
            "marker_annotation" | "annotation" => {
                AnnotationValue::Annotation(Box::new(self.annotation(node)))
            }
            _ => AnnotationValue::Other(text.to_string()),
        }
    }
}

fn is_type_kind(kind: &str) -> bool {
    matches!(
        kind,
        "integral_type"
            | "floating_point_type"
            | "boolean_type"
            | "void_type"
            | "type_identifier"
            | "scoped_type_identifier"
            | "generic_type"
            | "array_type"
            | "annotated_type"
    )
}

/// Integer literal as `Integer.decode` reads it: decimal, `0x` hex, leading-zero octal
fn parse_int(text: &str) -> Option<i64> {
    let digits: String = text
        .trim_end_matches(['l', 'L'])
        .chars()
        .filter(|c| *c != '_')
        .collect();
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        i64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

/// String literal contents with escapes resolved
fn unquote(literal: &str) -> String {
    let inner = if let Some(block) = literal.strip_prefix("\"\"\"") {
        block.strip_suffix("\"\"\"").unwrap_or(block).trim_start_matches(['\r', '\n'])
    } else {
        let s = literal.strip_prefix('"').unwrap_or(literal);
        s.strip_suffix('"').unwrap_or(s)
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('s') => out.push(' '),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOTE: &str = r#"package org.example;

import org.greenrobot.greendao.annotation.Entity;
import org.greenrobot.greendao.annotation.*;
import static java.lang.Math.max;
import java.util.List;

@Entity(nameInDb = "NOTES", active = true)
public class Note {

    @Id(autoincrement = true)
    private Long id;

    // KEEP FIELDS - put your custom fields here
    private String a, b;
    // KEEP FIELDS END

    @ToMany(joinProperties = {
            @JoinProperty(name = "id", referencedName = "noteId")
    })
    @OrderBy("date ASC")
    private List<Order> orders;

    static final int LIMIT = -0x10;

    /**
     * Constructor doc
     */
    @Generated(hash = 1272611929)
    public Note() {
    }

    public void setText(String text, byte[] data, int... rest) {
    }

    public static class Inner {}

    enum Kind { A, B }
}
"#;

    fn note() -> SourceTree {
        SourceTree::parse(NOTE).unwrap()
    }

    #[test]
    fn lowers_package_and_imports() {
        let tree = note();
        assert_eq!(tree.package_name(), "org.example");
        let imports = tree.imports();
        assert_eq!(imports.len(), 4);
        assert_eq!(imports[0].name, "org.greenrobot.greendao.annotation.Entity");
        assert!(imports[1].wildcard);
        assert_eq!(imports[1].name, "org.greenrobot.greendao.annotation");
        assert!(imports[2].is_static);
        assert_eq!(imports[3].line, 6);
    }

    #[test]
    fn lowers_class_annotations() {
        let tree = note();
        let class = tree.class().unwrap();
        assert_eq!(class.name, "Note");
        assert_eq!(class.indent, "");
        let entity = &class.annotations[0];
        assert_eq!(entity.name, "Entity");
        assert_eq!(entity.arg("nameInDb"), Some(&AnnotationValue::Str("NOTES".into())));
        assert_eq!(entity.arg("active"), Some(&AnnotationValue::Bool(true)));
        assert!(tree.slice(class.body.clone()).starts_with('{'));
        assert!(tree.slice(class.body.clone()).ends_with('}'));
    }

    #[test]
    fn lowers_fields_with_declarators() {
        let tree = note();
        let fields: Vec<_> = tree.members().filter(|m| m.kind == MemberKind::Field).collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].name, "id");
        assert_eq!(fields[0].indent, "    ");
        assert_eq!(fields[0].ty.as_ref().unwrap().base, "Long");
        let names: Vec<_> = fields[1].declarators.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        let orders = fields[2];
        let ty = orders.ty.as_ref().unwrap();
        assert_eq!(ty.base, "List");
        assert_eq!(ty.spelling, "List<Order>");
        assert_eq!(ty.args[0].base, "Order");
        assert_eq!(
            orders.annotation("OrderBy").unwrap().arg("value"),
            Some(&AnnotationValue::Str("date ASC".into()))
        );
        let Some(AnnotationValue::Array(items)) = orders.annotation("ToMany").unwrap().arg("joinProperties")
        else {
            panic!("joinProperties is not an array");
        };
        let AnnotationValue::Annotation(join) = &items[0] else {
            panic!("array item is not an annotation");
        };
        assert_eq!(join.arg("referencedName"), Some(&AnnotationValue::Str("noteId".into())));

        let limit = fields[3];
        assert!(limit.modifiers.is_static());
        assert_eq!(limit.declarators[0].value, Some(AnnotationValue::Int(-16)));
        assert!(limit.ty.as_ref().unwrap().is_primitive());
    }

    #[test]
    fn constructor_extent_includes_javadoc() {
        let tree = note();
        let ctor = tree.members().find(|m| m.kind == MemberKind::Constructor).unwrap();
        assert_eq!(ctor.name, "Note");
        assert!(ctor.parameters.is_empty());
        let text = tree.member_text(ctor.id);
        assert!(text.starts_with("/**"));
        assert!(text.ends_with('}'));
        assert!(tree.slice(ctor.range.clone()).starts_with("@Generated"));
        assert_eq!(ctor.annotation("Generated").unwrap().arg("hash"), Some(&AnnotationValue::Int(1_272_611_929)));
    }

    #[test]
    fn method_parameters_carry_types() {
        let tree = note();
        let method = tree.members().find(|m| m.kind == MemberKind::Method).unwrap();
        assert_eq!(method.name, "setText");
        let spellings: Vec<_> = method.parameters.iter().map(|p| p.ty.spelling.as_str()).collect();
        assert_eq!(spellings, ["String", "byte[]", "int[]"]);
        assert_eq!(method.parameters[1].ty.dims, 1);
        assert_eq!(method.parameters[2].name, "rest");
        assert_eq!(method.ty.as_ref().unwrap().base, "void");
    }

    #[test]
    fn records_inner_types_and_keep_markers() {
        let tree = note();
        let class = tree.class().unwrap();
        let inner: Vec<_> = class.inner_types.iter().map(|t| (t.name.as_str(), t.is_static)).collect();
        assert_eq!(inner, [("Inner", true), ("Kind", true)]);
        assert_eq!(class.keep_markers, [KeepMarker::Start(14), KeepMarker::End(16)]);
    }

    #[test]
    fn reports_syntax_errors_with_position() {
        let err = SourceTree::parse("class A {\n    int a = ;\n}\n").unwrap_err();
        let SyntaxError::Invalid { line, .. } = err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(line, 2);
    }

    #[test]
    fn line_of_offsets() {
        let tree = SourceTree::parse("class A {\n  int a;\n}\n").unwrap();
        assert_eq!(tree.line_of(0), 1);
        assert_eq!(tree.line_of(10), 2);
        assert_eq!(tree.line_of(12), 2);
        assert_eq!(tree.line_of(19), 3);
    }

    #[test]
    fn parses_literals() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("010"), Some(8));
        assert_eq!(parse_int("1_000L"), Some(1000));
        assert_eq!(unquote(r#""a\"b\n""#), "a\"b\n");
    }
}
