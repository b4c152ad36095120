//! Qualified name resolution against a file's imports

use daoweave_syntax::{AnnotationNode, ImportDecl, TypeNode};

use crate::annotations::{Dialect, DIALECT_PACKAGE};
use crate::error::{ModelError, ModelResult};
use crate::types::VariableType;

/// `java.lang` types visible without an import
pub const BUILT_IN_TYPES: [&str; 19] = [
    "Object",
    "String",
    "Boolean",
    "Byte",
    "Short",
    "Integer",
    "Long",
    "Float",
    "Double",
    "Character",
    "Number",
    "Void",
    "Enum",
    "CharSequence",
    "Iterable",
    "Comparable",
    "StringBuilder",
    "Class",
    "Math",
];

/// Resolves simple type names as written in one entity source
#[derive(Debug, Clone)]
pub struct NameResolver<'a> {
    package: &'a str,
    entity: &'a str,
    imports: &'a [ImportDecl],
    siblings: &'a [String],
    inner_types: Vec<&'a str>,
}

impl<'a> NameResolver<'a> {
    /// Create resolver
    #[must_use]
    pub fn new(package: &'a str, entity: &'a str, imports: &'a [ImportDecl], siblings: &'a [String]) -> Self {
        Self {
            package,
            entity,
            imports,
            siblings,
            inner_types: Vec::new(),
        }
    }

    /// Register types nested in the entity
    #[must_use]
    pub fn with_inner_types(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.inner_types.extend(names);
        self
    }

    fn qualify(&self, simple: &str) -> String {
        if self.package.is_empty() {
            simple.to_string()
        } else {
            format!("{}.{simple}", self.package)
        }
    }

    fn wildcards(&self) -> impl Iterator<Item = &'a ImportDecl> {
        self.imports.iter().filter(|i| i.wildcard && !i.is_static)
    }

    /// Fully qualified name of `name`
    ///
    /// # Errors
    /// [`ModelError::AmbiguousImport`] if imports on demand make the name ambiguous
    pub fn resolve(&self, name: &str, line: usize) -> ModelResult<String> {
        if let Some((head, rest)) = name.split_once('.') {
            // `Outer.Inner` resolves its outer type; `a.b.C` is already qualified
            if head.starts_with(|c: char| c.is_ascii_uppercase()) {
                return Ok(format!("{}.{rest}", self.resolve(head, line)?));
            }
            return Ok(name.to_string());
        }

        if self.inner_types.contains(&name) {
            return Ok(format!("{}.{name}", self.qualify(self.entity)));
        }
        if let Some(import) = self
            .imports
            .iter()
            .find(|i| !i.is_static && !i.wildcard && i.simple_name() == name)
        {
            return Ok(import.name.clone());
        }
        if self.siblings.iter().any(|s| s == name) || name == self.entity {
            return Ok(self.qualify(name));
        }
        if BUILT_IN_TYPES.contains(&name) {
            return Ok(format!("java.lang.{name}"));
        }
        if self.wildcards().count() < 2 {
            return Ok(self.qualify(name));
        }
        Err(ModelError::ambiguous_import(name, line))
    }

    /// Resolve a type node, generic arguments included
    ///
    /// # Errors
    /// [`ModelError::AmbiguousImport`] if any part of the type is ambiguous
    pub fn resolve_type(&self, ty: &TypeNode) -> ModelResult<VariableType> {
        let dims = "[]".repeat(ty.dims);
        if ty.primitive {
            return Ok(VariableType::new(
                format!("{}{dims}", ty.base),
                ty.spelling.clone(),
                ty.is_primitive(),
            ));
        }
        if ty.base.starts_with('?') {
            return Ok(VariableType::new(ty.spelling.clone(), ty.spelling.clone(), false));
        }
        let name = format!("{}{dims}", self.resolve(&ty.base, ty.line)?);
        let resolved = VariableType::new(name, ty.spelling.clone(), false);
        if ty.args.is_empty() {
            return Ok(resolved);
        }
        let args = ty
            .args
            .iter()
            .map(|arg| self.resolve_type(arg))
            .collect::<ModelResult<Vec<_>>>()?;
        Ok(resolved.with_type_arguments(args))
    }

    /// Check if an annotation is the dialect's `@Entity`
    ///
    /// # Errors
    /// [`ModelError::AmbiguousImport`] if several imports on demand, one of
    /// them the dialect package, could supply `Entity`
    pub fn is_entity_marker(&self, node: &AnnotationNode) -> ModelResult<bool> {
        let qualified = Dialect::Entity.qualified_name();
        if node.is_qualified() {
            return Ok(node.name == qualified);
        }
        if node.name != Dialect::Entity.simple_name() {
            return Ok(false);
        }
        if let Some(import) = self
            .imports
            .iter()
            .find(|i| !i.is_static && !i.wildcard && i.simple_name() == node.name)
        {
            return Ok(import.name == qualified);
        }
        let wildcards: Vec<_> = self.wildcards().collect();
        if !wildcards.iter().any(|i| i.name == DIALECT_PACKAGE) {
            return Ok(false);
        }
        if wildcards.len() < 2 {
            Ok(true)
        } else {
            Err(ModelError::ambiguous_import(node.name.clone(), node.line))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daoweave_syntax::SourceTree;
    use pretty_assertions::assert_eq;

    fn tree(imports: &str) -> SourceTree {
        SourceTree::parse(format!("package org.example;\n{imports}\n@Entity\nclass Note {{}}\n")).unwrap()
    }

    #[test]
    fn resolution_order() {
        let tree = tree("import java.util.List;\nimport java.util.*;");
        let siblings = vec!["Customer".to_string()];
        let resolver = NameResolver::new("org.example", "Note", tree.imports(), &siblings)
            .with_inner_types(["Status"]);

        assert_eq!(resolver.resolve("List", 1).unwrap(), "java.util.List");
        assert_eq!(resolver.resolve("Customer", 1).unwrap(), "org.example.Customer");
        assert_eq!(resolver.resolve("Long", 1).unwrap(), "java.lang.Long");
        assert_eq!(resolver.resolve("Status", 1).unwrap(), "org.example.Note.Status");
        assert_eq!(resolver.resolve("Status.Kind", 1).unwrap(), "org.example.Note.Status.Kind");
        assert_eq!(resolver.resolve("java.util.Date", 1).unwrap(), "java.util.Date");
        // A single import on demand is not ambiguous
        assert_eq!(resolver.resolve("Order", 1).unwrap(), "org.example.Order");
    }

    #[test]
    fn two_wildcards_make_unknown_names_ambiguous() {
        let tree = tree("import java.util.*;\nimport org.other.*;");
        let resolver = NameResolver::new("org.example", "Note", tree.imports(), &[]);
        assert_eq!(
            resolver.resolve("Order", 9),
            Err(ModelError::AmbiguousImport {
                name: "Order".into(),
                line: 9
            })
        );
        assert_eq!(resolver.resolve("String", 9).unwrap(), "java.lang.String");
    }

    #[test]
    fn static_wildcards_do_not_count() {
        let tree = tree("import static a.B.*;\nimport static c.D.*;");
        let resolver = NameResolver::new("org.example", "Note", tree.imports(), &[]);
        assert_eq!(resolver.resolve("Order", 1).unwrap(), "org.example.Order");
    }

    #[test]
    fn resolves_generic_and_array_types() {
        let tree = SourceTree::parse(
            "package p;\nimport java.util.List;\nclass A {\n    List<Order> orders;\n    byte[] data;\n}\n",
        )
        .unwrap();
        let resolver = NameResolver::new("p", "A", tree.imports(), &[]);
        let fields: Vec<_> = tree.members().collect();
        let orders = resolver.resolve_type(fields[0].ty.as_ref().unwrap()).unwrap();
        assert_eq!(orders.name, "java.util.List");
        assert_eq!(orders.single_argument().unwrap().name, "p.Order");
        let data = resolver.resolve_type(fields[1].ty.as_ref().unwrap()).unwrap();
        assert_eq!(data.name, "byte[]");
        assert!(!data.is_primitive);
    }

    #[test]
    fn entity_marker_detection() {
        let cases = [
            ("import org.greenrobot.greendao.annotation.Entity;", Ok(true)),
            ("import javax.persistence.Entity;", Ok(false)),
            ("import org.greenrobot.greendao.annotation.*;", Ok(true)),
            ("", Ok(false)),
        ];
        for (imports, expected) in cases {
            let tree = tree(imports);
            let resolver = NameResolver::new("org.example", "Note", tree.imports(), &[]);
            let marker = &tree.class().unwrap().annotations[0];
            assert_eq!(resolver.is_entity_marker(marker), expected, "{imports}");
        }
    }

    #[test]
    fn entity_marker_with_competing_wildcards_is_ambiguous() {
        let tree = tree("import org.greenrobot.greendao.annotation.*;\nimport javax.persistence.*;");
        let resolver = NameResolver::new("org.example", "Note", tree.imports(), &[]);
        let marker = &tree.class().unwrap().annotations[0];
        assert!(matches!(
            resolver.is_entity_marker(marker),
            Err(ModelError::AmbiguousImport { .. })
        ));
    }
}
