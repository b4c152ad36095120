//! Testing utilities for the daoweave workspace
//!
//! Entity fixture sources and small builders shared by the crate tests.

#![allow(missing_docs)]

use daoweave_artifact::{embed_hash, CodeHash};

pub const PACKAGE: &str = "org.example";

pub const DIALECT_IMPORT: &str = "import org.greenrobot.greendao.annotation.*;";

/// Plain entity with an id and a text column
pub const NOTE: &str = r#"package org.example;

import org.greenrobot.greendao.annotation.Entity;
import org.greenrobot.greendao.annotation.Id;
import org.greenrobot.greendao.annotation.NotNull;

@Entity
public class Note {

    @Id
    private Long id;

    @NotNull
    private String text;

    private int priority;
}
"#;

/// One primitive field, one developer-owned method
pub const FOOBAR: &str = r#"package org.example;

import org.greenrobot.greendao.annotation.*;

@Entity
public class Foobar {

    private int age;

    @Keep
    public String describe() {
        return "foobar " + age;
    }
}
"#;

/// Fields predating explicit transient markers
pub const LEGACY_KEEP_FIELDS: &str = r#"package org.example;

import org.greenrobot.greendao.annotation.*;

@Entity(generateConstructors = false, generateGettersSetters = false)
public class Legacy {

    @Id
    private Long id;

    // KEEP FIELDS - put your custom fields here
    private String cache;
    private int hits;
    // KEEP FIELDS END
}
"#;

/// Customer side of a one-to-many relation
pub const CUSTOMER: &str = r#"package org.example;

import java.util.List;

import org.greenrobot.greendao.annotation.*;

@Entity(active = true)
public class Customer {

    @Id
    private Long id;

    @NotNull
    private String name;

    @ToMany(referencedJoinProperty = "customerId")
    @OrderBy("date ASC")
    private List<Order> orders;
}
"#;

/// Order side, with a foreign-key to-one relation
pub const ORDER: &str = r#"package org.example;

import java.util.Date;

import org.greenrobot.greendao.annotation.*;

@Entity(nameInDb = "ORDERS", indexes = {
        @Index(value = "customerId, date DESC", unique = true)
})
public class Order {

    @Id(autoincrement = true)
    private Long id;

    private Date date;

    private long customerId;

    @ToOne(joinProperty = "customerId")
    private Customer customer;
}
"#;

/// Source of a minimal entity: package, dialect wildcard import and `body` inside the class
pub fn entity_source(name: &str, body: &str) -> String {
    format!("package {PACKAGE};\n\n{DIALECT_IMPORT}\n\n@Entity\npublic class {name} {{\n{body}}}\n")
}

/// Same as [`entity_source`] with extra class annotations after `@Entity`
pub fn entity_source_with(name: &str, annotations: &str, body: &str) -> String {
    format!("package {PACKAGE};\n\n{DIALECT_IMPORT}\n\n@Entity\n{annotations}\npublic class {name} {{\n{body}}}\n")
}

/// Replace the `HASH_STUB` placeholder in a member template with its real hash
pub fn hashed(template: &str) -> String {
    embed_hash(template).0
}

/// Hash of a member as the engine records it
pub fn hash_of(member: &str) -> CodeHash {
    CodeHash::compute(member)
}

/// Indent every non-blank line of `text` by `indent`
pub fn indent(text: &str, indent: &str) -> String {
    text.lines()
        .map(|l| if l.is_empty() { String::new() } else { format!("{indent}{l}") })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sibling class names of the relation fixtures
pub fn relation_siblings() -> Vec<String> {
    vec!["Customer".to_string(), "Order".to_string()]
}
