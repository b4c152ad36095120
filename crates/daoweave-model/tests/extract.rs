//! Model extraction over fixture sources

use daoweave_model::{
    Direction, EntityModel, Extraction, ModelError, ModelExtractor, Order, OwnershipHint, ToManyLink, ToOneJoin,
};
use daoweave_syntax::SourceTree;
use daoweave_test_utils::{
    entity_source, entity_source_with, hash_of, hashed, indent, relation_siblings, CUSTOMER, FOOBAR,
    LEGACY_KEEP_FIELDS, NOTE, ORDER,
};
use pretty_assertions::assert_eq;

fn extract(source: &str) -> Result<Extraction, ModelError> {
    let tree = SourceTree::parse(source).unwrap();
    ModelExtractor::new("src/org/example/Entity.java")
        .with_siblings(relation_siblings())
        .extract(tree)
}

fn model(source: &str) -> EntityModel {
    extract(source).unwrap().into_entity().expect("entity")
}

fn validation_message(source: &str) -> String {
    match extract(source) {
        Err(ModelError::Validation { message, .. }) => message,
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn note_fields_and_not_null_style() {
    let note = model(NOTE);
    assert_eq!(note.qualified_name(), "org.example.Note");
    assert_eq!(note.schema, "default");
    assert!(note.create_table);
    assert!(!note.is_active());

    let summary: Vec<_> = note
        .fields
        .iter()
        .map(|f| (f.name(), f.variable.ty.name.as_str(), f.is_not_null))
        .collect();
    assert_eq!(
        summary,
        [
            ("id", "java.lang.Long", false),
            ("text", "java.lang.String", true),
            ("priority", "int", true),
        ]
    );
    assert!(note.primary_key().is_some());
    assert_eq!(note.not_null_annotation.as_deref(), Some("@NotNull"));
    assert!(note.last_field.is_some());
}

#[test]
fn foobar_keeps_method_ownership() {
    let foobar = model(FOOBAR);
    assert_eq!(foobar.fields.len(), 1);
    assert_eq!(foobar.methods.len(), 1);
    assert_eq!(foobar.methods[0].hint, OwnershipHint::Keep);
    assert!(foobar.constructors.is_empty());
}

#[test]
fn relations_are_extracted() {
    let customer = model(CUSTOMER);
    assert!(customer.is_active());
    let orders = &customer.to_manys[0];
    assert_eq!(orders.link, ToManyLink::MappedBy("customerId".into()));
    assert_eq!(orders.target().unwrap().name, "org.example.Order");
    let Some(Order::Properties(order)) = &orders.order else {
        panic!("expected explicit ordering");
    };
    assert_eq!(order[0].name, "date");

    let order = model(ORDER);
    assert_eq!(order.table_name.as_deref(), Some("ORDERS"));
    assert_eq!(order.to_ones[0].join, ToOneJoin::ForeignKey("customerId".into()));
    assert_eq!(order.to_ones[0].variable.ty.name, "org.example.Customer");
    assert!(order.primary_key().unwrap().id.unwrap().autoincrement);
    let index = &order.indexes[0];
    assert!(index.unique);
    assert_eq!(index.properties[1].direction, Direction::Desc);
}

#[test]
fn bare_to_one_owns_a_column() {
    let source = entity_source(
        "Order",
        "    @Id\n    private Long id;\n\n    @ToOne\n    @Property(nameInDb = \"CUST\")\n    @NotNull\n    private Customer customer;\n",
    );
    let order = model(&source);
    assert_eq!(
        order.to_ones[0].join,
        ToOneJoin::Column {
            name: Some("CUST".into()),
            not_null: true,
            unique: false
        }
    );
}

#[test]
fn legacy_keep_fields_become_transient() {
    let legacy = model(LEGACY_KEEP_FIELDS);
    let names: Vec<_> = legacy
        .legacy_transient_fields
        .iter()
        .map(|f| f.variable.name.as_str())
        .collect();
    assert_eq!(names, ["cache", "hits"]);
    assert_eq!(legacy.fields.len(), 1);
    assert!(!legacy.generate_constructors);
}

#[test]
fn static_and_transient_fields_are_transient() {
    let source = entity_source(
        "A",
        "    private static final String TAG = \"A\";\n    private transient int cached;\n    @Transient\n    private String note;\n    private int age;\n",
    );
    let a = model(&source);
    assert_eq!(a.transient_fields.len(), 3);
    assert_eq!(a.fields.len(), 1);
}

#[test]
fn constants_resolve_in_annotation_arguments() {
    let source = entity_source(
        "A",
        "    static final String COLUMN = \"AGE_COL\";\n    @Property(nameInDb = COLUMN)\n    private int age;\n",
    );
    assert_eq!(model(&source).fields[0].column_name.as_deref(), Some("AGE_COL"));
}

#[test]
fn generated_member_with_matching_hash_passes() {
    let ctor = hashed("@Generated(hash = HASH_STUB)\npublic A() {\n}");
    let source = entity_source("A", &format!("    private int age;\n\n{}\n", indent(&ctor, "    ")));
    let a = model(&source);
    assert_eq!(a.constructors[0].hint, OwnershipHint::Generated(Some(hash_of(&ctor))));
}

#[test]
fn edited_generated_member_is_drift() {
    let ctor = hashed("@Generated(hash = HASH_STUB)\npublic A() {\n}");
    let edited = ctor.replace("{\n}", "{\n    age = 1;\n}");
    let source = entity_source("A", &format!("    private int age;\n\n{}\n", indent(&edited, "    ")));
    match extract(&source) {
        Err(ModelError::Drift { place, line, .. }) => {
            assert_eq!(place, "Constructor A()");
            assert_eq!(line, 9);
        }
        other => panic!("expected drift, got {other:?}"),
    }
}

#[test]
fn hashless_generated_member_is_trusted() {
    let source = entity_source("A", "    private int age;\n\n    @Generated\n    public A() {\n        age = 3;\n    }\n");
    assert_eq!(model(&source).constructors[0].hint, OwnershipHint::Generated(None));
}

#[test]
fn keep_class_skips_drift_check() {
    let source = entity_source_with(
        "A",
        "@Keep",
        "    private int age;\n\n    @Generated(hash = 1)\n    public A(int age) {\n        this.age = age;\n    }\n",
    );
    assert!(model(&source).keep_source);
}

#[test]
fn unique_with_index_is_rejected() {
    let source = entity_source("A", "    @Unique\n    @Index\n    private String name;\n");
    assert!(validation_message(&source).contains("@Unique and @Index"));
}

#[test]
fn index_value_on_field_is_rejected() {
    let source = entity_source("A", "    @Index(value = \"name\")\n    private String name;\n");
    assert!(validation_message(&source).starts_with("setting value on @Index is not supported"));
}

#[test]
fn to_many_needs_exactly_one_link() {
    let none = entity_source(
        "Customer",
        "    @Id\n    private Long id;\n    @ToMany\n    private java.util.List<Order> orders;\n",
    );
    assert!(validation_message(&none).contains("exactly one of"));

    let two = entity_source(
        "Customer",
        "    @Id\n    private Long id;\n    @ToMany(referencedJoinProperty = \"customerId\", joinProperties = {\n        @JoinProperty(name = \"id\", referencedName = \"customerId\")\n    })\n    private java.util.List<Order> orders;\n",
    );
    assert!(validation_message(&two).contains("found 2"));
}

#[test]
fn to_one_foreign_key_must_exist() {
    let source = entity_source("Order", "    @ToOne(joinProperty = \"customerId\")\n    private Customer customer;\n");
    assert!(validation_message(&source).contains("joinProperty customerId"));
}

#[test]
fn ambiguous_import_names_the_type() {
    let source = "package p;\n\nimport org.greenrobot.greendao.annotation.Entity;\nimport java.util.*;\nimport org.other.*;\n\n@Entity\nclass A {\n    private Thing thing;\n}\n";
    assert_eq!(
        extract(source).unwrap_err(),
        ModelError::AmbiguousImport {
            name: "Thing".into(),
            line: 9
        }
    );
}

#[test]
fn non_static_inner_converter_is_rejected() {
    let source = entity_source(
        "A",
        "    @Convert(converter = StatusConverter.class, columnType = Integer.class)\n    private Status status;\n\n    enum Status { ON, OFF }\n\n    class StatusConverter {}\n",
    );
    match extract(&source) {
        Err(ModelError::NonStaticInnerClass { name, .. }) => assert_eq!(name, "StatusConverter"),
        other => panic!("expected inner class error, got {other:?}"),
    }
}

#[test]
fn unmapped_field_type_is_unsupported() {
    let source = entity_source("A", "    private Object blob;\n");
    assert!(matches!(extract(&source), Err(ModelError::UnsupportedType { .. })));
}

#[test]
fn classes_without_marker_are_not_entities() {
    let plain = "package p;\n\npublic class Helper {\n    private int a;\n}\n";
    assert!(matches!(extract(plain), Ok(Extraction::NotAnEntity)));
    let interface = "package p;\n\npublic interface Api {}\n";
    assert!(matches!(extract(interface), Ok(Extraction::NotAnEntity)));
}
