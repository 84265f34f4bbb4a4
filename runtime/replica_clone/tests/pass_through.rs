//! Configured pass-through types.
//!
//! Configuration is process-wide, so this binary installs it once before
//! any clone runs.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::LazyLock;

use pretty_assertions::assert_eq;
use replica_clone::{
    configure, deep_clone, init_tracing, is_safe, CloneConfig, ConfigError,
};
use replica_model::{registry, ClassDef, Heap, TypeId, Value};

struct Types {
    connection: TypeId,
    client: TypeId,
}

static TYPES: LazyLock<Types> = LazyLock::new(|| {
    init_tracing();
    let connection = registry()
        .define_class(ClassDef::new("pass_through::Connection").field("fd", TypeId::I32))
        .unwrap();
    let client = registry()
        .define_class(
            ClassDef::new("pass_through::Client")
                .field("name", TypeId::STR)
                .field("conn", connection)
                .field("history", TypeId::OBJECT),
        )
        .unwrap();
    let config = CloneConfig::from_env()
        .unwrap_or_default()
        .pass_through(connection);
    configure(config).unwrap();
    Types { connection, client }
});

#[test]
fn pass_through_type_is_safe() {
    let types = &*TYPES;
    assert!(is_safe(types.connection));
    assert!(!is_safe(types.client));
}

#[test]
fn pass_through_objects_are_shared() {
    let types = &*TYPES;
    let mut heap = Heap::new();
    let conn = heap.allocate_raw(types.connection).unwrap();
    let history = heap.new_vector(TypeId::I64, vec![Value::I64(1)]).unwrap();
    let client = heap.allocate_raw(types.client).unwrap();
    heap.set(client, "conn", Value::Ref(conn)).unwrap();
    heap.set(client, "history", Value::Ref(history)).unwrap();

    let root = deep_clone(&mut heap, &Value::Ref(conn)).unwrap();
    assert_eq!(root, Value::Ref(conn));

    let copy = deep_clone(&mut heap, &Value::Ref(client)).unwrap();
    let copy = copy.as_obj().unwrap();
    assert_ne!(copy, client);
    assert_eq!(heap.get(copy, "conn"), Some(&Value::Ref(conn)));
    assert_ne!(heap.get(copy, "history"), Some(&Value::Ref(history)));
}

#[test]
fn configuration_is_fixed_once_installed() {
    LazyLock::force(&TYPES);
    assert_eq!(
        configure(CloneConfig::new()),
        Err(ConfigError::AlreadyConfigured)
    );
}

#[test]
fn tracing_init_is_repeatable() {
    let types = &*TYPES;
    init_tracing();
    init_tracing();
    let mut heap = Heap::new();
    let client = heap.allocate_raw(types.client).unwrap();
    let copy = deep_clone(&mut heap, &Value::Ref(client)).unwrap();
    assert_ne!(copy, Value::Ref(client));
}
