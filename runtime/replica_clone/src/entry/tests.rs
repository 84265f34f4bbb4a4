#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;
use replica_model::{ClassDef, StructDef, StructValue};

use super::*;

fn class(def: ClassDef) -> TypeId {
    registry().define_class(def).unwrap()
}

// ── deep_clone ──────────────────────────────────────────────────

#[test]
fn null_and_inline_values_clone_to_themselves() {
    let mut heap = Heap::new();
    assert_eq!(deep_clone(&mut heap, &Value::Null), Ok(Value::Null));
    assert_eq!(deep_clone(&mut heap, &Value::I32(4)), Ok(Value::I32(4)));
    let s = Value::string("interned");
    assert!(deep_clone(&mut heap, &s).unwrap().same_identity(&s));
    assert!(heap.is_empty());
}

#[test]
fn class_safe_root_is_shallow_copied() {
    let ty = class(
        ClassDef::new("entry_flat::Point")
            .field("x", TypeId::F64)
            .field("name", TypeId::STR),
    );
    let mut heap = Heap::new();
    let p = heap.allocate_raw(ty).unwrap();
    heap.set(p, "x", Value::F64(1.5)).unwrap();
    heap.set(p, "name", Value::string("p")).unwrap();

    let copy = deep_clone(&mut heap, &Value::Ref(p)).unwrap();
    let copy = copy.as_obj().unwrap();
    assert_ne!(copy, p);
    assert_eq!(heap.fields(copy), heap.fields(p));
}

#[test]
fn pure_value_struct_clones_by_value() {
    let ty = registry()
        .define_struct(
            StructDef::new("entry_struct::Money")
                .field("units", TypeId::I64)
                .field("currency", TypeId::STR),
        )
        .unwrap();
    let mut heap = Heap::new();
    let value = Value::Struct(StructValue::new(
        ty,
        vec![Value::I64(12), Value::string("EUR")],
    ));
    assert_eq!(deep_clone(&mut heap, &value), Ok(value.clone()));
}

// ── shallow_clone ───────────────────────────────────────────────

#[test]
fn shallow_clone_shares_children() {
    let leaf = class(ClassDef::new("entry_shallow::Leaf"));
    let ty = class(ClassDef::new("entry_shallow::Holder").field("leaf", leaf));
    let mut heap = Heap::new();
    let x = heap.allocate_raw(leaf).unwrap();
    let h = heap.allocate_raw(ty).unwrap();
    heap.set(h, "leaf", Value::Ref(x)).unwrap();

    let copy = shallow_clone(&mut heap, &Value::Ref(h)).unwrap();
    let copy = copy.as_obj().unwrap();
    assert_ne!(copy, h);
    assert_eq!(heap.get(copy, "leaf"), Some(&Value::Ref(x)));
}

// ── clone_into ──────────────────────────────────────────────────

#[test]
fn clone_into_argument_checks() {
    let ty = class(ClassDef::new("entry_args::Node").field("n", TypeId::I32));
    let mut heap = Heap::new();
    let x = Value::Ref(heap.allocate_raw(ty).unwrap());

    assert_eq!(deep_clone_into(&mut heap, &x, &Value::Null), Ok(Value::Null));
    assert_eq!(
        deep_clone_into(&mut heap, &Value::Null, &x),
        Err(CloneError::NullArgument)
    );
    assert_eq!(
        shallow_clone_into(&mut heap, &Value::Null, &x),
        Err(CloneError::NullArgument)
    );
    assert!(matches!(
        deep_clone_into(&mut heap, &Value::string("a"), &Value::string("b")),
        Err(CloneError::InvalidOperation(_))
    ));
}

#[test]
fn clone_into_writes_through_target_identity() {
    let leaf = class(ClassDef::new("entry_into::Leaf").field("n", TypeId::I32));
    let ty = class(
        ClassDef::new("entry_into::Holder")
            .field("count", TypeId::I32)
            .field("leaf", leaf),
    );
    let mut heap = Heap::new();
    let x = heap.allocate_raw(leaf).unwrap();
    let from = heap.allocate_raw(ty).unwrap();
    heap.set(from, "count", Value::I32(9)).unwrap();
    heap.set(from, "leaf", Value::Ref(x)).unwrap();
    let to = heap.allocate_raw(ty).unwrap();

    let result = deep_clone_into(&mut heap, &Value::Ref(from), &Value::Ref(to)).unwrap();
    assert_eq!(result, Value::Ref(to));
    assert_eq!(heap.get(to, "count"), Some(&Value::I32(9)));
    assert!(matches!(heap.get(to, "leaf"), Some(Value::Ref(r)) if *r != x));

    let to2 = heap.allocate_raw(ty).unwrap();
    shallow_clone_into(&mut heap, &Value::Ref(from), &Value::Ref(to2)).unwrap();
    assert_eq!(heap.get(to2, "leaf"), Some(&Value::Ref(x)));
}

#[test]
fn clone_into_accepts_subtypes_only() {
    let base = class(ClassDef::new("entry_sub::Base").field("id", TypeId::I32));
    let derived = class(
        ClassDef::new("entry_sub::Derived")
            .base(base)
            .field("extra", TypeId::STR),
    );
    let mut heap = Heap::new();
    let b = heap.allocate_raw(base).unwrap();
    heap.set(b, "id", Value::I32(3)).unwrap();
    let d = heap.allocate_raw(derived).unwrap();
    heap.set(d, "extra", Value::string("kept")).unwrap();

    deep_clone_into(&mut heap, &Value::Ref(b), &Value::Ref(d)).unwrap();
    assert_eq!(heap.get(d, "id"), Some(&Value::I32(3)));
    assert_eq!(heap.get(d, "extra"), Some(&Value::string("kept")));

    let before = heap.fields(b).to_vec();
    assert!(matches!(
        deep_clone_into(&mut heap, &Value::Ref(d), &Value::Ref(b)),
        Err(CloneError::InvalidOperation(_))
    ));
    assert_eq!(heap.fields(b), before.as_slice());
}

#[test]
fn clone_into_rejects_value_operands() {
    let s = registry()
        .define_struct(StructDef::new("entry_value::S").field("x", TypeId::I32))
        .unwrap();
    let ty = class(ClassDef::new("entry_value::C").field("x", TypeId::I32));
    let mut heap = Heap::new();
    let c = Value::Ref(heap.allocate_raw(ty).unwrap());
    let v = Value::Struct(StructValue::new(s, vec![Value::I32(1)]));
    assert!(matches!(
        deep_clone_into(&mut heap, &v, &c),
        Err(CloneError::InvalidOperation(_))
    ));
    assert!(matches!(
        shallow_clone_into(&mut heap, &c, &v),
        Err(CloneError::InvalidOperation(_))
    ));
}

#[test]
fn array_clone_into_requires_matching_shape() {
    let mut heap = Heap::new();
    let ints = heap
        .new_vector(TypeId::I32, vec![Value::I32(1), Value::I32(2), Value::I32(3)])
        .unwrap();
    let short = heap.new_vector(TypeId::I32, vec![Value::I32(0); 2]).unwrap();
    let floats = heap.new_vector(TypeId::F64, vec![Value::F64(0.0); 3]).unwrap();

    deep_clone_into(&mut heap, &Value::Ref(ints), &Value::Ref(short)).unwrap();
    assert_eq!(
        heap.array(short).map(|a| a.elements().to_vec()),
        Some(vec![Value::I32(1), Value::I32(2)])
    );

    assert!(matches!(
        deep_clone_into(&mut heap, &Value::Ref(ints), &Value::Ref(floats)),
        Err(CloneError::InvalidOperation(_))
    ));

    let grid_ty = registry().array_of(TypeId::I32, 2).unwrap();
    let grid = heap.new_array(grid_ty, &[1, 1], &[0, 0]).unwrap();
    assert!(matches!(
        shallow_clone_into(&mut heap, &Value::Ref(ints), &Value::Ref(grid)),
        Err(CloneError::InvalidOperation(_))
    ));
}
