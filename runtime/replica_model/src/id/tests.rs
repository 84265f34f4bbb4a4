use pretty_assertions::assert_eq;

use super::*;

#[test]
fn primitives_occupy_fixed_low_indices() {
    let primitives = [
        TypeId::BOOL,
        TypeId::CHAR,
        TypeId::I8,
        TypeId::I16,
        TypeId::I32,
        TypeId::I64,
        TypeId::U8,
        TypeId::U16,
        TypeId::U32,
        TypeId::U64,
        TypeId::F32,
        TypeId::F64,
        TypeId::DATETIME,
        TypeId::ISIZE,
        TypeId::USIZE,
        TypeId::STR,
    ];

    for (i, id) in primitives.into_iter().enumerate() {
        assert_eq!(id.index(), i);
        assert!(id.is_primitive(), "{id:?} should be primitive");
        assert!(id.builtin_name().is_some());
    }
}

#[test]
fn object_root_is_not_primitive() {
    assert!(!TypeId::OBJECT.is_primitive());
    assert_eq!(TypeId::OBJECT.builtin_name(), Some("object"));
}

#[test]
fn dynamic_ids_have_no_builtin_name() {
    let id = TypeId::from_raw(TypeId::FIRST_DYNAMIC);
    assert_eq!(id.builtin_name(), None);
    assert_eq!(format!("{id:?}"), "TypeId(64)");
    assert_eq!(id.to_string(), "#64");
}

#[test]
fn none_sentinel() {
    assert!(TypeId::NONE.is_none());
    assert!(!TypeId::STR.is_none());
    assert_eq!(format!("{:?}", TypeId::NONE), "TypeId::NONE");
}
