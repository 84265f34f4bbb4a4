use pretty_assertions::assert_eq;
use replica_model::{ClassDef, StructDef};

use super::*;

fn class(def: ClassDef) -> TypeId {
    registry().define_class(def).unwrap_or(TypeId::NONE)
}

fn plan(actions: &[Action]) -> FieldPlan {
    FieldPlan {
        actions: actions.into(),
    }
}

#[test]
fn safe_and_unknown_types_pass_through() {
    assert_eq!(synthesize(TypeId::I32), CloneStrategy::PassThrough);
    assert_eq!(synthesize(TypeId::STR), CloneStrategy::PassThrough);
    let later = registry()
        .reserve("strategy_unknown::Later")
        .unwrap_or(TypeId::NONE);
    assert_eq!(*strategy_for(later), CloneStrategy::PassThrough);
    assert!(!STRATEGIES.contains_key(&later));
}

#[test]
fn class_fields_get_actions_by_declared_type() {
    let point = registry()
        .define_struct(StructDef::new("strategy_fields::Point").field("x", TypeId::I32))
        .unwrap_or(TypeId::NONE);
    let leaf = class(ClassDef::new("strategy_fields::Leaf"));
    let boxed = registry()
        .define_struct(StructDef::new("strategy_fields::Boxed").field("leaf", leaf))
        .unwrap_or(TypeId::NONE);
    let ty = class(
        ClassDef::new("strategy_fields::Holder")
            .field("n", TypeId::I64)
            .field("p", point)
            .field("b", boxed)
            .field("leaf", leaf)
            .field("any", TypeId::OBJECT),
    );
    assert_eq!(
        synthesize(ty),
        CloneStrategy::Object(plan(&[
            Action::Copy,
            Action::Copy,
            Action::Struct,
            Action::Track,
            Action::Track,
        ]))
    );
}

#[test]
fn layout_marker_fields_are_pinned() {
    let leaf = class(ClassDef::new("strategy_marker::Leaf"));
    let marker = class(
        ClassDef::new("strategy_marker::Bound")
            .field("identity", leaf)
            .flags(ClassFlags::LAYOUT_MARKER),
    );
    let derived = class(
        ClassDef::new("strategy_marker::Derived")
            .base(marker)
            .field("payload", leaf),
    );
    assert_eq!(
        synthesize(derived),
        CloneStrategy::Object(plan(&[Action::Copy, Action::Track]))
    );
}

#[test]
fn fixed_layout_classes_rebind() {
    let leaf = class(ClassDef::new("strategy_fixed::Leaf"));
    let ty = class(
        ClassDef::new("strategy_fixed::Handle")
            .field("raw", TypeId::USIZE)
            .field("owner", leaf)
            .flags(ClassFlags::FIXED_LAYOUT),
    );
    assert_eq!(
        synthesize(ty),
        CloneStrategy::Rebind(plan(&[Action::Copy, Action::Track]))
    );
}

#[test]
fn tuples_split_on_component_safety() {
    let leaf = class(ClassDef::new("strategy_tuple::Leaf"));
    let flat = registry()
        .tuple_of(&[TypeId::I32, TypeId::STR])
        .unwrap_or(TypeId::NONE);
    let deep = registry()
        .tuple_of(&[TypeId::I32, leaf])
        .unwrap_or(TypeId::NONE);
    assert_eq!(synthesize(flat), CloneStrategy::Tuple);
    assert_eq!(
        synthesize(deep),
        CloneStrategy::Object(plan(&[Action::Copy, Action::Track]))
    );
}

#[test]
fn arrays_pick_a_shape_specific_strategy() {
    let leaf = class(ClassDef::new("strategy_array::Leaf"));
    let r = registry();
    let vector = r.vector_of(TypeId::F64).unwrap_or(TypeId::NONE);
    let ranked_one = r.array_of(leaf, 1).unwrap_or(TypeId::NONE);
    let matrix = r.array_of(leaf, 2).unwrap_or(TypeId::NONE);
    let cube = r.array_of(TypeId::I32, 3).unwrap_or(TypeId::NONE);
    assert_eq!(synthesize(vector), CloneStrategy::Vector(Action::Copy));
    assert_eq!(synthesize(ranked_one), CloneStrategy::Array(Action::Track));
    assert_eq!(synthesize(matrix), CloneStrategy::Matrix(Action::Track));
    assert_eq!(synthesize(cube), CloneStrategy::Array(Action::Copy));
}

#[test]
fn subtypes_get_their_own_strategy() {
    let leaf = class(ClassDef::new("strategy_sub::Leaf"));
    let base = class(ClassDef::new("strategy_sub::Base").field("id", TypeId::I32));
    let derived = class(
        ClassDef::new("strategy_sub::Derived")
            .base(base)
            .field("extra", leaf),
    );
    let base_strategy = strategy_for(base);
    let derived_strategy = strategy_for(derived);
    assert_eq!(*base_strategy, CloneStrategy::Object(plan(&[Action::Copy])));
    assert_eq!(
        *derived_strategy,
        CloneStrategy::Object(plan(&[Action::Copy, Action::Track]))
    );
}

#[test]
fn cache_returns_the_same_strategy() {
    let ty = class(ClassDef::new("strategy_cache::Node").field("n", TypeId::I32));
    let first = strategy_for(ty);
    let second = strategy_for(ty);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn concurrent_first_use_agrees() {
    let ty = class(
        ClassDef::new("strategy_race::Node")
            .field("n", TypeId::I32)
            .field("next", TypeId::OBJECT),
    );
    let results: Vec<Arc<CloneStrategy>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(move || strategy_for(ty))).collect();
        handles.into_iter().filter_map(|h| h.join().ok()).collect()
    });
    assert_eq!(results.len(), 8);
    let cached = strategy_for(ty);
    for strategy in &results {
        assert!(Arc::ptr_eq(strategy, &cached));
    }
}
