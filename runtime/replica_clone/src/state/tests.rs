use pretty_assertions::assert_eq;
use replica_model::{registry, ClassDef, Heap, TypeId};

use super::*;

fn objects(tag: &str, n: usize) -> Vec<ObjRef> {
    let ty = registry()
        .define_class(ClassDef::new(format!("state_objects::{tag}")))
        .unwrap_or(TypeId::NONE);
    let mut heap = Heap::new();
    (0..n).filter_map(|_| heap.allocate_raw(ty).ok()).collect()
}

#[test]
fn empty_state_knows_nothing() {
    let refs = objects("Empty", 1);
    let state = CloneState::new();
    assert!(state.is_empty());
    assert_eq!(state.known(refs[0]), None);
}

#[test]
fn inline_slots_hold_first_mappings() {
    let refs = objects("Inline", 6);
    let mut state = CloneState::new();
    state.record(refs[0], refs[1]);
    state.record(refs[2], refs[3]);
    assert_eq!(state.known(refs[0]), Some(refs[1]));
    assert_eq!(state.known(refs[2]), Some(refs[3]));
    assert_eq!(state.known(refs[1]), None);
    assert_eq!(state.len(), 2);
    assert!(state.overflow.is_empty());
}

#[test]
fn mappings_spill_into_overflow() {
    let refs = objects("Spill", 20);
    let mut state = CloneState::new();
    for pair in refs.chunks(2) {
        state.record(pair[0], pair[1]);
    }
    assert_eq!(state.len(), 10);
    assert_eq!(state.overflow.len(), 10 - INLINE_SLOTS);
    for pair in refs.chunks(2) {
        assert_eq!(state.known(pair[0]), Some(pair[1]));
        assert_eq!(state.known(pair[1]), None);
    }
}

#[test]
fn self_mapping_is_allowed() {
    let refs = objects("SelfMap", 1);
    let mut state = CloneState::new();
    state.record(refs[0], refs[0]);
    assert_eq!(state.known(refs[0]), Some(refs[0]));
}
