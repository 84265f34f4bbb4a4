//! Public clone operations.
//!
//! | Operation | Result |
//! |-----------|--------|
//! | [`deep_clone`] | independent copy of the whole reachable graph |
//! | [`shallow_clone`] | new top-level object, slots copied as-is |
//! | [`deep_clone_into`] | `from`'s graph cloned into the existing `to` |
//! | [`shallow_clone_into`] | `from`'s slots copied into the existing `to` |
//!
//! Every call gets its own identity map; nothing is shared between calls.

use replica_model::{registry, Heap, ObjRef, TypeId, Value};

use crate::engine::CloneRun;
use crate::safety::{is_class_safe, is_safe};
use crate::strategy::{strategy_for, Action, CloneStrategy, FieldPlan};
use crate::CloneError;

/// Produce a structurally independent copy of `value`.
///
/// Every mutable object reachable from `value` is duplicated once; shared
/// references and cycles in the source are shared references and cycles in
/// the copy. Safe values (primitives, strings, enums, safe structs and
/// pass-through objects) come back unchanged. No constructor runs.
pub fn deep_clone(heap: &mut Heap, value: &Value) -> Result<Value, CloneError> {
    match value {
        Value::Ref(r) => {
            let ty = heap.type_of(*r);
            if is_safe(ty) {
                return Ok(value.clone());
            }
            if is_class_safe(ty) {
                return Ok(Value::Ref(heap.shallow_copy(*r)?));
            }
            let mut run = CloneRun::new(heap);
            let copy = run.clone_ref(*r)?;
            tracing::trace!(ty = %ty, tracked = run.state.len(), "deep clone finished");
            Ok(Value::Ref(copy))
        }
        Value::Struct(s) => CloneRun::new(heap).clone_struct(s).map(Value::Struct),
        other => Ok(other.clone()),
    }
}

/// Copy one level of `value`.
///
/// A heap object becomes a new object of the same type whose slots hold
/// the same values; referenced objects are shared. Inline values are
/// returned as-is.
pub fn shallow_clone(heap: &mut Heap, value: &Value) -> Result<Value, CloneError> {
    match value {
        Value::Ref(r) if !is_safe(heap.type_of(*r)) => Ok(Value::Ref(heap.shallow_copy(*r)?)),
        other => Ok(other.clone()),
    }
}

/// Deep-clone `from` into the existing object `to` and return `to`.
///
/// `to` must be an instance of `from`'s runtime type or a subtype. Arrays
/// must share element type and rank; the overlapping region is written.
/// Fields of `to` that `from`'s type does not declare are untouched.
///
/// A null `to` yields null. Everything is validated before the first write.
pub fn deep_clone_into(heap: &mut Heap, from: &Value, to: &Value) -> Result<Value, CloneError> {
    clone_into(heap, from, to, Depth::Deep)
}

/// Copy the slots of `from` into the existing object `to` and return `to`.
///
/// Same contract as [`deep_clone_into`], one level only.
pub fn shallow_clone_into(heap: &mut Heap, from: &Value, to: &Value) -> Result<Value, CloneError> {
    clone_into(heap, from, to, Depth::Shallow)
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Depth {
    Deep,
    Shallow,
}

/// Validated clone-into target.
enum Target {
    Fields(FieldPlan),
    Array(Action),
}

fn clone_into(heap: &mut Heap, from: &Value, to: &Value, depth: Depth) -> Result<Value, CloneError> {
    if to.is_null() {
        return Ok(Value::Null);
    }
    if from.is_null() {
        return Err(CloneError::NullArgument);
    }
    let (Value::Ref(src), Value::Ref(dst)) = (from, to) else {
        return Err(CloneError::InvalidOperation(
            "clone-into needs two heap objects; value types and strings have no writable identity"
                .to_owned(),
        ));
    };
    let (src, dst) = (*src, *dst);
    let target = validate(heap, src, dst)?;

    let mut run = CloneRun::new(heap);
    if depth == Depth::Deep {
        run.state.record(src, dst);
    }
    match (target, depth) {
        (Target::Fields(plan), Depth::Deep) => run.fill_fields(src, dst, &plan, false)?,
        (Target::Fields(plan), Depth::Shallow) => {
            let copy_all = FieldPlan::copy_only(plan.actions().len());
            run.fill_fields(src, dst, &copy_all, false)?;
        }
        (Target::Array(action), Depth::Deep) => run.copy_overlap(src, dst, action)?,
        (Target::Array(_), Depth::Shallow) => run.copy_overlap(src, dst, Action::Copy)?,
    }
    Ok(Value::Ref(dst))
}

/// Check that `dst` can receive `src`'s state and pick how to write it.
fn validate(heap: &Heap, src: ObjRef, dst: ObjRef) -> Result<Target, CloneError> {
    let src_ty = heap.type_of(src);
    let dst_ty = heap.type_of(dst);
    if is_safe(src_ty) {
        return Err(invalid(src_ty, dst_ty, "source type is immutable or opaque"));
    }

    let strategy = strategy_for(src_ty);
    match &*strategy {
        CloneStrategy::Vector(action) | CloneStrategy::Matrix(action) | CloneStrategy::Array(action) => {
            let same_shape = match (heap.array(src), heap.array(dst)) {
                (Some(a), Some(b)) => a.rank() == b.rank(),
                _ => false,
            };
            let same_element = registry()
                .lookup(src_ty)
                .zip(registry().lookup(dst_ty))
                .and_then(|(a, b)| Some((a.as_array()?, b.as_array()?)))
                .is_some_and(|(a, b)| a.element == b.element);
            if !(same_shape && same_element) {
                return Err(invalid(src_ty, dst_ty, "arrays differ in element type or rank"));
            }
            Ok(Target::Array(*action))
        }
        CloneStrategy::Object(plan) | CloneStrategy::Rebind(plan) => {
            if !registry().is_subtype(dst_ty, src_ty) {
                return Err(invalid(src_ty, dst_ty, "target is not the source type or a subtype"));
            }
            Ok(Target::Fields(plan.clone()))
        }
        CloneStrategy::Tuple => {
            if dst_ty != src_ty {
                return Err(invalid(src_ty, dst_ty, "tuple types differ"));
            }
            let len = heap.fields(src).len();
            Ok(Target::Fields(FieldPlan::copy_only(len)))
        }
        CloneStrategy::PassThrough | CloneStrategy::Struct(_) => {
            Err(invalid(src_ty, dst_ty, "source type has no writable identity"))
        }
    }
}

fn invalid(from: TypeId, to: TypeId, reason: &str) -> CloneError {
    let r = registry();
    CloneError::InvalidOperation(format!(
        "cannot clone `{}` into `{}`: {reason}",
        r.name_of(from),
        r.name_of(to)
    ))
}

#[cfg(test)]
mod tests;
