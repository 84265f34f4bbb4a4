//! Safe-type classifier.
//!
//! A type is *safe* when copying a value bit-for-bit (or returning the same
//! reference) is indistinguishable from a full clone:
//!
//! - primitive leaves, including date/time, machine-word handles and
//!   strings (immutable, shared by reference);
//! - enums and raw pointers;
//! - structs whose every field is safe;
//! - pass-through types named in the [`CloneConfig`](crate::CloneConfig);
//! - types unknown to the registry (best-effort pass-through).
//!
//! Every other reference type (classes, tuples, arrays, interfaces,
//! `object`) is unsafe unconditionally.
//!
//! Results are memoized for the life of the process. Struct fields are
//! classified recursively with an in-progress set: a type met again while
//! it is still being classified counts as safe, which guarantees
//! termination for self-containing struct definitions. A safe answer that
//! rests on such an assumption is only memoized once the outermost struct
//! of the loop has resolved, so the result never depends on which member
//! of a loop was asked about first.

use std::sync::LazyLock;

use dashmap::DashMap;
use replica_model::{registry, FieldDesc, TypeDesc, TypeId, TypeKind};
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::config;

/// Memoized classification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Safety {
    /// Values never need recursive cloning.
    Safe,
    /// Values must be cloned field by field.
    Unsafe,
}

static KNOWN_TYPES: LazyLock<DashMap<TypeId, Safety, FxBuildHasher>> =
    LazyLock::new(|| DashMap::with_hasher(FxBuildHasher));

static KNOWN_CLASSES: LazyLock<DashMap<TypeId, bool, FxBuildHasher>> =
    LazyLock::new(|| DashMap::with_hasher(FxBuildHasher));

/// Classify `ty`.
pub fn classify(ty: TypeId) -> Safety {
    Classifier::default().classify(ty)
}

/// Check if values of `ty` can be copied without recursive cloning.
#[inline]
pub fn is_safe(ty: TypeId) -> bool {
    classify(ty) == Safety::Safe
}

/// Check if `ty` is a non-array reference type whose fields (own and
/// inherited) are all safe.
///
/// Such objects can be duplicated with a single shallow copy when they are
/// the root of a deep clone.
pub fn is_class_safe(ty: TypeId) -> bool {
    if let Some(known) = KNOWN_CLASSES.get(&ty) {
        return *known;
    }
    let Some(desc) = registry().lookup(ty) else {
        return false;
    };
    let safe = desc.has_field_storage() && desc.fields().iter().all(|f| is_safe(f.ty));
    KNOWN_CLASSES.insert(ty, safe);
    safe
}

/// No in-progress type was assumed.
const RESOLVED: usize = usize::MAX;

/// One classification walk.
///
/// `in_progress` maps each struct on the current path to its depth.
/// `pending` holds structs judged safe only by assuming an enclosing
/// struct is safe; they are memoized once that struct resolves.
#[derive(Default)]
struct Classifier {
    in_progress: FxHashMap<TypeId, usize>,
    pending: Vec<TypeId>,
}

impl Classifier {
    fn classify(&mut self, ty: TypeId) -> Safety {
        self.walk(ty).0
    }

    /// Classify `ty`, also returning the shallowest in-progress depth the
    /// answer relies on, or [`RESOLVED`].
    fn walk(&mut self, ty: TypeId) -> (Safety, usize) {
        if let Some(known) = KNOWN_TYPES.get(&ty) {
            return (*known, RESOLVED);
        }

        // Type loop: assume safe to terminate.
        if let Some(&depth) = self.in_progress.get(&ty) {
            return (Safety::Safe, depth);
        }

        if config::active().is_pass_through(ty) {
            KNOWN_TYPES.insert(ty, Safety::Safe);
            return (Safety::Safe, RESOLVED);
        }

        // Opaque to introspection: pass through rather than fail. Not
        // memoized, a reserved name may be defined later.
        let Some(desc) = registry().lookup(ty) else {
            return (Safety::Safe, RESOLVED);
        };

        match desc.kind() {
            TypeKind::Struct { fields } => self.walk_struct(ty, fields),
            _ => {
                let result = classify_leaf(desc);
                KNOWN_TYPES.insert(ty, result);
                (result, RESOLVED)
            }
        }
    }

    fn walk_struct(&mut self, ty: TypeId, fields: &[FieldDesc]) -> (Safety, usize) {
        let depth = self.in_progress.len();
        let mark = self.pending.len();
        self.in_progress.insert(ty, depth);

        let mut relies_on = RESOLVED;
        let mut safe = true;
        for field in fields {
            let (field_safety, field_relies_on) = self.walk(field.ty);
            relies_on = relies_on.min(field_relies_on);
            if field_safety == Safety::Unsafe {
                safe = false;
                break;
            }
        }
        self.in_progress.remove(&ty);

        if !safe {
            // Assumptions only ever say "safe", so "unsafe" is final. Safe
            // answers that leaned on this struct are not.
            self.pending.truncate(mark);
            KNOWN_TYPES.insert(ty, Safety::Unsafe);
            return (Safety::Unsafe, RESOLVED);
        }

        if relies_on < depth {
            self.pending.push(ty);
            return (Safety::Safe, relies_on);
        }

        for settled in self.pending.drain(mark..) {
            KNOWN_TYPES.insert(settled, Safety::Safe);
        }
        KNOWN_TYPES.insert(ty, Safety::Safe);
        (Safety::Safe, RESOLVED)
    }
}

fn classify_leaf(desc: &TypeDesc) -> Safety {
    match desc.kind() {
        TypeKind::Primitive(_)
        | TypeKind::Enum { .. }
        | TypeKind::Pointer { .. }
        | TypeKind::Struct { .. } => Safety::Safe,

        TypeKind::Object
        | TypeKind::Class(_)
        | TypeKind::Tuple { .. }
        | TypeKind::Array(_)
        | TypeKind::Interface => Safety::Unsafe,
    }
}
