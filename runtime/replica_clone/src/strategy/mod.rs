//! Per-type clone strategies.
//!
//! A [`CloneStrategy`] is the compiled clone procedure for one concrete
//! runtime type. The engine interprets it: each variant says how to
//! allocate the copy, and carries one [`Action`] per field (or one for
//! every array element) precomputed from the declared slot types.
//!
//! Strategies are synthesized on first use and cached for the life of the
//! process, keyed by exact type identity. A subtype never shares its
//! base's strategy.
//!
//! # Concurrency
//!
//! The cache is a sharded concurrent map. Hits take a shard read lock
//! only. Synthesis runs outside any lock, so two threads may build the
//! same strategy; the first insert wins and the loser adopts the winner's
//! value.

use std::sync::{Arc, LazyLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use replica_model::{registry, ClassFlags, FieldDesc, TypeDesc, TypeId, TypeKind};
use rustc_hash::FxBuildHasher;

use crate::safety::is_safe;

/// What to do with one field or array element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Copy the slot as-is.
    Copy,
    /// Declared as a value type: clone inline, no identity tracking.
    Struct,
    /// Declared as a reference type: clone through the identity map,
    /// dispatching on the runtime type of the value found in the slot.
    Track,
}

impl Action {
    /// Action for a slot declared with type `ty`.
    pub fn for_slot(ty: TypeId) -> Self {
        if is_safe(ty) {
            return Action::Copy;
        }
        match registry().lookup(ty) {
            Some(desc) if desc.is_value_type() => Action::Struct,
            _ => Action::Track,
        }
    }
}

/// Actions for every field of a layout, in slot order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPlan {
    actions: Box<[Action]>,
}

impl FieldPlan {
    /// Plan for `fields`, copying the first `pinned` slots as-is.
    fn new(fields: &[FieldDesc], pinned: usize) -> Self {
        let actions = fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                if i < pinned {
                    Action::Copy
                } else {
                    Action::for_slot(field.ty)
                }
            })
            .collect();
        FieldPlan { actions }
    }

    /// Plan that copies `len` slots as-is.
    pub fn copy_only(len: usize) -> Self {
        FieldPlan {
            actions: vec![Action::Copy; len].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Action for slot `index`; slots past the plan are copied.
    #[inline]
    pub fn action(&self, index: usize) -> Action {
        self.actions.get(index).copied().unwrap_or(Action::Copy)
    }

    /// Check if every slot is copied as-is.
    pub fn is_copy_only(&self) -> bool {
        self.actions.iter().all(|a| *a == Action::Copy)
    }
}

/// Compiled clone procedure for one concrete type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloneStrategy {
    /// Safe or opaque: the input is its own clone.
    PassThrough,
    /// Inline value type.
    Struct(FieldPlan),
    /// Reference type allocated without a constructor, registered, then
    /// filled slot by slot.
    Object(FieldPlan),
    /// Fixed-layout reference type: shallow-copied, registered, then only
    /// the non-copy slots are rebound.
    Rebind(FieldPlan),
    /// Tuple whose components are all safe: built whole from the source
    /// components, then registered.
    Tuple,
    /// Zero-based one-dimensional array.
    Vector(Action),
    /// Rank-2 array.
    Matrix(Action),
    /// Any other rank, or a rank-1 array with a lower bound.
    Array(Action),
}

impl CloneStrategy {
    /// Short name for diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            CloneStrategy::PassThrough => "pass-through",
            CloneStrategy::Struct(_) => "struct",
            CloneStrategy::Object(_) => "object",
            CloneStrategy::Rebind(_) => "rebind",
            CloneStrategy::Tuple => "tuple",
            CloneStrategy::Vector(_) => "vector",
            CloneStrategy::Matrix(_) => "matrix",
            CloneStrategy::Array(_) => "array",
        }
    }
}

/// Build the strategy for `ty` without consulting the cache.
pub fn synthesize(ty: TypeId) -> CloneStrategy {
    if is_safe(ty) {
        return CloneStrategy::PassThrough;
    }
    match registry().lookup(ty) {
        Some(desc) => synthesize_desc(desc),
        None => CloneStrategy::PassThrough,
    }
}

fn synthesize_desc(desc: &TypeDesc) -> CloneStrategy {
    match desc.kind() {
        TypeKind::Array(shape) => {
            let element = Action::for_slot(shape.element);
            if shape.vector {
                CloneStrategy::Vector(element)
            } else if shape.rank == 2 {
                CloneStrategy::Matrix(element)
            } else {
                CloneStrategy::Array(element)
            }
        }

        TypeKind::Tuple { components } => {
            let plan = FieldPlan::new(components, 0);
            if plan.is_copy_only() {
                CloneStrategy::Tuple
            } else {
                // Back-references through the tuple must resolve to the
                // copy, so it is registered before its components clone.
                CloneStrategy::Object(plan)
            }
        }

        TypeKind::Struct { fields } => CloneStrategy::Struct(FieldPlan::new(fields, 0)),

        TypeKind::Class(layout) => {
            let plan = FieldPlan::new(&layout.fields, layout.pinned_fields);
            if layout.flags.contains(ClassFlags::FIXED_LAYOUT) {
                CloneStrategy::Rebind(plan)
            } else {
                CloneStrategy::Object(plan)
            }
        }

        // Never the runtime type of an instance.
        TypeKind::Object | TypeKind::Interface => CloneStrategy::PassThrough,

        TypeKind::Primitive(_) | TypeKind::Enum { .. } | TypeKind::Pointer { .. } => {
            CloneStrategy::PassThrough
        }
    }
}

static STRATEGIES: LazyLock<DashMap<TypeId, Arc<CloneStrategy>, FxBuildHasher>> =
    LazyLock::new(|| DashMap::with_hasher(FxBuildHasher));

/// Cached strategy for the concrete type `ty`.
pub fn strategy_for(ty: TypeId) -> Arc<CloneStrategy> {
    if let Some(hit) = STRATEGIES.get(&ty) {
        return Arc::clone(hit.value());
    }

    let Some(desc) = registry().lookup(ty) else {
        // Opaque types are not cached: a reserved name may be defined later.
        return Arc::new(CloneStrategy::PassThrough);
    };

    let built = Arc::new(synthesize(ty));
    match STRATEGIES.entry(ty) {
        Entry::Occupied(existing) => {
            tracing::debug!(ty = desc.name(), "lost strategy race, using cached strategy");
            Arc::clone(existing.get())
        }
        Entry::Vacant(slot) => {
            tracing::debug!(ty = desc.name(), strategy = built.label(), "synthesized clone strategy");
            slot.insert(Arc::clone(&built));
            built
        }
    }
}

#[cfg(test)]
mod tests;
