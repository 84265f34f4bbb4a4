//! Runtime object model for Replica.
//!
//! This crate is the introspection facility the clone engine reflects
//! over. It provides:
//!
//! - **Type registry** ([`TypeRegistry`], [`TypeDesc`], [`TypeKind`]): a
//!   process-wide table of immutable type descriptors addressed by
//!   [`TypeId`]: value/reference kind, flattened field layouts (inherited
//!   fields first), array shapes, class layout flags and constructors.
//!
//! - **Values** ([`Value`], [`StructValue`]): inline scalars and structs,
//!   shared immutable strings, and references into a heap.
//!
//! - **Heap** ([`Heap`], [`ObjRef`]): an arena of objects with reference
//!   identity, supporting constructor-free allocation and writes that
//!   bypass read-only enforcement.
//!
//! # Design
//!
//! Objects are field slots addressed by index rather than constructor and
//! setter APIs. That is what lets a runtime service allocate an instance
//! without running user code and reproduce read-only state exactly, while
//! ordinary callers still see read-only fields enforced.

mod heap;
mod id;
mod registry;
mod value;

pub use heap::{ArrayStorage, Dims, Heap, HeapError, Initializer, ObjRef};
pub use id::TypeId;
pub use registry::{
    registry, ArrayShape, ClassDef, ClassFlags, ClassLayout, Constructor, DefineError, FieldDef,
    FieldDesc, Primitive, StructDef, TypeDesc, TypeKind, TypeRegistry, MAX_RANK,
};
pub use value::{DateTime, StructValue, Value};
