//! Object arena.
//!
//! Heap objects are addressed by [`ObjRef`]; reference identity is index
//! identity. Every object records its concrete runtime type and stores
//! either field slots (classes and tuples) or array storage.
//!
//! # Access paths
//!
//! - [`Heap::construct`] runs the type's constructor. Read-only fields are
//!   writable only from inside it, through the [`Initializer`].
//! - [`Heap::set_field`] is the ordinary mutator and refuses read-only
//!   fields.
//! - [`Heap::allocate_raw`] and [`Heap::write_field_raw`] form the
//!   constructor-free path used by runtime services such as the cloner:
//!   storage comes back zero-filled and read-only enforcement is skipped.
//!   The field metadata itself is unchanged.

use std::fmt;

use smallvec::SmallVec;

use crate::registry::{registry, ClassFlags, DefineError, TypeDesc, TypeKind};
use crate::{TypeId, Value};

/// Handle to a heap object. Identity is index equality.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjRef(u32);

impl ObjRef {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Per-dimension extents of an array.
pub type Dims<T> = SmallVec<[T; 4]>;

/// Row-major array storage with per-dimension lengths and lower bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayStorage {
    lengths: Dims<usize>,
    lower_bounds: Dims<isize>,
    elements: Vec<Value>,
}

impl ArrayStorage {
    /// Build storage from a shape and row-major elements.
    pub fn new(
        lengths: &[usize],
        lower_bounds: &[isize],
        elements: Vec<Value>,
    ) -> Result<Self, HeapError> {
        if lengths.is_empty() || lengths.len() != lower_bounds.len() {
            return Err(HeapError::Shape(format!(
                "{} lengths for {} lower bounds",
                lengths.len(),
                lower_bounds.len()
            )));
        }
        let total = lengths
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| HeapError::Shape("array too large".to_owned()))?;
        if total != elements.len() {
            return Err(HeapError::Shape(format!(
                "shape holds {total} elements, got {}",
                elements.len()
            )));
        }
        Ok(ArrayStorage {
            lengths: lengths.iter().copied().collect(),
            lower_bounds: lower_bounds.iter().copied().collect(),
            elements,
        })
    }

    /// Storage with every element set to `fill`.
    pub fn filled(lengths: &[usize], lower_bounds: &[isize], fill: &Value) -> Result<Self, HeapError> {
        let total = lengths
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| HeapError::Shape("array too large".to_owned()))?;
        Self::new(lengths, lower_bounds, vec![fill.clone(); total])
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    /// Total element count.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    #[inline]
    pub fn lower_bounds(&self) -> &[isize] {
        &self.lower_bounds
    }

    #[inline]
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    #[inline]
    pub fn elements_mut(&mut self) -> &mut [Value] {
        &mut self.elements
    }

    /// Row-major offset of a multi-index given in each dimension's own
    /// coordinates (i.e. including lower bounds).
    pub fn offset(&self, indices: &[isize]) -> Option<usize> {
        if indices.len() != self.rank() {
            return None;
        }
        let mut offset = 0usize;
        for ((&i, &lo), &len) in indices.iter().zip(&self.lower_bounds).zip(&self.lengths) {
            let rel = usize::try_from(i.checked_sub(lo)?).ok()?;
            if rel >= len {
                return None;
            }
            offset = offset * len + rel;
        }
        Some(offset)
    }

    pub fn get(&self, indices: &[isize]) -> Option<&Value> {
        self.elements.get(self.offset(indices)?)
    }
}

#[derive(Clone, Debug)]
enum Body {
    Fields(Box<[Value]>),
    Array(ArrayStorage),
}

#[derive(Clone, Debug)]
struct Object {
    ty: TypeId,
    body: Body,
}

/// Errors raised by heap operations.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum HeapError {
    #[error("type `{0}` cannot be instantiated")]
    NotInstantiable(String),

    #[error("type `{0}` has a fixed layout and cannot be allocated without a constructor")]
    FixedLayout(String),

    #[error("field `{field}` of `{ty}` is read-only")]
    ReadOnlyField { ty: String, field: String },

    #[error("type `{ty}` has no field `{field}`")]
    UnknownField { ty: String, field: String },

    #[error("field index {index} out of range for {len} fields")]
    FieldIndex { index: usize, len: usize },

    #[error("object {0:?} has no field storage")]
    NotFieldStorage(ObjRef),

    #[error("object {0:?} is not an array")]
    NotAnArray(ObjRef),

    #[error("object {0:?} does not belong to this heap")]
    Dangling(ObjRef),

    #[error("array index {0:?} out of bounds")]
    OutOfBounds(Vec<isize>),

    #[error("invalid array shape: {0}")]
    Shape(String),

    #[error("expected {expected} arguments, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("constructor failed: {0}")]
    Constructor(String),

    #[error(transparent)]
    Define(#[from] DefineError),
}

/// Object arena.
#[derive(Clone, Debug, Default)]
pub struct Heap {
    objects: Vec<Object>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Concrete runtime type of an object.
    ///
    /// Returns [`TypeId::NONE`] for a reference from another heap.
    #[inline]
    pub fn type_of(&self, r: ObjRef) -> TypeId {
        self.objects.get(r.index()).map_or(TypeId::NONE, |o| o.ty)
    }

    /// Runtime type of any value; `None` for `Null`.
    pub fn value_type(&self, value: &Value) -> Option<TypeId> {
        match value {
            Value::Ref(r) => Some(self.type_of(*r)),
            other => other.inline_type(),
        }
    }

    /// Descriptor of an object's runtime type.
    pub fn desc_of(&self, r: ObjRef) -> Option<&'static TypeDesc> {
        registry().lookup(self.type_of(r))
    }

    // ── Allocation ─────────────────────────────────────────────────

    /// Allocate an instance of a class and run its constructor.
    ///
    /// A class without a constructor accepts no arguments.
    pub fn construct(&mut self, ty: TypeId, args: &[Value]) -> Result<ObjRef, HeapError> {
        let desc = lookup_instantiable(ty)?;
        let Some(layout) = desc.as_class() else {
            return Err(HeapError::NotInstantiable(desc.name().to_owned()));
        };
        let obj = self.push(ty, Body::Fields(default_fields(desc)));
        match layout.constructor {
            Some(ctor) => ctor(&mut Initializer { heap: self, obj }, args)?,
            None if !args.is_empty() => {
                return Err(HeapError::Arity {
                    expected: 0,
                    found: args.len(),
                })
            }
            None => {}
        }
        Ok(obj)
    }

    /// Allocate zero-filled storage for a class or tuple without running
    /// any constructor.
    pub fn allocate_raw(&mut self, ty: TypeId) -> Result<ObjRef, HeapError> {
        let desc = lookup_instantiable(ty)?;
        if !desc.has_field_storage() {
            return Err(HeapError::NotInstantiable(desc.name().to_owned()));
        }
        if desc
            .as_class()
            .is_some_and(|c| c.flags.contains(ClassFlags::FIXED_LAYOUT))
        {
            return Err(HeapError::FixedLayout(desc.name().to_owned()));
        }
        Ok(self.push(ty, Body::Fields(default_fields(desc))))
    }

    /// Allocate a tuple from all of its components at once.
    pub fn new_tuple(&mut self, ty: TypeId, components: Vec<Value>) -> Result<ObjRef, HeapError> {
        let desc = lookup_instantiable(ty)?;
        let TypeKind::Tuple { components: slots } = desc.kind() else {
            return Err(HeapError::NotInstantiable(desc.name().to_owned()));
        };
        if slots.len() != components.len() {
            return Err(HeapError::Arity {
                expected: slots.len(),
                found: components.len(),
            });
        }
        Ok(self.push(ty, Body::Fields(components.into_boxed_slice())))
    }

    /// Allocate a default-filled array of type `ty`.
    pub fn new_array(
        &mut self,
        ty: TypeId,
        lengths: &[usize],
        lower_bounds: &[isize],
    ) -> Result<ObjRef, HeapError> {
        let desc = lookup_instantiable(ty)?;
        let Some(shape) = desc.as_array() else {
            return Err(HeapError::NotInstantiable(desc.name().to_owned()));
        };
        let fill = Value::default_for(shape.element);
        let storage = ArrayStorage::filled(lengths, lower_bounds, &fill)?;
        self.alloc_array(ty, storage)
    }

    /// Allocate a zero-based one-dimensional array holding `values`.
    pub fn new_vector(&mut self, element: TypeId, values: Vec<Value>) -> Result<ObjRef, HeapError> {
        let ty = registry().vector_of(element)?;
        let len = values.len();
        let storage = ArrayStorage::new(&[len], &[0], values)?;
        self.alloc_array(ty, storage)
    }

    /// Allocate an array of type `ty` over prepared storage.
    pub fn alloc_array(&mut self, ty: TypeId, storage: ArrayStorage) -> Result<ObjRef, HeapError> {
        let desc = lookup_instantiable(ty)?;
        let Some(shape) = desc.as_array() else {
            return Err(HeapError::NotInstantiable(desc.name().to_owned()));
        };
        if storage.rank() != usize::from(shape.rank) {
            return Err(HeapError::Shape(format!(
                "`{}` has rank {}, storage has rank {}",
                desc.name(),
                shape.rank,
                storage.rank()
            )));
        }
        if shape.vector && storage.lower_bounds() != [0] {
            return Err(HeapError::Shape(format!(
                "`{}` must be zero-based",
                desc.name()
            )));
        }
        Ok(self.push(ty, Body::Array(storage)))
    }

    /// New object of the same type with every slot copied as-is.
    ///
    /// Referenced objects are shared, not duplicated, and no constructor
    /// runs. Works for every object kind, including fixed-layout classes.
    pub fn shallow_copy(&mut self, r: ObjRef) -> Result<ObjRef, HeapError> {
        let copy = self.object(r)?.clone();
        let index = self.objects.len();
        self.objects.push(copy);
        Ok(ObjRef(to_raw(index)))
    }

    // ── Field access ───────────────────────────────────────────────

    /// All field slots of an object; empty for arrays and foreign refs.
    pub fn fields(&self, r: ObjRef) -> &[Value] {
        match self.objects.get(r.index()).map(|o| &o.body) {
            Some(Body::Fields(fields)) => fields,
            _ => &[],
        }
    }

    #[inline]
    pub fn field(&self, r: ObjRef, index: usize) -> Option<&Value> {
        self.fields(r).get(index)
    }

    /// Most-derived field called `name`.
    pub fn get(&self, r: ObjRef, name: &str) -> Option<&Value> {
        let index = self.desc_of(r)?.field_index(name)?;
        self.field(r, index)
    }

    /// Write a mutable field.
    pub fn set_field(&mut self, r: ObjRef, index: usize, value: Value) -> Result<(), HeapError> {
        let desc = self.desc_of(r).ok_or(HeapError::Dangling(r))?;
        if let Some(field) = desc.fields().get(index) {
            if field.readonly {
                return Err(HeapError::ReadOnlyField {
                    ty: desc.name().to_owned(),
                    field: field.name.to_string(),
                });
            }
        }
        self.write_field_raw(r, index, value)
    }

    /// Write the most-derived mutable field called `name`.
    pub fn set(&mut self, r: ObjRef, name: &str, value: Value) -> Result<(), HeapError> {
        let index = self.resolve_field(r, name)?;
        self.set_field(r, index, value)
    }

    /// Write a field slot, ignoring read-only enforcement.
    ///
    /// For runtime services that must reproduce state exactly, such as the
    /// cloner. Ordinary code goes through [`Heap::set_field`].
    pub fn write_field_raw(&mut self, r: ObjRef, index: usize, value: Value) -> Result<(), HeapError> {
        match &mut self.object_mut(r)?.body {
            Body::Fields(fields) => {
                let len = fields.len();
                let slot = fields
                    .get_mut(index)
                    .ok_or(HeapError::FieldIndex { index, len })?;
                *slot = value;
                Ok(())
            }
            Body::Array(_) => Err(HeapError::NotFieldStorage(r)),
        }
    }

    fn resolve_field(&self, r: ObjRef, name: &str) -> Result<usize, HeapError> {
        let desc = self.desc_of(r).ok_or(HeapError::Dangling(r))?;
        desc.field_index(name).ok_or_else(|| HeapError::UnknownField {
            ty: desc.name().to_owned(),
            field: name.to_owned(),
        })
    }

    // ── Array access ───────────────────────────────────────────────

    pub fn array(&self, r: ObjRef) -> Option<&ArrayStorage> {
        match &self.objects.get(r.index())?.body {
            Body::Array(storage) => Some(storage),
            Body::Fields(_) => None,
        }
    }

    pub fn array_mut(&mut self, r: ObjRef) -> Result<&mut ArrayStorage, HeapError> {
        match &mut self.object_mut(r)?.body {
            Body::Array(storage) => Ok(storage),
            Body::Fields(_) => Err(HeapError::NotAnArray(r)),
        }
    }

    /// Element at a multi-index in the array's own coordinates.
    pub fn element(&self, r: ObjRef, indices: &[isize]) -> Option<&Value> {
        self.array(r)?.get(indices)
    }

    pub fn set_element(&mut self, r: ObjRef, indices: &[isize], value: Value) -> Result<(), HeapError> {
        let storage = self.array_mut(r)?;
        let offset = storage
            .offset(indices)
            .ok_or_else(|| HeapError::OutOfBounds(indices.to_vec()))?;
        if let Some(slot) = storage.elements.get_mut(offset) {
            *slot = value;
        }
        Ok(())
    }

    // ── Internals ──────────────────────────────────────────────────

    fn push(&mut self, ty: TypeId, body: Body) -> ObjRef {
        let index = self.objects.len();
        self.objects.push(Object { ty, body });
        ObjRef(to_raw(index))
    }

    fn object(&self, r: ObjRef) -> Result<&Object, HeapError> {
        self.objects.get(r.index()).ok_or(HeapError::Dangling(r))
    }

    fn object_mut(&mut self, r: ObjRef) -> Result<&mut Object, HeapError> {
        self.objects.get_mut(r.index()).ok_or(HeapError::Dangling(r))
    }
}

/// Constructor-time view of a freshly allocated object.
///
/// Read-only fields may be written here and nowhere else.
pub struct Initializer<'h> {
    heap: &'h mut Heap,
    obj: ObjRef,
}

impl Initializer<'_> {
    /// The object under construction.
    #[inline]
    pub fn obj(&self) -> ObjRef {
        self.obj
    }

    /// The heap, for allocating objects the constructor links to.
    #[inline]
    pub fn heap(&mut self) -> &mut Heap {
        self.heap
    }

    /// Initialise the most-derived field called `name`, read-only or not.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), HeapError> {
        let index = self.heap.resolve_field(self.obj, name)?;
        self.heap.write_field_raw(self.obj, index, value)
    }
}

fn lookup_instantiable(ty: TypeId) -> Result<&'static TypeDesc, HeapError> {
    registry()
        .lookup(ty)
        .ok_or_else(|| HeapError::NotInstantiable(registry().name_of(ty)))
}

fn default_fields(desc: &TypeDesc) -> Box<[Value]> {
    desc.fields().iter().map(|f| Value::default_for(f.ty)).collect()
}

/// Heap indices are `u32`; an arena past that is out of memory long before.
#[expect(
    clippy::cast_possible_truncation,
    reason = "object count is bounded well below u32::MAX in practice"
)]
fn to_raw(index: usize) -> u32 {
    index as u32
}
