//! Process-wide type registry.
//!
//! Every runtime type is described once by a [`TypeDesc`] and addressed by
//! its [`TypeId`]. Descriptors are immutable after definition and live for
//! the rest of the process, so lookups hand out `&'static` references.
//!
//! # Defining types
//!
//! Recursive and mutually recursive types are declared first with
//! [`TypeRegistry::reserve`] and filled in later by the matching
//! `define_*` call; field types may name a reserved type, base classes may
//! not.
//!
//! ```text
//! let node = registry().reserve("Node")?;
//! registry().define_class(
//!     ClassDef::new("Node")
//!         .field("value", TypeId::I32)
//!         .field("next", node),
//! )?;
//! ```
//!
//! Pointer, tuple and array types are derived on demand and interned, so
//! asking twice for `vector_of(TypeId::I32)` yields the same id.

use std::sync::LazyLock;

use bitflags::bitflags;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::heap::Initializer;
use crate::{HeapError, TypeId, Value};

/// Largest supported array rank.
pub const MAX_RANK: u8 = 32;

/// Primitive leaf kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    DateTime,
    ISize,
    USize,
    /// Immutable shared string. A reference type, but never duplicated.
    Str,
}

impl Primitive {
    /// Primitives in fixed-index order.
    pub const ALL: [Primitive; 16] = [
        Primitive::Bool,
        Primitive::Char,
        Primitive::I8,
        Primitive::I16,
        Primitive::I32,
        Primitive::I64,
        Primitive::U8,
        Primitive::U16,
        Primitive::U32,
        Primitive::U64,
        Primitive::F32,
        Primitive::F64,
        Primitive::DateTime,
        Primitive::ISize,
        Primitive::USize,
        Primitive::Str,
    ];
}

bitflags! {
    /// Layout flags for class types.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ClassFlags: u8 {
        /// Marker base for interop-bound objects. Fields declared by this
        /// class and its ancestors are carried over bit-for-bit by the
        /// cloner and never recursed into.
        const LAYOUT_MARKER = 1 << 0;
        /// Storage cannot be allocated without running a constructor.
        const FIXED_LAYOUT = 1 << 1;
    }
}

/// User constructor, run by [`Heap::construct`](crate::Heap::construct).
///
/// Read-only fields can be written through the initializer.
pub type Constructor = fn(&mut Initializer<'_>, &[Value]) -> Result<(), HeapError>;

/// A field slot in a flattened layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: Box<str>,
    /// Declared (static) type of the slot.
    pub ty: TypeId,
    /// Writable only during construction.
    pub readonly: bool,
    /// Type whose definition introduced this field.
    pub declared_in: TypeId,
}

/// Layout of a reference type.
#[derive(Debug)]
pub struct ClassLayout {
    pub base: Option<TypeId>,
    /// All instance fields, inherited first.
    pub fields: Box<[FieldDesc]>,
    pub flags: ClassFlags,
    pub constructor: Option<Constructor>,
    /// Number of leading fields owned by the nearest layout marker in the
    /// inheritance chain (zero when there is none).
    pub pinned_fields: usize,
}

/// Shape of an array type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArrayShape {
    pub element: TypeId,
    pub rank: u8,
    /// One-dimensional and always zero-based.
    pub vector: bool,
}

/// What a type is.
#[derive(Debug)]
pub enum TypeKind {
    Primitive(Primitive),
    /// The `object` root.
    Object,
    Enum { variants: Box<[Box<str>]> },
    Pointer { pointee: TypeId },
    /// Value type, copied inline.
    Struct { fields: Box<[FieldDesc]> },
    Class(ClassLayout),
    /// Immutable fixed-arity product; components are read-only fields.
    Tuple { components: Box<[FieldDesc]> },
    Array(ArrayShape),
    /// Abstract type: only ever a declared type, never an instance type.
    Interface,
}

/// Immutable description of one runtime type.
#[derive(Debug)]
pub struct TypeDesc {
    id: TypeId,
    name: Box<str>,
    kind: TypeKind,
}

impl TypeDesc {
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Value types are copied on assignment: non-string primitives, enums,
    /// pointers and structs.
    pub fn is_value_type(&self) -> bool {
        match &self.kind {
            TypeKind::Primitive(p) => *p != Primitive::Str,
            TypeKind::Enum { .. } | TypeKind::Pointer { .. } | TypeKind::Struct { .. } => true,
            TypeKind::Object
            | TypeKind::Class(_)
            | TypeKind::Tuple { .. }
            | TypeKind::Array(_)
            | TypeKind::Interface => false,
        }
    }

    /// Instance fields of structs, classes and tuples; empty otherwise.
    pub fn fields(&self) -> &[FieldDesc] {
        match &self.kind {
            TypeKind::Struct { fields } | TypeKind::Tuple { components: fields } => fields,
            TypeKind::Class(layout) => &layout.fields,
            _ => &[],
        }
    }

    pub fn as_class(&self) -> Option<&ClassLayout> {
        match &self.kind {
            TypeKind::Class(layout) => Some(layout),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<ArrayShape> {
        match &self.kind {
            TypeKind::Array(shape) => Some(*shape),
            _ => None,
        }
    }

    /// Objects of this type live on the heap as field slots.
    pub fn has_field_storage(&self) -> bool {
        matches!(self.kind, TypeKind::Class(_) | TypeKind::Tuple { .. })
    }

    /// Index of the most-derived field called `name`.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields().iter().rposition(|f| &*f.name == name)
    }

    /// Index of the field called `name` introduced by `declared_in`.
    ///
    /// Resolves fields hidden by a same-named field in a subclass.
    pub fn field_index_in(&self, declared_in: TypeId, name: &str) -> Option<usize> {
        self.fields()
            .iter()
            .position(|f| f.declared_in == declared_in && &*f.name == name)
    }
}

/// Input field for class and struct definitions.
#[derive(Clone, Debug)]
pub struct FieldDef {
    name: Box<str>,
    ty: TypeId,
    readonly: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<Box<str>>, ty: TypeId) -> Self {
        FieldDef {
            name: name.into(),
            ty,
            readonly: false,
        }
    }

    /// Mark the field writable only during construction.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    fn into_desc(self, declared_in: TypeId) -> FieldDesc {
        FieldDesc {
            name: self.name,
            ty: self.ty,
            readonly: self.readonly,
            declared_in,
        }
    }
}

/// Class definition builder.
#[derive(Clone, Debug)]
pub struct ClassDef {
    name: Box<str>,
    base: Option<TypeId>,
    fields: Vec<FieldDef>,
    flags: ClassFlags,
    constructor: Option<Constructor>,
}

impl ClassDef {
    pub fn new(name: impl Into<Box<str>>) -> Self {
        ClassDef {
            name: name.into(),
            base: None,
            fields: Vec::new(),
            flags: ClassFlags::empty(),
            constructor: None,
        }
    }

    #[must_use]
    pub fn base(mut self, base: TypeId) -> Self {
        self.base = Some(base);
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<Box<str>>, ty: TypeId) -> Self {
        self.fields.push(FieldDef::new(name, ty));
        self
    }

    #[must_use]
    pub fn readonly_field(mut self, name: impl Into<Box<str>>, ty: TypeId) -> Self {
        self.fields.push(FieldDef::new(name, ty).readonly());
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn constructor(mut self, ctor: Constructor) -> Self {
        self.constructor = Some(ctor);
        self
    }
}

/// Struct definition builder.
#[derive(Clone, Debug)]
pub struct StructDef {
    name: Box<str>,
    fields: Vec<FieldDef>,
}

impl StructDef {
    pub fn new(name: impl Into<Box<str>>) -> Self {
        StructDef {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<Box<str>>, ty: TypeId) -> Self {
        self.fields.push(FieldDef::new(name, ty));
        self
    }

    #[must_use]
    pub fn readonly_field(mut self, name: impl Into<Box<str>>, ty: TypeId) -> Self {
        self.fields.push(FieldDef::new(name, ty).readonly());
        self
    }
}

/// Errors raised while defining types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DefineError {
    #[error("type `{0}` is already defined")]
    AlreadyDefined(String),

    #[error("base type {0} is not defined")]
    UnknownBase(TypeId),

    #[error("base type `{0}` is not a class")]
    BaseNotClass(String),

    #[error("array rank {0} is outside 1..={MAX_RANK}")]
    InvalidRank(u8),

    #[error("a tuple needs at least one component")]
    EmptyTuple,

    #[error("type registry is full")]
    Exhausted,
}

/// Key for interned derived types.
#[derive(Clone, PartialEq, Eq, Hash)]
enum DerivedKey {
    Pointer(TypeId),
    Tuple(Box<[TypeId]>),
    Array(ArrayShape),
}

struct Slot {
    name: Box<str>,
    desc: Option<&'static TypeDesc>,
}

struct Inner {
    slots: Vec<Slot>,
    by_name: FxHashMap<Box<str>, TypeId>,
    derived: FxHashMap<DerivedKey, TypeId>,
}

/// The process-wide type registry.
pub struct TypeRegistry {
    inner: RwLock<Inner>,
}

static REGISTRY: LazyLock<TypeRegistry> = LazyLock::new(TypeRegistry::with_builtins);

/// Access the process-wide registry.
#[inline]
pub fn registry() -> &'static TypeRegistry {
    &REGISTRY
}

fn leak(id: TypeId, name: &str, kind: TypeKind) -> &'static TypeDesc {
    Box::leak(Box::new(TypeDesc {
        id,
        name: name.into(),
        kind,
    }))
}

impl TypeRegistry {
    fn with_builtins() -> Self {
        let mut slots = Vec::with_capacity(TypeId::FIRST_DYNAMIC as usize + 64);
        let mut by_name = FxHashMap::default();

        for raw in 0..TypeId::FIRST_DYNAMIC {
            let id = TypeId::from_raw(raw);
            let slot = match id.builtin_name() {
                Some(name) => {
                    let kind = match Primitive::ALL.get(id.index()) {
                        Some(&p) => TypeKind::Primitive(p),
                        None => TypeKind::Object,
                    };
                    by_name.insert(Box::from(name), id);
                    Slot {
                        name: name.into(),
                        desc: Some(leak(id, name, kind)),
                    }
                }
                // Reserved range: never resolves.
                None => Slot {
                    name: "<reserved>".into(),
                    desc: None,
                },
            };
            slots.push(slot);
        }

        TypeRegistry {
            inner: RwLock::new(Inner {
                slots,
                by_name,
                derived: FxHashMap::default(),
            }),
        }
    }

    /// Look up a defined type.
    ///
    /// Returns `None` for unknown ids and for reserved-but-undefined names.
    #[inline]
    pub fn lookup(&self, id: TypeId) -> Option<&'static TypeDesc> {
        self.inner.read().slots.get(id.index()).and_then(|s| s.desc)
    }

    /// Find a named type (defined or reserved).
    pub fn by_name(&self, name: &str) -> Option<TypeId> {
        self.inner.read().by_name.get(name).copied()
    }

    /// Display name of any id, including reserved ones.
    pub fn name_of(&self, id: TypeId) -> String {
        match self.inner.read().slots.get(id.index()) {
            Some(slot) => slot.name.to_string(),
            None => id.to_string(),
        }
    }

    /// Forward-declare a named type so other definitions can refer to it.
    ///
    /// Reserving an already known name returns its existing id.
    pub fn reserve(&self, name: &str) -> Result<TypeId, DefineError> {
        let mut inner = self.inner.write();
        if let Some(&id) = inner.by_name.get(name) {
            return Ok(id);
        }
        let id = Self::push_slot(&mut inner, name.into(), None)?;
        inner.by_name.insert(name.into(), id);
        Ok(id)
    }

    pub fn define_class(&self, def: ClassDef) -> Result<TypeId, DefineError> {
        let ClassDef {
            name,
            base,
            fields,
            flags,
            constructor,
        } = def;

        let mut inner = self.inner.write();
        let id = Self::claim_name(&mut inner, &name)?;

        let (mut all_fields, mut pinned_fields) = match base {
            None => (Vec::new(), 0),
            Some(base_id) => {
                let base_desc = inner
                    .slots
                    .get(base_id.index())
                    .and_then(|s| s.desc)
                    .ok_or(DefineError::UnknownBase(base_id))?;
                let base_layout = base_desc
                    .as_class()
                    .ok_or_else(|| DefineError::BaseNotClass(base_desc.name().to_owned()))?;
                (base_layout.fields.to_vec(), base_layout.pinned_fields)
            }
        };
        all_fields.extend(fields.into_iter().map(|f| f.into_desc(id)));
        if flags.contains(ClassFlags::LAYOUT_MARKER) {
            pinned_fields = all_fields.len();
        }

        let layout = ClassLayout {
            base,
            fields: all_fields.into_boxed_slice(),
            flags,
            constructor,
            pinned_fields,
        };
        Self::fill(&mut inner, id, &name, TypeKind::Class(layout));
        tracing::debug!(name = &*name, id = id.raw(), "defined class");
        Ok(id)
    }

    pub fn define_struct(&self, def: StructDef) -> Result<TypeId, DefineError> {
        let mut inner = self.inner.write();
        let id = Self::claim_name(&mut inner, &def.name)?;
        let fields = def.fields.into_iter().map(|f| f.into_desc(id)).collect();
        Self::fill(&mut inner, id, &def.name, TypeKind::Struct { fields });
        Ok(id)
    }

    pub fn define_enum(&self, name: &str, variants: &[&str]) -> Result<TypeId, DefineError> {
        let mut inner = self.inner.write();
        let id = Self::claim_name(&mut inner, name)?;
        let variants = variants.iter().map(|v| Box::from(*v)).collect();
        Self::fill(&mut inner, id, name, TypeKind::Enum { variants });
        Ok(id)
    }

    pub fn define_interface(&self, name: &str) -> Result<TypeId, DefineError> {
        let mut inner = self.inner.write();
        let id = Self::claim_name(&mut inner, name)?;
        Self::fill(&mut inner, id, name, TypeKind::Interface);
        Ok(id)
    }

    /// Raw pointer to `pointee`.
    pub fn pointer_to(&self, pointee: TypeId) -> Result<TypeId, DefineError> {
        let name = format!("*{}", self.name_of(pointee));
        self.intern_derived(DerivedKey::Pointer(pointee), name, || TypeKind::Pointer {
            pointee,
        })
    }

    /// Immutable tuple over `components`.
    pub fn tuple_of(&self, components: &[TypeId]) -> Result<TypeId, DefineError> {
        if components.is_empty() {
            return Err(DefineError::EmptyTuple);
        }
        let names: Vec<String> = components.iter().map(|&c| self.name_of(c)).collect();
        let name = format!("({})", names.join(", "));
        let key = DerivedKey::Tuple(components.into());
        let owned: Vec<TypeId> = components.to_vec();
        self.intern_derived_with_id(key, name, move |id| TypeKind::Tuple {
            components: owned
                .iter()
                .enumerate()
                .map(|(i, &ty)| FieldDesc {
                    name: format!("item{}", i + 1).into(),
                    ty,
                    readonly: true,
                    declared_in: id,
                })
                .collect(),
        })
    }

    /// One-dimensional zero-based array of `element`.
    pub fn vector_of(&self, element: TypeId) -> Result<TypeId, DefineError> {
        let shape = ArrayShape {
            element,
            rank: 1,
            vector: true,
        };
        let name = format!("{}[]", self.name_of(element));
        self.intern_derived(DerivedKey::Array(shape), name, move || TypeKind::Array(shape))
    }

    /// General array of `element` with the given rank.
    ///
    /// Instances may have arbitrary per-dimension lower bounds. A rank-1
    /// general array is distinct from the vector type of the same element.
    pub fn array_of(&self, element: TypeId, rank: u8) -> Result<TypeId, DefineError> {
        if rank == 0 || rank > MAX_RANK {
            return Err(DefineError::InvalidRank(rank));
        }
        let shape = ArrayShape {
            element,
            rank,
            vector: false,
        };
        let dims = if rank == 1 {
            "*".to_owned()
        } else {
            ",".repeat(usize::from(rank) - 1)
        };
        let name = format!("{}[{dims}]", self.name_of(element));
        self.intern_derived(DerivedKey::Array(shape), name, move || TypeKind::Array(shape))
    }

    /// Check if `derived` can stand where `base` is expected.
    ///
    /// Walks the class base chain. Every reference type is a subtype of
    /// `object`.
    pub fn is_subtype(&self, derived: TypeId, base: TypeId) -> bool {
        if derived == base {
            return true;
        }
        let Some(desc) = self.lookup(derived) else {
            return false;
        };
        if base == TypeId::OBJECT {
            return !desc.is_value_type();
        }
        let mut current = desc.as_class().and_then(|c| c.base);
        while let Some(id) = current {
            if id == base {
                return true;
            }
            current = self.lookup(id).and_then(|d| d.as_class()).and_then(|c| c.base);
        }
        false
    }

    fn intern_derived(
        &self,
        key: DerivedKey,
        name: String,
        make: impl FnOnce() -> TypeKind,
    ) -> Result<TypeId, DefineError> {
        self.intern_derived_with_id(key, name, |_| make())
    }

    fn intern_derived_with_id(
        &self,
        key: DerivedKey,
        name: String,
        make: impl FnOnce(TypeId) -> TypeKind,
    ) -> Result<TypeId, DefineError> {
        if let Some(&id) = self.inner.read().derived.get(&key) {
            return Ok(id);
        }

        let mut inner = self.inner.write();
        // Double-check after acquiring the write lock.
        if let Some(&id) = inner.derived.get(&key) {
            return Ok(id);
        }
        let id = Self::push_slot(&mut inner, name.clone().into_boxed_str(), None)?;
        Self::fill(&mut inner, id, &name, make(id));
        inner.derived.insert(key, id);
        Ok(id)
    }

    /// Resolve `name` to a fresh or reserved slot that has no definition yet.
    fn claim_name(inner: &mut Inner, name: &str) -> Result<TypeId, DefineError> {
        if let Some(&id) = inner.by_name.get(name) {
            let defined = inner.slots.get(id.index()).is_some_and(|s| s.desc.is_some());
            if defined {
                return Err(DefineError::AlreadyDefined(name.to_owned()));
            }
            return Ok(id);
        }
        let id = Self::push_slot(inner, name.into(), None)?;
        inner.by_name.insert(name.into(), id);
        Ok(id)
    }

    fn push_slot(
        inner: &mut Inner,
        name: Box<str>,
        desc: Option<&'static TypeDesc>,
    ) -> Result<TypeId, DefineError> {
        let raw = u32::try_from(inner.slots.len()).map_err(|_| DefineError::Exhausted)?;
        if raw == u32::MAX {
            return Err(DefineError::Exhausted);
        }
        inner.slots.push(Slot { name, desc });
        Ok(TypeId::from_raw(raw))
    }

    fn fill(inner: &mut Inner, id: TypeId, name: &str, kind: TypeKind) {
        if let Some(slot) = inner.slots.get_mut(id.index()) {
            slot.desc = Some(leak(id, name, kind));
        }
    }
}
