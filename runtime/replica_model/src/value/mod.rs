//! Runtime values.
//!
//! A [`Value`] is what a field slot, array element or local holds. Scalars
//! and structs are stored inline and copied on assignment; everything with
//! reference identity is either a shared immutable string or an [`ObjRef`]
//! into a [`Heap`](crate::Heap).

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::heap::ObjRef;
use crate::registry::{registry, Primitive, TypeKind};
use crate::TypeId;

/// Point in time as microseconds since the Unix epoch.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime(pub i64);

impl DateTime {
    pub const MIN: DateTime = DateTime(i64::MIN);
    pub const UNIX_EPOCH: DateTime = DateTime(0);

    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        DateTime(micros)
    }

    #[inline]
    pub const fn micros(self) -> i64 {
        self.0
    }
}

/// Inline value-type instance.
#[derive(Clone, Debug, PartialEq)]
pub struct StructValue {
    ty: TypeId,
    fields: Box<[Value]>,
}

impl StructValue {
    pub fn new(ty: TypeId, fields: impl Into<Box<[Value]>>) -> Self {
        StructValue {
            ty,
            fields: fields.into(),
        }
    }

    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    #[inline]
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    #[inline]
    pub fn fields_mut(&mut self) -> &mut [Value] {
        &mut self.fields
    }

    /// Field by name, resolved through the registry.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let index = registry().lookup(self.ty)?.field_index(name)?;
        self.fields.get(index)
    }

    /// Overwrite a field by name. Returns `false` if there is no such field.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        let Some(index) = registry()
            .lookup(self.ty)
            .and_then(|desc| desc.field_index(name))
        else {
            return false;
        };
        match self.fields.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// A runtime value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absent reference.
    #[default]
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    DateTime(DateTime),
    /// Signed machine-word handle.
    ISize(isize),
    /// Unsigned machine-word handle.
    USize(usize),
    /// Shared immutable string. Identity is the allocation.
    Str(Arc<str>),
    Enum {
        ty: TypeId,
        value: i64,
    },
    /// Raw pointer: copied blindly, never followed.
    Pointer {
        ty: TypeId,
        addr: usize,
    },
    Struct(StructValue),
    /// Reference to a heap object.
    Ref(ObjRef),
}

impl Value {
    #[inline]
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn as_obj(&self) -> Option<ObjRef> {
        match self {
            Value::Ref(r) => Some(*r),
            _ => None,
        }
    }

    #[inline]
    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Reference identity: same heap object, or same string allocation.
    ///
    /// Inline values have no identity and never compare identical, except
    /// `Null` with itself.
    pub fn same_identity(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Type of an inline value.
    ///
    /// `None` for `Null` and for heap references; a reference's type lives
    /// on its object (see [`Heap::value_type`](crate::Heap::value_type)).
    pub fn inline_type(&self) -> Option<TypeId> {
        let id = match self {
            Value::Null | Value::Ref(_) => return None,
            Value::Bool(_) => TypeId::BOOL,
            Value::Char(_) => TypeId::CHAR,
            Value::I8(_) => TypeId::I8,
            Value::I16(_) => TypeId::I16,
            Value::I32(_) => TypeId::I32,
            Value::I64(_) => TypeId::I64,
            Value::U8(_) => TypeId::U8,
            Value::U16(_) => TypeId::U16,
            Value::U32(_) => TypeId::U32,
            Value::U64(_) => TypeId::U64,
            Value::F32(_) => TypeId::F32,
            Value::F64(_) => TypeId::F64,
            Value::DateTime(_) => TypeId::DATETIME,
            Value::ISize(_) => TypeId::ISIZE,
            Value::USize(_) => TypeId::USIZE,
            Value::Str(_) => TypeId::STR,
            Value::Enum { ty, .. } | Value::Pointer { ty, .. } => *ty,
            Value::Struct(s) => s.ty,
        };
        Some(id)
    }

    /// Zero value of `ty`: numeric zero, `Null` for references, and a
    /// struct of zero values for value types.
    pub fn default_for(ty: TypeId) -> Value {
        let mut in_progress = SmallVec::new();
        Self::default_guarded(ty, &mut in_progress)
    }

    fn default_guarded(ty: TypeId, in_progress: &mut SmallVec<[TypeId; 8]>) -> Value {
        let Some(desc) = registry().lookup(ty) else {
            return Value::Null;
        };
        match desc.kind() {
            TypeKind::Primitive(p) => Self::default_primitive(*p),
            TypeKind::Enum { .. } => Value::Enum { ty, value: 0 },
            TypeKind::Pointer { .. } => Value::Pointer { ty, addr: 0 },
            TypeKind::Struct { fields } => {
                // A struct that contains itself has no finite layout.
                if in_progress.contains(&ty) {
                    return Value::Null;
                }
                in_progress.push(ty);
                let values: Vec<Value> = fields
                    .iter()
                    .map(|f| Self::default_guarded(f.ty, in_progress))
                    .collect();
                in_progress.pop();
                Value::Struct(StructValue::new(ty, values))
            }
            TypeKind::Object
            | TypeKind::Class(_)
            | TypeKind::Tuple { .. }
            | TypeKind::Array(_)
            | TypeKind::Interface => Value::Null,
        }
    }

    fn default_primitive(p: Primitive) -> Value {
        match p {
            Primitive::Bool => Value::Bool(false),
            Primitive::Char => Value::Char('\0'),
            Primitive::I8 => Value::I8(0),
            Primitive::I16 => Value::I16(0),
            Primitive::I32 => Value::I32(0),
            Primitive::I64 => Value::I64(0),
            Primitive::U8 => Value::U8(0),
            Primitive::U16 => Value::U16(0),
            Primitive::U32 => Value::U32(0),
            Primitive::U64 => Value::U64(0),
            Primitive::F32 => Value::F32(0.0),
            Primitive::F64 => Value::F64(0.0),
            Primitive::DateTime => Value::DateTime(DateTime::default()),
            Primitive::ISize => Value::ISize(0),
            Primitive::USize => Value::USize(0),
            Primitive::Str => Value::Null,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<ObjRef> for Value {
    fn from(r: ObjRef) -> Self {
        Value::Ref(r)
    }
}

impl From<StructValue> for Value {
    fn from(s: StructValue) -> Self {
        Value::Struct(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v:?}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "@{}us", v.0),
            Value::ISize(v) => write!(f, "{v:#x}"),
            Value::USize(v) => write!(f, "{v:#x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Enum { ty, value } => write!(f, "{ty}::{value}"),
            Value::Pointer { addr, .. } => write!(f, "*{addr:#x}"),
            Value::Struct(s) => write!(f, "{}{{..}}", s.ty),
            Value::Ref(r) => write!(f, "{r:?}"),
        }
    }
}
