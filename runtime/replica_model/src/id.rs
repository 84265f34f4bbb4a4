//! Runtime type handle.
//!
//! `TypeId` is the identity of a runtime type. Every descriptor in the
//! registry is addressed by one, and type identity is index equality.
//!
//! Primitive leaf types and the `object` root are registered at fixed
//! indices so they can be recognised without touching the registry.

use std::fmt;

/// A 32-bit handle into the process-wide type registry.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // === Primitive leaf types (indices 0-15) ===

    /// `bool`.
    pub const BOOL: Self = Self(0);
    /// `char` (Unicode scalar value).
    pub const CHAR: Self = Self(1);
    /// `i8`.
    pub const I8: Self = Self(2);
    /// `i16`.
    pub const I16: Self = Self(3);
    /// `i32`.
    pub const I32: Self = Self(4);
    /// `i64`.
    pub const I64: Self = Self(5);
    /// `u8`.
    pub const U8: Self = Self(6);
    /// `u16`.
    pub const U16: Self = Self(7);
    /// `u32`.
    pub const U32: Self = Self(8);
    /// `u64`.
    pub const U64: Self = Self(9);
    /// `f32`.
    pub const F32: Self = Self(10);
    /// `f64`.
    pub const F64: Self = Self(11);
    /// Point in time, stored as microseconds since the Unix epoch.
    pub const DATETIME: Self = Self(12);
    /// Signed machine-word handle.
    pub const ISIZE: Self = Self(13);
    /// Unsigned machine-word handle.
    pub const USIZE: Self = Self(14);
    /// Immutable shared string.
    pub const STR: Self = Self(15);

    /// Root of the reference-type hierarchy. Usable as a declared field
    /// type that may hold any value.
    pub const OBJECT: Self = Self(16);

    // === Reserved Range (17-63) ===

    /// First index handed out to user-defined and derived types.
    pub const FIRST_DYNAMIC: u32 = 64;

    /// Number of pre-registered primitive leaf types.
    pub const PRIMITIVE_COUNT: u32 = 16;

    /// Sentinel value indicating no type.
    pub const NONE: Self = Self(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is one of the pre-registered primitive leaf types.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::PRIMITIVE_COUNT
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Human-readable name for the fixed-index types.
    ///
    /// Dynamic types need the registry to render their names.
    pub const fn builtin_name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("bool"),
            1 => Some("char"),
            2 => Some("i8"),
            3 => Some("i16"),
            4 => Some("i32"),
            5 => Some("i64"),
            6 => Some("u8"),
            7 => Some("u16"),
            8 => Some("u32"),
            9 => Some("u64"),
            10 => Some("f32"),
            11 => Some("f64"),
            12 => Some("datetime"),
            13 => Some("isize"),
            14 => Some("usize"),
            15 => Some("str"),
            16 => Some("object"),
            _ => None,
        }
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.builtin_name() {
            Some(name) => write!(f, "TypeId::{name}"),
            None if self.is_none() => write!(f, "TypeId::NONE"),
            None => write!(f, "TypeId({})", self.0),
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.builtin_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "#{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests;
