//! Per-call identity map.
//!
//! Maps source objects to the clones already produced for them within one
//! top-level clone call. Lookups are by reference identity only.
//!
//! Most graphs have few shared or cyclic nodes, so the first mappings live
//! in a small inline buffer that is scanned linearly; later ones spill into
//! a hash map.

use replica_model::ObjRef;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Inline slot count before spilling to the map.
const INLINE_SLOTS: usize = 4;

/// Source-to-clone identity map for one clone call.
#[derive(Debug, Default)]
pub struct CloneState {
    recent: SmallVec<[(ObjRef, ObjRef); INLINE_SLOTS]>,
    overflow: FxHashMap<ObjRef, ObjRef>,
}

impl CloneState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The clone already produced for `from`, if any.
    #[inline]
    pub fn known(&self, from: ObjRef) -> Option<ObjRef> {
        if let Some(&(_, to)) = self.recent.iter().find(|(src, _)| *src == from) {
            return Some(to);
        }
        if self.overflow.is_empty() {
            return None;
        }
        self.overflow.get(&from).copied()
    }

    /// Record `to` as the clone of `from`.
    ///
    /// Each source is recorded at most once per call; callers check
    /// [`known`](Self::known) first.
    pub fn record(&mut self, from: ObjRef, to: ObjRef) {
        debug_assert!(self.known(from).is_none(), "{from:?} recorded twice");
        if self.recent.len() < INLINE_SLOTS {
            self.recent.push((from, to));
        } else {
            self.overflow.insert(from, to);
        }
    }

    /// Number of recorded mappings.
    #[inline]
    pub fn len(&self) -> usize {
        self.recent.len() + self.overflow.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}

#[cfg(test)]
mod tests;
