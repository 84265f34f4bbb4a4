//! Array strategies.
//!
//! Arrays are cloned to the same type, rank, per-dimension lengths and
//! lower bounds. The copy is registered before any element is cloned, so
//! an element referring back to its own array resolves to the copy.
//!
//! - Safe elements: the storage is copied in one block.
//! - Vectors (zero-based, one dimension): one pass over the elements.
//! - Rank 2: nested row/column loops.
//! - Everything else: a walk of the full index space in row-major order.

use replica_model::{ArrayStorage, Dims, HeapError, ObjRef, Value};
use smallvec::smallvec;

use crate::engine::CloneRun;
use crate::strategy::Action;
use crate::CloneError;

/// Row-major walk over `0..lengths[0] × 0..lengths[1] × …`.
///
/// Yields indices relative to each dimension's lower bound.
pub(crate) struct IndexSpace {
    lengths: Dims<usize>,
    next: Option<Dims<usize>>,
}

impl IndexSpace {
    pub(crate) fn new(lengths: &[usize]) -> Self {
        let next = if lengths.is_empty() || lengths.contains(&0) {
            None
        } else {
            Some(smallvec![0; lengths.len()])
        };
        IndexSpace {
            lengths: lengths.iter().copied().collect(),
            next,
        }
    }
}

impl Iterator for IndexSpace {
    type Item = Dims<usize>;

    fn next(&mut self) -> Option<Dims<usize>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for dim in (0..following.len()).rev() {
            following[dim] += 1;
            if following[dim] < self.lengths[dim] {
                self.next = Some(following);
                break;
            }
            following[dim] = 0;
        }
        Some(current)
    }
}

/// Translate a relative index into an array's own coordinates.
fn absolute(relative: &[usize], lower_bounds: &[isize]) -> Result<Dims<isize>, HeapError> {
    relative
        .iter()
        .zip(lower_bounds)
        .map(|(&rel, &lo)| {
            isize::try_from(rel)
                .ok()
                .and_then(|rel| lo.checked_add(rel))
        })
        .collect::<Option<Dims<isize>>>()
        .ok_or_else(|| HeapError::Shape("index outside the addressable range".to_owned()))
}

impl CloneRun<'_> {
    fn source_array(&self, from: ObjRef) -> Result<ArrayStorage, CloneError> {
        self.heap
            .array(from)
            .cloned()
            .ok_or(CloneError::Heap(HeapError::NotAnArray(from)))
    }

    /// Safe elements: duplicate the storage wholesale.
    fn block_copy(&mut self, from: ObjRef, storage: ArrayStorage) -> Result<ObjRef, CloneError> {
        let ty = self.heap.type_of(from);
        let to = self.heap.alloc_array(ty, storage)?;
        self.state.record(from, to);
        Ok(to)
    }

    /// Allocate a default-filled array shaped like `storage` and register it.
    fn allocate_like(&mut self, from: ObjRef, storage: &ArrayStorage) -> Result<ObjRef, CloneError> {
        let ty = self.heap.type_of(from);
        let to = self
            .heap
            .new_array(ty, storage.lengths(), storage.lower_bounds())?;
        self.state.record(from, to);
        Ok(to)
    }

    fn write_element(&mut self, to: ObjRef, offset: usize, value: Value) -> Result<(), CloneError> {
        let storage = self.heap.array_mut(to)?;
        if let Some(slot) = storage.elements_mut().get_mut(offset) {
            *slot = value;
        }
        Ok(())
    }

    pub(crate) fn clone_vector(&mut self, from: ObjRef, action: Action) -> Result<ObjRef, CloneError> {
        let storage = self.source_array(from)?;
        if action == Action::Copy {
            return self.block_copy(from, storage);
        }
        let to = self.allocate_like(from, &storage)?;
        for (offset, value) in storage.elements().iter().enumerate() {
            let cloned = self.apply(action, value)?;
            self.write_element(to, offset, cloned)?;
        }
        Ok(to)
    }

    pub(crate) fn clone_matrix(&mut self, from: ObjRef, action: Action) -> Result<ObjRef, CloneError> {
        let storage = self.source_array(from)?;
        if action == Action::Copy {
            return self.block_copy(from, storage);
        }
        let &[rows, cols] = storage.lengths() else {
            return self.clone_array(from, action);
        };
        let to = self.allocate_like(from, &storage)?;
        let elements = storage.elements();
        for row in 0..rows {
            for col in 0..cols {
                let offset = row * cols + col;
                let Some(value) = elements.get(offset) else {
                    continue;
                };
                let cloned = self.apply(action, value)?;
                self.write_element(to, offset, cloned)?;
            }
        }
        Ok(to)
    }

    pub(crate) fn clone_array(&mut self, from: ObjRef, action: Action) -> Result<ObjRef, CloneError> {
        let storage = self.source_array(from)?;
        if action == Action::Copy {
            return self.block_copy(from, storage);
        }
        let to = self.allocate_like(from, &storage)?;
        for relative in IndexSpace::new(storage.lengths()) {
            let index = absolute(&relative, storage.lower_bounds())?;
            let Some(value) = storage.get(&index) else {
                continue;
            };
            let cloned = self.apply(action, value)?;
            self.heap.set_element(to, &index, cloned)?;
        }
        Ok(to)
    }

    /// Copy the region `from` and `to` share into `to`.
    ///
    /// Both arrays have the same rank. The region spans the smaller length
    /// in every dimension, counted from each array's own lower bound;
    /// target elements outside it are untouched.
    pub(crate) fn copy_overlap(
        &mut self,
        from: ObjRef,
        to: ObjRef,
        action: Action,
    ) -> Result<(), CloneError> {
        let source = self.source_array(from)?;
        let target = self
            .heap
            .array(to)
            .ok_or(CloneError::Heap(HeapError::NotAnArray(to)))?;
        let lengths: Dims<usize> = source
            .lengths()
            .iter()
            .zip(target.lengths())
            .map(|(&a, &b)| a.min(b))
            .collect();
        let target_bounds: Dims<isize> = target.lower_bounds().iter().copied().collect();

        for relative in IndexSpace::new(&lengths) {
            let source_index = absolute(&relative, source.lower_bounds())?;
            let target_index = absolute(&relative, &target_bounds)?;
            let Some(value) = source.get(&source_index) else {
                continue;
            };
            let cloned = self.apply(action, value)?;
            self.heap.set_element(to, &target_index, cloned)?;
        }
        Ok(())
    }
}
