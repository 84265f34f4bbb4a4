//! Graph traversal.
//!
//! A [`CloneRun`] is one top-level clone call: it owns the identity map
//! and interprets cached [`CloneStrategy`] values against the heap.
//! Reference-typed slots are dispatched on the runtime type of the object
//! they hold, never on the declared type of the slot.
//!
//! Every new reference-type copy is registered in the identity map before
//! its own slots are filled, so shared and cyclic references in the source
//! resolve to the same copy.

use replica_model::{Heap, ObjRef, StructValue, Value};

use crate::stack::ensure_sufficient_stack;
use crate::state::CloneState;
use crate::strategy::{strategy_for, Action, CloneStrategy, FieldPlan};
use crate::CloneError;

/// One deep clone call over `heap`.
pub(crate) struct CloneRun<'h> {
    pub(crate) heap: &'h mut Heap,
    pub(crate) state: CloneState,
}

impl<'h> CloneRun<'h> {
    pub(crate) fn new(heap: &'h mut Heap) -> Self {
        CloneRun {
            heap,
            state: CloneState::new(),
        }
    }

    /// Deep-clone any value.
    pub(crate) fn clone_value(&mut self, value: &Value) -> Result<Value, CloneError> {
        match value {
            Value::Ref(r) => self.clone_ref(*r).map(Value::Ref),
            Value::Struct(s) => self.clone_struct(s).map(Value::Struct),
            other => Ok(other.clone()),
        }
    }

    /// Deep-clone a heap object, reusing the copy if it was already made
    /// during this run.
    pub(crate) fn clone_ref(&mut self, from: ObjRef) -> Result<ObjRef, CloneError> {
        let strategy = strategy_for(self.heap.type_of(from));
        if matches!(*strategy, CloneStrategy::PassThrough) {
            return Ok(from);
        }
        if let Some(known) = self.state.known(from) {
            return Ok(known);
        }
        ensure_sufficient_stack(|| self.run(from, &strategy))
    }

    /// Deep-clone an inline value type. Structs carry no identity.
    pub(crate) fn clone_struct(&mut self, from: &StructValue) -> Result<StructValue, CloneError> {
        let strategy = strategy_for(from.ty());
        let CloneStrategy::Struct(plan) = &*strategy else {
            return Ok(from.clone());
        };
        let mut fields = Vec::with_capacity(from.fields().len());
        for (i, value) in from.fields().iter().enumerate() {
            fields.push(self.apply(plan.action(i), value)?);
        }
        Ok(StructValue::new(from.ty(), fields))
    }

    fn run(&mut self, from: ObjRef, strategy: &CloneStrategy) -> Result<ObjRef, CloneError> {
        let ty = self.heap.type_of(from);
        match strategy {
            CloneStrategy::Object(plan) => {
                let to = self.heap.allocate_raw(ty)?;
                self.state.record(from, to);
                self.fill_fields(from, to, plan, false)?;
                Ok(to)
            }
            CloneStrategy::Rebind(plan) => {
                let to = self.heap.shallow_copy(from)?;
                self.state.record(from, to);
                self.fill_fields(from, to, plan, true)?;
                Ok(to)
            }
            CloneStrategy::Tuple => {
                let components = self.heap.fields(from).to_vec();
                let to = self.heap.new_tuple(ty, components)?;
                self.state.record(from, to);
                Ok(to)
            }
            CloneStrategy::Vector(action) => self.clone_vector(from, *action),
            CloneStrategy::Matrix(action) => self.clone_matrix(from, *action),
            CloneStrategy::Array(action) => self.clone_array(from, *action),
            // Structs are never heap objects; a mismatched strategy leaves
            // the reference shared.
            CloneStrategy::PassThrough | CloneStrategy::Struct(_) => Ok(from),
        }
    }

    /// Write every slot of `from` into `to` according to `plan`.
    ///
    /// With `skip_copies`, slots whose action is [`Action::Copy`] are left
    /// alone; the target already holds them.
    pub(crate) fn fill_fields(
        &mut self,
        from: ObjRef,
        to: ObjRef,
        plan: &FieldPlan,
        skip_copies: bool,
    ) -> Result<(), CloneError> {
        let source = self.heap.fields(from).to_vec();
        for (i, value) in source.iter().enumerate() {
            let action = plan.action(i);
            if skip_copies && action == Action::Copy {
                continue;
            }
            let cloned = self.apply(action, value)?;
            self.heap.write_field_raw(to, i, cloned)?;
        }
        Ok(())
    }

    /// Produce the copy of one slot value.
    pub(crate) fn apply(&mut self, action: Action, value: &Value) -> Result<Value, CloneError> {
        match (action, value) {
            (Action::Copy, _) | (_, Value::Null) => Ok(value.clone()),
            (Action::Struct, Value::Struct(s)) => self.clone_struct(s).map(Value::Struct),
            (Action::Struct | Action::Track, _) => self.clone_value(value),
        }
    }
}
