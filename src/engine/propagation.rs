//! Dirty marking and lazy evaluation.
//!
//! Three passes run over the two edge kinds:
//!
//! - **dirty** travels downstream: outputs push to their connection
//!   targets, everything else pushes to its affected parameters.
//! - **aux dirty** travels upstream: inputs push to their connection
//!   sources, outputs push to their affecting parameters.
//! - **evaluation** pulls: inputs evaluate their connection sources and
//!   collect the results, other parameters evaluate their dirty affecting
//!   parameters first. Then the bound callbacks run and both flags clear.
//!
//! Every pass keeps its own stack. Reaching a parameter that is already on
//! the stack is a cycle and aborts the pass with
//! `EngineError::CyclicDependency`; a stack deeper than the configured limit
//! aborts with `EngineError::PropagationDepthExceeded`.

use crate::engine::callback::{CallbackKind, NodeContext};
use crate::engine::event::ParameterEvent;
use crate::engine::id::{ConnectionId, ParameterId};
use crate::engine::network::Network;
use crate::engine::types::PinType;
use crate::engine::value::Value;
use crate::error::{EngineError, EngineResult};
use std::collections::HashSet;

/// Traversal state of one propagation pass.
struct Pass {
    stack: Vec<ParameterId>,
    visited: HashSet<ParameterId>,
    limit: usize,
}

impl Pass {
    fn new(limit: usize) -> Self {
        Self {
            stack: Vec::new(),
            visited: HashSet::new(),
            limit,
        }
    }

    fn on_stack(&self, id: ParameterId) -> Option<usize> {
        self.stack.iter().position(|p| *p == id)
    }
}

impl Network {
    fn cycle_on_stack(&self, pass: &Pass, start: usize, id: ParameterId) -> EngineError {
        let path = pass.stack[start..]
            .iter()
            .chain(std::iter::once(&id))
            .map(|p| self.path(*p))
            .collect();
        EngineError::CyclicDependency { path }
    }

    fn check_depth(&self, pass: &Pass, id: ParameterId) -> EngineResult<()> {
        if pass.stack.len() >= pass.limit {
            return Err(EngineError::PropagationDepthExceeded {
                limit: pass.limit,
                parameter: self.path(id),
            });
        }
        Ok(())
    }

    /// Sources of the connections that end in `id`, in connection-id order.
    fn incoming_sources(&self, id: ParameterId) -> Vec<ParameterId> {
        self.incoming(id).into_iter().filter_map(|(_, s)| s).collect()
    }

    fn incoming(&self, id: ParameterId) -> Vec<(ConnectionId, Option<ParameterId>)> {
        let Some(slot) = self.slot(id) else {
            return Vec::new();
        };
        slot.connections
            .iter()
            .filter_map(|c| self.connections.get(c))
            .filter(|c| c.target() == Some(id))
            .map(|c| (c.id(), c.source()))
            .collect()
    }

    fn outgoing_targets(&self, id: ParameterId) -> Vec<ParameterId> {
        let Some(slot) = self.slot(id) else {
            return Vec::new();
        };
        slot.connections
            .iter()
            .filter_map(|c| self.connections.get(c))
            .filter(|c| c.source() == Some(id))
            .filter_map(|c| c.target())
            .collect()
    }

    // ── Dirty ──

    /// Mark `id` dirty (or, with `set_first_true == false`, clean) and push
    /// dirtiness to everything downstream of it.
    ///
    /// A self-evaluating input is evaluated on the spot instead of waiting
    /// for a consumer to pull it.
    pub fn propagate_dirty(&mut self, id: ParameterId, set_first_true: bool) -> EngineResult<()> {
        let mut pass = Pass::new(self.config.max_propagation_depth);
        self.dirty_step(id, set_first_true, &mut pass)
    }

    fn dirty_step(&mut self, id: ParameterId, set_dirty: bool, pass: &mut Pass) -> EngineResult<()> {
        if let Some(start) = pass.on_stack(id) {
            return Err(self.cycle_on_stack(pass, start, id));
        }
        if !pass.visited.insert(id) {
            return Ok(());
        }
        self.check_depth(pass, id)?;

        pass.stack.push(id);
        let result = self.mark_dirty(id, set_dirty, pass);
        pass.stack.pop();
        result
    }

    fn mark_dirty(&mut self, id: ParameterId, set_dirty: bool, pass: &mut Pass) -> EngineResult<()> {
        let slot = self.require_mut(id)?;
        let pin_type = slot.parameter.pin_type;
        if slot.parameter.self_evaluating && pin_type == PinType::Input {
            slot.parameter.dirty = true;
            self.propagate_evaluation(id)?;
        } else {
            slot.parameter.dirty = set_dirty;
        }

        if self.is_dirty(id) {
            self.emit(ParameterEvent::Dirtied { parameter: id });
        }

        let next = match pin_type {
            PinType::Output => self.outgoing_targets(id),
            PinType::Input | PinType::None => self.affected_parameters(id).to_vec(),
        };
        for downstream in next {
            self.dirty_step(downstream, true, pass)?;
        }
        Ok(())
    }

    // ── Aux dirty ──

    /// Mark `id` aux-dirty and push the flag toward the parameters whose
    /// recomputation produces it.
    pub fn propagate_aux_dirty(&mut self, id: ParameterId) -> EngineResult<()> {
        let mut pass = Pass::new(self.config.max_propagation_depth);
        self.aux_dirty_step(id, &mut pass)
    }

    fn aux_dirty_step(&mut self, id: ParameterId, pass: &mut Pass) -> EngineResult<()> {
        if let Some(start) = pass.on_stack(id) {
            return Err(self.cycle_on_stack(pass, start, id));
        }
        if !pass.visited.insert(id) {
            return Ok(());
        }
        self.check_depth(pass, id)?;

        let slot = self.require_mut(id)?;
        slot.parameter.aux_dirty = true;
        let pin_type = slot.parameter.pin_type;
        let next = match pin_type {
            PinType::Input => self.incoming_sources(id),
            PinType::Output => self.affecting_parameters(id).to_vec(),
            PinType::None => Vec::new(),
        };

        pass.stack.push(id);
        let result = next
            .into_iter()
            .try_for_each(|upstream| self.aux_dirty_step(upstream, pass));
        pass.stack.pop();
        result
    }

    // ── Evaluation ──

    /// Bring `id` up to date by pulling from everything it depends on, then
    /// run its processing callbacks and clear both flags.
    pub fn propagate_evaluation(&mut self, id: ParameterId) -> EngineResult<()> {
        let mut pass = Pass::new(self.config.max_propagation_depth);
        self.evaluation_step(id, &mut pass)
    }

    fn evaluation_step(&mut self, id: ParameterId, pass: &mut Pass) -> EngineResult<()> {
        if let Some(start) = pass.on_stack(id) {
            return Err(self.cycle_on_stack(pass, start, id));
        }
        let slot = self.require(id)?;
        if slot.evaluating {
            // Re-entered from one of its own callbacks: the caller sees the
            // current value.
            tracing::trace!("Skipping re-entrant evaluation of {}", self.path(id));
            return Ok(());
        }
        let p = &slot.parameter;
        if !(p.dirty || p.aux_dirty || p.self_evaluating) {
            return Ok(());
        }
        self.check_depth(pass, id)?;

        pass.stack.push(id);
        self.require_mut(id)?.evaluating = true;
        let result = self.evaluate(id, pass);
        if let Some(slot) = self.slot_mut(id) {
            slot.evaluating = false;
        }
        pass.stack.pop();
        result
    }

    fn evaluate(&mut self, id: ParameterId, pass: &mut Pass) -> EngineResult<()> {
        let slot = self.require_mut(id)?;
        if slot.parameter.pin_type == PinType::Input {
            if slot.parameter.dirty {
                slot.parameter.value_list.clear();
            }
            for (index, (_, source)) in self.incoming(id).into_iter().enumerate() {
                let Some(source) = source else {
                    continue;
                };
                self.evaluation_step(source, pass)?;
                if !self.is_dirty(id) {
                    continue;
                }
                let value = self.value(source).cloned().unwrap_or_default();
                self.require_mut(id)?.parameter.value_list.push(value.clone());
                if index == 0 {
                    self.set_value(id, value, false)?;
                }
            }
        } else {
            let affecting = self.affecting_parameters(id).to_vec();
            for upstream in affecting {
                if self.is_dirty(upstream) || self.is_aux_dirty(upstream) {
                    self.evaluation_step(upstream, pass)?;
                }
            }
        }

        if self.is_dirty(id) {
            self.invoke_callback(id, CallbackKind::Processing)?;
        }
        if self.is_aux_dirty(id) {
            self.invoke_callback(id, CallbackKind::AuxProcessing)?;
        }
        self.run_node_process(id)?;

        if let Some(slot) = self.slot_mut(id) {
            slot.parameter.dirty = false;
            slot.parameter.aux_dirty = false;
        }
        Ok(())
    }

    fn run_node_process(&mut self, id: ParameterId) -> EngineResult<()> {
        let Some(slot) = self.slot(id) else {
            return Ok(());
        };
        let Some(node) = slot.node else {
            return Ok(());
        };
        let name = slot.parameter.name.clone();
        let Some(behavior) = self.behavior(node) else {
            return Ok(());
        };
        let mut ctx = NodeContext::new(self, node, Some(id));
        if !behavior.process(&mut ctx, &name)? {
            tracing::debug!("Node processing of \"{}\" reported no result", name);
        }
        Ok(())
    }

    // ── Accessors ──

    /// The scalar value. With `trigger_evaluation` a pin parameter is
    /// brought up to date first.
    pub fn get_value(&mut self, id: ParameterId, trigger_evaluation: bool) -> EngineResult<Value> {
        self.pull_if_pin(id, trigger_evaluation)?;
        Ok(self.require(id)?.parameter.value.clone())
    }

    /// Values collected from every incoming connection during the last pull.
    pub fn get_value_list(&mut self, id: ParameterId, trigger_evaluation: bool) -> EngineResult<Vec<Value>> {
        self.pull_if_pin(id, trigger_evaluation)?;
        Ok(self.require(id)?.parameter.value_list.clone())
    }

    /// All values of a parameter: the collected connection values of a
    /// multi-connection input, the components of a multi-valued parameter,
    /// or the single value.
    pub fn get_values(&mut self, id: ParameterId, trigger_evaluation: bool) -> EngineResult<Vec<Value>> {
        self.pull_if_pin(id, trigger_evaluation)?;
        let p = &self.require(id)?.parameter;
        if p.pin_type == PinType::Input && p.multiplicity.is_multiple() && !p.value_list.is_empty() {
            return Ok(p.value_list.clone());
        }
        if p.size > 1 {
            return Ok(p.value.components());
        }
        Ok(vec![p.value.clone()])
    }

    fn pull_if_pin(&mut self, id: ParameterId, trigger_evaluation: bool) -> EngineResult<()> {
        let pin_type = self.require(id)?.parameter.pin_type;
        if trigger_evaluation && pin_type.is_pin() {
            self.propagate_evaluation(id)?;
        }
        Ok(())
    }

    // ── Mutators ──

    /// Store a new value. Equal values are ignored entirely. Only with
    /// `trigger_dirtying` does the change dirty downstream parameters.
    pub fn set_value(&mut self, id: ParameterId, value: Value, trigger_dirtying: bool) -> EngineResult<()> {
        let slot = self.require_mut(id)?;
        if slot.parameter.value == value {
            return Ok(());
        }
        slot.parameter.value = value;
        self.emit(ParameterEvent::ValueChanged {
            parameter: id,
            index: None,
        });
        if trigger_dirtying {
            self.propagate_dirty(id, true)?;
        }
        Ok(())
    }

    /// Store several values at once. A single value degrades to `set_value`.
    pub fn set_values(&mut self, id: ParameterId, values: Vec<Value>, trigger_dirtying: bool) -> EngineResult<()> {
        match values.len() {
            0 => Ok(()),
            1 => {
                let value = values.into_iter().next().unwrap_or_default();
                self.set_value(id, value, trigger_dirtying)
            }
            len => {
                let packed = Value::pack(values);
                let slot = self.require_mut(id)?;
                if slot.parameter.value == packed {
                    return Ok(());
                }
                slot.parameter.value = packed;
                slot.parameter.size = len;
                self.emit(ParameterEvent::ValueChanged {
                    parameter: id,
                    index: None,
                });
                if trigger_dirtying {
                    self.propagate_dirty(id, true)?;
                }
                Ok(())
            }
        }
    }

    /// Replace one element of a multi-valued parameter. Out-of-range
    /// indices and single-valued parameters are logged and left untouched.
    pub fn set_value_at(
        &mut self,
        id: ParameterId,
        index: usize,
        value: Value,
        trigger_dirtying: bool,
    ) -> EngineResult<()> {
        let path = self.path(id);
        let slot = self.require_mut(id)?;
        let changed = match &mut slot.parameter.value {
            Value::Vector3(v) => {
                let Some(component) = v.get_mut(index) else {
                    tracing::error!("Index {} is out of range for \"{}\" of size 3.", index, path);
                    return Ok(());
                };
                let Some(f) = value.as_float() else {
                    tracing::error!("The value for \"{}[{}]\" is not a number.", path, index);
                    return Ok(());
                };
                let changed = *component != f;
                *component = f;
                changed
            }
            Value::List(values) => {
                let len = values.len();
                let Some(element) = values.get_mut(index) else {
                    tracing::error!("Index {} is out of range for \"{}\" of size {}.", index, path, len);
                    return Ok(());
                };
                let changed = *element != value;
                *element = value;
                changed
            }
            _ => {
                tracing::error!("Parameter \"{}\" does not contain a list of values.", path);
                return Ok(());
            }
        };
        if changed {
            self.emit(ParameterEvent::ValueChanged {
                parameter: id,
                index: Some(index),
            });
            if trigger_dirtying {
                self.propagate_dirty(id, true)?;
            }
        }
        Ok(())
    }

    /// Restore the default value and size, then dirty unconditionally.
    pub fn reset(&mut self, id: ParameterId) -> EngineResult<()> {
        let default_value = self.require(id)?.parameter.default_value.clone();
        let size = default_value.component_count();
        self.set_value(id, default_value, false)?;
        self.require_mut(id)?.parameter.size = size;
        self.propagate_dirty(id, true)
    }

    /// Apply an interactive edit: store and dirty, then run the change
    /// function.
    pub fn apply_edit(&mut self, id: ParameterId, value: Value) -> EngineResult<()> {
        self.set_value(id, value, true)?;
        self.execute_change(id)
    }
}
