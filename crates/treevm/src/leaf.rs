//! Contracts implemented by pluggable leaf kinds.
//!
//! A leaf never touches the graph directly. `Process::run` requests effects
//! through a [`LeafContext`]; the event loop applies them, in request order,
//! once `run` has returned. A leaf can therefore be re-entered by its own
//! output (a cyclic specification) without aliasing itself.

use std::time::Duration;

use crate::error::LeafError;
use crate::value::Value;

/// Leaf with a side-effecting `run`, invoked on every input.
pub trait Process {
    fn run(&mut self, cx: &mut LeafContext<'_>) -> Result<(), LeafError>;
}

/// Leaf answering a synchronous boolean question about an input.
///
/// Used as a gate/switch condition, `test` is read directly. Used as an ordinary
/// node, its result is emitted as `Value::Bool`.
pub trait Condition {
    fn test(&self, input: &Value, state: Option<&Value>) -> Result<bool, LeafError>;
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Effect {
    Emit(Value),
    EmitAfter(Duration, Value),
    Render(Value),
}

/// View of a node handed to `Process::run`.
pub struct LeafContext<'a> {
    input: &'a Value,
    state: &'a mut Option<Value>,
    effects: &'a mut Vec<Effect>,
}

impl<'a> LeafContext<'a> {
    pub(crate) fn new(
        input: &'a Value,
        state: &'a mut Option<Value>,
        effects: &'a mut Vec<Effect>,
    ) -> Self {
        Self {
            input,
            state,
            effects,
        }
    }

    /// The value that triggered this run.
    pub fn input(&self) -> &Value {
        self.input
    }

    /// Current state cell; `None` until the state subtree (if any) has emitted.
    pub fn state(&self) -> Option<&Value> {
        self.state.as_ref()
    }

    /// Overwrite the state cell. Visible to later runs and to the rest of this one.
    pub fn set_state(&mut self, value: Value) {
        *self.state = Some(value);
    }

    /// Fan `value` out to this node's listeners once `run` returns.
    pub fn emit(&mut self, value: Value) {
        self.effects.push(Effect::Emit(value));
    }

    /// Fan `value` out after `delay` of graph time, as a separate task.
    /// A zero delay still defers to a later tick.
    pub fn emit_after(&mut self, delay: Duration, value: Value) {
        self.effects.push(Effect::EmitAfter(delay, value));
    }

    /// Hand `value` to the graph's render log.
    pub fn render(&mut self, value: Value) {
        self.effects.push(Effect::Render(value));
    }
}
