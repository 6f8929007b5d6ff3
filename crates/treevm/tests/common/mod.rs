//! Leaves used by the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use treevm::{Condition, LeafContext, LeafError, Process, Registry, Value};

#[derive(Debug, thiserror::Error)]
#[error("boom")]
pub struct Boom;

/// Emits its input.
pub struct Get;

impl Process for Get {
    fn run(&mut self, cx: &mut LeafContext<'_>) -> Result<(), LeafError> {
        let input = cx.input().clone();
        cx.emit(input);
        Ok(())
    }
}

/// Emits `input + state`.
pub struct Add;

impl Process for Add {
    fn run(&mut self, cx: &mut LeafContext<'_>) -> Result<(), LeafError> {
        let input = cx.input().as_number().ok_or("add input must be a number")?;
        let state = cx
            .state()
            .and_then(Value::as_number)
            .ok_or("add state must be a number")?;
        cx.emit(Value::Number(input + state));
        Ok(())
    }
}

pub struct Fail;

impl Process for Fail {
    fn run(&mut self, _cx: &mut LeafContext<'_>) -> Result<(), LeafError> {
        Err(Boom.into())
    }
}

/// `input < state`, counting every evaluation.
pub struct Under {
    calls: Rc<Cell<usize>>,
}

impl Condition for Under {
    fn test(&self, input: &Value, state: Option<&Value>) -> Result<bool, LeafError> {
        self.calls.set(self.calls.get() + 1);
        match (input.as_number(), state.and_then(Value::as_number)) {
            (Some(input), Some(limit)) => Ok(input < limit),
            _ => Err("under compares numbers".into()),
        }
    }
}

/// Evaluation counters for the `first`, `second` and `third` conditions.
#[derive(Default, Clone)]
pub struct Calls {
    pub first: Rc<Cell<usize>>,
    pub second: Rc<Cell<usize>>,
    pub third: Rc<Cell<usize>>,
}

/// Registry with `get`, `add`, `fail` and the counting `under` conditions
/// `first`, `second` and `third`.
pub fn registry() -> (Registry, Calls) {
    let calls = Calls::default();
    let mut registry = Registry::new();
    registry.register_process("get", |_| Ok(Get)).unwrap();
    registry.register_process("add", |_| Ok(Add)).unwrap();
    registry.register_process("fail", |_| Ok(Fail)).unwrap();

    let first = calls.first.clone();
    registry
        .register_condition("first", move |_| Ok(Under { calls: first.clone() }))
        .unwrap();
    let second = calls.second.clone();
    registry
        .register_condition("second", move |_| Ok(Under { calls: second.clone() }))
        .unwrap();
    let third = calls.third.clone();
    registry
        .register_condition("third", move |_| Ok(Under { calls: third.clone() }))
        .unwrap();
    (registry, calls)
}

pub fn numbers(values: &[f64]) -> Vec<Value> {
    values.iter().copied().map(Value::Number).collect()
}
