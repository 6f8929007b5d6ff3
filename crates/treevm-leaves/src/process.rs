//! Process leaves: each reacts to every input it receives.

use std::time::Duration;

use tracing::info;
use treevm::{LeafContext, LeafError, Process, Value};

use crate::error::LeafValueError;

pub const RENDER_TARGET: &str = "treevm::render";

fn number(leaf: &'static str, role: &'static str, value: &Value) -> Result<f64, LeafValueError> {
    value.as_number().ok_or(LeafValueError::NotANumber {
        leaf,
        role,
        found: value.type_name(),
    })
}

fn state<'a>(leaf: &'static str, cx: &'a LeafContext<'_>) -> Result<&'a Value, LeafValueError> {
    cx.state().ok_or(LeafValueError::MissingState(leaf))
}

/// `input + state`.
#[derive(Debug, Default)]
pub struct Add;

impl Process for Add {
    fn run(&mut self, cx: &mut LeafContext<'_>) -> Result<(), LeafError> {
        let input = number("add", "input", cx.input())?;
        let addend = number("add", "state", state("add", cx)?)?;
        cx.emit(Value::Number(input + addend));
        Ok(())
    }
}

/// Re-emits its input after `state` milliseconds of graph time.
#[derive(Debug, Default)]
pub struct Delay;

impl Process for Delay {
    fn run(&mut self, cx: &mut LeafContext<'_>) -> Result<(), LeafError> {
        let ms = number("delay", "state", state("delay", cx)?)?;
        let delay =
            Duration::try_from_secs_f64(ms / 1000.0).map_err(|_| LeafValueError::InvalidDelay(ms))?;
        let input = cx.input().clone();
        cx.emit_after(delay, input);
        Ok(())
    }
}

/// Identity.
#[derive(Debug, Default)]
pub struct Get;

impl Process for Get {
    fn run(&mut self, cx: &mut LeafContext<'_>) -> Result<(), LeafError> {
        let input = cx.input().clone();
        cx.emit(input);
        Ok(())
    }
}

/// Emits its state whenever any input arrives. Registered as both `pass` and `set`.
#[derive(Debug)]
pub struct EmitState {
    kind: &'static str,
}

impl EmitState {
    pub fn pass() -> Self {
        Self { kind: "pass" }
    }

    pub fn set() -> Self {
        Self { kind: "set" }
    }
}

impl Process for EmitState {
    fn run(&mut self, cx: &mut LeafContext<'_>) -> Result<(), LeafError> {
        let value = state(self.kind, cx)?.clone();
        cx.emit(value);
        Ok(())
    }
}

/// Hands its input to the render log. Emits nothing.
#[derive(Debug, Default)]
pub struct Render;

impl Process for Render {
    fn run(&mut self, cx: &mut LeafContext<'_>) -> Result<(), LeafError> {
        let input = cx.input().clone();
        info!(target: RENDER_TARGET, value = %input.to_display_string(), "render");
        cx.render(input);
        Ok(())
    }
}

/// Remembers its input as state, then emits it on a later tick.
#[derive(Debug, Default)]
pub struct Store;

impl Process for Store {
    fn run(&mut self, cx: &mut LeafContext<'_>) -> Result<(), LeafError> {
        let input = cx.input().clone();
        cx.set_state(input.clone());
        cx.emit_after(Duration::ZERO, input);
        Ok(())
    }
}
