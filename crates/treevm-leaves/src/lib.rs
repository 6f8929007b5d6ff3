//! Standard leaf kinds for treevm graphs.
//!
//! | kind | behavior |
//! |---|---|
//! | `add` | emits `input + state` |
//! | `delay` | emits `input` after `state` milliseconds |
//! | `get` | emits `input` |
//! | `pass`, `set` | emit `state` |
//! | `render` | sends `input` to the render log |
//! | `store` | `state := input`, emitted on the next tick |
//! | `under` | condition, `input < state` |

pub mod condition;
pub mod error;
pub mod process;

use treevm::{Registry, RegistryError};

pub use condition::Under;
pub use error::LeafValueError;
pub use process::{Add, Delay, EmitState, Get, Render, Store};

pub const KINDS: [&str; 8] = ["add", "delay", "get", "pass", "render", "set", "store", "under"];

/// Register every catalogue kind. Kinds already present are replaced.
pub fn register_all(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_process("add", |_| Ok(Add))?;
    registry.register_process("delay", |_| Ok(Delay))?;
    registry.register_process("get", |_| Ok(Get))?;
    registry.register_process("pass", |_| Ok(EmitState::pass()))?;
    registry.register_process("render", |_| Ok(Render))?;
    registry.register_process("set", |_| Ok(EmitState::set()))?;
    registry.register_process("store", |_| Ok(Store))?;
    registry.register_condition("under", |_| Ok(Under))?;
    Ok(())
}

/// A fresh registry holding the catalogue.
pub fn registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    register_all(&mut registry)?;
    Ok(registry)
}
