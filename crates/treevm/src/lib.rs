//! Interpreter for declarative dataflow trees.
//!
//! A [`SpecNode`] tree is built once into a [`Graph`] of nodes joined by typed
//! listeners. Values pushed into the root propagate synchronously; broadcasts
//! and delayed leaf output are deferred to later ticks of the graph's event
//! loop, which the host drives.

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod leaf;
pub mod registry;
pub mod spec;
pub mod trace;
pub mod value;

pub use builder::{Builder, build};
pub use config::GraphConfig;
pub use engine::arena::SlotId;
pub use error::{BuildError, LeafError, RegistryError, RunError, ScopeError};
pub use graph::{Graph, GraphSummary};
pub use leaf::{Condition, LeafContext, Process};
pub use registry::{LeafShape, Registry};
pub use spec::{Property, SpecNode};
pub use value::Value;
