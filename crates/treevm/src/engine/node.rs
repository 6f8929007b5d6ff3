use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use super::arena::SlotId;
use super::listener::Listeners;
use crate::leaf::{Condition, Process};
use crate::value::Value;

/// The kind of graph node and its kind-specific wiring.
pub enum NodeKind {
    /// Slot allocated before its children were wired (two-phase build).
    Placeholder,
    /// Routing junction: forwards its input to every producer.
    Composite { producers: SmallVec<[SlotId; 4]> },
    /// Gate (no `negative`) or switch (with `negative`).
    Conditional {
        conditions: SmallVec<[SlotId; 4]>,
        positive: SlotId,
        negative: Option<SlotId>,
    },
    /// Literal emitted once, when the graph is activated.
    Constant { value: Value },
    /// Registered leaf with a side-effecting run.
    Process {
        kind: Arc<str>,
        behavior: Box<dyn Process>,
    },
    /// Registered leaf answering a boolean test.
    Condition {
        kind: Arc<str>,
        behavior: Box<dyn Condition>,
    },
}

impl NodeKind {
    /// Kind name as written in specifications.
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Placeholder => "placeholder",
            NodeKind::Composite { .. } => crate::spec::COMPONENT,
            NodeKind::Conditional { negative: None, .. } => crate::spec::GATE,
            NodeKind::Conditional { negative: Some(_), .. } => crate::spec::SWITCH,
            NodeKind::Constant { .. } => crate::spec::VALUE,
            NodeKind::Process { kind, .. } | NodeKind::Condition { kind, .. } => kind.as_ref(),
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Placeholder => f.write_str("Placeholder"),
            NodeKind::Composite { producers } => f
                .debug_struct("Composite")
                .field("producers", producers)
                .finish(),
            NodeKind::Conditional {
                conditions,
                positive,
                negative,
            } => f
                .debug_struct("Conditional")
                .field("conditions", conditions)
                .field("positive", positive)
                .field("negative", negative)
                .finish(),
            NodeKind::Constant { value } => {
                f.debug_struct("Constant").field("value", value).finish()
            }
            NodeKind::Process { kind, .. } => f.debug_struct("Process").field("kind", kind).finish(),
            NodeKind::Condition { kind, .. } => {
                f.debug_struct("Condition").field("kind", kind).finish()
            }
        }
    }
}

/// A single runtime node in the arena.
#[derive(Debug)]
pub struct GraphNode {
    pub kind: NodeKind,
    /// Last received input, overwritten on every delivery.
    pub input: Option<Value>,
    /// State cell, empty until the state subtree first emits.
    pub state: Option<Value>,
    pub outputs: Listeners,
}

impl GraphNode {
    pub fn new(kind: NodeKind, outputs: Listeners) -> Self {
        Self {
            kind,
            input: None,
            state: None,
            outputs,
        }
    }
}
