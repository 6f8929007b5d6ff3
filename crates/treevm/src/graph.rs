//! A built graph and the operations a host drives it with.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;
use ulid::Ulid;

use crate::engine::arena::SlotId;
use crate::engine::event_loop::EventLoop;
use crate::engine::listener::Listener;
use crate::engine::scope::Scope;
use crate::error::RunError;
use crate::value::Value;

pub struct Graph {
    id: Ulid,
    root: SlotId,
    event_loop: EventLoop,
    scope: Scope,
}

/// Node and channel counts of a graph, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub kinds: BTreeMap<String, usize>,
    pub broadcast_keys: Vec<String>,
}

impl fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} nodes", self.nodes)?;
        for (kind, count) in &self.kinds {
            writeln!(f, "  {kind}: {count}")?;
        }
        if self.broadcast_keys.is_empty() {
            write!(f, "no broadcast keys")
        } else {
            write!(f, "broadcast keys: {}", self.broadcast_keys.join(", "))
        }
    }
}

impl Graph {
    pub(crate) fn new(id: Ulid, root: SlotId, event_loop: EventLoop, scope: Scope) -> Self {
        Self {
            id,
            root,
            event_loop,
            scope,
        }
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    /// Deliver `value` to the root's input and propagate it synchronously.
    /// Deferred work it causes waits for the next tick.
    pub fn push(&mut self, value: impl Into<Value>) -> Result<(), RunError> {
        let value = value.into();
        debug!(graph = %self.id, %value, "push");
        self.event_loop.set_input(self.root, value)
    }

    pub fn run_tick(&mut self) -> Result<usize, RunError> {
        self.event_loop.run_tick()
    }

    pub fn run_until_idle(&mut self) -> Result<usize, RunError> {
        self.event_loop.run_until_idle()
    }

    pub fn advance_by(&mut self, by: Duration) -> Result<(), RunError> {
        self.event_loop.advance_by(by)
    }

    pub fn settle(&mut self) -> Result<(), RunError> {
        self.event_loop.settle()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.event_loop.clock.now()
    }

    pub fn time_to_next_timer(&self) -> Option<Duration> {
        self.event_loop.clock.time_to_next_timer()
    }

    pub fn has_pending_work(&self) -> bool {
        self.event_loop.has_pending_work()
    }

    /// Values that reached the root's output, oldest first.
    pub fn outputs(&self) -> &[Value] {
        self.event_loop.outputs()
    }

    pub fn take_outputs(&mut self) -> Vec<Value> {
        self.event_loop.take_outputs()
    }

    pub fn rendered(&self) -> &[Value] {
        self.event_loop.rendered()
    }

    pub fn take_rendered(&mut self) -> Vec<Value> {
        self.event_loop.take_rendered()
    }

    pub fn node_count(&self) -> usize {
        self.event_loop.arena.len()
    }

    /// Slots of every node of `kind`, in allocation order.
    pub fn find(&self, kind: &str) -> Vec<SlotId> {
        self.event_loop
            .arena
            .iter()
            .filter(|(_, node)| node.kind.name() == kind)
            .map(|(slot, _)| slot)
            .collect()
    }

    /// Last input stored on `slot`.
    pub fn input_of(&self, slot: SlotId) -> Option<&Value> {
        self.event_loop.arena.get(slot)?.input.as_ref()
    }

    pub fn state_of(&self, slot: SlotId) -> Option<&Value> {
        self.event_loop.arena.get(slot)?.state.as_ref()
    }

    /// Record every later output of `slot` in the output log.
    /// Values the node emitted earlier are not replayed.
    pub fn tap(&mut self, slot: SlotId) -> bool {
        self.event_loop.add_listener(slot, Listener::Sink)
    }

    pub fn summary(&self) -> GraphSummary {
        let mut kinds = BTreeMap::new();
        for (_, node) in self.event_loop.arena.iter() {
            *kinds.entry(node.kind.name().to_string()).or_insert(0) += 1;
        }
        GraphSummary {
            nodes: self.event_loop.arena.len(),
            kinds,
            broadcast_keys: self.scope.keys().into_iter().map(str::to_string).collect(),
        }
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Release every node and drop pending work. Returns the number of nodes freed.
    pub fn teardown(&mut self) -> usize {
        let freed = self.event_loop.teardown();
        debug!(graph = %self.id, freed, "graph torn down");
        freed
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("nodes", &self.event_loop.arena.len())
            .field("pending_tasks", &self.event_loop.pending_tasks())
            .finish()
    }
}
