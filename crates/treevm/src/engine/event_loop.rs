use std::collections::VecDeque;
use std::time::Duration;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::arena::{Arena, SlotId};
use super::broadcast::{ChannelId, Channels};
use super::clock::VirtualClock;
use super::listener::{Listener, Listeners};
use super::node::{GraphNode, NodeKind};
use crate::config::GraphConfig;
use crate::error::RunError;
use crate::leaf::{Effect, LeafContext};
use crate::trace::Tracer;
use crate::value::Value;

/// Unit of deferred work.
#[derive(Debug, Clone)]
pub enum Task {
    /// Broadcast delivery to the listeners captured when the send was scheduled.
    Deliver {
        channel: ChannelId,
        listeners: Listeners,
        value: Value,
    },
    /// Delayed leaf output.
    Emit { slot: SlotId, value: Value },
}

/// Owns every node of one graph and propagates values through it.
///
/// Propagation is synchronous and re-entrant: delivering to an input runs the
/// node, whose output is delivered to its listeners before `deliver` returns.
/// Broadcast sends and delayed leaf output are the only deferred work; they
/// run on later ticks, driven by the host.
pub struct EventLoop {
    pub arena: Arena,
    pub channels: Channels,
    pub clock: VirtualClock,
    queue: VecDeque<Task>,
    outputs: Vec<Value>,
    rendered: Vec<Value>,
    tracer: Tracer,
    depth: usize,
    max_depth: usize,
    max_ticks: usize,
}

impl EventLoop {
    pub fn new(config: &GraphConfig, tracer: Tracer) -> Self {
        Self {
            arena: Arena::new(),
            channels: Channels::new(),
            clock: VirtualClock::new(),
            queue: VecDeque::new(),
            outputs: Vec::new(),
            rendered: Vec::new(),
            tracer,
            depth: 0,
            max_depth: config.max_depth,
            max_ticks: config.max_ticks,
        }
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Allocate a node in the arena.
    pub fn alloc(&mut self, kind: NodeKind, outputs: Listeners) -> SlotId {
        self.arena.alloc(GraphNode::new(kind, outputs))
    }

    /// Replace the kind of an already allocated node (second build phase).
    pub fn set_kind(&mut self, slot: SlotId, kind: NodeKind) {
        if let Some(node) = self.arena.get_mut(slot) {
            node.kind = kind;
        }
    }

    /// Register one more output listener on `slot`.
    /// Values emitted before the call are not replayed.
    pub fn add_listener(&mut self, slot: SlotId, listener: Listener) -> bool {
        match self.arena.get_mut(slot) {
            Some(node) => {
                node.outputs.push(listener);
                true
            }
            None => false,
        }
    }

    // --- Synchronous propagation ---

    /// Store `value` as the input of `slot` and run it.
    pub fn set_input(&mut self, slot: SlotId, value: Value) -> Result<(), RunError> {
        if self.depth >= self.max_depth {
            return Err(RunError::DepthExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = self.store_and_run(slot, value);
        self.depth -= 1;
        result
    }

    fn store_and_run(&mut self, slot: SlotId, value: Value) -> Result<(), RunError> {
        let Some(node) = self.arena.get_mut(slot) else {
            warn!(%slot, "input delivered to a freed node, dropping");
            return Ok(());
        };
        self.tracer.input(slot, node.kind.name(), &value);
        node.input = Some(value);
        self.run(slot)
    }

    /// Fan `value` out to every output listener of `slot`, in registration order.
    pub fn set_output(&mut self, slot: SlotId, value: Value) -> Result<(), RunError> {
        let Some(node) = self.arena.get(slot) else {
            warn!(%slot, "output from a freed node, dropping");
            return Ok(());
        };
        self.tracer.output(slot, node.kind.name(), &value);
        let listeners = node.outputs.clone();
        for listener in listeners {
            self.deliver(listener, value.clone())?;
        }
        Ok(())
    }

    /// Overwrite the state cell of `slot` without running it.
    pub fn set_state(&mut self, slot: SlotId, value: Value) {
        match self.arena.get_mut(slot) {
            Some(node) => {
                self.tracer.state(slot, node.kind.name(), &value);
                node.state = Some(value);
            }
            None => warn!(%slot, "state delivered to a freed node, dropping"),
        }
    }

    pub fn deliver(&mut self, listener: Listener, value: Value) -> Result<(), RunError> {
        trace!(?listener, %value, "deliver");
        match listener {
            Listener::Input(slot) => self.set_input(slot, value),
            Listener::Output(slot) => self.set_output(slot, value),
            Listener::State(slot) => {
                self.set_state(slot, value);
                Ok(())
            }
            Listener::Broadcast(channel) => {
                self.send(channel, value);
                Ok(())
            }
            Listener::Sink => {
                self.outputs.push(value);
                Ok(())
            }
        }
    }

    /// Schedule delivery of `value` to the channel's current listeners on a later tick.
    pub fn send(&mut self, channel: ChannelId, value: Value) {
        let Some(target) = self.channels.get(channel) else {
            warn!(%channel, "send to an unknown channel, dropping");
            return;
        };
        // Listeners added after this point do not see this value
        let listeners = target.snapshot();
        self.tracer
            .broadcast(channel, target.key(), listeners.len(), &value);
        self.queue.push_back(Task::Deliver {
            channel,
            listeners,
            value,
        });
    }

    /// Per-kind behavior, run right after an input was stored.
    fn run(&mut self, slot: SlotId) -> Result<(), RunError> {
        let Some(node) = self.arena.get_mut(slot) else {
            return Ok(());
        };
        let Some(input) = node.input.clone() else {
            return Ok(());
        };
        let GraphNode { kind, state, .. } = node;
        match kind {
            NodeKind::Composite { producers } => {
                let producers = producers.clone();
                for producer in producers {
                    self.set_input(producer, input.clone())?;
                }
                Ok(())
            }
            NodeKind::Conditional { .. } => {
                if !self.run_conditional(slot, &input)? {
                    trace!(%slot, "no branch took the input");
                }
                Ok(())
            }
            NodeKind::Constant { .. } => {
                debug!(%slot, "constant ignores its input");
                Ok(())
            }
            NodeKind::Placeholder => {
                warn!(%slot, "input reached a node that was never wired");
                Ok(())
            }
            NodeKind::Process { kind, behavior } => {
                let mut effects = Vec::new();
                let mut cx = LeafContext::new(&input, state, &mut effects);
                behavior.run(&mut cx).map_err(|source| RunError::Leaf {
                    kind: kind.to_string(),
                    source,
                })?;
                self.apply_effects(slot, effects)
            }
            NodeKind::Condition { kind, behavior } => {
                let matched = behavior
                    .test(&input, state.as_ref())
                    .map_err(|source| RunError::Leaf {
                        kind: kind.to_string(),
                        source,
                    })?;
                self.set_output(slot, Value::Bool(matched))
            }
        }
    }

    /// Evaluate conditions in order, stopping at the first failure, then route
    /// `input` to `positive` (all held) or `negative` (switch only).
    /// Returns whether a branch received the input.
    pub fn run_conditional(&mut self, slot: SlotId, input: &Value) -> Result<bool, RunError> {
        let Some(NodeKind::Conditional {
            conditions,
            positive,
            negative,
        }) = self.arena.get(slot).map(|node| &node.kind)
        else {
            return Ok(false);
        };
        let conditions: SmallVec<[SlotId; 4]> = conditions.clone();
        let (positive, negative) = (*positive, *negative);

        let mut matched = true;
        for condition in conditions {
            if !self.evaluate_condition(condition, input)? {
                matched = false;
                break;
            }
        }

        let kind = if negative.is_some() {
            crate::spec::SWITCH
        } else {
            crate::spec::GATE
        };
        self.tracer.branch(slot, kind, matched);

        if matched {
            self.set_input(positive, input.clone())?;
            Ok(true)
        } else if let Some(negative) = negative {
            self.set_input(negative, input.clone())?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Read a condition node's boolean answer for `input` synchronously.
    /// The condition's input cell is updated; nothing is fanned out.
    pub fn evaluate_condition(&mut self, slot: SlotId, input: &Value) -> Result<bool, RunError> {
        let Some(node) = self.arena.get_mut(slot) else {
            warn!(%slot, "condition was freed, treating it as failed");
            return Ok(false);
        };
        self.tracer.input(slot, node.kind.name(), input);
        node.input = Some(input.clone());
        match &node.kind {
            NodeKind::Condition { kind, behavior } => behavior
                .test(input, node.state.as_ref())
                .map_err(|source| RunError::Leaf {
                    kind: kind.to_string(),
                    source,
                }),
            NodeKind::Constant { value } => value.as_bool().ok_or_else(|| RunError::NotBool {
                kind: crate::spec::VALUE.to_string(),
                value: value.clone(),
            }),
            other => Err(RunError::NotBool {
                kind: other.name().to_string(),
                value: input.clone(),
            }),
        }
    }

    fn apply_effects(&mut self, slot: SlotId, effects: Vec<Effect>) -> Result<(), RunError> {
        for effect in effects {
            match effect {
                Effect::Emit(value) => self.set_output(slot, value)?,
                Effect::EmitAfter(delay, value) => {
                    debug!(%slot, ?delay, "output deferred");
                    self.clock.schedule(delay, Task::Emit { slot, value });
                }
                Effect::Render(value) => {
                    self.tracer.render(slot, &value);
                    self.rendered.push(value);
                }
            }
        }
        Ok(())
    }

    // --- Deferred work ---

    /// Run one tick: move due timers into the queue, then run exactly the
    /// tasks queued at this point. Work they schedule waits for the next tick.
    pub fn run_tick(&mut self) -> Result<usize, RunError> {
        // Phase 1: Due timers
        let now = self.clock.now();
        while let Some(task) = self.clock.pop_due(now) {
            self.queue.push_back(task);
        }

        // Phase 2: Tasks present at tick start
        let batch = self.queue.len();
        for _ in 0..batch {
            let Some(task) = self.queue.pop_front() else {
                break;
            };
            self.run_task(task)?;
        }
        Ok(batch)
    }

    fn run_task(&mut self, task: Task) -> Result<(), RunError> {
        match task {
            Task::Deliver {
                channel,
                listeners,
                value,
            } => {
                trace!(%channel, listeners = listeners.len(), "broadcast delivery");
                for listener in listeners {
                    self.deliver(listener, value.clone())?;
                }
                Ok(())
            }
            Task::Emit { slot, value } => self.set_output(slot, value),
        }
    }

    /// Whether a tick would do anything without advancing time.
    pub fn has_runnable_work(&self) -> bool {
        !self.queue.is_empty()
            || self
                .clock
                .next_deadline()
                .is_some_and(|deadline| deadline <= self.clock.now())
    }

    /// Whether anything is queued or waiting on a timer.
    pub fn has_pending_work(&self) -> bool {
        !self.queue.is_empty() || self.clock.has_pending_timers()
    }

    fn drain(&mut self, remaining: &mut usize) -> Result<usize, RunError> {
        let mut ticks = 0;
        while self.has_runnable_work() {
            if *remaining == 0 {
                return Err(RunError::TickBudgetExhausted(self.max_ticks));
            }
            *remaining -= 1;
            self.run_tick()?;
            ticks += 1;
        }
        Ok(ticks)
    }

    /// Tick until nothing is runnable at the current time. Returns ticks run.
    pub fn run_until_idle(&mut self) -> Result<usize, RunError> {
        let mut remaining = self.max_ticks;
        self.drain(&mut remaining)
    }

    /// Advance virtual time by `by`, firing timers in deadline order and
    /// draining the work each one causes before moving on.
    pub fn advance_by(&mut self, by: Duration) -> Result<(), RunError> {
        let target = self.clock.now() + by;
        let mut remaining = self.max_ticks;
        self.drain(&mut remaining)?;
        while let Some(deadline) = self.clock.next_deadline() {
            if deadline > target {
                break;
            }
            self.clock.advance_to(deadline);
            self.drain(&mut remaining)?;
        }
        self.clock.advance_to(target);
        Ok(())
    }

    /// Run until no task is queued and no timer is pending, jumping virtual
    /// time to each deadline.
    pub fn settle(&mut self) -> Result<(), RunError> {
        let mut remaining = self.max_ticks;
        loop {
            self.drain(&mut remaining)?;
            match self.clock.next_deadline() {
                Some(deadline) => self.clock.advance_to(deadline),
                None => return Ok(()),
            }
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    // --- Logs ---

    pub fn outputs(&self) -> &[Value] {
        &self.outputs
    }

    pub fn take_outputs(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.outputs)
    }

    pub fn rendered(&self) -> &[Value] {
        &self.rendered
    }

    pub fn take_rendered(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.rendered)
    }

    /// Release every node, channel, task and timer. Returns the number of
    /// nodes freed.
    pub fn teardown(&mut self) -> usize {
        let slots: Vec<SlotId> = self.arena.iter().map(|(slot, _)| slot).collect();
        for slot in &slots {
            self.arena.free(*slot);
        }
        self.channels.clear();
        self.queue.clear();
        self.clock.clear_timers();
        slots.len()
    }
}
