//! Turns a specification tree into a live graph.
//!
//! Building runs in three passes over the tree:
//!
//! 1. **Declare** validates every node, resolves leaf kinds and registers a
//!    channel for every `broadcast` consumer in the scope. Listener keys can
//!    then be resolved regardless of where in the tree they were declared.
//! 2. **Wire** instantiates nodes in construction order (a composite builds its
//!    consumers before its producers; a leaf builds its state subtree after
//!    itself). Composites and conditionals allocate a placeholder slot first so
//!    their children can listen back to them.
//! 3. **Activate** fans every constant out to its listeners, in wire order,
//!    now that every listener exists.
//!
//! Any failure aborts the build and drops everything built so far.

use std::sync::Arc;

use smallvec::{SmallVec, smallvec};
use tracing::{debug, debug_span};
use ulid::Ulid;

use crate::config::GraphConfig;
use crate::engine::arena::SlotId;
use crate::engine::broadcast::Channels;
use crate::engine::event_loop::EventLoop;
use crate::engine::listener::{Listener, Listeners};
use crate::engine::node::NodeKind;
use crate::engine::scope::Scope;
use crate::error::BuildError;
use crate::graph::Graph;
use crate::registry::{LeafInstance, LeafShape, Registry};
use crate::spec::{BROADCAST, COMPONENT, GATE, LISTENER, SWITCH, SpecNode, VALUE};
use crate::trace::Tracer;

/// Build `spec` with the default configuration.
pub fn build(registry: &Registry, spec: &SpecNode) -> Result<Graph, BuildError> {
    Builder::new(registry).build(spec)
}

pub struct Builder<'r> {
    registry: &'r Registry,
    config: GraphConfig,
}

impl<'r> Builder<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            config: GraphConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(&self, spec: &SpecNode) -> Result<Graph, BuildError> {
        let id = Ulid::new();
        let _span = debug_span!("build", graph = %id, root = %spec.kind).entered();

        let mut event_loop = EventLoop::new(&self.config, Tracer::new(self.config.trace, id));
        // The outermost composite's scope, shared by the whole tree
        let mut scope = Scope::new();

        // Phase 1: Declare
        self.declare(spec, &mut scope, &mut event_loop.channels)?;
        debug!(keys = scope.len(), "declared broadcast keys");

        // Phase 2: Wire
        let mut wiring = Wiring {
            event_loop: &mut event_loop,
            scope: &scope,
            registry: self.registry,
            constants: Vec::new(),
        };
        let root = wiring.instantiate(spec, smallvec![Listener::Sink])?;
        let constants = wiring.constants;
        debug!(nodes = event_loop.arena.len(), constants = constants.len(), "wired graph");

        // Phase 3: Activate
        for slot in constants {
            let value = match event_loop.arena.get(slot).map(|node| &node.kind) {
                Some(NodeKind::Constant { value }) => value.clone(),
                _ => continue,
            };
            event_loop.set_output(slot, value)?;
        }

        Ok(Graph::new(id, root, event_loop, scope))
    }

    fn declare(
        &self,
        spec: &SpecNode,
        scope: &mut Scope,
        channels: &mut Channels,
    ) -> Result<(), BuildError> {
        match spec.kind.as_str() {
            COMPONENT => {
                for consumer in spec.nodes("consumers")? {
                    if consumer.kind == BROADCAST {
                        let key = consumer.key()?;
                        let channel = channels.create(key);
                        scope.register_key(key, channel)?;
                    } else {
                        self.declare(consumer, scope, channels)?;
                    }
                }
                for producer in spec.nodes("producers")? {
                    if producer.kind == LISTENER {
                        producer.key()?;
                    } else {
                        self.declare(producer, scope, channels)?;
                    }
                }
            }
            GATE | SWITCH => {
                for condition in spec.nodes("conditions")? {
                    self.check_condition(condition)?;
                    self.declare(condition, scope, channels)?;
                }
                self.declare(spec.node("positive")?, scope, channels)?;
                if spec.kind == SWITCH {
                    self.declare(spec.node("negative")?, scope, channels)?;
                }
            }
            VALUE => {
                spec.literal("value")?;
            }
            BROADCAST => {
                return Err(BuildError::Misplaced {
                    kind: spec.kind.clone(),
                    position: "consumer",
                });
            }
            LISTENER => {
                return Err(BuildError::Misplaced {
                    kind: spec.kind.clone(),
                    position: "producer",
                });
            }
            kind => {
                if !self.registry.contains(kind) {
                    return Err(BuildError::UnknownKind(kind.to_string()));
                }
                if let Some(state) = spec.state()? {
                    self.declare(state, scope, channels)?;
                }
            }
        }
        Ok(())
    }

    fn check_condition(&self, spec: &SpecNode) -> Result<(), BuildError> {
        if spec.kind == VALUE {
            // A constant condition is read as its literal on every input
            return match spec.literal("value")?.as_bool() {
                Some(_) => Ok(()),
                None => Err(BuildError::WrongShape {
                    kind: spec.kind.clone(),
                    property: "value".to_string(),
                    expected: "a boolean when used as a condition",
                }),
            };
        }
        match self.registry.shape(&spec.kind) {
            Some(LeafShape::Condition) => Ok(()),
            Some(LeafShape::Process) => Err(BuildError::NotACondition(spec.kind.clone())),
            None if spec.is_structural() => Err(BuildError::NotACondition(spec.kind.clone())),
            None => Err(BuildError::UnknownKind(spec.kind.clone())),
        }
    }
}

/// Second-phase state: instantiates nodes into the event loop.
struct Wiring<'a> {
    event_loop: &'a mut EventLoop,
    scope: &'a Scope,
    registry: &'a Registry,
    /// Constants in wire order, activated once wiring is complete
    constants: Vec<SlotId>,
}

impl Wiring<'_> {
    fn instantiate(&mut self, spec: &SpecNode, outputs: Listeners) -> Result<SlotId, BuildError> {
        match spec.kind.as_str() {
            COMPONENT => self.component(spec, outputs),
            GATE | SWITCH => self.conditional(spec, outputs),
            VALUE => {
                let value = spec.literal("value")?.clone();
                let slot = self.event_loop.alloc(NodeKind::Constant { value }, outputs);
                self.constants.push(slot);
                Ok(slot)
            }
            BROADCAST | LISTENER => Err(BuildError::Misplaced {
                kind: spec.kind.clone(),
                position: if spec.kind == BROADCAST {
                    "consumer"
                } else {
                    "producer"
                },
            }),
            _ => self.leaf(spec, outputs),
        }
    }

    fn component(&mut self, spec: &SpecNode, outputs: Listeners) -> Result<SlotId, BuildError> {
        let slot = self.event_loop.alloc(NodeKind::Placeholder, outputs);

        // Consumers first: producers are built with the consumer listeners
        let mut consumer_targets = Listeners::new();
        for consumer in spec.nodes("consumers")? {
            if consumer.kind == BROADCAST {
                let channel = self.scope.lookup(consumer.key()?)?;
                consumer_targets.push(Listener::Broadcast(channel));
            } else {
                let consumer_slot = self.instantiate(consumer, smallvec![Listener::Output(slot)])?;
                consumer_targets.push(Listener::Input(consumer_slot));
            }
        }

        let mut producers = SmallVec::new();
        for producer in spec.nodes("producers")? {
            if producer.kind == LISTENER {
                let key = producer.key()?;
                let channel = self.scope.lookup(key)?;
                if let Some(channel) = self.event_loop.channels.get_mut(channel) {
                    channel.add_listeners(consumer_targets.iter().copied());
                }
                debug!(key, listeners = consumer_targets.len(), "listening on broadcast");
            } else {
                producers.push(self.instantiate(producer, consumer_targets.clone())?);
            }
        }

        self.event_loop
            .set_kind(slot, NodeKind::Composite { producers });
        Ok(slot)
    }

    fn conditional(&mut self, spec: &SpecNode, outputs: Listeners) -> Result<SlotId, BuildError> {
        let slot = self.event_loop.alloc(NodeKind::Placeholder, outputs);

        let positive = self.instantiate(spec.node("positive")?, smallvec![Listener::Output(slot)])?;
        let negative = if spec.kind == SWITCH {
            Some(self.instantiate(spec.node("negative")?, smallvec![Listener::Output(slot)])?)
        } else {
            if spec.property("negative").is_some() {
                debug!("gate ignores its `negative` property");
            }
            None
        };

        // Conditions are read synchronously, never through listeners
        let mut conditions = SmallVec::new();
        for condition in spec.nodes("conditions")? {
            conditions.push(self.instantiate(condition, Listeners::new())?);
        }

        self.event_loop.set_kind(
            slot,
            NodeKind::Conditional {
                conditions,
                positive,
                negative,
            },
        );
        Ok(slot)
    }

    fn leaf(&mut self, spec: &SpecNode, outputs: Listeners) -> Result<SlotId, BuildError> {
        let kind: Arc<str> = spec.kind.as_str().into();
        let node_kind = match self.registry.instantiate(spec)? {
            LeafInstance::Process(behavior) => NodeKind::Process { kind, behavior },
            LeafInstance::Condition(behavior) => NodeKind::Condition { kind, behavior },
        };
        let slot = self.event_loop.alloc(node_kind, outputs);

        if let Some(state) = spec.state()? {
            self.instantiate(state, smallvec![Listener::State(slot)])?;
        }
        Ok(slot)
    }
}
