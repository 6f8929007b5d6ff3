//! Per-build debug trace of value hops.
//!
//! Tracing is a property of one graph, chosen through `GraphConfig::trace`,
//! never a process-wide switch. When disabled every call is a no-op; when
//! enabled each hop becomes one `info` event on the `treevm::trace` target.

use tracing::info;
use ulid::Ulid;

use crate::engine::arena::SlotId;
use crate::engine::broadcast::ChannelId;
use crate::value::Value;

pub const TARGET: &str = "treevm::trace";

#[derive(Debug, Clone, Copy)]
pub struct Tracer {
    enabled: bool,
    graph: Ulid,
}

impl Tracer {
    pub fn new(enabled: bool, graph: Ulid) -> Self {
        Self { enabled, graph }
    }

    pub fn disabled() -> Self {
        Self::new(false, Ulid::nil())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn input(&self, slot: SlotId, kind: &str, value: &Value) {
        if self.enabled {
            info!(target: TARGET, graph = %self.graph, %slot, kind, %value, "input");
        }
    }

    pub fn output(&self, slot: SlotId, kind: &str, value: &Value) {
        if self.enabled {
            info!(target: TARGET, graph = %self.graph, %slot, kind, %value, "output");
        }
    }

    pub fn state(&self, slot: SlotId, kind: &str, value: &Value) {
        if self.enabled {
            info!(target: TARGET, graph = %self.graph, %slot, kind, %value, "state");
        }
    }

    pub fn branch(&self, slot: SlotId, kind: &str, matched: bool) {
        if self.enabled {
            info!(target: TARGET, graph = %self.graph, %slot, kind, matched, "branch");
        }
    }

    pub fn broadcast(&self, channel: ChannelId, key: &str, listeners: usize, value: &Value) {
        if self.enabled {
            info!(target: TARGET, graph = %self.graph, %channel, key, listeners, %value, "broadcast");
        }
    }

    pub fn render(&self, slot: SlotId, value: &Value) {
        if self.enabled {
            info!(target: TARGET, graph = %self.graph, %slot, %value, "render");
        }
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::disabled()
    }
}
