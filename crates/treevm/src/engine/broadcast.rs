use std::fmt;
use std::sync::Arc;

use super::listener::{Listener, Listeners};

/// Index of a broadcast channel within its graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u32);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel{}", self.0)
    }
}

/// Named many-to-many relay.
///
/// The listener list is append-only: a channel keeps every listener it was
/// ever given for the lifetime of its graph.
#[derive(Debug, Clone)]
pub struct BroadcastChannel {
    key: Arc<str>,
    listeners: Listeners,
}

impl BroadcastChannel {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self {
            key: key.into(),
            listeners: Listeners::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn add_listeners(&mut self, listeners: impl IntoIterator<Item = Listener>) {
        self.listeners.extend(listeners);
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    /// Copy of the current listener list, taken when a send is scheduled.
    pub fn snapshot(&self) -> Listeners {
        self.listeners.clone()
    }
}

/// Every channel of one graph, addressed by `ChannelId`.
#[derive(Debug, Default)]
pub struct Channels {
    channels: Vec<BroadcastChannel>,
}

impl Channels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, key: impl Into<Arc<str>>) -> ChannelId {
        let id = ChannelId(self.channels.len() as u32);
        self.channels.push(BroadcastChannel::new(key));
        id
    }

    pub fn get(&self, id: ChannelId) -> Option<&BroadcastChannel> {
        self.channels.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut BroadcastChannel> {
        self.channels.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }
}
