use smallvec::SmallVec;

use super::arena::SlotId;
use super::broadcast::ChannelId;

/// Where a delivered value goes.
///
/// A listener never owns its target; it only names it. Delivery is performed by
/// the event loop, which owns every target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Listener {
    /// Store as the target's input and run it.
    Input(SlotId),
    /// Fan out from the target's output, as if the target had emitted.
    Output(SlotId),
    /// Overwrite the target's state cell. Never runs the target.
    State(SlotId),
    /// Send into a broadcast channel (delivery deferred to a later tick).
    Broadcast(ChannelId),
    /// Append to the graph's output log, read by the embedder.
    Sink,
}

/// Most nodes have one or two listeners.
pub type Listeners = SmallVec<[Listener; 2]>;

impl Listener {
    /// Slot this listener delivers to, if it targets a node.
    pub fn target(&self) -> Option<SlotId> {
        match self {
            Listener::Input(slot) | Listener::Output(slot) | Listener::State(slot) => Some(*slot),
            Listener::Broadcast(_) | Listener::Sink => None,
        }
    }
}
