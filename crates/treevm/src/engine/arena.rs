use std::fmt;

use super::node::GraphNode;

/// Generational index into the arena.
/// Allows safe reuse of slots with use-after-free detection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SlotId {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct Entry {
    generation: u32,
    node: Option<GraphNode>,
}

/// Arena owning every node of one graph.
///
/// Listeners reference nodes by `SlotId` only, so releasing the arena (or a
/// range of slots) tears a subtree down without chasing references.
pub struct Arena {
    entries: Vec<Entry>,
    free_list: Vec<u32>,
    live: usize,
}

impl Arena {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Allocate a new slot holding `node`.
    pub fn alloc(&mut self, node: GraphNode) -> SlotId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            // Freed slots already had their generation bumped
            let entry = &mut self.entries[index as usize];
            entry.node = Some(node);
            SlotId {
                index,
                generation: entry.generation,
            }
        } else {
            let index = self.entries.len() as u32;
            self.entries.push(Entry {
                generation: 0,
                node: Some(node),
            });
            SlotId { index, generation: 0 }
        }
    }

    /// Free a slot, making it available for reuse.
    /// Returns the node that lived there, if the slot was still valid.
    pub fn free(&mut self, slot: SlotId) -> Option<GraphNode> {
        if !self.is_valid(slot) {
            return None;
        }
        let entry = &mut self.entries[slot.index as usize];
        // Bump generation immediately to invalidate outstanding SlotIds
        entry.generation += 1;
        self.free_list.push(slot.index);
        self.live -= 1;
        entry.node.take()
    }

    /// Check if a SlotId is valid (correct generation, not freed).
    pub fn is_valid(&self, slot: SlotId) -> bool {
        self.entries
            .get(slot.index as usize)
            .is_some_and(|entry| entry.generation == slot.generation && entry.node.is_some())
    }

    pub fn get(&self, slot: SlotId) -> Option<&GraphNode> {
        let entry = self.entries.get(slot.index as usize)?;
        if entry.generation != slot.generation {
            return None;
        }
        entry.node.as_ref()
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut GraphNode> {
        let entry = self.entries.get_mut(slot.index as usize)?;
        if entry.generation != slot.generation {
            return None;
        }
        entry.node.as_mut()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Iterate over live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &GraphNode)> {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            entry.node.as_ref().map(|node| {
                (
                    SlotId {
                        index: index as u32,
                        generation: entry.generation,
                    },
                    node,
                )
            })
        })
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}
