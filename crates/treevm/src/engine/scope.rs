//! Lexical registry of broadcast keys.
//!
//! A scope is created by the outermost composite of a build and threaded into
//! every recursive build call, so sibling and descendant subtrees can address a
//! channel by key without holding a reference to the subtree that declared it.

use std::collections::HashMap;
use std::sync::Arc;

use super::broadcast::ChannelId;
use crate::error::ScopeError;

#[derive(Debug, Default)]
pub struct Scope {
    keys: HashMap<Arc<str>, ChannelId>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` for `channel`. A key may be registered once per scope.
    pub fn register_key(&mut self, key: &str, channel: ChannelId) -> Result<(), ScopeError> {
        if self.keys.contains_key(key) {
            return Err(ScopeError::DuplicateKey(key.to_string()));
        }
        self.keys.insert(key.into(), channel);
        Ok(())
    }

    /// Resolve a key to the channel registered for it.
    pub fn lookup(&self, key: &str) -> Result<ChannelId, ScopeError> {
        self.keys
            .get(key)
            .copied()
            .ok_or_else(|| ScopeError::UnknownKey(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Registered keys, sorted for deterministic output.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.keys.keys().map(|k| k.as_ref()).collect();
        keys.sort_unstable();
        keys
    }
}
