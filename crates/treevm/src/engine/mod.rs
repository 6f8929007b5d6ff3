//! Runtime machinery: node storage, listeners, channels and the event loop.

pub mod arena;
pub mod broadcast;
pub mod clock;
pub mod event_loop;
pub mod listener;
pub mod node;
pub mod scope;
