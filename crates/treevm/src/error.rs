//! Error taxonomy.
//!
//! Build-time failures (`BuildError`) leave no usable graph behind. Run-time
//! failures (`RunError`) abort the propagation step that raised them; the core
//! never retries or suppresses them.

use thiserror::Error;

use crate::value::Value;

/// Error type returned by leaf behaviors. The core passes it through untouched.
pub type LeafError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Misuse of a scope's broadcast registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// The key was already registered in this scope.
    #[error("broadcast key `{0}` is already registered in this scope")]
    DuplicateKey(String),
    /// No broadcast in this scope declares the key.
    #[error("broadcast key `{0}` is not registered in this scope")]
    UnknownKey(String),
}

/// Misuse of the leaf registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Structural kinds are interpreted by the builder and cannot be replaced.
    #[error("`{0}` is a structural kind and cannot be registered as a leaf")]
    ReservedKind(String),
}

/// Failure while turning a specification tree into a graph.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// A specification names a kind with no structural or registered handler.
    #[error("unknown node kind `{0}`")]
    UnknownKind(String),
    /// A required property is absent.
    #[error("`{kind}` node is missing required property `{property}`")]
    MissingProperty { kind: String, property: String },
    /// A property is present but holds the wrong kind of data.
    #[error("`{kind}` node property `{property}` must be {expected}")]
    WrongShape {
        kind: String,
        property: String,
        expected: &'static str,
    },
    /// `broadcast`/`listener` used anywhere but a component's consumers/producers.
    #[error("`{kind}` is only valid as a component {position}")]
    Misplaced {
        kind: String,
        position: &'static str,
    },
    /// A gate/switch condition names a kind that cannot answer a boolean test.
    #[error("`{0}` cannot be used as a gate or switch condition")]
    NotACondition(String),
    /// A leaf factory rejected its specification.
    #[error("cannot build `{kind}` node: {source}")]
    Leaf {
        kind: String,
        #[source]
        source: LeafError,
    },
    /// Activating constants at the end of the build failed.
    #[error("propagation failed while activating the graph: {0}")]
    Run(#[from] RunError),
}

/// Failure while propagating a value through a live graph.
#[derive(Debug, Error)]
pub enum RunError {
    /// A leaf's `run` or `test` failed; the leaf's own error is the source.
    #[error("`{kind}` node failed: {source}")]
    Leaf {
        kind: String,
        #[source]
        source: LeafError,
    },
    /// A condition produced something other than a boolean.
    #[error("condition `{kind}` produced {value} instead of a boolean")]
    NotBool { kind: String, value: Value },
    /// Synchronous propagation nested deeper than the configured limit,
    /// usually a cycle in the specification.
    #[error("propagation exceeded the maximum depth of {0}")]
    DepthExceeded(usize),
    /// `settle` ran out of ticks before the graph went quiet.
    #[error("graph did not settle within {0} ticks")]
    TickBudgetExhausted(usize),
}
