//! Kind name → leaf factory mapping.
//!
//! The core never names a leaf kind; embedders (or a catalogue crate) register
//! factories before building.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{BuildError, LeafError, RegistryError};
use crate::leaf::{Condition, Process};
use crate::spec::{self, SpecNode};

type ProcessFactory = Box<dyn Fn(&SpecNode) -> Result<Box<dyn Process>, LeafError>>;
type ConditionFactory = Box<dyn Fn(&SpecNode) -> Result<Box<dyn Condition>, LeafError>>;

/// Which contract a registered kind implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafShape {
    Process,
    Condition,
}

enum Factory {
    Process(ProcessFactory),
    Condition(ConditionFactory),
}

pub(crate) enum LeafInstance {
    Process(Box<dyn Process>),
    Condition(Box<dyn Condition>),
}

#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind whose nodes run `P` on every input.
    pub fn register_process<F, P>(&mut self, kind: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&SpecNode) -> Result<P, LeafError> + 'static,
        P: Process + 'static,
    {
        let factory: ProcessFactory =
            Box::new(move |spec| factory(spec).map(|leaf| Box::new(leaf) as Box<dyn Process>));
        self.insert(kind, Factory::Process(factory))
    }

    /// Register a kind whose nodes answer a boolean test.
    pub fn register_condition<F, C>(&mut self, kind: &str, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&SpecNode) -> Result<C, LeafError> + 'static,
        C: Condition + 'static,
    {
        let factory: ConditionFactory =
            Box::new(move |spec| factory(spec).map(|leaf| Box::new(leaf) as Box<dyn Condition>));
        self.insert(kind, Factory::Condition(factory))
    }

    fn insert(&mut self, kind: &str, factory: Factory) -> Result<(), RegistryError> {
        if spec::is_structural(kind) {
            return Err(RegistryError::ReservedKind(kind.to_string()));
        }
        if self.factories.insert(kind.to_string(), factory).is_some() {
            debug!(kind, "leaf kind re-registered, replacing previous factory");
        }
        Ok(())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn shape(&self, kind: &str) -> Option<LeafShape> {
        self.factories.get(kind).map(|factory| match factory {
            Factory::Process(_) => LeafShape::Process,
            Factory::Condition(_) => LeafShape::Condition,
        })
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub(crate) fn instantiate(&self, spec: &SpecNode) -> Result<LeafInstance, BuildError> {
        let leaf_error = |source| BuildError::Leaf {
            kind: spec.kind.clone(),
            source,
        };
        match self.factories.get(&spec.kind) {
            None => Err(BuildError::UnknownKind(spec.kind.clone())),
            Some(Factory::Process(factory)) => {
                factory(spec).map(LeafInstance::Process).map_err(leaf_error)
            }
            Some(Factory::Condition(factory)) => {
                factory(spec).map(LeafInstance::Condition).map_err(leaf_error)
            }
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
