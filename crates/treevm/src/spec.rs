//! Specification trees: the declarative input the builder turns into a graph.
//!
//! On the wire a node is an object with a `kind` (alias `type`) next to its
//! kind-specific properties:
//!
//! ```json
//! {"kind": "component",
//!  "producers": [{"kind": "value", "value": 3}],
//!  "consumers": [{"kind": "add", "state": {"kind": "value", "value": 4}}]}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::value::Value;

pub const COMPONENT: &str = "component";
pub const GATE: &str = "gate";
pub const SWITCH: &str = "switch";
pub const VALUE: &str = "value";
pub const BROADCAST: &str = "broadcast";
pub const LISTENER: &str = "listener";

/// Kinds interpreted by the builder itself. Everything else is a leaf kind.
pub const STRUCTURAL_KINDS: [&str; 6] = [COMPONENT, GATE, SWITCH, VALUE, BROADCAST, LISTENER];

pub fn is_structural(kind: &str) -> bool {
    STRUCTURAL_KINDS.contains(&kind)
}

/// One node of a specification tree. Immutable once handed to the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecNode {
    #[serde(alias = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub properties: BTreeMap<String, Property>,
}

/// Property value: a subtree, a list of subtrees, or a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Property {
    Node(SpecNode),
    Nodes(Vec<SpecNode>),
    Literal(Value),
}

impl From<SpecNode> for Property {
    fn from(node: SpecNode) -> Self {
        Property::Node(node)
    }
}

impl From<Vec<SpecNode>> for Property {
    fn from(nodes: Vec<SpecNode>) -> Self {
        Property::Nodes(nodes)
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Literal(value)
    }
}

impl SpecNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, property: impl Into<Property>) -> Self {
        self.properties.insert(name.into(), property.into());
        self
    }

    pub fn component(producers: Vec<SpecNode>, consumers: Vec<SpecNode>) -> Self {
        Self::new(COMPONENT)
            .with("producers", producers)
            .with("consumers", consumers)
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Self::new(VALUE).with("value", value.into())
    }

    pub fn broadcast(key: &str) -> Self {
        Self::new(BROADCAST).with("key", Value::from(key))
    }

    pub fn listener(key: &str) -> Self {
        Self::new(LISTENER).with("key", Value::from(key))
    }

    pub fn gate(conditions: Vec<SpecNode>, positive: SpecNode) -> Self {
        Self::new(GATE)
            .with("conditions", conditions)
            .with("positive", positive)
    }

    pub fn switch(conditions: Vec<SpecNode>, positive: SpecNode, negative: SpecNode) -> Self {
        Self::new(SWITCH)
            .with("conditions", conditions)
            .with("positive", positive)
            .with("negative", negative)
    }

    pub fn leaf(kind: impl Into<String>) -> Self {
        Self::new(kind)
    }

    pub fn with_state(self, state: SpecNode) -> Self {
        self.with("state", state)
    }

    pub fn is_structural(&self) -> bool {
        is_structural(&self.kind)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    fn missing(&self, property: &str) -> BuildError {
        BuildError::MissingProperty {
            kind: self.kind.clone(),
            property: property.to_string(),
        }
    }

    fn wrong_shape(&self, property: &str, expected: &'static str) -> BuildError {
        BuildError::WrongShape {
            kind: self.kind.clone(),
            property: property.to_string(),
            expected,
        }
    }

    /// Required single subtree.
    pub fn node(&self, name: &str) -> Result<&SpecNode, BuildError> {
        self.optional_node(name)?.ok_or_else(|| self.missing(name))
    }

    /// Optional single subtree; `null` counts as absent.
    pub fn optional_node(&self, name: &str) -> Result<Option<&SpecNode>, BuildError> {
        match self.property(name) {
            None | Some(Property::Literal(Value::Unit)) => Ok(None),
            Some(Property::Node(node)) => Ok(Some(node)),
            Some(_) => Err(self.wrong_shape(name, "a specification node")),
        }
    }

    /// Required list of subtrees. A single subtree is read as a one-element list.
    pub fn nodes(&self, name: &str) -> Result<&[SpecNode], BuildError> {
        match self.property(name) {
            None => Err(self.missing(name)),
            Some(Property::Nodes(nodes)) => Ok(nodes),
            Some(Property::Node(node)) => Ok(std::slice::from_ref(node)),
            Some(Property::Literal(_)) => Err(self.wrong_shape(name, "a list of specification nodes")),
        }
    }

    /// Required literal.
    pub fn literal(&self, name: &str) -> Result<&Value, BuildError> {
        match self.property(name) {
            None => Err(self.missing(name)),
            Some(Property::Literal(value)) => Ok(value),
            Some(_) => Err(self.wrong_shape(name, "a literal")),
        }
    }

    /// Broadcast/listener key.
    pub fn key(&self) -> Result<&str, BuildError> {
        self.literal("key")?
            .as_text()
            .ok_or_else(|| self.wrong_shape("key", "a string"))
    }

    /// Optional state subtree of a leaf.
    pub fn state(&self) -> Result<Option<&SpecNode>, BuildError> {
        self.optional_node("state")
    }
}

#[cfg(feature = "json")]
impl SpecNode {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
