use treevm::{Condition, LeafError, Value};

use crate::error::LeafValueError;

/// Holds when `input < state`.
#[derive(Debug, Default)]
pub struct Under;

impl Condition for Under {
    fn test(&self, input: &Value, state: Option<&Value>) -> Result<bool, LeafError> {
        let limit = state.ok_or(LeafValueError::MissingState("under"))?;
        let found = |value: &Value, role| LeafValueError::NotANumber {
            leaf: "under",
            role,
            found: value.type_name(),
        };
        let input_number = input.as_number().ok_or_else(|| found(input, "input"))?;
        let limit = limit.as_number().ok_or_else(|| found(limit, "state"))?;
        Ok(input_number < limit)
    }
}
