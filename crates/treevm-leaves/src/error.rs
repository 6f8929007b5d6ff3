use thiserror::Error;

/// Why a catalogue leaf rejected a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LeafValueError {
    #[error("`{leaf}` expects a number as its {role}, got {found}")]
    NotANumber {
        leaf: &'static str,
        role: &'static str,
        found: &'static str,
    },
    #[error("`{0}` ran before its state was set")]
    MissingState(&'static str),
    #[error("`delay` cannot wait {0} ms")]
    InvalidDelay(f64),
}
