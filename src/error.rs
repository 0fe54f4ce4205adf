//! Error types for the vertical disk simulation

use thiserror::Error;

/// Failures of the one-time symbolic derivation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("cannot differentiate with respect to slot {slot}: expression declares {arity} variables")]
    UnknownVariable { slot: usize, arity: usize },

    #[error("expression references variable slot {slot} but was compiled with arity {arity}")]
    UnboundVariable { slot: usize, arity: usize },

    #[error("expression handle {0} does not belong to this graph")]
    DanglingNode(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("configuration error: `{field}` has {found} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("non-finite acceleration on body {body}{} at step {step}", partner_suffix(.partner))]
    Singularity {
        step: usize,
        body: usize,
        partner: Option<usize>,
    },

    #[error("integrator is {0}")]
    State(&'static str),

    #[error("force law derivation failed: {0}")]
    Derivation(#[from] DerivationError),
}

fn partner_suffix(partner: &Option<usize>) -> String {
    match partner {
        Some(j) => format!(" (partner body {j})"),
        None => " (background field)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
