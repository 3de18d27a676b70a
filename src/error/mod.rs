/////////////////////////////////////////////////////////////////////////////////////
//
// Rumor model
//
// error module
//
// failures raised while building networks, seeding states and stepping the process
//
////////////////////////////////////////////////////////////////////////////////////

use thiserror::Error;

/// Errors produced by the simulation core.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SimError {
    /// A generator, state, coefficient or sweep input was malformed.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameters {
        /// Name of the offending parameter.
        name: &'static str,
        /// Human readable explanation.
        reason: String,
    },
    /// A network statistic cannot be computed for this network.
    #[error("degenerate network: {reason}")]
    DegenerateNetwork {
        /// Human readable explanation.
        reason: String,
    },
    /// A transition probability fell outside [0, 1] under the strict policy.
    #[error("transition probability {probability} of node {node} lies outside [0, 1]")]
    NumericDegeneracy {
        /// Node whose spreading probability is out of range.
        node: usize,
        /// The offending probability.
        probability: f64,
    },
}

impl SimError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> SimError {
        SimError::InvalidParameters {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> SimError {
        SimError::DegenerateNetwork {
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the core.
pub type Result<T, E = SimError> = std::result::Result<T, E>;
