//! Errors raised while sequencing a patrol

use std::io;

use thiserror::Error;

use crate::state_machine::Outcome;

/// Errors raised while sequencing a patrol
#[derive(Debug, Error)]
pub enum PatrolError {
    /// An external command could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The action command ran but failed without reporting a status
    #[error("action command for '{server}' failed: {detail}")]
    ActionCommand { server: String, detail: String },

    /// The action command output had no final goal status
    #[error("could not read a goal status for '{server}' from: {output}")]
    UnparsedStatus { server: String, output: String },

    /// A state returned an outcome that leads nowhere
    #[error("state '{state}' returned outcome '{outcome}' with no transition")]
    InvalidTransition { state: String, outcome: Outcome },

    /// The transition graph does not hold together
    #[error("state machine is inconsistent: {0}")]
    Inconsistent(String),

    /// A waypoint with a non-finite value or a non-unit orientation
    #[error("invalid waypoint: {0}")]
    InvalidWaypoint(String),
}
