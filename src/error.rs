//! Errors raised when the inputs to a regionalisation or clustering run violate a constraint.
//!
//! These are carried inside [`anyhow::Error`] like every other error in the program, so callers
//! who need to react to a particular case can recover it with `downcast_ref::<BlobsError>()`.
use derive_more::Display;

/// A named constraint violation.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum BlobsError {
    /// A variable has zero standard deviation and cannot be standardised
    #[display("Variable {variable} has zero standard deviation and cannot be standardised")]
    DegenerateVariable {
        /// The offending variable
        variable: String,
    },
    /// The number of weights does not match the number of variables
    #[display("Expected {expected} weights (one per variable) but {actual} were given")]
    WeightCountMismatch {
        /// Number of variables
        expected: usize,
        /// Number of weights supplied
        actual: usize,
    },
    /// The search was asked to run for zero iterations
    #[display("Number of iterations must be at least 1 (got {requested})")]
    InvalidIterationCount {
        /// The requested number of iterations
        requested: u32,
    },
    /// No partition of the areas satisfies the floor constraint
    #[display("Floor of {floor} cannot be satisfied: {reason}")]
    InfeasibleConstraint {
        /// The floor constraint
        floor: f64,
        /// Which part of the input makes the floor unreachable
        reason: String,
    },
    /// The cluster sizing rules gave zero clusters
    #[display(
        "Cannot form any clusters from {total_members} regions with {avg_per_cluster} regions \
        per cluster"
    )]
    ClusterCountUnderflow {
        /// Number of regions to be clustered
        total_members: usize,
        /// Requested average number of regions per cluster
        avg_per_cluster: usize,
    },
}

impl std::error::Error for BlobsError {}
