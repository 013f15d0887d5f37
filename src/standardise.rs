//! Preparing variables for the regionalisation solver.
//!
//! Without standardisation, variables with large values dominate the objective function. The
//! methods here let the user decide how much say each variable has.
use crate::area::VariableMatrix;
use crate::error::BlobsError;
use crate::stats::{mean, std_dev};
use anyhow::{Result, ensure};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// How variables are weighted against one another
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum StandardisationMethod {
    /// Use the raw values, so variables are implicitly weighted by their scale
    #[string = "default"]
    PassThrough,
    /// Convert every variable to z-scores so that each has an equal say
    #[default]
    #[string = "equal_votes"]
    #[alias = "equal votes"]
    EqualVotes,
    /// Convert to z-scores, then scale each variable by the square root of a user-supplied weight
    #[string = "weighted"]
    Weighted,
}

/// Create a solver-ready copy of `matrix` using the given method.
///
/// # Arguments
///
/// * `matrix` - Raw variable values
/// * `method` - The standardisation method
/// * `weights` - One weight per variable (only used for [`StandardisationMethod::Weighted`])
pub fn standardise(
    matrix: &VariableMatrix,
    method: StandardisationMethod,
    weights: &[f64],
) -> Result<VariableMatrix> {
    match method {
        StandardisationMethod::PassThrough => Ok(matrix.clone()),
        StandardisationMethod::EqualVotes => {
            matrix.map_columns(|_, name, column| z_scores(name, &column, 1.0))
        }
        StandardisationMethod::Weighted => {
            ensure!(
                weights.len() == matrix.n_variables(),
                BlobsError::WeightCountMismatch {
                    expected: matrix.n_variables(),
                    actual: weights.len(),
                }
            );
            matrix.map_columns(|index, name, column| z_scores(name, &column, weights[index].sqrt()))
        }
    }
}

/// Convert a column to z-scores, multiplied by `scale`.
///
/// A column whose standard deviation is within rounding error of zero counts as constant.
fn z_scores(name: &str, column: &[f64], scale: f64) -> Result<Vec<f64>> {
    let mean = mean(column);
    let sd = std_dev(column);
    let tolerance = f64::EPSILON * mean.abs().max(1.0) * column.len() as f64;
    ensure!(
        sd > tolerance,
        BlobsError::DegenerateVariable {
            variable: name.to_string()
        }
    );

    Ok(column.iter().map(|x| (x - mean) / sd * scale).collect())
}
