//! The model: the area data and contiguity structure plus the parameters for a run.
use crate::adjacency::Adjacency;
use crate::area::{FloorValues, VariableMatrix};
use crate::error::BlobsError;
use crate::standardise::StandardisationMethod;
use anyhow::{Context, Result, ensure};
use std::path::{Path, PathBuf};

pub mod parameters;
pub use parameters::{ClusteringParameters, RunParameters, VariableSelection};

/// Model definition
#[derive(Debug)]
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// All the input data for each area
    pub areas: VariableMatrix,
    /// Which areas border one another
    pub adjacency: Adjacency,
    /// Parameters from the model TOML file
    pub parameters: RunParameters,
    variables: Vec<String>,
}

impl Model {
    /// Create a new [`Model`], checking that the pieces are consistent.
    ///
    /// # Arguments
    ///
    /// * `model_path` - Folder the model was loaded from
    /// * `areas` - The area table
    /// * `adjacency` - The contiguity structure, which must follow the row order of `areas`
    /// * `parameters` - The run parameters
    pub fn new(
        model_path: &Path,
        areas: VariableMatrix,
        adjacency: Adjacency,
        parameters: RunParameters,
    ) -> Result<Self> {
        ensure!(
            adjacency.matches(&areas),
            "Adjacency and area table must cover the same areas in the same order"
        );

        let variables = parameters
            .variables
            .resolve(&areas, &parameters.floor_variable);
        areas
            .select(&variables)
            .context("Invalid variables in model parameters")?;
        areas
            .floor_values(&parameters.floor_variable)
            .context("Invalid floor variable in model parameters")?;
        if parameters.method == StandardisationMethod::Weighted {
            ensure!(
                parameters.weights.len() == variables.len(),
                BlobsError::WeightCountMismatch {
                    expected: variables.len(),
                    actual: parameters.weights.len()
                }
            );
        }

        Ok(Self {
            model_path: model_path.to_path_buf(),
            areas,
            adjacency,
            parameters,
            variables,
        })
    }

    /// The names of the variables regions are built from
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The raw values of the variables regions are built from
    pub fn selected_areas(&self) -> Result<VariableMatrix> {
        self.areas.select(&self.variables)
    }

    /// The floor variable for each area
    pub fn floor_values(&self) -> Result<FloorValues> {
        self.areas.floor_values(&self.parameters.floor_variable)
    }

    /// The model name (i.e. the name of the model folder)
    pub fn name(&self) -> String {
        self.model_path
            .file_name()
            .map_or_else(|| "model".into(), |name| name.to_string_lossy().into())
    }
}
