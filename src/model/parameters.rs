//! Defines the `RunParameters` struct, which represents the contents of `model.toml`.
use crate::area::{FloorVariable, VariableMatrix};
use crate::input::{input_err_msg, read_toml};
use crate::oracle::OracleOptions;
use crate::regionalisation::SortMethod;
use crate::standardise::StandardisationMethod;
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

/// The keyword meaning "every variable except the floor variable"
const ALL_VARIABLES: &str = "all";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_iterations, u32, 10);
define_param_default!(default_initial, u32, 10);
define_param_default!(default_max_local_search_passes, u32, 100);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct RunParameters {
    /// The variables to build regions from
    pub variables: VariableSelection,
    /// The variable each region must reach the floor of
    pub floor_variable: FloorVariable,
    /// The minimum total of the floor variable for each region
    pub floor: f64,
    /// How many times to run the solver
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// How variables are standardised before solving
    #[serde(default)]
    pub method: StandardisationMethod,
    /// One weight per variable, for the `weighted` method
    #[serde(default)]
    pub weights: Vec<f64>,
    /// Number of constructions the solver attempts on each run
    #[serde(default = "default_initial")]
    pub initial: u32,
    /// Maximum number of local search passes on each run
    #[serde(default = "default_max_local_search_passes")]
    pub max_local_search_passes: u32,
    /// Seed for the solver's random number generator
    pub seed: Option<u64>,
    /// How to order the regions of the best solution
    pub sort_regions: Option<SortMethod>,
    /// Whether to save the region summaries (overrides program settings)
    pub save_data: Option<bool>,
    /// Options for clustering the regions
    pub clustering: Option<ClusteringParameters>,
}

/// Which variables regions are built from
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "VariableSelectionRaw")]
pub enum VariableSelection {
    /// Every variable except the floor variable
    All,
    /// The named variables, in order
    Named(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VariableSelectionRaw {
    Keyword(String),
    Names(Vec<String>),
}

impl TryFrom<VariableSelectionRaw> for VariableSelection {
    type Error = String;

    fn try_from(raw: VariableSelectionRaw) -> Result<Self, Self::Error> {
        match raw {
            VariableSelectionRaw::Keyword(keyword) if keyword == ALL_VARIABLES => Ok(Self::All),
            VariableSelectionRaw::Keyword(keyword) => Err(format!(
                "variables must be a list of names or \"{ALL_VARIABLES}\" (got \"{keyword}\")"
            )),
            VariableSelectionRaw::Names(names) => Ok(Self::Named(names)),
        }
    }
}

impl VariableSelection {
    /// The names of the selected variables.
    ///
    /// # Arguments
    ///
    /// * `areas` - The area table
    /// * `floor_variable` - The floor variable, which is left out when selecting all variables
    pub fn resolve(&self, areas: &VariableMatrix, floor_variable: &FloorVariable) -> Vec<String> {
        match self {
            Self::All => areas
                .variables()
                .filter(|&name| !matches!(floor_variable, FloorVariable::Column(f) if f == name))
                .map(String::from)
                .collect(),
            Self::Named(names) => names.clone(),
        }
    }
}

/// The `[clustering]` section of the model file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ClusteringParameters {
    /// Number of clusters
    pub n_clusters: Option<usize>,
    /// Average number of regions per cluster (takes precedence over `n_clusters`)
    pub regions_per_cluster: Option<usize>,
    /// Seed for the k-means random number generator
    pub seed: Option<u64>,
}

/// Check that the `floor` parameter is valid
fn check_floor(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "floor must be a finite number greater than zero"
    );

    Ok(())
}

/// Check that the `weights` parameter is valid
fn check_weights(method: StandardisationMethod, weights: &[f64]) -> Result<()> {
    if method != StandardisationMethod::Weighted {
        if !weights.is_empty() {
            warn!("weights are only used with the \"weighted\" method and will be ignored");
        }
        return Ok(());
    }

    ensure!(
        !weights.is_empty(),
        "weights must be given when method is \"weighted\""
    );
    ensure!(
        weights.iter().all(|w| w.is_finite() && *w >= 0.0),
        "weights must be finite and non-negative"
    );

    Ok(())
}

/// Check that the `initial` parameter is valid
fn check_initial(value: u32) -> Result<()> {
    ensure!(value > 0, "initial cannot be zero");

    Ok(())
}

impl RunParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`RunParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<RunParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let params: RunParameters = read_toml(&file_path)?;

        params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_floor(self.floor)?;
        check_weights(self.method, &self.weights)?;
        check_initial(self.initial)?;

        Ok(())
    }

    /// Options for the built-in solver
    pub fn oracle_options(&self) -> OracleOptions {
        OracleOptions {
            initial: self.initial,
            max_local_search_passes: self.max_local_search_passes,
            seed: self.seed,
        }
    }
}
