//! Functionality for running a model from start to finish.
//!
//! A run selects and standardises the chosen variables, searches for the best regionalisation,
//! summarises the regions, clusters them and writes everything to the output folder.
use crate::adjacency::Adjacency;
use crate::area::{FloorVariable, VariableMatrix};
use crate::cluster::{ClusterResult, ClusterSizing, KMeans, resize};
use crate::model::{ClusteringParameters, Model};
use crate::oracle::{OracleOptions, Problem, RegionGrowingOracle};
use crate::output::metadata::{ResultMetadata, write_metadata};
use crate::output::{write_area_regions, write_clusters, write_region_summaries};
use crate::regionalisation::{Regionalisation, SortMethod};
use crate::search::{IterationReport, SearchOutcome, search};
use crate::standardise::{StandardisationMethod, standardise};
use crate::summary::{RegionSummary, mean_table, summarise};
use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use std::path::{Path, PathBuf};

/// Everything needed to build regions from an area table
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalisationConfig {
    /// The variables to build regions from
    pub variables: Vec<String>,
    /// The variable each region must reach the floor of
    pub floor_variable: FloorVariable,
    /// The minimum total of the floor variable for each region
    pub floor: f64,
    /// How many times to run the solver
    pub iterations: u32,
    /// How variables are standardised
    pub method: StandardisationMethod,
    /// Weights for the `weighted` method
    pub weights: Vec<f64>,
    /// Options for the solver
    pub oracle: OracleOptions,
    /// How to order the regions afterwards, if at all
    pub sort_regions: Option<SortMethod>,
}

impl RegionalisationConfig {
    /// Take the configuration from a model's parameters
    pub fn from_model(model: &Model) -> Self {
        let parameters = &model.parameters;
        Self {
            variables: model.variables().to_vec(),
            floor_variable: parameters.floor_variable.clone(),
            floor: parameters.floor,
            iterations: parameters.iterations,
            method: parameters.method,
            weights: parameters.weights.clone(),
            oracle: parameters.oracle_options(),
            sort_regions: parameters.sort_regions,
        }
    }
}

/// The result of building regions
#[derive(Debug)]
pub struct RegionalisationOutcome {
    /// The best regionalisation found
    pub regionalisation: Regionalisation,
    /// Statistics for each region
    pub summaries: Vec<RegionSummary>,
    /// Progress reports for each iteration of the search
    pub history: Vec<IterationReport>,
}

/// The result of clustering regions
#[derive(Debug)]
pub struct ClusteringOutcome {
    /// The number of clusters and regions per cluster used
    pub sizing: ClusterSizing,
    /// The cluster labels and centres
    pub result: ClusterResult,
}

/// The result of a complete run
#[derive(Debug)]
pub struct RunOutcome {
    /// The regions
    pub regions: RegionalisationOutcome,
    /// The clusters of regions
    pub clusters: ClusteringOutcome,
    /// The region summary file, if one was written
    pub summary_file: Option<PathBuf>,
}

/// Build regions from an area table.
///
/// # Arguments
///
/// * `areas` - The area table, including the floor variable
/// * `adjacency` - Which areas border one another
/// * `config` - What to build regions from and how
pub fn regionalise(
    areas: &VariableMatrix,
    adjacency: &Adjacency,
    config: &RegionalisationConfig,
) -> Result<RegionalisationOutcome> {
    let raw = areas.select(&config.variables)?;
    let floor_values = areas.floor_values(&config.floor_variable)?;
    let solver_matrix = standardise(&raw, config.method, &config.weights)?;
    let problem = Problem::new(adjacency, &solver_matrix, &floor_values, config.floor)?;

    info!(
        "Building regions from {} areas with {} >= {} ({} iterations)",
        raw.n_areas(),
        config.floor_variable,
        config.floor,
        config.iterations
    );
    let mut oracle = RegionGrowingOracle::new(&config.oracle);
    let SearchOutcome { best, history } = search(&mut oracle, &problem, config.iterations)?;

    let mut regionalisation = Regionalisation {
        solution: best,
        floor_variable: config.floor_variable.clone(),
        floor: config.floor,
        variables: config.variables.clone(),
        method: config.method,
        sorted_by: None,
    };
    if let Some(method) = config.sort_regions {
        regionalisation.sort_regions(&solver_matrix, method)?;
    }

    let summaries = summarise(&regionalisation.solution, &raw, &floor_values)?;

    Ok(RegionalisationOutcome {
        regionalisation,
        summaries,
        history,
    })
}

/// Group regions into clusters by the means of their variables
pub fn cluster_regions(
    summaries: &[RegionSummary],
    parameters: &ClusteringParameters,
) -> Result<ClusteringOutcome> {
    let sizing = resize(
        parameters.n_clusters,
        parameters.regions_per_cluster,
        summaries.len(),
    )?;
    let kmeans = KMeans {
        seed: parameters.seed,
        ..KMeans::new(sizing.n_clusters)
    };
    let result = kmeans.fit(&mean_table(summaries))?;
    info!(
        "Grouped {} regions into {} clusters (about {} regions per cluster, inertia {:.3})",
        summaries.len(),
        sizing.n_clusters,
        sizing.avg_per_cluster,
        result.inertia
    );

    Ok(ClusteringOutcome { sizing, result })
}

/// Run a model and write the results to `output_path`.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `save_data` - Whether to write the region summaries to file
pub fn run(model: &Model, output_path: &Path, save_data: bool) -> Result<RunOutcome> {
    let started = Local::now();
    let config = RegionalisationConfig::from_model(model);
    let regions = regionalise(&model.areas, &model.adjacency, &config)?;

    write_area_regions(output_path, &regions.regionalisation.solution)
        .context("Failed to write area regions")?;
    let summary_file = if save_data {
        let file_path = write_region_summaries(
            output_path,
            &regions.summaries,
            &config.variables,
            &config.floor_variable,
            &started,
        )
        .context("Failed to write region summaries")?;
        info!("Region summaries written to {}", file_path.display());
        Some(file_path)
    } else {
        None
    };

    let clusters = cluster_regions(
        &regions.summaries,
        &model.parameters.clustering.clone().unwrap_or_default(),
    )?;
    write_clusters(output_path, &clusters.result, &config.variables)
        .context("Failed to write clusters")?;

    let solution = &regions.regionalisation.solution;
    write_metadata(
        output_path,
        &model.model_path,
        &started,
        &ResultMetadata {
            iterations: config.iterations,
            seed: config.oracle.seed,
            best_score: solution.score(),
            n_regions: solution.n_regions(),
            n_clusters: clusters.sizing.n_clusters,
            inertia: clusters.result.inertia,
        },
    )
    .context("Failed to save metadata")?;

    Ok(RunOutcome {
        regions,
        clusters,
        summary_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlobsError;
    use crate::fixture::{grid_adjacency, grid_table};
    use rstest::{fixture, rstest};

    #[fixture]
    fn config() -> RegionalisationConfig {
        RegionalisationConfig {
            variables: vec!["x".into(), "y".into()],
            floor_variable: FloorVariable::AreaCount,
            floor: 3.0,
            iterations: 3,
            method: StandardisationMethod::EqualVotes,
            weights: Vec::new(),
            oracle: OracleOptions {
                seed: Some(5),
                ..OracleOptions::default()
            },
            sort_regions: Some(SortMethod::Objective),
        }
    }

    #[rstest]
    fn test_regionalise(
        grid_table: VariableMatrix,
        grid_adjacency: Adjacency,
        config: RegionalisationConfig,
    ) {
        let outcome = regionalise(&grid_table, &grid_adjacency, &config).unwrap();
        let solution = &outcome.regionalisation.solution;
        assert_eq!(outcome.history.len(), 3);
        assert_eq!(outcome.summaries.len(), solution.n_regions());
        assert!(outcome.summaries.iter().all(|s| s.floor_total >= 3.0));
        assert_eq!(
            outcome.regionalisation.sorted_by,
            Some(SortMethod::Objective)
        );
        for pair in outcome.summaries.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
    }

    #[rstest]
    fn test_regionalise_zero_iterations(
        grid_table: VariableMatrix,
        grid_adjacency: Adjacency,
        mut config: RegionalisationConfig,
    ) {
        config.iterations = 0;
        let err = regionalise(&grid_table, &grid_adjacency, &config).unwrap_err();
        assert_eq!(
            err.downcast_ref::<BlobsError>(),
            Some(&BlobsError::InvalidIterationCount { requested: 0 })
        );
    }

    #[rstest]
    fn test_cluster_regions(
        grid_table: VariableMatrix,
        grid_adjacency: Adjacency,
        mut config: RegionalisationConfig,
    ) {
        config.floor = 1.0;
        let outcome = regionalise(&grid_table, &grid_adjacency, &config).unwrap();
        assert_eq!(outcome.summaries.len(), 9);

        let parameters = ClusteringParameters {
            n_clusters: Some(3),
            regions_per_cluster: None,
            seed: Some(1),
        };
        let clusters = cluster_regions(&outcome.summaries, &parameters).unwrap();
        assert_eq!(
            clusters.sizing,
            ClusterSizing {
                n_clusters: 3,
                avg_per_cluster: 3
            }
        );
        assert_eq!(clusters.result.labels.len(), 9);
        assert_eq!(clusters.result.centres.len(), 3);

        // Too few regions for the default of ten per cluster
        let err = cluster_regions(&outcome.summaries[..4], &ClusteringParameters::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BlobsError>(),
            Some(BlobsError::ClusterCountUnderflow { .. })
        ));
    }
}
