//! The module responsible for writing output data to disk.
use crate::area::{AreaID, FloorVariable};
use crate::cluster::ClusterResult;
use crate::oracle::Solution;
use crate::summary::RegionSummary;
use anyhow::{Context, Result, ensure};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "blobs_results";

/// The output file name for the region each area is assigned to
const AREA_REGIONS_FILE_NAME: &str = "area_regions.csv";

/// The output file name for the cluster each region is assigned to
const REGION_CLUSTERS_FILE_NAME: &str = "region_clusters.csv";

/// The output file name for cluster centres
const CLUSTER_CENTRES_FILE_NAME: &str = "cluster_centres.csv";

/// The prefix for region summary file names, which are followed by a timestamp
const REGION_SUMMARY_FILE_PREFIX: &str = "blobs_data_";

/// Get the default output directory for the model in the specified directory
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data.
///
/// # Arguments
///
/// * `output_dir` - The output directory to create or overwrite
/// * `allow_overwrite` - Whether to delete and recreate the folder if it is non-empty
///
/// # Returns
///
/// `true` if the output dir contained existing data which was deleted, `false` if not, or an error
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// The name of the region summary file for a run started at `timestamp`.
///
/// `copy` numbers files from runs started in the same second; the first has no suffix.
pub fn region_summary_file_name(timestamp: &DateTime<Local>, copy: u32) -> String {
    let timestamp = timestamp.format("%Y%m%d_%H%M%S");
    if copy == 0 {
        format!("{REGION_SUMMARY_FILE_PREFIX}{timestamp}.csv")
    } else {
        format!("{REGION_SUMMARY_FILE_PREFIX}{timestamp}_{}.csv", copy + 1)
    }
}

/// Create a new region summary file without replacing any existing one
fn create_region_summary_file(
    output_path: &Path,
    timestamp: &DateTime<Local>,
) -> Result<(PathBuf, File)> {
    let mut copy = 0;
    loop {
        let file_path = output_path.join(region_summary_file_name(timestamp, copy));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
        {
            Ok(file) => return Ok((file_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => copy += 1,
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Could not create {}", file_path.display()));
            }
        }
    }
}

/// Write the region summaries to a timestamped CSV file.
///
/// The columns are `region`, `score`, `size`, the floor variable's total, then a `_mean` and a
/// `_stdev` column for each variable.
///
/// # Returns
///
/// The path of the file written
pub fn write_region_summaries(
    output_path: &Path,
    summaries: &[RegionSummary],
    variables: &[String],
    floor_variable: &FloorVariable,
    timestamp: &DateTime<Local>,
) -> Result<PathBuf> {
    let (file_path, file) = create_region_summary_file(output_path, timestamp)?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec![
        "region".to_string(),
        "score".to_string(),
        "size".to_string(),
        floor_variable.to_string(),
    ];
    for variable in variables {
        header.push(format!("{variable}_mean"));
        header.push(format!("{variable}_stdev"));
    }
    writer.write_record(&header)?;

    for summary in summaries {
        ensure!(
            summary.statistics.len() == variables.len(),
            "Region {} has statistics for {} variables but there are {}",
            summary.region,
            summary.statistics.len(),
            variables.len()
        );
        let mut record = vec![
            summary.region.to_string(),
            summary.score.to_string(),
            summary.size.to_string(),
            summary.floor_total.to_string(),
        ];
        for stats in &summary.statistics {
            record.push(stats.mean.to_string());
            record.push(stats.std_dev.to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(file_path)
}

/// Represents a row in the area regions CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct AreaRegionRow {
    area_id: AreaID,
    region: usize,
}

/// Write the region each area is assigned to
pub fn write_area_regions(output_path: &Path, solution: &Solution) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path.join(AREA_REGIONS_FILE_NAME))?;
    for (area_id, &region) in solution.assignment() {
        writer.serialize(AreaRegionRow {
            area_id: area_id.clone(),
            region,
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Represents a row in the region clusters CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RegionClusterRow {
    region: usize,
    cluster: usize,
}

/// Write the cluster each region is assigned to and the cluster centres.
///
/// # Arguments
///
/// * `output_path` - Folder where files will be saved
/// * `clusters` - The result of clustering the regions, with one label per region in order
/// * `variables` - The variables whose means were clustered
pub fn write_clusters(
    output_path: &Path,
    clusters: &ClusterResult,
    variables: &[String],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path.join(REGION_CLUSTERS_FILE_NAME))?;
    for (region, &cluster) in clusters.labels.iter().enumerate() {
        writer.serialize(RegionClusterRow { region, cluster })?;
    }
    writer.flush()?;

    let mut writer = csv::Writer::from_path(output_path.join(CLUSTER_CENTRES_FILE_NAME))?;
    let header = std::iter::once("cluster".to_string())
        .chain(variables.iter().map(|variable| format!("{variable}_mean")));
    writer.write_record(header)?;
    for (cluster, centre) in clusters.centres.iter().enumerate() {
        let record = std::iter::once(cluster.to_string())
            .chain(centre.iter().map(ToString::to_string));
        writer.write_record(record)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::VariableMatrix;
    use crate::fixture::area_table;
    use crate::summary::summarise;
    use chrono::TimeZone;
    use itertools::{Itertools, assert_equal};
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn test_create_output_directory_new_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("new_output");

        // Create a new directory should succeed and return false (no overwrite)
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_empty_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("empty_output");
        fs::create_dir(&output_dir).unwrap();

        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_with_files() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("output_with_files");
        fs::create_dir(&output_dir).unwrap();
        fs::write(output_dir.join("existing_file.txt"), "some content").unwrap();

        // Without overwrite, this should fail
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(output_dir.join("existing_file.txt").exists());

        // With overwrite, the old contents should go
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(output_dir.is_dir());
        assert!(!output_dir.join("existing_file.txt").exists());
    }

    #[test]
    fn test_region_summary_file_name() {
        let timestamp = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(
            region_summary_file_name(&timestamp, 0),
            "blobs_data_20240305_140709.csv"
        );
        assert_eq!(
            region_summary_file_name(&timestamp, 1),
            "blobs_data_20240305_140709_2.csv"
        );
    }

    #[rstest]
    fn test_write_region_summaries(area_table: VariableMatrix) {
        let solution = Solution::from_regions(&[vec![0, 1], vec![2, 3]], &area_table).unwrap();
        let floor_variable = FloorVariable::AreaCount;
        let floor_values = area_table.floor_values(&floor_variable).unwrap();
        let summaries = summarise(&solution, &area_table, &floor_values).unwrap();
        let variables = vec!["pop".to_string(), "income".to_string()];
        let timestamp = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let dir = tempdir().unwrap();
        let file_path = write_region_summaries(
            dir.path(),
            &summaries,
            &variables,
            &floor_variable,
            &timestamp,
        )
        .unwrap();

        let mut reader = csv::Reader::from_path(file_path).unwrap();
        assert_equal(
            reader.headers().unwrap(),
            [
                "region",
                "score",
                "size",
                "areas",
                "pop_mean",
                "pop_stdev",
                "income_mean",
                "income_stdev",
            ],
        );
        let records: Vec<_> = reader.records().try_collect().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[1][0], "1");
        assert_eq!(&records[1][2], "2");
        assert_eq!(&records[1][4], "350");
    }

    #[rstest]
    fn test_write_region_summaries_same_second(area_table: VariableMatrix) {
        let solution = Solution::from_regions(&[vec![0, 1], vec![2, 3]], &area_table).unwrap();
        let floor_variable = FloorVariable::AreaCount;
        let floor_values = area_table.floor_values(&floor_variable).unwrap();
        let summaries = summarise(&solution, &area_table, &floor_values).unwrap();
        let variables = vec!["pop".to_string(), "income".to_string()];
        let timestamp = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let dir = tempdir().unwrap();
        let paths: Vec<_> = (0..3)
            .map(|_| {
                write_region_summaries(
                    dir.path(),
                    &summaries,
                    &variables,
                    &floor_variable,
                    &timestamp,
                )
                .unwrap()
            })
            .collect();
        assert_equal(
            paths.iter().map(|path| path.file_name().unwrap()),
            [
                "blobs_data_20240101_000000.csv",
                "blobs_data_20240101_000000_2.csv",
                "blobs_data_20240101_000000_3.csv",
            ],
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[rstest]
    fn test_write_area_regions(area_table: VariableMatrix) {
        let solution = Solution::from_regions(&[vec![0, 1], vec![2, 3]], &area_table).unwrap();
        let dir = tempdir().unwrap();
        write_area_regions(dir.path(), &solution).unwrap();

        let records: Vec<AreaRegionRow> =
            csv::Reader::from_path(dir.path().join(AREA_REGIONS_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        assert_equal(
            records,
            [("A", 0), ("B", 0), ("C", 1), ("D", 1)].map(|(id, region)| AreaRegionRow {
                area_id: id.into(),
                region,
            }),
        );
    }

    #[test]
    fn test_write_clusters() {
        let clusters = ClusterResult {
            labels: vec![1, 0, 1],
            centres: vec![vec![1.5, 2.0], vec![3.0, 4.5]],
            inertia: 0.0,
        };
        let variables = vec!["pop".to_string(), "income".to_string()];
        let dir = tempdir().unwrap();
        write_clusters(dir.path(), &clusters, &variables).unwrap();

        let records: Vec<RegionClusterRow> =
            csv::Reader::from_path(dir.path().join(REGION_CLUSTERS_FILE_NAME))
                .unwrap()
                .into_deserialize()
                .try_collect()
                .unwrap();
        assert_equal(
            records,
            [(0, 1), (1, 0), (2, 1)].map(|(region, cluster)| RegionClusterRow { region, cluster }),
        );

        let contents = fs::read_to_string(dir.path().join(CLUSTER_CENTRES_FILE_NAME)).unwrap();
        assert_eq!(
            contents,
            "cluster,pop_mean,income_mean\n0,1.5,2\n1,3,4.5\n"
        );
    }
}
