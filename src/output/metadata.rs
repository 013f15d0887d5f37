//! Code for writing metadata to file
use anyhow::{Result, anyhow};
use chrono::prelude::*;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
#[allow(clippy::doc_markdown)]
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get information about program version from git
fn get_git_hash() -> String {
    let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT else {
        return "unknown".into();
    };

    if built_info::GIT_DIRTY == Some(true) {
        format!("{hash}-dirty")
    } else {
        hash.into()
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    results: &'a ResultMetadata,
    program: ProgramMetadata<'a>,
    platform: PlatformMetadata,
}

/// Information about the model run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the model which was run
    model_path: &'a Path,
    /// The date and time on which the run started
    datetime: String,
}

/// Headline results of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultMetadata {
    /// Number of times the solver was run
    pub iterations: u32,
    /// Seed for the solver, if one was given
    pub seed: Option<u64>,
    /// The objective score of the best solution
    pub best_score: f64,
    /// Number of regions in the best solution
    pub n_regions: usize,
    /// Number of clusters the regions were grouped into
    pub n_clusters: usize,
    /// The k-means inertia of the clustering
    pub inertia: f64,
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
    /// The target architecture for the build (e.g. x86_64-unknown-linux-gnu)
    target: &'a str,
    /// Whether it is a debug build
    is_debug: bool,
    /// The version of rustc used to compile the program
    rustc_version: &'a str,
    /// When the program was built
    build_time_utc: &'a str,
    /// The git commit hash for this version of the program (if known)
    git_commit_hash: String,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// Information about the platform the program is running on.
///
/// The fields correspond to different data available from the [`PlatformInfo`] struct.
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
    osname: String,
}

impl PlatformMetadata {
    fn new() -> Result<Self> {
        let info = PlatformInfo::new()
            .map_err(|err| anyhow!("Unable to determine platform info: {err}"))?;

        Ok(Self {
            sysname: info.sysname().to_string_lossy().into(),
            nodename: info.nodename().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            version: info.version().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        })
    }
}

/// Write metadata to the specified output path in TOML format
///
/// # Arguments
///
/// * `output_path` - Folder where the file will be saved
/// * `model_path` - Folder the model was loaded from
/// * `started` - When the run started
/// * `results` - Headline results of the run
pub fn write_metadata(
    output_path: &Path,
    model_path: &Path,
    started: &DateTime<Local>,
    results: &ResultMetadata,
) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            model_path,
            datetime: started.to_rfc2822(),
        },
        results,
        program: ProgramMetadata::default(),
        platform: PlatformMetadata::new()?,
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_metadata() {
        let dir = tempdir().unwrap();
        let results = ResultMetadata {
            iterations: 5,
            seed: None,
            best_score: 12.5,
            n_regions: 3,
            n_clusters: 1,
            inertia: 0.25,
        };
        write_metadata(dir.path(), Path::new("models/grid"), &Local::now(), &results).unwrap();

        let contents = fs::read_to_string(dir.path().join(METADATA_FILE_NAME)).unwrap();
        let value: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(value["results"]["n_regions"].as_integer(), Some(3));
        assert_eq!(value["program"]["name"].as_str(), Some("blobs"));
        assert!(value["run"]["model_path"].as_str().is_some());
        assert!(!value["results"].as_table().unwrap().contains_key("seed"));
    }
}
