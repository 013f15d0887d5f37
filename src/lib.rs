//! Common functionality for blobs: building max-p regions from areal data and clustering them.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod adjacency;
pub mod area;
pub mod cli;
pub mod cluster;
pub mod error;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod oracle;
pub mod output;
pub mod pipeline;
pub mod regionalisation;
pub mod score;
pub mod search;
pub mod settings;
pub mod standardise;
pub mod stats;
pub mod summary;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// This is the `blobs` folder inside the platform's configuration directory.
pub fn get_blobs_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir on this platform, so just use the current dir
        return PathBuf::new();
    };

    config_dir.push("blobs");
    config_dir
}
