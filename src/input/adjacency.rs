//! Code for reading which areas border one another from a CSV file.
use super::{input_err_msg, read_csv_optional};
use crate::adjacency::Adjacency;
use crate::area::{AreaID, VariableMatrix};
use crate::id::IDCollection;
use anyhow::{Context, Result};
use indexmap::IndexSet;
use serde::Deserialize;
use std::path::Path;

const ADJACENCY_FILE_NAME: &str = "adjacency.csv";

/// A pair of contiguous areas, as read from file
#[derive(PartialEq, Debug, Deserialize)]
struct AdjacencyRaw {
    area_id: String,
    neighbour_id: String,
}

/// Read the contiguity structure from a CSV file.
///
/// A file with a header but no rows is allowed, in which case every area is an island.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `areas` - The area table; the adjacency's areas follow its row order
pub fn read_adjacency(model_dir: &Path, areas: &VariableMatrix) -> Result<Adjacency> {
    let file_path = model_dir.join(ADJACENCY_FILE_NAME);
    let iter = read_csv_optional::<AdjacencyRaw>(&file_path)?;
    read_adjacency_from_iter(iter, areas).with_context(|| input_err_msg(&file_path))
}

fn read_adjacency_from_iter<I>(iter: I, areas: &VariableMatrix) -> Result<Adjacency>
where
    I: Iterator<Item = AdjacencyRaw>,
{
    let area_ids: IndexSet<AreaID> = areas.area_ids().cloned().collect();
    let pairs = iter
        .map(|raw| {
            Ok((
                area_ids.get_id_by_str(&raw.area_id)?,
                area_ids.get_id_by_str(&raw.neighbour_id)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Adjacency::new(area_ids, pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{area_table, assert_error};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn raw(area_id: &str, neighbour_id: &str) -> AdjacencyRaw {
        AdjacencyRaw {
            area_id: area_id.into(),
            neighbour_id: neighbour_id.into(),
        }
    }

    #[rstest]
    fn test_read_adjacency(area_table: VariableMatrix) {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(ADJACENCY_FILE_NAME)).unwrap();
            writeln!(file, "area_id,neighbour_id\nA,B\nC,B\nB,A").unwrap();
        }

        let adjacency = read_adjacency(dir.path(), &area_table).unwrap();
        assert!(adjacency.matches(&area_table));
        assert_eq!(adjacency.n_pairs(), 2);
        assert!(adjacency.are_adjacent(1, 2));
        assert!(!adjacency.are_adjacent(2, 3));
    }

    #[rstest]
    fn test_read_adjacency_header_only(area_table: VariableMatrix) {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(ADJACENCY_FILE_NAME)).unwrap();
            writeln!(file, "area_id,neighbour_id").unwrap();
        }

        let adjacency = read_adjacency(dir.path(), &area_table).unwrap();
        assert_eq!(adjacency.n_pairs(), 0);
        assert_eq!(adjacency.components().len(), 4);
    }

    #[rstest]
    fn test_read_adjacency_bad(area_table: VariableMatrix) {
        assert_error!(
            read_adjacency_from_iter([raw("A", "Z")].into_iter(), &area_table),
            "Unknown ID Z found"
        );
        assert_error!(
            read_adjacency_from_iter([raw("C", "C")].into_iter(), &area_table),
            "Area C cannot be adjacent to itself"
        );
    }
}
