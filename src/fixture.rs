//! Fixtures for tests

use crate::adjacency::Adjacency;
use crate::area::{AreaID, VariableMatrix};
use itertools::iproduct;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Four areas with a population and an income each
#[fixture]
pub fn area_table() -> VariableMatrix {
    VariableMatrix::new(
        vec!["pop".into(), "income".into()],
        [
            (AreaID::new("A"), vec![100.0, 1.0]),
            (AreaID::new("B"), vec![200.0, 2.0]),
            (AreaID::new("C"), vec![300.0, 3.0]),
            (AreaID::new("D"), vec![400.0, 4.0]),
        ],
    )
    .unwrap()
}

/// The areas of [`area_table`] in a line: A-B-C-D
#[fixture]
pub fn line_adjacency() -> Adjacency {
    let ids = ["A", "B", "C", "D"].map(AreaID::new);
    Adjacency::new(
        ids.clone(),
        [
            (ids[0].clone(), ids[1].clone()),
            (ids[1].clone(), ids[2].clone()),
            (ids[2].clone(), ids[3].clone()),
        ],
    )
    .unwrap()
}

fn grid_id(row: usize, col: usize) -> AreaID {
    AreaID::new(&format!("r{row}c{col}"))
}

/// A 3x3 grid of areas whose variables are their column and row plus a little noise
#[fixture]
pub fn grid_table() -> VariableMatrix {
    let rows = iproduct!(0..3, 0..3).map(|(row, col)| {
        let noise = 0.1 * ((row * 3 + col) % 4) as f64;
        (grid_id(row, col), vec![col as f64 + noise, row as f64])
    });
    VariableMatrix::new(vec!["x".into(), "y".into()], rows).unwrap()
}

/// Rook contiguity for the areas of [`grid_table`]
#[fixture]
pub fn grid_adjacency() -> Adjacency {
    let areas = iproduct!(0..3, 0..3).map(|(row, col)| grid_id(row, col));
    let pairs = iproduct!(0..3, 0..3).flat_map(|(row, col)| {
        let mut pairs = Vec::new();
        if col + 1 < 3 {
            pairs.push((grid_id(row, col), grid_id(row, col + 1)));
        }
        if row + 1 < 3 {
            pairs.push((grid_id(row, col), grid_id(row + 1, col)));
        }
        pairs
    });
    Adjacency::new(areas, pairs).unwrap()
}
