//! The interface to regionalisation solvers.
//!
//! A solver (an "oracle") takes the contiguity structure, the solver-ready variables and a floor
//! constraint and returns a partition of the areas into contiguous regions, each of which meets
//! the floor. Solvers are randomised, so calling one repeatedly explores different solutions; the
//! search driver relies on this.
use crate::adjacency::Adjacency;
use crate::area::{AreaID, FloorValues, VariableMatrix};
use crate::score::objective_contribution;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;

pub mod region_growing;
pub use region_growing::{OracleOptions, RegionGrowingOracle};

/// A regionalisation solver
pub trait RegionalisationOracle {
    /// Partition the areas of `problem` into regions.
    ///
    /// Each call should draw fresh randomness. An error means that no partition could be found;
    /// if that is because the floor cannot be met, the error should be
    /// [`BlobsError::InfeasibleConstraint`](crate::error::BlobsError::InfeasibleConstraint).
    fn solve(&mut self, problem: &Problem) -> Result<Solution>;
}

/// The input to a regionalisation solver
#[derive(Debug)]
pub struct Problem<'a> {
    adjacency: &'a Adjacency,
    matrix: &'a VariableMatrix,
    rows: Vec<&'a [f64]>,
    floor_values: Vec<f64>,
    floor: f64,
}

impl<'a> Problem<'a> {
    /// Create a new [`Problem`].
    ///
    /// # Arguments
    ///
    /// * `adjacency` - Which areas are contiguous
    /// * `matrix` - Solver-ready variable values (must cover the same areas as `adjacency`)
    /// * `floor_values` - Value of the floor variable for every area
    /// * `floor` - Minimum total of the floor variable for each region
    pub fn new(
        adjacency: &'a Adjacency,
        matrix: &'a VariableMatrix,
        floor_values: &FloorValues,
        floor: f64,
    ) -> Result<Self> {
        ensure!(
            adjacency.matches(matrix),
            "Adjacency and variable data must cover the same areas in the same order"
        );
        ensure!(matrix.n_areas() > 0, "There are no areas to regionalise");
        ensure!(
            floor.is_finite() && floor > 0.0,
            "Floor must be a finite number greater than zero"
        );

        let floor_values = matrix
            .area_ids()
            .map(|id| {
                let value = floor_values
                    .get(id)
                    .copied()
                    .with_context(|| format!("No floor value for area {id}"))?;
                ensure!(value >= 0.0, "Floor value for area {id} cannot be negative");
                Ok(value)
            })
            .collect::<Result<Vec<_>>>()?;
        let rows = matrix.iter().map(|(_, row)| row).collect();

        Ok(Self {
            adjacency,
            matrix,
            rows,
            floor_values,
            floor,
        })
    }

    /// The contiguity structure
    pub fn adjacency(&self) -> &Adjacency {
        self.adjacency
    }

    /// The solver-ready variables
    pub fn matrix(&self) -> &VariableMatrix {
        self.matrix
    }

    /// The number of areas
    pub fn n_areas(&self) -> usize {
        self.rows.len()
    }

    /// The variable values for the area with the given index
    pub fn row(&self, index: usize) -> &[f64] {
        self.rows[index]
    }

    /// The floor value for the area with the given index
    pub fn floor_value(&self, index: usize) -> f64 {
        self.floor_values[index]
    }

    /// The floor constraint
    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// The objective contribution of a set of areas (by index)
    pub fn contribution(&self, members: &[usize]) -> f64 {
        objective_contribution(members.iter().map(|&index| self.row(index)))
    }

    /// The total floor value of a set of areas (by index)
    pub fn floor_total(&self, members: &[usize]) -> f64 {
        members.iter().map(|&index| self.floor_value(index)).sum()
    }
}

/// A partition of areas into regions, with its objective score
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    assignment: IndexMap<AreaID, usize>,
    region_scores: Vec<f64>,
    score: f64,
}

impl Solution {
    /// Create a [`Solution`] from an assignment of areas to regions.
    ///
    /// Scores are calculated from `matrix`, which should be the matrix the solver was given.
    /// Region labels must run from zero with none left unused and every area in `matrix` must be
    /// assigned.
    pub fn new(assignment: IndexMap<AreaID, usize>, matrix: &VariableMatrix) -> Result<Self> {
        ensure!(
            assignment.len() == matrix.n_areas(),
            "Assignment covers {} areas but there are {}",
            assignment.len(),
            matrix.n_areas()
        );

        let n_regions = assignment.values().max().map_or(0, |max| max + 1);
        let mut members = vec![Vec::new(); n_regions];
        for (id, &region) in &assignment {
            let row = matrix
                .row(id)
                .with_context(|| format!("Unknown area {id} in assignment"))?;
            members[region].push(row);
        }
        for (region, rows) in members.iter().enumerate() {
            ensure!(!rows.is_empty(), "Region {region} has no areas");
        }

        let region_scores: Vec<_> = members
            .into_iter()
            .map(objective_contribution)
            .collect();
        let score = region_scores.iter().sum();

        Ok(Self {
            assignment,
            region_scores,
            score,
        })
    }

    /// Create a [`Solution`] from lists of member area indices, one list per region
    pub fn from_regions(regions: &[Vec<usize>], matrix: &VariableMatrix) -> Result<Self> {
        let mut region_of = vec![None; matrix.n_areas()];
        for (region, members) in regions.iter().enumerate() {
            for &index in members {
                ensure!(
                    index < region_of.len(),
                    "Area position {index} is out of range"
                );
                ensure!(
                    region_of[index].replace(region).is_none(),
                    "Area at position {index} is in more than one region"
                );
            }
        }

        let assignment = matrix
            .area_ids()
            .zip(region_of)
            .map(|(id, region)| {
                region
                    .map(|region| (id.clone(), region))
                    .with_context(|| format!("Area {id} is not in any region"))
            })
            .collect::<Result<_>>()?;

        Self::new(assignment, matrix)
    }

    /// The total objective score (lower is better)
    pub fn score(&self) -> f64 {
        self.score
    }

    /// The number of regions
    pub fn n_regions(&self) -> usize {
        self.region_scores.len()
    }

    /// The number of areas
    pub fn n_areas(&self) -> usize {
        self.assignment.len()
    }

    /// The objective contribution of each region
    pub fn region_scores(&self) -> &[f64] {
        &self.region_scores
    }

    /// The region each area is assigned to
    pub fn assignment(&self) -> &IndexMap<AreaID, usize> {
        &self.assignment
    }

    /// The region the given area is assigned to
    pub fn region_of(&self, id: &AreaID) -> Option<usize> {
        self.assignment.get(id).copied()
    }

    /// The member areas of each region
    pub fn regions(&self) -> Vec<Vec<AreaID>> {
        let mut regions = vec![Vec::new(); self.n_regions()];
        for (id, &region) in &self.assignment {
            regions[region].push(id.clone());
        }

        regions
    }

    /// Renumber the regions without changing their membership.
    ///
    /// # Arguments
    ///
    /// * `new_labels` - The new label for each existing region; must be a permutation of
    ///   `0..n_regions`
    pub fn relabel(&self, new_labels: &[usize]) -> Result<Self> {
        let n_regions = self.n_regions();
        ensure!(
            new_labels.len() == n_regions,
            "Expected {n_regions} labels, got {}",
            new_labels.len()
        );
        let mut region_scores = vec![f64::NAN; n_regions];
        let mut used = vec![false; n_regions];
        for (old, &new) in new_labels.iter().enumerate() {
            ensure!(
                new < n_regions && !used[new],
                "Region labels must be a permutation of 0..{n_regions}"
            );
            used[new] = true;
            region_scores[new] = self.region_scores[old];
        }

        Ok(Self {
            assignment: self
                .assignment
                .iter()
                .map(|(id, &region)| (id.clone(), new_labels[region]))
                .collect(),
            region_scores,
            score: self.score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{area_table, assert_error, line_adjacency};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_solution_new(area_table: VariableMatrix) {
        let solution = Solution::from_regions(&[vec![0, 1], vec![2, 3]], &area_table).unwrap();
        assert_eq!(solution.n_regions(), 2);
        assert_eq!(solution.n_areas(), 4);
        assert_eq!(solution.region_of(&"C".into()), Some(1));

        // pop: 100, 200 -> var 2500; income: 1, 2 -> var 0.25; two members
        let expected = (2500.0 + 0.25) * 2.0;
        assert_approx_eq!(f64, solution.region_scores()[0], expected);
        assert_approx_eq!(f64, solution.region_scores()[1], expected);
        assert_approx_eq!(f64, solution.score(), 2.0 * expected);
    }

    #[rstest]
    fn test_solution_regions_partition(area_table: VariableMatrix) {
        let solution = Solution::from_regions(&[vec![3], vec![0, 1, 2]], &area_table).unwrap();
        let regions = solution.regions();
        let mut all: Vec<_> = regions.iter().flatten().cloned().collect();
        all.sort();
        let mut expected: Vec<_> = area_table.area_ids().cloned().collect();
        expected.sort();
        assert_eq!(all, expected);
        assert_eq!(regions[0], [AreaID::new("D")]);
    }

    #[rstest]
    fn test_solution_bad_assignments(area_table: VariableMatrix) {
        assert_error!(
            Solution::from_regions(&[vec![0, 1], vec![2]], &area_table),
            "Area D is not in any region"
        );
        assert_error!(
            Solution::from_regions(&[vec![0, 1, 2], vec![2, 3]], &area_table),
            "Area at position 2 is in more than one region"
        );

        let assignment = area_table
            .area_ids()
            .map(|id| (id.clone(), 2 * usize::from(id.0.as_ref() == "A")))
            .collect();
        assert_error!(
            Solution::new(assignment, &area_table),
            "Region 1 has no areas"
        );
    }

    #[rstest]
    fn test_solution_relabel(area_table: VariableMatrix) {
        let solution = Solution::from_regions(&[vec![0], vec![1, 2, 3]], &area_table).unwrap();
        let relabelled = solution.relabel(&[1, 0]).unwrap();
        assert_eq!(relabelled.region_of(&"A".into()), Some(1));
        assert_eq!(relabelled.region_of(&"D".into()), Some(0));
        assert_approx_eq!(
            f64,
            relabelled.region_scores()[0],
            solution.region_scores()[1]
        );
        assert_approx_eq!(f64, relabelled.score(), solution.score());

        assert_error!(
            solution.relabel(&[0, 0]),
            "Region labels must be a permutation of 0..2"
        );
    }

    #[rstest]
    fn test_problem_new(line_adjacency: Adjacency, area_table: VariableMatrix) {
        let floor_values = area_table
            .floor_values(&crate::area::FloorVariable::AreaCount)
            .unwrap();
        let problem = Problem::new(&line_adjacency, &area_table, &floor_values, 2.0).unwrap();
        assert_eq!(problem.n_areas(), 4);
        assert_approx_eq!(f64, problem.floor_total(&[0, 1, 2]), 3.0);

        assert_error!(
            Problem::new(&line_adjacency, &area_table, &floor_values, 0.0),
            "Floor must be a finite number greater than zero"
        );

        let other = area_table.select(&["pop".into()]).unwrap();
        let mut missing = floor_values.clone();
        missing.shift_remove(&AreaID::new("B"));
        assert_error!(
            Problem::new(&line_adjacency, &other, &missing, 1.0),
            "No floor value for area B"
        );

        let mut negative = floor_values.clone();
        negative.insert(AreaID::new("C"), -1.0);
        assert_error!(
            Problem::new(&line_adjacency, &area_table, &negative, 1.0),
            "Floor value for area C cannot be negative"
        );
    }
}
