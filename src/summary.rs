//! Per-region statistics for a regionalisation.
use crate::area::{FloorValues, VariableMatrix};
use crate::oracle::Solution;
use crate::stats::{mean, std_dev};
use anyhow::{Context, Result, ensure};

/// The mean and standard deviation of a variable within a region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableStatistics {
    /// Mean
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

/// Summary statistics for one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSummary {
    /// The region label
    pub region: usize,
    /// The region's contribution to the objective score
    pub score: f64,
    /// Number of member areas
    pub size: usize,
    /// Total of the floor variable over member areas
    pub floor_total: f64,
    /// Statistics for each variable, in the column order of the matrix summarised
    pub statistics: Vec<VariableStatistics>,
}

/// Summarise every region of a solution.
///
/// Scores are taken from the solution itself, so they refer to the matrix the solver was given,
/// whereas the statistics are calculated from `raw`.
///
/// # Arguments
///
/// * `solution` - The solution to summarise
/// * `raw` - Unstandardised values of the variables of interest
/// * `floor_values` - The floor variable for every area
///
/// # Returns
///
/// One summary per region, in order of region label
pub fn summarise(
    solution: &Solution,
    raw: &VariableMatrix,
    floor_values: &FloorValues,
) -> Result<Vec<RegionSummary>> {
    let summaries = solution
        .regions()
        .into_iter()
        .zip(solution.region_scores())
        .enumerate()
        .map(|(region, (members, &score))| {
            let mut floor_total = 0.0;
            let mut rows = Vec::with_capacity(members.len());
            for id in &members {
                floor_total += floor_values
                    .get(id)
                    .with_context(|| format!("No floor value for area {id}"))?;
                rows.push(
                    raw.row(id)
                        .with_context(|| format!("No data for area {id}"))?,
                );
            }

            let statistics = (0..raw.n_variables())
                .map(|index| {
                    let column: Vec<_> = rows.iter().map(|row| row[index]).collect();
                    VariableStatistics {
                        mean: mean(&column),
                        std_dev: std_dev(&column),
                    }
                })
                .collect();

            Ok(RegionSummary {
                region,
                score,
                size: members.len(),
                floor_total,
                statistics,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    ensure!(
        summaries.len() == solution.n_regions(),
        "Expected {} region summaries, got {}",
        solution.n_regions(),
        summaries.len()
    );

    Ok(summaries)
}

/// The mean of each variable for each region, i.e. the input to the clustering step
pub fn mean_table(summaries: &[RegionSummary]) -> Vec<Vec<f64>> {
    summaries
        .iter()
        .map(|summary| summary.statistics.iter().map(|stats| stats.mean).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::FloorVariable;
    use crate::fixture::area_table;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_summarise(area_table: VariableMatrix) {
        let solution = Solution::from_regions(&[vec![0, 1], vec![2, 3]], &area_table).unwrap();
        let floor_values = area_table
            .floor_values(&FloorVariable::Column("pop".into()))
            .unwrap();
        let summaries = summarise(&solution, &area_table, &floor_values).unwrap();

        assert_eq!(summaries.len(), 2);
        let second = &summaries[1];
        assert_eq!(second.region, 1);
        assert_eq!(second.size, 2);
        assert_approx_eq!(f64, second.floor_total, 700.0);
        assert_approx_eq!(f64, second.score, solution.region_scores()[1]);
        assert_approx_eq!(f64, second.statistics[0].mean, 350.0);
        assert_approx_eq!(f64, second.statistics[0].std_dev, 50.0);
        assert_approx_eq!(f64, second.statistics[1].mean, 3.5);
        assert_approx_eq!(f64, second.statistics[1].std_dev, 0.5);

        let means = mean_table(&summaries);
        for (row, expected) in means.iter().zip([[150.0, 1.5], [350.0, 3.5]]) {
            assert_eq!(row.len(), 2);
            for (&value, expected) in row.iter().zip(expected) {
                assert_approx_eq!(f64, value, expected);
            }
        }
    }

    #[rstest]
    fn test_summarise_idempotent(area_table: VariableMatrix) {
        let solution = Solution::from_regions(&[vec![3], vec![0, 1, 2]], &area_table).unwrap();
        let floor_values = area_table.floor_values(&FloorVariable::AreaCount).unwrap();
        let first = summarise(&solution, &area_table, &floor_values).unwrap();
        let second = summarise(&solution, &area_table, &floor_values).unwrap();
        assert_eq!(first, second);

        // Every area is counted exactly once
        assert_eq!(first.iter().map(|s| s.size).sum::<usize>(), 4);
        assert_approx_eq!(f64, first.iter().map(|s| s.floor_total).sum::<f64>(), 4.0);
    }

    #[rstest]
    fn test_summarise_uses_solution_scores(area_table: VariableMatrix) {
        // Scores come from the solver's matrix, which may differ from the raw one
        let solver_matrix = area_table.select(&["income".into()]).unwrap();
        let solution = Solution::from_regions(&[vec![0, 1, 2, 3]], &solver_matrix).unwrap();
        let floor_values = area_table.floor_values(&FloorVariable::AreaCount).unwrap();
        let summaries = summarise(&solution, &area_table, &floor_values).unwrap();
        assert_approx_eq!(f64, summaries[0].score, 5.0);
        assert_eq!(summaries[0].statistics.len(), 2);
    }
}
