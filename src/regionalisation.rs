//! The chosen solution of a run, together with the settings which produced it.
use crate::area::{FloorVariable, VariableMatrix};
use crate::oracle::Solution;
use crate::standardise::StandardisationMethod;
use crate::stats::mean;
use anyhow::{Context, Result};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// How to order region labels after the search
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum SortMethod {
    /// By ascending objective contribution
    #[string = "objective"]
    Objective,
    /// By ascending mean of all variable values in the region
    #[string = "mean"]
    Mean,
}

/// The best solution of a run plus the bookkeeping needed to interpret it
#[derive(Debug, Clone, PartialEq)]
pub struct Regionalisation {
    /// The solution
    pub solution: Solution,
    /// The floor variable
    pub floor_variable: FloorVariable,
    /// The floor constraint
    pub floor: f64,
    /// The variables regions were built from
    pub variables: Vec<String>,
    /// How the variables were standardised
    pub method: StandardisationMethod,
    /// How region labels have been ordered, if at all
    pub sorted_by: Option<SortMethod>,
}

impl Regionalisation {
    /// Relabel the regions in order of the given method.
    ///
    /// Only labels change; region membership is untouched.
    ///
    /// # Arguments
    ///
    /// * `matrix` - The matrix the solution was built from
    /// * `method` - How to order the regions
    pub fn sort_regions(&mut self, matrix: &VariableMatrix, method: SortMethod) -> Result<()> {
        let new_labels = region_order(&self.solution, matrix, method)?;
        self.solution = self.solution.relabel(&new_labels)?;
        self.sorted_by = Some(method);

        Ok(())
    }
}

/// Work out new region labels so that regions are numbered in order of the given method.
///
/// Ties keep their existing relative order.
///
/// # Returns
///
/// The new label for each existing region
pub fn region_order(
    solution: &Solution,
    matrix: &VariableMatrix,
    method: SortMethod,
) -> Result<Vec<usize>> {
    let keys: Vec<f64> = match method {
        SortMethod::Objective => solution.region_scores().to_vec(),
        SortMethod::Mean => solution
            .regions()
            .iter()
            .map(|members| {
                let values = members
                    .iter()
                    .map(|id| {
                        matrix
                            .row(id)
                            .with_context(|| format!("No data for area {id}"))
                    })
                    .collect::<Result<Vec<_>>>()?
                    .concat();
                Ok(mean(&values))
            })
            .collect::<Result<_>>()?,
    };

    let mut by_key: Vec<_> = (0..keys.len()).collect();
    by_key.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));

    let mut new_labels = vec![0; keys.len()];
    for (new, old) in by_key.into_iter().enumerate() {
        new_labels[old] = new;
    }

    Ok(new_labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::AreaID;
    use crate::fixture::area_table;
    use rstest::rstest;

    #[rstest]
    #[case(SortMethod::Objective, vec![1, 0])]
    #[case(SortMethod::Mean, vec![1, 0])]
    fn test_region_order(
        area_table: VariableMatrix,
        #[case] method: SortMethod,
        #[case] expected: Vec<usize>,
    ) {
        // The first region is larger and has the larger values
        let solution = Solution::from_regions(&[vec![1, 2, 3], vec![0]], &area_table).unwrap();
        assert_eq!(
            region_order(&solution, &area_table, method).unwrap(),
            expected
        );
    }

    #[rstest]
    #[case("objective", SortMethod::Objective)]
    #[case("Mean", SortMethod::Mean)]
    fn test_parse_sort_method(#[case] name: &str, #[case] expected: SortMethod) {
        assert_eq!(name.parse::<SortMethod>().unwrap(), expected);
        assert_eq!(expected.to_string(), name.to_lowercase());
    }

    #[rstest]
    fn test_region_order_ties(area_table: VariableMatrix) {
        let solution =
            Solution::from_regions(&[vec![0], vec![1], vec![2], vec![3]], &area_table).unwrap();
        assert_eq!(
            region_order(&solution, &area_table, SortMethod::Objective).unwrap(),
            [0, 1, 2, 3]
        );
    }

    #[rstest]
    fn test_sort_regions_keeps_membership(area_table: VariableMatrix) {
        let solution = Solution::from_regions(&[vec![2, 3], vec![0, 1]], &area_table).unwrap();
        let mut regionalisation = Regionalisation {
            solution: solution.clone(),
            floor_variable: FloorVariable::AreaCount,
            floor: 2.0,
            variables: vec!["pop".into(), "income".into()],
            method: StandardisationMethod::PassThrough,
            sorted_by: None,
        };
        regionalisation
            .sort_regions(&area_table, SortMethod::Mean)
            .unwrap();

        assert_eq!(regionalisation.sorted_by, Some(SortMethod::Mean));
        let mut before = solution.regions();
        let mut after = regionalisation.solution.regions();
        assert_eq!(after[0], [AreaID::new("A"), AreaID::new("B")]);
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }
}
