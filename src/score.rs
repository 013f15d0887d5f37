//! The objective function for regionalisations.
//!
//! Every score in the program (the one the oracle optimises, the one the search driver compares
//! and the per-region score in the exported summaries) comes from [`objective_contribution`], so
//! totals are always comparable.
use crate::stats::variance;

/// The objective contribution of a single region.
///
/// This is the sum over variables of the within-region (population) variance, multiplied by the
/// number of member areas. An empty region contributes nothing.
///
/// # Arguments
///
/// * `rows` - The variable values of the member areas, one slice per area
pub fn objective_contribution<'a, I>(rows: I) -> f64
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let rows: Vec<_> = rows.into_iter().collect();
    let Some(first) = rows.first() else {
        return 0.0;
    };

    let total_variance: f64 = (0..first.len())
        .map(|j| {
            let column: Vec<_> = rows.iter().map(|row| row[j]).collect();
            variance(&column)
        })
        .sum();

    total_variance * rows.len() as f64
}
