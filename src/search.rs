//! The multi-start search driver.
//!
//! Regionalisation heuristics get stuck in local optima, so we run the solver several times from
//! fresh random starts and keep the best solution found.
use crate::error::BlobsError;
use crate::oracle::{Problem, RegionalisationOracle, Solution};
use anyhow::{Context, Result, ensure};
use log::info;
use std::time::{Duration, Instant};

/// Keeps hold of the best (lowest-scoring) solution seen so far
#[derive(Debug, Default)]
pub struct BestSolutionTracker {
    best: Option<Solution>,
}

impl BestSolutionTracker {
    /// Offer a new solution to the tracker.
    ///
    /// The solution replaces the tracked one only if its score is strictly lower, so on a tie the
    /// earlier solution is kept.
    ///
    /// # Returns
    ///
    /// Whether the solution was kept
    pub fn offer(&mut self, solution: Solution) -> bool {
        match &self.best {
            Some(best) if solution.score() >= best.score() => false,
            _ => {
                self.best = Some(solution);
                true
            }
        }
    }

    /// The best solution so far
    pub fn best(&self) -> Option<&Solution> {
        self.best.as_ref()
    }

    /// The score of the best solution so far
    pub fn best_score(&self) -> Option<f64> {
        self.best.as_ref().map(Solution::score)
    }

    /// Consume the tracker, returning the best solution
    pub fn into_best(self) -> Option<Solution> {
        self.best
    }
}

/// Progress information for one iteration of the search
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    /// The iteration number (starting at 1)
    pub iteration: u32,
    /// The score of this iteration's solution
    pub score: f64,
    /// The best score so far, including this iteration
    pub best_score: f64,
    /// The number of regions in this iteration's solution
    pub n_regions: usize,
    /// The mean number of areas per region in this iteration's solution
    pub areas_per_region: f64,
    /// How long the solver took for this iteration
    pub elapsed: Duration,
    /// Estimated time left: the mean time per iteration so far times the iterations remaining
    pub remaining: Duration,
}

/// The result of a search
#[derive(Debug)]
pub struct SearchOutcome {
    /// The best solution found
    pub best: Solution,
    /// A report for each iteration, in order
    pub history: Vec<IterationReport>,
}

/// Run the solver `n_iterations` times and keep the best solution.
///
/// If the solver fails on any iteration, the whole search fails.
///
/// # Arguments
///
/// * `oracle` - The solver
/// * `problem` - The problem to solve
/// * `n_iterations` - How many times to run the solver (at least 1)
pub fn search<O>(oracle: &mut O, problem: &Problem, n_iterations: u32) -> Result<SearchOutcome>
where
    O: RegionalisationOracle + ?Sized,
{
    ensure!(
        n_iterations >= 1,
        BlobsError::InvalidIterationCount {
            requested: n_iterations
        }
    );

    let mut tracker = BestSolutionTracker::default();
    let mut history = Vec::with_capacity(n_iterations as usize);
    let mut total_elapsed = Duration::ZERO;
    for iteration in 1..=n_iterations {
        let start = Instant::now();
        let solution = oracle
            .solve(problem)
            .with_context(|| format!("Solver failed on iteration {iteration}"))?;
        let elapsed = start.elapsed();
        total_elapsed += elapsed;

        let score = solution.score();
        let n_regions = solution.n_regions();
        tracker.offer(solution);

        let report = IterationReport {
            iteration,
            score,
            best_score: tracker.best_score().unwrap_or(score),
            n_regions,
            areas_per_region: problem.n_areas() as f64 / n_regions as f64,
            elapsed,
            remaining: (total_elapsed / iteration) * (n_iterations - iteration),
        };
        log_iteration(&report, n_iterations);
        history.push(report);
    }

    let best = tracker
        .into_best()
        .context("Search finished without a solution")?;
    info!(
        "Best solution: score {:.2}, {} regions ({:.1} areas per region)",
        best.score(),
        best.n_regions(),
        best.n_areas() as f64 / best.n_regions() as f64
    );

    Ok(SearchOutcome { best, history })
}

/// Log progress for an iteration
fn log_iteration(report: &IterationReport, n_iterations: u32) {
    info!(
        "Iteration {}/{n_iterations}: score {:.2}, {} regions ({:.1} areas per region), best so \
        far {:.2}",
        report.iteration,
        report.score,
        report.n_regions,
        report.areas_per_region,
        report.best_score
    );
    info!(
        "Time taken: {:.1} seconds ({} seconds remaining)",
        report.elapsed.as_secs_f64(),
        report.remaining.as_secs()
    );
}
