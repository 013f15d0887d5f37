//! The built-in max-p regions solver.
//!
//! This follows the heuristic of Duque, Anselin and Rey ("The Max-p-Regions Problem", Journal of
//! Regional Science, 2012):
//!
//! 1. **Construction.** Areas are visited in random order. Each unassigned area seeds a region
//!    which grows by absorbing random unassigned neighbours until it reaches the floor. Regions
//!    which run out of neighbours before reaching the floor are dissolved and their areas become
//!    *enclaves*. Each enclave is then attached to whichever neighbouring region's objective
//!    contribution grows the least. This is repeated a number of times and the construction with
//!    the most regions (then the lowest score) is kept.
//! 2. **Local search.** Areas on region boundaries are moved to a neighbouring region whenever
//!    this lowers the total score and leaves the donor region contiguous and above the floor.
use super::{Problem, RegionalisationOracle, Solution};
use crate::error::BlobsError;
use anyhow::{Result, bail, ensure};
use itertools::Itertools;
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Moves must improve the score by more than this to be accepted
const IMPROVEMENT_TOLERANCE: f64 = 1e-9;

/// Options for the [`RegionGrowingOracle`]
#[derive(Debug, Clone, PartialEq)]
pub struct OracleOptions {
    /// Number of constructions to attempt for each solve
    pub initial: u32,
    /// Maximum number of passes of the local search
    pub max_local_search_passes: u32,
    /// Seed for the random number generator (if `None`, seed from the OS)
    pub seed: Option<u64>,
}

impl Default for OracleOptions {
    fn default() -> Self {
        Self {
            initial: 10,
            max_local_search_passes: 100,
            seed: None,
        }
    }
}

/// The state of an area during construction
#[derive(Debug, Clone, Copy, PartialEq)]
enum AreaState {
    Free,
    Assigned(usize),
    Enclave,
}

/// A randomised max-p regions solver
pub struct RegionGrowingOracle {
    rng: StdRng,
    initial: u32,
    max_local_search_passes: u32,
}

impl RegionGrowingOracle {
    /// Create a new [`RegionGrowingOracle`]
    pub fn new(options: &OracleOptions) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            rng,
            initial: options.initial.max(1),
            max_local_search_passes: options.max_local_search_passes,
        }
    }

    /// Build one feasible partition from random seeds
    fn construct(&mut self, problem: &Problem) -> Result<Vec<Vec<usize>>> {
        let adjacency = problem.adjacency();
        let mut state = vec![AreaState::Free; problem.n_areas()];
        let mut regions: Vec<Vec<usize>> = Vec::new();

        let mut order: Vec<_> = (0..problem.n_areas()).collect();
        order.shuffle(&mut self.rng);
        for seed in order {
            if state[seed] != AreaState::Free {
                continue;
            }

            let label = regions.len();
            state[seed] = AreaState::Assigned(label);
            let mut members = vec![seed];
            let mut total = problem.floor_value(seed);
            let mut frontier: Vec<_> = adjacency
                .neighbours(seed)
                .filter(|&j| state[j] == AreaState::Free)
                .collect();
            while total < problem.floor() && !frontier.is_empty() {
                let next = frontier.swap_remove(self.rng.random_range(0..frontier.len()));
                if state[next] != AreaState::Free {
                    continue;
                }

                state[next] = AreaState::Assigned(label);
                members.push(next);
                total += problem.floor_value(next);
                frontier.extend(
                    adjacency
                        .neighbours(next)
                        .filter(|&j| state[j] == AreaState::Free),
                );
            }

            if total >= problem.floor() {
                regions.push(members);
            } else {
                for area in members {
                    state[area] = AreaState::Enclave;
                }
            }
        }

        let mut enclaves: Vec<_> = (0..problem.n_areas())
            .filter(|&area| state[area] == AreaState::Enclave)
            .collect();
        enclaves.shuffle(&mut self.rng);
        while !enclaves.is_empty() {
            let mut remaining = Vec::new();
            for &area in &enclaves {
                let candidates = adjacency
                    .neighbours(area)
                    .filter_map(|j| match state[j] {
                        AreaState::Assigned(region) => Some(region),
                        _ => None,
                    })
                    .unique();
                let Some(region) = candidates.min_by(|&a, &b| {
                    let cost = |region: usize| enclave_cost(problem, &regions[region], area);
                    cost(a).total_cmp(&cost(b))
                }) else {
                    remaining.push(area);
                    continue;
                };

                regions[region].push(area);
                state[area] = AreaState::Assigned(region);
            }

            if remaining.len() == enclaves.len() {
                bail!(
                    "Could not attach {} area(s) to any region (e.g. area {})",
                    remaining.len(),
                    describe_area(problem, remaining[0])
                );
            }
            enclaves = remaining;
        }

        Ok(regions)
    }

    /// Move areas between neighbouring regions while doing so lowers the score
    fn local_search(&self, problem: &Problem, regions: &mut [Vec<usize>]) {
        let adjacency = problem.adjacency();
        let mut region_of = vec![0; problem.n_areas()];
        for (region, members) in regions.iter().enumerate() {
            for &area in members {
                region_of[area] = region;
            }
        }
        let mut scores: Vec<_> = regions.iter().map(|m| problem.contribution(m)).collect();

        for pass in 1..=self.max_local_search_passes {
            let mut moves = 0;
            for area in 0..problem.n_areas() {
                let from = region_of[area];
                if regions[from].len() == 1 {
                    continue;
                }

                let targets: Vec<_> = adjacency
                    .neighbours(area)
                    .map(|j| region_of[j])
                    .filter(|&region| region != from)
                    .unique()
                    .collect();
                if targets.is_empty() {
                    continue;
                }

                let donor: Vec<_> = regions[from]
                    .iter()
                    .copied()
                    .filter(|&j| j != area)
                    .collect();
                if problem.floor_total(&donor) < problem.floor() || !adjacency.is_contiguous(&donor)
                {
                    continue;
                }
                let donor_score = problem.contribution(&donor);

                let best = targets
                    .into_iter()
                    .map(|to| {
                        let mut receiver = regions[to].clone();
                        receiver.push(area);
                        let receiver_score = problem.contribution(&receiver);
                        let delta = donor_score + receiver_score - scores[from] - scores[to];
                        (to, receiver_score, delta)
                    })
                    .min_by(|a, b| a.2.total_cmp(&b.2));
                let Some((to, receiver_score, delta)) = best else {
                    continue;
                };
                if delta >= -IMPROVEMENT_TOLERANCE {
                    continue;
                }

                regions[from] = donor;
                regions[to].push(area);
                scores[from] = donor_score;
                scores[to] = receiver_score;
                region_of[area] = to;
                moves += 1;
            }

            debug!("Local search pass {pass}: {moves} move(s)");
            if moves == 0 {
                break;
            }
        }
    }
}

impl RegionalisationOracle for RegionGrowingOracle {
    fn solve(&mut self, problem: &Problem) -> Result<Solution> {
        check_feasible(problem)?;

        let mut best = self.construct(problem)?;
        let mut best_score = total_score(problem, &best);
        for attempt in 2..=self.initial {
            let regions = self.construct(problem)?;
            let score = total_score(problem, &regions);
            debug!(
                "Construction {attempt}: {} regions, score {score:.2}",
                regions.len()
            );
            if regions.len() > best.len() || (regions.len() == best.len() && score < best_score) {
                best = regions;
                best_score = score;
            }
        }

        self.local_search(problem, &mut best);
        check_regions(problem, &best)?;
        Solution::from_regions(&best, problem.matrix())
    }
}

/// Check that every connected group of areas can reach the floor.
///
/// Every area must end up in a region meeting the floor and regions cannot span disconnected
/// groups, so each group's total must be at least the floor.
fn check_feasible(problem: &Problem) -> Result<()> {
    for component in problem.adjacency().components() {
        let total = problem.floor_total(&component);
        if total < problem.floor() {
            bail!(BlobsError::InfeasibleConstraint {
                floor: problem.floor(),
                reason: format!(
                    "the {} contiguous area(s) including area {} only have a floor total of \
                    {total}",
                    component.len(),
                    describe_area(problem, component[0])
                ),
            });
        }
    }

    Ok(())
}

/// Check that every region of a finished partition is contiguous and meets the floor
fn check_regions(problem: &Problem, regions: &[Vec<usize>]) -> Result<()> {
    for members in regions {
        let total = problem.floor_total(members);
        ensure!(
            total >= problem.floor() && problem.adjacency().is_contiguous(members),
            "Region including area {} is not contiguous or has a floor total of {total}, below \
            the floor of {}",
            describe_area(problem, members[0]),
            problem.floor()
        );
    }

    Ok(())
}

/// How much a region's objective contribution grows if `area` joins it
fn enclave_cost(problem: &Problem, members: &[usize], area: usize) -> f64 {
    let mut with_area = members.to_vec();
    with_area.push(area);
    problem.contribution(&with_area) - problem.contribution(members)
}

/// The total score of a partition
fn total_score(problem: &Problem, regions: &[Vec<usize>]) -> f64 {
    regions.iter().map(|m| problem.contribution(m)).sum()
}

/// The ID of the area with the given index, for error messages
fn describe_area(problem: &Problem, index: usize) -> String {
    problem
        .adjacency()
        .area_id(index)
        .map_or_else(|| format!("#{index}"), ToString::to_string)
}
