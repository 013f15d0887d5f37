//! Lloyd's k-means with k-means++ seeding.
use anyhow::{Result, ensure};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Options for k-means clustering
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    /// Number of clusters
    pub n_clusters: usize,
    /// Maximum number of Lloyd iterations per restart
    pub max_iterations: u32,
    /// Stop once the total squared movement of the centres is no more than this
    pub tolerance: f64,
    /// Number of restarts; the one with the lowest inertia is kept
    pub n_init: u32,
    /// Seed for the random number generator (if `None`, seed from the OS)
    pub seed: Option<u64>,
}

/// The result of clustering
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterResult {
    /// The cluster each point belongs to
    pub labels: Vec<usize>,
    /// The centre of each cluster
    pub centres: Vec<Vec<f64>>,
    /// Sum of squared distances from each point to its cluster centre
    pub inertia: f64,
}

impl KMeans {
    /// Create a new [`KMeans`] with default options for the given number of clusters
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iterations: 300,
            tolerance: 1e-4,
            n_init: 10,
            seed: None,
        }
    }

    /// Cluster the given points.
    ///
    /// # Arguments
    ///
    /// * `points` - One row per point; all rows must be the same length
    pub fn fit(&self, points: &[Vec<f64>]) -> Result<ClusterResult> {
        ensure!(!points.is_empty(), "There are no points to cluster");
        ensure!(self.n_clusters > 0, "Number of clusters must be at least 1");
        ensure!(
            points.len() >= self.n_clusters,
            "Cannot make {} clusters from {} points",
            self.n_clusters,
            points.len()
        );
        let n_dims = points[0].len();
        ensure!(
            points.iter().all(|point| point.len() == n_dims),
            "All points must have the same number of values"
        );

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut best = self.fit_once(points, &mut rng);
        for _ in 1..self.n_init {
            let result = self.fit_once(points, &mut rng);
            if result.inertia < best.inertia {
                best = result;
            }
        }

        Ok(best)
    }

    /// Run one restart of Lloyd's algorithm
    fn fit_once(&self, points: &[Vec<f64>], rng: &mut StdRng) -> ClusterResult {
        let mut centres = plus_plus_centres(points, self.n_clusters, rng);
        let mut labels = vec![0; points.len()];
        for iteration in 1..=self.max_iterations {
            assign(points, &centres, &mut labels);
            let new_centres = update_centres(points, &labels, &centres);
            let shift: f64 = centres
                .iter()
                .zip(&new_centres)
                .map(|(old, new)| squared_distance(old, new))
                .sum();
            centres = new_centres;
            if shift <= self.tolerance {
                debug!("k-means converged after {iteration} iterations");
                break;
            }
        }

        let inertia = assign(points, &centres, &mut labels);
        ClusterResult {
            labels,
            centres,
            inertia,
        }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// The index of and squared distance to the nearest centre
fn nearest(point: &[f64], centres: &[Vec<f64>]) -> (usize, f64) {
    centres
        .iter()
        .map(|centre| squared_distance(point, centre))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (index, distance)| {
            if distance < best.1 {
                (index, distance)
            } else {
                best
            }
        })
}

/// Choose initial centres with k-means++.
///
/// The first centre is a random point; each subsequent one is a point chosen with probability
/// proportional to its squared distance from the nearest centre chosen so far.
fn plus_plus_centres(points: &[Vec<f64>], n_clusters: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centres = vec![points[rng.random_range(0..points.len())].clone()];
    let mut distances: Vec<_> = points
        .iter()
        .map(|point| squared_distance(point, &centres[0]))
        .collect();

    while centres.len() < n_clusters {
        let total: f64 = distances.iter().sum();
        let index = if total > 0.0 {
            let target = rng.random_range(0.0..total);
            let mut cumulative = 0.0;
            distances
                .iter()
                .position(|distance| {
                    cumulative += distance;
                    cumulative > target
                })
                .unwrap_or(points.len() - 1)
        } else {
            // All remaining points coincide with a centre
            rng.random_range(0..points.len())
        };

        let centre = points[index].clone();
        for (distance, point) in distances.iter_mut().zip(points) {
            *distance = distance.min(squared_distance(point, &centre));
        }
        centres.push(centre);
    }

    centres
}

/// Assign each point to its nearest centre.
///
/// # Returns
///
/// The inertia of the assignment
fn assign(points: &[Vec<f64>], centres: &[Vec<f64>], labels: &mut [usize]) -> f64 {
    let mut inertia = 0.0;
    for (label, point) in labels.iter_mut().zip(points) {
        let (index, distance) = nearest(point, centres);
        *label = index;
        inertia += distance;
    }

    inertia
}

/// Move each centre to the mean of its points.
///
/// A centre which has lost all its points is moved onto the point furthest from its own centre.
fn update_centres(points: &[Vec<f64>], labels: &[usize], centres: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n_dims = centres[0].len();
    let mut sums = vec![vec![0.0; n_dims]; centres.len()];
    let mut counts = vec![0usize; centres.len()];
    for (point, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (sum, value) in sums[label].iter_mut().zip(point) {
            *sum += value;
        }
    }

    let mut taken = Vec::new();
    sums.into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            if count > 0 {
                return sum.into_iter().map(|x| x / count as f64).collect();
            }

            let furthest = points
                .iter()
                .zip(labels)
                .enumerate()
                .filter(|(index, _)| !taken.contains(index))
                .map(|(index, (point, &label))| {
                    (index, squared_distance(point, &centres[label]))
                })
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map_or(0, |(index, _)| index);
            taken.push(furthest);
            points[furthest].clone()
        })
        .collect()
}
