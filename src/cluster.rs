//! Clustering of regions by their summary statistics.
//!
//! Once the areas have been grouped into regions, similar regions are grouped into clusters with
//! k-means. The number of clusters is either given directly or derived from a target number of
//! regions per cluster (see [`sizing`]).
pub mod kmeans;
pub mod sizing;
pub use kmeans::{ClusterResult, KMeans};
pub use sizing::{ClusterSizing, resize};
