//! Working out how many clusters to make.
use crate::error::BlobsError;
use anyhow::{Result, ensure};

/// The average number of members per cluster if nothing else is specified
pub const DEFAULT_MEMBERS_PER_CLUSTER: usize = 10;

/// The number of clusters and the average number of members in each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterSizing {
    /// Number of clusters
    pub n_clusters: usize,
    /// Average number of members per cluster
    pub avg_per_cluster: usize,
}

/// Work out the cluster count and average cluster size from whichever of the two is given.
///
/// If `avg_per_cluster` is given it takes precedence and the cluster count is recalculated from
/// it. If only `n_clusters` is given, the average is recalculated instead. If neither is given,
/// an average of [`DEFAULT_MEMBERS_PER_CLUSTER`] is assumed. Zero counts as not given. Division
/// results are rounded to the nearest integer, with ties going to the even one.
///
/// # Arguments
///
/// * `n_clusters` - Requested number of clusters
/// * `avg_per_cluster` - Requested average number of members per cluster
/// * `total_members` - Number of things to be clustered
pub fn resize(
    n_clusters: Option<usize>,
    avg_per_cluster: Option<usize>,
    total_members: usize,
) -> Result<ClusterSizing> {
    let n_clusters = n_clusters.filter(|&n| n > 0);
    let avg_per_cluster = avg_per_cluster.filter(|&avg| avg > 0);

    let sizing = match (n_clusters, avg_per_cluster) {
        (_, Some(avg)) => ClusterSizing {
            n_clusters: rounded_ratio(total_members, avg),
            avg_per_cluster: avg,
        },
        (Some(n), None) => ClusterSizing {
            n_clusters: n,
            avg_per_cluster: rounded_ratio(total_members, n),
        },
        (None, None) => ClusterSizing {
            n_clusters: rounded_ratio(total_members, DEFAULT_MEMBERS_PER_CLUSTER),
            avg_per_cluster: DEFAULT_MEMBERS_PER_CLUSTER,
        },
    };
    ensure!(
        sizing.n_clusters > 0,
        BlobsError::ClusterCountUnderflow {
            total_members,
            avg_per_cluster: sizing.avg_per_cluster
        }
    );

    Ok(sizing)
}

/// `numerator / denominator` rounded half to even
fn rounded_ratio(numerator: usize, denominator: usize) -> usize {
    (numerator as f64 / denominator as f64).round_ties_even() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(5), None, 50, 5, 10)]
    #[case(None, Some(10), 47, 5, 10)]
    #[case(None, None, 100, 10, 10)]
    #[case(Some(3), Some(10), 47, 5, 10)]
    #[case(None, Some(10), 45, 4, 10)]
    #[case(None, Some(10), 55, 6, 10)]
    #[case(Some(4), None, 10, 4, 2)]
    #[case(Some(0), Some(0), 30, 3, 10)]
    fn test_resize(
        #[case] n_clusters: Option<usize>,
        #[case] avg_per_cluster: Option<usize>,
        #[case] total_members: usize,
        #[case] expected_n: usize,
        #[case] expected_avg: usize,
    ) {
        assert_eq!(
            resize(n_clusters, avg_per_cluster, total_members).unwrap(),
            ClusterSizing {
                n_clusters: expected_n,
                avg_per_cluster: expected_avg
            }
        );
    }

    #[rstest]
    #[case(None, Some(10), 4)]
    #[case(None, None, 5)]
    #[case(Some(2), Some(20), 0)]
    fn test_resize_underflow(
        #[case] n_clusters: Option<usize>,
        #[case] avg_per_cluster: Option<usize>,
        #[case] total_members: usize,
    ) {
        let err = resize(n_clusters, avg_per_cluster, total_members).unwrap_err();
        let expected_avg = avg_per_cluster.unwrap_or(DEFAULT_MEMBERS_PER_CLUSTER);
        assert_eq!(
            err.downcast_ref::<BlobsError>(),
            Some(&BlobsError::ClusterCountUnderflow {
                total_members,
                avg_per_cluster: expected_avg
            })
        );
    }
}
