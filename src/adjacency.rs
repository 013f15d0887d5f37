//! The contiguity structure of the areas, i.e. which areas share a border.
//!
//! Areas are nodes of an undirected graph. Node indices follow the row order of the area table the
//! structure was built from, which lets the regionalisation code work with plain indices once
//! [`Adjacency::matches`] has confirmed that the two line up.
use crate::area::{AreaID, VariableMatrix};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::{Dfs, NodeFiltered};
use std::collections::HashSet;

/// A symmetric relation over areas defining which are spatially contiguous
#[derive(Debug, Clone)]
pub struct Adjacency {
    areas: IndexSet<AreaID>,
    graph: UnGraph<(), ()>,
}

impl Adjacency {
    /// Create a new [`Adjacency`].
    ///
    /// Each pair need only be listed once (in either direction); duplicates are ignored.
    ///
    /// # Arguments
    ///
    /// * `areas` - All areas, in the same order as the rows of the area table
    /// * `pairs` - Pairs of contiguous areas
    pub fn new<A, P>(areas: A, pairs: P) -> Result<Self>
    where
        A: IntoIterator<Item = AreaID>,
        P: IntoIterator<Item = (AreaID, AreaID)>,
    {
        let areas: IndexSet<_> = areas.into_iter().collect();
        let mut graph = UnGraph::with_capacity(areas.len(), 0);
        for _ in 0..areas.len() {
            graph.add_node(());
        }

        let node_of = |id: &AreaID| {
            areas
                .get_index_of(id)
                .map(NodeIndex::new)
                .with_context(|| format!("Unknown area ID {id} in adjacency"))
        };
        for (a, b) in pairs {
            ensure!(a != b, "Area {a} cannot be adjacent to itself");
            let (a, b) = (node_of(&a)?, node_of(&b)?);
            graph.update_edge(a, b, ());
        }

        Ok(Self { areas, graph })
    }

    /// The number of areas
    pub fn n_areas(&self) -> usize {
        self.areas.len()
    }

    /// The number of contiguous pairs
    pub fn n_pairs(&self) -> usize {
        self.graph.edge_count()
    }

    /// The areas, in node order
    pub fn area_ids(&self) -> impl Iterator<Item = &AreaID> {
        self.areas.iter()
    }

    /// The ID of the area with the given node index
    pub fn area_id(&self, index: usize) -> Option<&AreaID> {
        self.areas.get_index(index)
    }

    /// Whether the areas are the same as the rows of `matrix`, in the same order
    pub fn matches(&self, matrix: &VariableMatrix) -> bool {
        self.areas.len() == matrix.n_areas() && self.areas.iter().eq(matrix.area_ids())
    }

    /// The indices of areas adjacent to the area with the given index
    pub fn neighbours(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors(NodeIndex::new(index))
            .map(NodeIndex::index)
    }

    /// Whether two areas (by index) are adjacent
    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        self.graph
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .is_some()
    }

    /// Whether the given set of areas forms a single contiguous block.
    ///
    /// An empty set is not contiguous.
    pub fn is_contiguous(&self, members: &[usize]) -> bool {
        let Some(&first) = members.first() else {
            return false;
        };

        let set: HashSet<_> = members.iter().copied().map(NodeIndex::new).collect();
        let filtered = NodeFiltered::from_fn(&self.graph, |node| set.contains(&node));
        let mut dfs = Dfs::new(&filtered, NodeIndex::new(first));
        let mut reached = 0;
        while dfs.next(&filtered).is_some() {
            reached += 1;
        }

        reached == set.len()
    }

    /// The connected components of the graph, as lists of area indices
    pub fn components(&self) -> Vec<Vec<usize>> {
        kosaraju_scc(&self.graph)
            .into_iter()
            .map(|component| {
                let mut component: Vec<_> = component.into_iter().map(NodeIndex::index).collect();
                component.sort_unstable();
                component
            })
            .collect()
    }
}
