/////////////////////////////////////////////////////////////////////////////////////
//
// Rumor model
//
// network module
//
// the contact network is a Watts-Strogatz small world: a ring lattice whose edges are
// randomly rewired once at construction time
//
////////////////////////////////////////////////////////////////////////////////////

use crate::error::{Result, SimError};
use crate::utilities::{check_unit_interval, Seed};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

// Parameters --------------------------------------------------------------------------------------
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NetworkParms {
    pub nodes: usize,   // n
    pub degree: usize,  // k, mean degree, even
    pub rewiring: f64,  // p, chance of rewiring each lattice edge
}

impl NetworkParms {
    pub const fn new(nodes: usize, degree: usize, rewiring: f64) -> NetworkParms {
        NetworkParms {
            nodes,
            degree,
            rewiring,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes < 3 {
            return Err(SimError::invalid(
                "nodes",
                format!("a small world needs at least 3 nodes, got {}", self.nodes),
            ));
        }
        if self.degree < 2 || self.degree % 2 != 0 {
            return Err(SimError::invalid(
                "degree",
                format!("must be even and at least 2, got {}", self.degree),
            ));
        }
        if self.degree >= self.nodes {
            return Err(SimError::invalid(
                "degree",
                format!(
                    "must be lower than the node count {}, got {}",
                    self.nodes, self.degree
                ),
            ));
        }
        check_unit_interval("rewiring", self.rewiring)?;
        Ok(())
    }

    pub fn generate(&self, seed: Seed) -> Result<ContactNetwork> {
        generate_network_with_rng(self, &mut seed.rng())
    }
}

impl Default for NetworkParms {
    fn default() -> NetworkParms {
        NetworkParms::new(1000, 10, 0.029_473_68)
    }
}

// Contact network ---------------------------------------------------------------------------------
// Undirected, no self-loops, no parallel edges.  Neighbour lists are kept sorted so lookups
// can binary search and iteration order never depends on how the network was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactNetwork {
    adjacency: Vec<Vec<usize>>,
    edge_count: usize,
}

impl ContactNetwork {
    /// Build a network from an explicit edge list.
    ///
    /// Fails when an endpoint is out of range, an edge is a self-loop, or the same
    /// pair appears twice.
    pub fn from_edges(node_count: usize, edges: &[(usize, usize)]) -> Result<ContactNetwork> {
        let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); node_count];
        for &(a, b) in edges {
            if a >= node_count || b >= node_count {
                return Err(SimError::invalid(
                    "edges",
                    format!("edge ({}, {}) names a node outside 0..{}", a, b, node_count),
                ));
            }
            if a == b {
                return Err(SimError::invalid(
                    "edges",
                    format!("self-loop on node {}", a),
                ));
            }
            if !adjacency[a].insert(b) {
                return Err(SimError::invalid(
                    "edges",
                    format!("duplicate edge ({}, {})", a, b),
                ));
            }
            adjacency[b].insert(a);
        }
        Ok(ContactNetwork::from_sets(adjacency))
    }

    fn from_sets(sets: Vec<BTreeSet<usize>>) -> ContactNetwork {
        let adjacency: Vec<Vec<usize>> = sets
            .into_iter()
            .map(|set| set.into_iter().collect())
            .collect();
        let edge_count = adjacency.iter().map(Vec::len).sum::<usize>() / 2;
        ContactNetwork {
            adjacency,
            edge_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn neighbours(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    pub fn has_edge(&self, a: usize, b: usize) -> bool {
        self.adjacency
            .get(a)
            .map_or(false, |neighbours| neighbours.binary_search(&b).is_ok())
    }

    // each undirected edge once, as (low, high), in ascending order
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(a, neighbours)| {
                neighbours
                    .iter()
                    .filter(move |&&b| a < b)
                    .map(move |&b| (a, b))
            })
    }

    pub fn mean_degree(&self) -> f64 {
        if self.adjacency.is_empty() {
            0.0
        } else {
            2.0 * self.edge_count as f64 / self.node_count() as f64
        }
    }

    pub fn summary(&self) -> NetworkSummary {
        let degrees = self.adjacency.iter().map(Vec::len);
        NetworkSummary {
            nodes: self.node_count(),
            edges: self.edge_count,
            mean_degree: self.mean_degree(),
            min_degree: degrees.clone().min().unwrap_or(0),
            max_degree: degrees.max().unwrap_or(0),
        }
    }

    // breadth first hop counts from source; None for unreachable nodes, empty when source
    // is not a node
    pub fn hop_counts_from(&self, source: usize) -> Vec<Option<usize>> {
        if source >= self.node_count() {
            return Vec::new();
        }
        let mut hops: Vec<Option<usize>> = vec![None; self.node_count()];
        let mut queue = VecDeque::with_capacity(self.node_count());
        hops[source] = Some(0);
        queue.push_back(source);
        while let Some(node) = queue.pop_front() {
            let next = hops[node].map_or(0, |h| h + 1);
            for &neighbour in self.neighbours(node) {
                if hops[neighbour].is_none() {
                    hops[neighbour] = Some(next);
                    queue.push_back(neighbour);
                }
            }
        }
        hops
    }

    /// Mean hop count over all ordered pairs of distinct nodes.
    ///
    /// Fails with `DegenerateNetwork` when some pair is not connected.
    pub fn average_shortest_path_length(&self) -> Result<f64> {
        let n = self.node_count();
        if n < 2 {
            return Ok(0.0);
        }
        let mut total: u64 = 0;
        for source in 0..n {
            for (target, hops) in self.hop_counts_from(source).into_iter().enumerate() {
                match hops {
                    Some(h) => total += h as u64,
                    None => {
                        return Err(SimError::degenerate(format!(
                            "node {} cannot reach node {}; path length is undefined",
                            source, target
                        )))
                    }
                }
            }
        }
        Ok(total as f64 / (n * (n - 1)) as f64)
    }
}

// node, edge and degree figures for a generated network
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct NetworkSummary {
    pub nodes: usize,
    pub edges: usize,
    pub mean_degree: f64,
    pub min_degree: usize,
    pub max_degree: usize,
}

// Generator ---------------------------------------------------------------------------------------
/// Generate a small-world network of `n` nodes with mean degree `k` and rewiring
/// probability `p`. Identical arguments always give the identical edge set.
pub fn generate_network(n: usize, k: usize, p: f64, seed: Seed) -> Result<ContactNetwork> {
    NetworkParms::new(n, k, p).generate(seed)
}

pub fn generate_network_with_rng<R: Rng + ?Sized>(
    parms: &NetworkParms,
    rng: &mut R,
) -> Result<ContactNetwork> {
    parms.validate()?;
    let n = parms.nodes;
    let half = parms.degree / 2;

    // ring lattice - each node joined to its k/2 nearest neighbours on either side
    let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    for offset in 1..=half {
        for u in 0..n {
            let v = (u + offset) % n;
            adjacency[u].insert(v);
            adjacency[v].insert(u);
        }
    }

    // rewire lattice edges (u, u + offset) one ring of offsets at a time.  The u end is kept
    // and the far end moves to a uniformly chosen node that u is not yet joined to.  When u
    // is already joined to everyone the edge is left alone.
    let targets = Uniform::new(0, n);
    let mut rewired = 0usize;
    let mut skipped = 0usize;
    for offset in 1..=half {
        for u in 0..n {
            if rng.gen::<f64>() >= parms.rewiring {
                continue;
            }
            if adjacency[u].len() >= n - 1 {
                skipped += 1;
                continue;
            }
            let w = loop {
                let candidate = targets.sample(rng);
                if candidate != u && !adjacency[u].contains(&candidate) {
                    break candidate;
                }
            };
            let v = (u + offset) % n;
            adjacency[u].remove(&v);
            adjacency[v].remove(&u);
            adjacency[u].insert(w);
            adjacency[w].insert(u);
            rewired += 1;
        }
    }

    let network = ContactNetwork::from_sets(adjacency);
    debug!(
        nodes = n,
        edges = network.edge_count(),
        rewired,
        skipped,
        "small-world network generated"
    );
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn ring_lattice(n: usize, k: usize) -> ContactNetwork {
        generate_network(n, k, 0.0, Seed::new(1)).expect("valid ring lattice")
    }

    #[rstest]
    #[case(2, 2, 0.1)]
    #[case(10, 3, 0.1)]
    #[case(10, 0, 0.1)]
    #[case(10, 10, 0.1)]
    #[case(10, 12, 0.1)]
    #[case(10, 4, -0.5)]
    #[case(10, 4, 1.5)]
    #[case(10, 4, f64::NAN)]
    fn rejects_invalid_parameters(#[case] n: usize, #[case] k: usize, #[case] p: f64) {
        let err = generate_network(n, k, p, Seed::new(3)).expect_err("parameters are invalid");
        assert!(matches!(err, SimError::InvalidParameters { .. }), "{:?}", err);
    }

    #[test]
    fn zero_rewiring_gives_ring_lattice() {
        let network = ring_lattice(20, 4);
        assert_eq!(network.edge_count(), 40);
        for u in 0..20 {
            let mut expected = vec![(u + 1) % 20, (u + 2) % 20, (u + 18) % 20, (u + 19) % 20];
            expected.sort_unstable();
            assert_eq!(network.neighbours(u), expected.as_slice());
        }
    }

    #[test]
    fn full_rewiring_keeps_edge_count() {
        let network = generate_network(50, 6, 1.0, Seed::new(9)).expect("valid parameters");
        assert_eq!(network.edge_count(), 150);
        assert_ne!(network, ring_lattice(50, 6));
    }

    #[rstest]
    #[case(3, 2)]
    #[case(7, 6)]
    fn complete_lattice_is_left_alone(#[case] n: usize, #[case] k: usize) {
        // k = n - 1 joins every node to all the others, so no rewiring has a target
        for seed in 0..8 {
            let network = generate_network(n, k, 1.0, Seed::new(seed)).expect("valid parameters");
            assert_eq!(network, ring_lattice(n, k));
            assert_eq!(network.edge_count(), n * (n - 1) / 2);
            for u in 0..n {
                assert_eq!(network.degree(u), n - 1);
            }
        }
    }

    #[test]
    fn nearly_complete_lattice_stays_simple() {
        let network = generate_network(6, 4, 1.0, Seed::new(5)).expect("valid parameters");
        assert_eq!(network.edge_count(), 12);
        for u in 0..6 {
            assert!(!network.has_edge(u, u));
            assert!(network.degree(u) <= 5);
        }
    }

    #[test]
    fn same_seed_same_edges() {
        let first = generate_network(200, 6, 0.2, Seed::from_label("nsll")).expect("valid");
        let second = generate_network(200, 6, 0.2, Seed::from_label("nsll")).expect("valid");
        let other = generate_network(200, 6, 0.2, Seed::from_label("nsll1")).expect("valid");
        assert_eq!(
            first.edges().collect::<Vec<_>>(),
            second.edges().collect::<Vec<_>>()
        );
        assert_ne!(first, other);
    }

    #[test]
    fn from_edges_rejects_malformed_lists() {
        assert!(ContactNetwork::from_edges(3, &[(0, 0)]).is_err());
        assert!(ContactNetwork::from_edges(3, &[(0, 1), (1, 0)]).is_err());
        assert!(ContactNetwork::from_edges(3, &[(0, 3)]).is_err());
    }

    #[test]
    fn summary_reports_degrees() {
        let network = ContactNetwork::from_edges(4, &[(0, 1), (1, 2), (2, 3), (0, 2)])
            .expect("valid edges");
        let summary = network.summary();
        assert_eq!(summary.nodes, 4);
        assert_eq!(summary.edges, 4);
        assert_eq!(summary.mean_degree, 2.0);
        assert_eq!(summary.min_degree, 1);
        assert_eq!(summary.max_degree, 3);
    }

    #[test]
    fn path_length_of_a_path_graph() {
        let network =
            ContactNetwork::from_edges(4, &[(0, 1), (1, 2), (2, 3)]).expect("valid edges");
        // distances 1,2,3,1,2,1 over 6 unordered pairs
        let length = network.average_shortest_path_length().expect("connected");
        assert!((length - 10.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn hop_counts_from_unknown_node_are_empty() {
        let network =
            ContactNetwork::from_edges(4, &[(0, 1), (1, 2)]).expect("valid edges");
        assert_eq!(
            network.hop_counts_from(0),
            vec![Some(0), Some(1), Some(2), None]
        );
        assert!(network.hop_counts_from(4).is_empty());
    }

    #[test]
    fn path_length_requires_connectivity() {
        let network = ContactNetwork::from_edges(4, &[(0, 1), (2, 3)]).expect("valid edges");
        let err = network
            .average_shortest_path_length()
            .expect_err("network is split in two");
        assert!(matches!(err, SimError::DegenerateNetwork { .. }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn generated_networks_are_simple(
            n in 5usize..60,
            half in 1usize..4,
            p in 0.0f64..=1.0,
            seed in any::<u64>(),
        ) {
            let k = 2 * half;
            prop_assume!(k < n);
            let network = generate_network(n, k, p, Seed::new(seed)).expect("valid parameters");
            prop_assert_eq!(network.node_count(), n);
            prop_assert_eq!(network.edge_count(), n * k / 2);
            for u in 0..n {
                let neighbours = network.neighbours(u);
                prop_assert!(!neighbours.contains(&u));
                prop_assert!(neighbours.windows(2).all(|pair| pair[0] < pair[1]));
                prop_assert!(network.degree(u) <= n - 1);
                for &v in neighbours {
                    prop_assert!(network.has_edge(v, u));
                }
            }
            // the kept end of every lattice edge means each node holds its own k/2 edges
            for u in 0..n {
                prop_assert!(network.degree(u) >= half);
            }
        }
    }
}
