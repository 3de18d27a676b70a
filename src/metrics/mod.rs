/////////////////////////////////////////////////////////////////////////////////////
//
// Rumor model
//
// metrics module
//
// structural weights of each node - clustering coefficient and betweenness centrality.
// They are computed once per network and read by every transition step.
//
////////////////////////////////////////////////////////////////////////////////////

use crate::network::ContactNetwork;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct NodeWeights {
    pub clustering: f64,
    pub betweenness: f64,
}

impl NodeWeights {
    // how effectively the node passes a message on
    pub fn spread_weight(&self) -> f64 {
        self.clustering * self.betweenness
    }
}

// structure of arrays indexed by node id
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMetrics {
    clustering: Vec<f64>,
    betweenness: Vec<f64>,
}

impl NodeMetrics {
    pub fn node_count(&self) -> usize {
        self.clustering.len()
    }

    pub fn clustering(&self, node: usize) -> f64 {
        self.clustering[node]
    }

    pub fn betweenness(&self, node: usize) -> f64 {
        self.betweenness[node]
    }

    pub fn weights(&self, node: usize) -> NodeWeights {
        NodeWeights {
            clustering: self.clustering[node],
            betweenness: self.betweenness[node],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeWeights> + '_ {
        self.clustering
            .iter()
            .zip(&self.betweenness)
            .map(|(&clustering, &betweenness)| NodeWeights {
                clustering,
                betweenness,
            })
    }

    pub fn average_clustering(&self) -> f64 {
        if self.clustering.is_empty() {
            0.0
        } else {
            self.clustering.iter().sum::<f64>() / self.clustering.len() as f64
        }
    }
}

/// Compute clustering and normalised betweenness for every node of `network`.
///
/// Betweenness needs a breadth first search from every node, so this is the dominant
/// one-off cost of a run; callers keep the result for the life of the network.
pub fn compute_metrics(network: &ContactNetwork) -> NodeMetrics {
    let metrics = NodeMetrics {
        clustering: clustering_coefficients(network),
        betweenness: betweenness_centrality(network),
    };
    debug!(
        nodes = metrics.node_count(),
        average_clustering = metrics.average_clustering(),
        "node metrics computed"
    );
    metrics
}

// fraction of a node's neighbour pairs that are joined themselves
fn clustering_coefficients(network: &ContactNetwork) -> Vec<f64> {
    (0..network.node_count())
        .map(|node| {
            let neighbours = network.neighbours(node);
            let degree = neighbours.len();
            if degree < 2 {
                return 0.0;
            }
            let mut links = 0usize;
            for (i, &a) in neighbours.iter().enumerate() {
                for &b in &neighbours[i + 1..] {
                    if network.has_edge(a, b) {
                        links += 1;
                    }
                }
            }
            2.0 * links as f64 / (degree * (degree - 1)) as f64
        })
        .collect()
}

// Brandes' accumulation from every source.  Each unordered pair is counted from both of its
// ends, so dividing by (n-1)(n-2) gives the usual normalised undirected value.
// Accumulated sequentially so the result is bit for bit reproducible.
fn betweenness_centrality(network: &ContactNetwork) -> Vec<f64> {
    let n = network.node_count();
    let mut centrality = vec![0.0; n];
    if n < 3 {
        return centrality;
    }

    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut paths = vec![0.0f64; n];
    let mut hops: Vec<Option<usize>> = vec![None; n];
    let mut dependency = vec![0.0f64; n];
    let mut queue = VecDeque::with_capacity(n);

    for source in 0..n {
        order.clear();
        for list in predecessors.iter_mut() {
            list.clear();
        }
        paths.iter_mut().for_each(|p| *p = 0.0);
        hops.iter_mut().for_each(|h| *h = None);
        dependency.iter_mut().for_each(|d| *d = 0.0);

        paths[source] = 1.0;
        hops[source] = Some(0);
        queue.push_back(source);
        while let Some(v) = queue.pop_front() {
            order.push(v);
            let next = hops[v].map_or(0, |h| h + 1);
            for &w in network.neighbours(v) {
                if hops[w].is_none() {
                    hops[w] = Some(next);
                    queue.push_back(w);
                }
                if hops[w] == Some(next) {
                    paths[w] += paths[v];
                    predecessors[w].push(v);
                }
            }
        }

        while let Some(w) = order.pop() {
            for &v in &predecessors[w] {
                dependency[v] += paths[v] / paths[w] * (1.0 + dependency[w]);
            }
            if w != source {
                centrality[w] += dependency[w];
            }
        }
    }

    let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    centrality.iter_mut().for_each(|c| *c *= scale);
    centrality
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::generate_network;
    use crate::utilities::Seed;
    use rstest::rstest;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn path_graph_betweenness() {
        let network =
            ContactNetwork::from_edges(4, &[(0, 1), (1, 2), (2, 3)]).expect("valid edges");
        let metrics = compute_metrics(&network);
        let expected = [0.0, 2.0 / 3.0, 2.0 / 3.0, 0.0];
        for (node, &value) in expected.iter().enumerate() {
            assert!(close(metrics.betweenness(node), value), "node {}", node);
            assert_eq!(metrics.clustering(node), 0.0);
        }
    }

    #[test]
    fn star_centre_carries_every_path() {
        let network =
            ContactNetwork::from_edges(4, &[(0, 1), (0, 2), (0, 3)]).expect("valid edges");
        let metrics = compute_metrics(&network);
        assert!(close(metrics.betweenness(0), 1.0));
        for leaf in 1..4 {
            assert_eq!(metrics.betweenness(leaf), 0.0);
            assert_eq!(metrics.clustering(leaf), 0.0);
        }
        assert_eq!(metrics.clustering(0), 0.0);
    }

    #[test]
    fn triangle_with_tail_clustering() {
        let network = ContactNetwork::from_edges(4, &[(0, 1), (1, 2), (0, 2), (2, 3)])
            .expect("valid edges");
        let metrics = compute_metrics(&network);
        assert_eq!(metrics.clustering(0), 1.0);
        assert_eq!(metrics.clustering(1), 1.0);
        assert!(close(metrics.clustering(2), 1.0 / 3.0));
        assert_eq!(metrics.clustering(3), 0.0);
    }

    #[test]
    fn complete_graph_has_no_betweenness() {
        let network = generate_network(5, 4, 0.0, Seed::new(0)).expect("K5 as a ring lattice");
        let metrics = compute_metrics(&network);
        for weights in metrics.iter() {
            assert_eq!(weights.clustering, 1.0);
            assert_eq!(weights.betweenness, 0.0);
            assert_eq!(weights.spread_weight(), 0.0);
        }
    }

    #[rstest]
    #[case(8, 1.0 / 14.0)]
    #[case(10, 1.0 / 12.0)]
    #[case(20, 2.0 / 19.0)]
    fn ring_lattice_weights(#[case] n: usize, #[case] betweenness: f64) {
        let network = generate_network(n, 4, 0.0, Seed::new(0)).expect("valid lattice");
        let metrics = compute_metrics(&network);
        for node in 0..n {
            assert!(close(metrics.clustering(node), 0.5));
            assert!(close(metrics.betweenness(node), betweenness), "node {}", node);
            let weights = metrics.weights(node);
            assert_eq!(weights.clustering, metrics.clustering(node));
            assert!(close(weights.spread_weight(), 0.5 * betweenness));
        }
    }

    #[test]
    fn recomputation_is_identical() {
        let network = generate_network(300, 6, 0.1, Seed::from_label("nsll")).expect("valid");
        let first = compute_metrics(&network);
        let second = compute_metrics(&network);
        assert_eq!(first, second);
        for weights in first.iter() {
            assert!((0.0..=1.0).contains(&weights.clustering));
            assert!((0.0..=1.0).contains(&weights.betweenness));
        }
    }
}
