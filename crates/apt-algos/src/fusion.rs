//! Weighted fusion of feature graphs into a per-user graph, and of per-user
//! graphs into the aggregate graph.

use apt_core::{CancelToken, Domain, Graph, Neighbor, NeighborList};
use indexmap::{IndexMap, IndexSet};

use crate::error::Error;

/// Builds an aggregate `name -> Domain` pool across a sequence of graphs,
/// merging request sets (receiver order first: earlier graphs in the
/// sequence keep their request order, later graphs only append what's new)
/// for every name encountered either as a node or as a neighbor target.
fn domain_pool<'a>(graphs: impl Iterator<Item = &'a Graph>) -> IndexMap<String, Domain> {
    let mut pool: IndexMap<String, Domain> = IndexMap::new();
    let mut record = |domain: &Domain| {
        pool.entry(domain.name.clone())
            .and_modify(|d| d.merge(domain))
            .or_insert_with(|| domain.clone());
    };
    for graph in graphs {
        for (domain, neighbors) in graph.entries() {
            record(domain);
            for neighbor in neighbors {
                record(&neighbor.domain);
            }
        }
    }
    pool
}

fn resolve(pool: &IndexMap<String, Domain>, name: &str) -> Domain {
    pool.get(name)
        .cloned()
        .unwrap_or_else(|| Domain::new(name.to_string()))
}

/// Fuses a user's `F` feature graphs into one unbounded per-user graph.
///
/// Implements "byUsers" mode (spec §4.4): the domain universe is every
/// node name appearing in any of the user's feature graphs; for each such
/// node, for each feature graph that contains it, each neighbor's
/// similarity is scaled by that feature's weight and accumulated into a
/// per-neighbor sum. A neighbor is only dropped from the output if its
/// fully-accumulated similarity is exactly `0.0`.
///
/// Returns `Ok(None)` if `cancel` is observed mid-fusion.
pub fn fuse_features<'a>(
    feature_graphs: &[&'a Graph],
    weights: &[f64],
    cancel: &CancelToken,
) -> Result<Option<Graph>, Error> {
    if feature_graphs.len() != weights.len() {
        return Err(Error::WeightCountMismatch {
            expected: feature_graphs.len(),
            actual: weights.len(),
        });
    }

    let pool = domain_pool(feature_graphs.iter().copied());

    let mut node_order: IndexSet<String> = IndexSet::new();
    for graph in feature_graphs {
        for node in graph.nodes() {
            node_order.insert(node.name.clone());
        }
    }

    let mut output = Graph::new(None);
    for name in &node_order {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let mut accumulator: IndexMap<String, f64> = IndexMap::new();
        for (feature, graph) in feature_graphs.iter().enumerate() {
            if let Some(neighbors) = graph.neighbors(name) {
                for neighbor in neighbors {
                    *accumulator
                        .entry(neighbor.domain.name.clone())
                        .or_insert(0.0) += weights[feature] * neighbor.similarity;
                }
            }
        }

        let mut list = NeighborList::new();
        for (neighbor_name, similarity) in accumulator {
            if similarity == 0.0 {
                continue;
            }
            let neighbor_domain = resolve(&pool, &neighbor_name);
            list.push(Neighbor::new(neighbor_domain.clone(), similarity)?);
            output.ensure_node(neighbor_domain);
        }
        output.put(resolve(&pool, name), list);
    }

    Ok(Some(output))
}

/// Fuses every user's per-user graph into one aggregate graph.
///
/// Implements "all" mode (spec §4.4): the domain universe is the
/// cross-user unique-by-name node set; for each node name, for each input
/// (user) graph that contains it by name, the neighbor similarities are
/// scaled by that user's weight and accumulated, same zero-drop rule as
/// [`fuse_features`]. Output node/neighbor `Domain`s carry the union of
/// requests across every user that mentioned that name (spec §3).
pub fn fuse_users(
    user_graphs: &[(String, Graph)],
    weights: &[f64],
    cancel: &CancelToken,
) -> Result<Option<Graph>, Error> {
    if user_graphs.len() != weights.len() {
        return Err(Error::WeightCountMismatch {
            expected: user_graphs.len(),
            actual: weights.len(),
        });
    }

    let pool = domain_pool(user_graphs.iter().map(|(_, g)| g));

    let mut node_order: IndexSet<String> = IndexSet::new();
    for (_, graph) in user_graphs {
        for node in graph.nodes() {
            node_order.insert(node.name.clone());
        }
    }

    let mut output = Graph::new(None);
    for name in &node_order {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let mut accumulator: IndexMap<String, f64> = IndexMap::new();
        for (user_idx, (_, graph)) in user_graphs.iter().enumerate() {
            if let Some(neighbors) = graph.neighbors(name) {
                for neighbor in neighbors {
                    *accumulator
                        .entry(neighbor.domain.name.clone())
                        .or_insert(0.0) += weights[user_idx] * neighbor.similarity;
                }
            }
        }

        let mut list = NeighborList::new();
        for (neighbor_name, similarity) in accumulator {
            if similarity == 0.0 {
                continue;
            }
            let neighbor_domain = resolve(&pool, &neighbor_name);
            list.push(Neighbor::new(neighbor_domain.clone(), similarity)?);
            output.ensure_node(neighbor_domain);
        }
        output.put(resolve(&pool, name), list);
    }

    Ok(Some(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apt_core::Request;
    use indexmap::IndexSet as CoreIndexSet;

    fn graph_with_edge(from: &str, to: &str, sim: f64) -> Graph {
        let mut g = Graph::new(Some(8));
        let mut list = NeighborList::new();
        list.push(Neighbor::new(Domain::new(to), sim).unwrap());
        g.put(Domain::new(from), list);
        g.ensure_node(Domain::new(to));
        g
    }

    #[test]
    fn s1_scenario_feature_fusion() {
        // F0: A->B(0.8); F1: A->C(0.6); weights=(0.5,0.5)
        let f0 = graph_with_edge("A", "B", 0.8);
        let f1 = graph_with_edge("A", "C", 0.6);
        let fused = fuse_features(&[&f0, &f1], &[0.5, 0.5], &CancelToken::new())
            .unwrap()
            .unwrap();

        let neighbors: Vec<_> = fused
            .neighbors("A")
            .unwrap()
            .iter()
            .map(|n| (n.domain.name.clone(), n.similarity))
            .collect();
        assert_eq!(neighbors, vec![("B".to_string(), 0.4), ("C".to_string(), 0.3)]);
    }

    #[test]
    fn fusion_linearity_basis_vector() {
        let f0 = graph_with_edge("A", "B", 0.8);
        let f1 = graph_with_edge("A", "C", 0.6);
        let fused = fuse_features(&[&f0, &f1], &[1.0, 0.0], &CancelToken::new())
            .unwrap()
            .unwrap();

        assert_eq!(fused.neighbors("A").unwrap().len(), 1);
        let only = fused.neighbors("A").unwrap().iter().next().unwrap();
        assert_eq!(only.domain.name, "B");
        assert_eq!(only.similarity, 0.8);
    }

    #[test]
    fn cancellation_returns_none() {
        let f0 = graph_with_edge("A", "B", 0.8);
        let token = CancelToken::new();
        token.cancel();
        let result = fuse_features(&[&f0], &[1.0], &token).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn user_fusion_merges_requests_receiver_order_first() {
        let r1 = Request::new(1, "GET", "/", 200, 1, 1, "c1");
        let r2 = Request::new(2, "GET", "/", 200, 1, 1, "c1");
        let r3 = Request::new(3, "GET", "/", 200, 1, 1, "c1");

        let mut u1 = Graph::new(None);
        let mut reqs1: CoreIndexSet<Request> = CoreIndexSet::new();
        reqs1.insert(r1.clone());
        reqs1.insert(r2.clone());
        u1.put(Domain::with_requests("d.example", reqs1), NeighborList::new());

        let mut u2 = Graph::new(None);
        let mut reqs2: CoreIndexSet<Request> = CoreIndexSet::new();
        reqs2.insert(r2.clone());
        reqs2.insert(r3.clone());
        u2.put(Domain::with_requests("d.example", reqs2), NeighborList::new());

        let fused = fuse_users(
            &[("u1".to_string(), u1), ("u2".to_string(), u2)],
            &[0.5, 0.5],
            &CancelToken::new(),
        )
        .unwrap()
        .unwrap();

        let domain = fused.get_domain("d.example").unwrap();
        let requests: Vec<_> = domain.requests.iter().cloned().collect();
        assert_eq!(requests, vec![r1, r2, r3]);
    }
}
