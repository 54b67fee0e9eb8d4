use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::Error;
use crate::neighbor::NeighborList;

/// A directed, weighted graph of domains with bounded-or-unbounded neighbor
/// lists, keyed by domain name with insertion-defined iteration order.
///
/// Node order is not incidental: clustering and ranking tie-breaks depend
/// on it, so every operation that builds a new `Graph` must preserve the
/// order its inputs were visited in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Graph {
    nodes: IndexMap<Domain, NeighborList>,
    /// `None` means unbounded (the fusion/aggregate `INT_MAX` convention).
    k_max: Option<usize>,
}

impl Graph {
    pub fn new(k_max: Option<usize>) -> Self {
        Self {
            nodes: IndexMap::new(),
            k_max,
        }
    }

    pub fn k_max(&self) -> Option<usize> {
        self.k_max
    }

    pub fn put(&mut self, node: Domain, neighbors: NeighborList) {
        self.nodes.insert(node, neighbors);
    }

    /// Inserts `node` as a key with an empty neighbor list if it is not
    /// already present, without disturbing an existing entry.
    pub fn ensure_node(&mut self, node: Domain) {
        self.nodes.entry(node).or_insert_with(NeighborList::new);
    }

    pub fn neighbors(&self, name: &str) -> Option<&NeighborList> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn get_domain(&self, name: &str) -> Option<&Domain> {
        self.nodes.get_key_value(name).map(|(d, _)| d)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Domain> {
        self.nodes.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Domain, &NeighborList)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(NeighborList::len).sum()
    }

    /// Every node referenced by a neighbor list must also be a key. Checked
    /// on demand rather than on every mutation, since fusion builds graphs
    /// incrementally.
    pub fn check_closed(&self) -> Result<(), Error> {
        for neighbors in self.nodes.values() {
            for neighbor in neighbors {
                if !self.nodes.contains_key(neighbor.domain.name.as_str()) {
                    return Err(Error::UnknownNode(neighbor.domain.name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Removes every edge with `similarity < threshold`. Nodes that end up
    /// with an empty neighbor list remain as keys: clustering treats an
    /// isolated node as a singleton component.
    pub fn prune(&self, threshold: f64) -> Graph {
        let mut pruned = Graph::new(self.k_max);
        for (node, neighbors) in &self.nodes {
            pruned.put(node.clone(), neighbors.pruned(threshold));
        }
        pruned
    }

    /// Deep-clones the neighbor mapping. `Domain` is a plain value type in
    /// this port, so cloning it already duplicates its owned data; callers
    /// that relied on the source's by-reference node sharing only cared
    /// that the *mapping* was independently mutable, which this preserves.
    pub fn deep_clone(&self) -> Graph {
        self.clone()
    }

    /// All similarity values as a flat list, in node/neighbor iteration
    /// order, the input to the mean/variance/histogram stage.
    pub fn similarities(&self) -> Vec<f64> {
        self.nodes
            .values()
            .flat_map(|list| list.iter().map(|n| n.similarity))
            .collect()
    }

    /// Connected components under undirected reachability (an A->B or B->A
    /// edge connects A and B). Components are emitted in the order their
    /// first node appears in this graph's node iteration order; within a
    /// component, nodes retain discovery order from the traversal.
    pub fn connected_components(&self) -> Vec<Graph> {
        let mut reverse: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (node, neighbors) in &self.nodes {
            for neighbor in neighbors {
                reverse
                    .entry(neighbor.domain.name.as_str())
                    .or_default()
                    .push(node.name.as_str());
            }
        }

        let adjacency = |name: &str| -> Vec<&str> {
            let mut seen: IndexSet<&str> = IndexSet::new();
            if let Some(neighbors) = self.nodes.get(name) {
                for neighbor in neighbors {
                    seen.insert(neighbor.domain.name.as_str());
                }
            }
            if let Some(incoming) = reverse.get(name) {
                for &name in incoming {
                    seen.insert(name);
                }
            }
            seen.into_iter().collect()
        };

        let mut visited: IndexSet<&str> = IndexSet::new();
        let mut components = Vec::new();

        for start in self.nodes.keys() {
            let start_name = start.name.as_str();
            if visited.contains(start_name) {
                continue;
            }

            let mut order: Vec<&str> = Vec::new();
            let mut queue: VecDeque<&str> = VecDeque::new();
            queue.push_back(start_name);
            visited.insert(start_name);

            while let Some(name) = queue.pop_front() {
                order.push(name);
                for next in adjacency(name) {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }

            let mut component = Graph::new(self.k_max);
            for name in order {
                let (domain, neighbors) = self.nodes.get_key_value(name).expect("visited node");
                component.put(domain.clone(), neighbors.clone());
            }
            components.push(component);
        }

        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neighbor::Neighbor;

    fn edge(graph: &mut Graph, from: &str, to: &str, sim: f64) {
        graph.ensure_node(Domain::new(to));
        let mut list = graph
            .neighbors(from)
            .cloned()
            .unwrap_or_else(NeighborList::new);
        list.push(Neighbor::new(Domain::new(to), sim).unwrap());
        graph.put(Domain::new(from), list);
    }

    #[test]
    fn prune_keeps_isolated_nodes() {
        let mut g = Graph::new(None);
        edge(&mut g, "a", "b", 0.2);
        g.ensure_node(Domain::new("c"));

        let pruned = g.prune(0.5);
        assert_eq!(pruned.node_count(), 3);
        assert_eq!(pruned.edge_count(), 0);
        assert!(pruned.contains("c"));
    }

    #[test]
    fn components_partition_nodes() {
        let mut g = Graph::new(None);
        edge(&mut g, "a", "b", 0.9);
        g.ensure_node(Domain::new("c"));

        let components = g.connected_components();
        let total: usize = components.iter().map(Graph::node_count).sum();
        assert_eq!(total, g.node_count());
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].node_count(), 2);
        assert_eq!(components[1].node_count(), 1);
    }

    #[test]
    fn components_connect_via_reverse_edges() {
        // b -> a only: undirected reachability still joins them.
        let mut g = Graph::new(None);
        edge(&mut g, "b", "a", 0.9);

        let components = g.connected_components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].node_count(), 2);
    }
}
