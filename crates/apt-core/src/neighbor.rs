use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::Error;

/// A `(Domain, similarity)` pair. Similarities are symmetric in intent but
/// stored directed: an A->B neighbor entry is independent of any B->A entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Neighbor {
    pub domain: Domain,
    pub similarity: f64,
}

impl Neighbor {
    pub fn new(domain: Domain, similarity: f64) -> Result<Self, Error> {
        if similarity < 0.0 {
            return Err(Error::NegativeSimilarity(similarity));
        }
        Ok(Self { domain, similarity })
    }
}

/// An ordered sequence of neighbors for one node.
///
/// Feature-graph neighbor lists are bounded to `k` (the batch k-NN
/// parameter, enforced by the caller that builds them); fusion and
/// aggregate graphs use an unbounded list.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NeighborList(Vec<Neighbor>);

impl NeighborList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_vec(neighbors: Vec<Neighbor>) -> Self {
        Self(neighbors)
    }

    pub fn push(&mut self, neighbor: Neighbor) {
        self.0.push(neighbor);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Neighbor> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Neighbor] {
        &self.0
    }

    /// Returns a new list with every entry whose similarity is strictly
    /// below `threshold` removed. An empty result is valid: pruning never
    /// removes the node itself, only edges.
    pub fn pruned(&self, threshold: f64) -> Self {
        Self(
            self.0
                .iter()
                .filter(|n| n.similarity >= threshold)
                .cloned()
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a NeighborList {
    type Item = &'a Neighbor;
    type IntoIter = std::slice::Iter<'a, Neighbor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Neighbor> for NeighborList {
    fn from_iter<T: IntoIterator<Item = Neighbor>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
