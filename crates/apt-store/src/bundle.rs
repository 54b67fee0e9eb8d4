use apt_core::Graph;

/// For one user, the ordered sequence of `F` feature graphs. `F` is fixed
/// across every user in a batch and the i-th entry in every bundle
/// corresponds to the same similarity measure.
#[derive(Clone, Debug)]
pub struct FeatureGraphBundle(Vec<Graph>);

impl FeatureGraphBundle {
    pub fn new(graphs: Vec<Graph>) -> Self {
        Self(graphs)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, feature: usize) -> Option<&Graph> {
        self.0.get(feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Graph> {
        self.0.iter()
    }
}
