use apt_core::Request;
use apt_store::GraphStore;

use crate::cache::{StageCache, StageOutput};
use crate::parameters::Parameters;

/// Per-session state (C9): the store handle a session queries against,
/// its stage cache, and the last `Parameters` it was run with. Only
/// [`crate::controller::PipelineController`] ever mutates this; callers
/// go through `analyze`, never touch the cache directly.
pub struct SessionState {
    pub(crate) store: GraphStore,
    pub(crate) cache: StageCache,
    pub(crate) last_params: Option<Parameters>,
}

impl SessionState {
    pub fn new(store: GraphStore) -> Self {
        Self {
            store,
            cache: StageCache::new(),
            last_params: None,
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Drops every cached stage, forcing the next query to recompute from
    /// scratch. Used when the caller knows the on-disk store changed
    /// underneath a long-lived session.
    pub fn reset(&mut self) {
        self.cache.invalidate_from(0);
        self.last_params = None;
    }

    /// The requests recorded against `domain_name` in the last completed
    /// `analyze` call's flattened graph, or an empty list if no query has
    /// run yet or the domain didn't survive filtering. Backs the
    /// `getRequests` auxiliary query (spec §6).
    pub fn requests_for(&self, domain_name: &str) -> Vec<Request> {
        match self.cache.get(7) {
            Some(StageOutput::Ranked { flat, .. }) => flat
                .get_domain(domain_name)
                .map(|domain| domain.requests.iter().cloned().collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}
