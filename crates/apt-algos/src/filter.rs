//! Cluster-size filtering and whitelist/minimum-requests suppression (C6).

use std::collections::HashSet as StdHashSet;
use std::path::Path;

use apt_core::{CancelToken, Graph};
use indexmap::IndexSet;

/// Drops every component whose node count exceeds `max_size`. A component
/// with size exactly `max_size` is kept.
pub fn filter_by_size(components: Vec<Graph>, max_size: usize) -> Vec<Graph> {
    components
        .into_iter()
        .filter(|c| c.node_count() <= max_size)
        .collect()
}

/// The union of a persistent whitelist file's contents and an ad-hoc,
/// newline-separated "on-the-go" string.
#[derive(Clone, Debug, Default)]
pub struct Whitelist(StdHashSet<String>);

impl Whitelist {
    /// A missing or unreadable persistent file is treated as an empty
    /// whitelist: the read failure is logged and the query proceeds (spec
    /// §7: "a whitelist read failure is logged and treated as an empty
    /// whitelist"). `persistent_path` is `None` when no persistent file is
    /// configured for this store at all, distinct from a configured-but-
    /// missing path; both end up contributing nothing to the set.
    pub fn load(persistent_path: Option<&Path>, ongoing_text: &str) -> Self {
        let mut set = StdHashSet::new();
        if let Some(path) = persistent_path {
            match std::fs::read_to_string(path) {
                Ok(contents) => set.extend(
                    contents
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                ),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!("whitelist file {} not found, treating as empty", path.display());
                }
                Err(err) => {
                    log::warn!("failed to read whitelist file {}: {err}; treating as empty", path.display());
                }
            }
        }
        set.extend(
            ongoing_text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        );
        Self(set)
    }

    pub fn contains(&self, domain_name: &str) -> bool {
        self.0.contains(domain_name)
    }
}

/// Per user, the request count for a given domain name (the engine's
/// `requests(domain)` lookup, restricted to a user already filtered to the
/// active set).
pub trait RequestCounts {
    fn request_count(&self, user: &str, domain_name: &str) -> usize;
}

/// For each component, for each domain, whitelists it (and so removes it
/// and its incident edges from the component) if either its name is in
/// `whitelist`, or any user in `active_users` has fewer than `min_requests`
/// requests for it (spec §4.6, the "any single user" suppression rule,
/// preserved as observed).
///
/// Polls `cancel` once per component.
pub fn apply_whitelist(
    components: Vec<Graph>,
    whitelist: &Whitelist,
    min_requests: usize,
    active_users: &[String],
    request_counts: &dyn RequestCounts,
    cancel: &CancelToken,
) -> Option<Vec<Graph>> {
    let mut filtered = Vec::with_capacity(components.len());

    for component in components {
        if cancel.is_cancelled() {
            return None;
        }

        let mut whitelisted: IndexSet<String> = IndexSet::new();
        for node in component.nodes() {
            if whitelisted.contains(&node.name) {
                continue;
            }
            if whitelist.contains(&node.name) {
                whitelisted.insert(node.name.clone());
                continue;
            }
            for user in active_users {
                if request_counts.request_count(user, &node.name) < min_requests {
                    whitelisted.insert(node.name.clone());
                    break;
                }
            }
        }

        if whitelisted.is_empty() {
            filtered.push(component);
            continue;
        }

        let mut survivor = Graph::new(component.k_max());
        for (domain, neighbors) in component.entries() {
            if whitelisted.contains(&domain.name) {
                continue;
            }
            let kept: Vec<_> = neighbors
                .iter()
                .filter(|n| !whitelisted.contains(&n.domain.name))
                .cloned()
                .collect();
            survivor.put(domain.clone(), apt_core::NeighborList::from_vec(kept));
        }
        filtered.push(survivor);
    }

    Some(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apt_core::Domain;

    struct FixedCounts(Vec<((String, String), usize)>);
    impl RequestCounts for FixedCounts {
        fn request_count(&self, user: &str, domain_name: &str) -> usize {
            self.0
                .iter()
                .find(|((u, d), _)| u == user && d == domain_name)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        }
    }

    #[test]
    fn s2_scenario_min_requests() {
        let mut g = Graph::new(None);
        g.ensure_node(Domain::new("X"));
        let components = vec![g];

        let counts = FixedCounts(vec![
            (("u1".to_string(), "X".to_string()), 5),
            (("u2".to_string(), "X".to_string()), 2),
        ]);
        let users = vec!["u1".to_string(), "u2".to_string()];
        let whitelist = Whitelist::load(None, "");

        let result = apply_whitelist(components.clone(), &whitelist, 3, &users, &counts, &CancelToken::new())
            .unwrap();
        assert_eq!(result[0].node_count(), 0);

        let result = apply_whitelist(components, &whitelist, 2, &users, &counts, &CancelToken::new()).unwrap();
        assert_eq!(result[0].node_count(), 1);
    }

    #[test]
    fn missing_persistent_file_is_an_empty_whitelist() {
        let dir = tempfile::tempdir().unwrap();
        let whitelist = Whitelist::load(Some(&dir.path().join("whitelist.txt")), "evil.com");
        assert!(!whitelist.contains("a.com"));
        assert!(whitelist.contains("evil.com"));
    }

    #[test]
    fn persistent_file_unions_with_ongoing_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whitelist.txt");
        std::fs::write(&path, "known-good.com\n\nanother.com\n").unwrap();

        let whitelist = Whitelist::load(Some(&path), "ad-hoc.com");
        assert!(whitelist.contains("known-good.com"));
        assert!(whitelist.contains("another.com"));
        assert!(whitelist.contains("ad-hoc.com"));
        assert!(!whitelist.contains("unrelated.com"));
    }

    #[test]
    fn size_filter_boundary_keeps_exact_match() {
        let mut small = Graph::new(None);
        small.ensure_node(Domain::new("a"));
        small.ensure_node(Domain::new("b"));
        let mut large = Graph::new(None);
        for n in ["a", "b", "c"] {
            large.ensure_node(Domain::new(n));
        }

        let filtered = filter_by_size(vec![small, large], 2);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].node_count(), 2);
    }

    #[test]
    fn size_filter_is_idempotent() {
        let mut g = Graph::new(None);
        for n in ["a", "b", "c"] {
            g.ensure_node(Domain::new(n));
        }
        let once = filter_by_size(vec![g.clone()], 2);
        let twice = filter_by_size(once.clone(), 2);
        assert_eq!(once.len(), twice.len());
    }
}
