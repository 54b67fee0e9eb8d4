use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use apt_core::Graph;
use parking_lot::RwLock;

use crate::bundle::FeatureGraphBundle;
use crate::error::Error;

/// Process-wide, read-mostly cache of the users/subnets index lists, keyed
/// by the input directory they were read from. Guarded by a single lock per
/// list; writers only ever add a new entry on cache miss, readers never
/// tear (spec: "the engine must tolerate concurrent reads without
/// tearing").
fn users_cache() -> &'static RwLock<HashMap<PathBuf, Arc<[String]>>> {
    static CACHE: OnceLock<RwLock<HashMap<PathBuf, Arc<[String]>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

fn subnets_cache() -> &'static RwLock<HashMap<PathBuf, Arc<[String]>>> {
    static CACHE: OnceLock<RwLock<HashMap<PathBuf, Arc<[String]>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Reads the batch-precomputed per-user per-feature k-NN graphs and the
/// users/subnets indexes out of a fixed `input_dir`. Re-reads of the
/// feature graphs themselves are always allowed, no in-process cache is
/// mandated by the spec for those: they are large and superseded as soon
/// as stage 1 fuses them. Only the small index lists are cached.
pub struct GraphStore {
    input_dir: PathBuf,
}

impl GraphStore {
    pub fn open(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
        }
    }

    pub fn get_all_users(&self) -> Result<Arc<[String]>, Error> {
        if let Some(cached) = users_cache().read().get(&self.input_dir) {
            return Ok(cached.clone());
        }
        let users: Arc<[String]> = read_lines(&self.path("users.ser"))?.into();
        users_cache()
            .write()
            .insert(self.input_dir.clone(), users.clone());
        Ok(users)
    }

    pub fn get_all_subnets(&self) -> Result<Arc<[String]>, Error> {
        if let Some(cached) = subnets_cache().read().get(&self.input_dir) {
            return Ok(cached.clone());
        }
        let subnets: Arc<[String]> = read_lines(&self.path("subnets.ser"))?.into();
        subnets_cache()
            .write()
            .insert(self.input_dir.clone(), subnets.clone());
        Ok(subnets)
    }

    pub fn get_k(&self) -> Result<usize, Error> {
        let path = self.path("k.txt");
        let text = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        text.trim()
            .parse::<usize>()
            .map_err(|_| Error::InvalidK(text))
    }

    /// Loads the F feature graphs for `user`, stopping at the first
    /// `f` for which `<user>_<f>.ser` does not exist. Order is the feature
    /// index, which every bundle across users agrees on.
    pub fn get_user_graphs(&self, user: &str) -> Result<FeatureGraphBundle, Error> {
        let mut graphs = Vec::new();
        let mut feature = 0usize;
        loop {
            let path = self.feature_graph_path(user, feature);
            if !path.exists() {
                break;
            }
            graphs.push(read_graph(&path)?);
            feature += 1;
        }
        if graphs.is_empty() {
            return Err(Error::UserNotFound(user.to_string()));
        }
        Ok(FeatureGraphBundle::new(graphs))
    }

    /// The persistent whitelist file's path for this store (spec §6):
    /// `<input_dir>/whitelist.txt`, read by `apt_algos::Whitelist::load`;
    /// a missing file there is treated as an empty whitelist, not an error.
    pub fn whitelist_path(&self) -> PathBuf {
        self.path("whitelist.txt")
    }

    fn path(&self, name: &str) -> PathBuf {
        self.input_dir.join(name)
    }

    fn feature_graph_path(&self, user: &str, feature: usize) -> PathBuf {
        self.input_dir.join(format!("{user}_{feature}.ser"))
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn read_graph(path: &Path) -> Result<Graph, Error> {
    let bytes = std::fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let graph: Graph = bincode::deserialize(&bytes).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    // A batch-file graph referencing a neighbor it never declares as a node
    // is an invariant violation (spec §7 InternalError), not a decode
    // failure: fail loudly rather than feed a malformed graph downstream.
    graph.check_closed()?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apt_core::{Domain, Neighbor, NeighborList};
    use tempfile::tempdir;

    fn write_graph(path: &Path, graph: &Graph) {
        let bytes = bincode::serialize(graph).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn loads_users_subnets_and_feature_bundle() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("users.ser"), "1.2.3.4\n5.6.7.8\n").unwrap();
        std::fs::write(dir.path().join("subnets.ser"), "1.2.3.0/24\n").unwrap();
        std::fs::write(dir.path().join("k.txt"), "5\n").unwrap();

        let mut g0 = Graph::new(Some(5));
        g0.put(
            Domain::new("a.com"),
            NeighborList::from_vec(vec![Neighbor::new(Domain::new("b.com"), 0.5).unwrap()]),
        );
        g0.ensure_node(Domain::new("b.com"));
        write_graph(&dir.path().join("1.2.3.4_0.ser"), &g0);

        let store = GraphStore::open(dir.path());
        assert_eq!(&*store.get_all_users().unwrap(), &["1.2.3.4", "5.6.7.8"]);
        assert_eq!(&*store.get_all_subnets().unwrap(), &["1.2.3.0/24"]);
        assert_eq!(store.get_k().unwrap(), 5);

        let bundle = store.get_user_graphs("1.2.3.4").unwrap();
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.get(0).unwrap().node_count(), 2);
    }

    #[test]
    fn missing_user_is_an_error() {
        let dir = tempdir().unwrap();
        let store = GraphStore::open(dir.path());
        assert!(store.get_user_graphs("nobody").is_err());
    }

    #[test]
    fn a_graph_with_a_dangling_neighbor_is_an_internal_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("users.ser"), "1.2.3.4\n").unwrap();
        std::fs::write(dir.path().join("subnets.ser"), "").unwrap();
        std::fs::write(dir.path().join("k.txt"), "4\n").unwrap();

        // "b.com" is referenced as a neighbor target but never added as a
        // node: a malformed batch file should fail loudly, not silently
        // feed a broken graph downstream (spec §7 InternalError).
        let mut broken = Graph::new(Some(4));
        broken.put(
            Domain::new("a.com"),
            NeighborList::from_vec(vec![Neighbor::new(Domain::new("b.com"), 0.5).unwrap()]),
        );
        write_graph(&dir.path().join("1.2.3.4_0.ser"), &broken);

        let store = GraphStore::open(dir.path());
        let err = store.get_user_graphs("1.2.3.4").unwrap_err();
        assert!(matches!(err, Error::Core(_)));
    }
}
