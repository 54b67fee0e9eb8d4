use std::collections::HashMap;
use std::path::PathBuf;

use apt_core::CancelToken;
use apt_pipeline::{Parameters, PipelineController, ProgressEvent, SessionState};
use apt_store::GraphStore;
use parking_lot::Mutex;

use crate::error::Error;
use crate::session_id::SessionId;
use crate::types::{AnalyzeRequest, AnalyzeResponse, GetRequestsResponse, GetUsersResponse};

/// Dispatches the engine's three query operations (spec §6) over one
/// `PipelineController`, keyed per session so independent callers (or the
/// same caller running several targets) each keep their own stage cache.
/// No network transport lives here, that's the external JSON-RPC
/// collaborator this crate is the library for.
pub struct QueryService {
    controller: PipelineController,
    sessions: Mutex<HashMap<SessionId, SessionState>>,
}

impl QueryService {
    pub fn new() -> Self {
        Self {
            controller: PipelineController::new(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a session against an `input_dir`, replacing any prior
    /// session state under the same id.
    pub fn open_session(&self, session_id: SessionId, input_dir: impl Into<PathBuf>) {
        self.sessions
            .lock()
            .insert(session_id, SessionState::new(GraphStore::open(input_dir)));
    }

    pub fn close_session(&self, session_id: &SessionId) {
        self.sessions.lock().remove(session_id);
    }

    pub fn analyze(
        &self,
        session_id: &SessionId,
        request: AnalyzeRequest,
        cancel: &CancelToken,
    ) -> Result<Option<AnalyzeResponse>, Error> {
        let params: Parameters = request.into();
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::UnknownSession(session_id.to_string()))?;

        let output = self.controller.analyze(session, params, cancel, |event: ProgressEvent| {
            log::debug!("session {session_id}: stage {} ({:?} elapsed): {}", event.stage, event.elapsed, event.message);
        })?;

        Ok(output.as_ref().map(AnalyzeResponse::from))
    }

    /// The union of subnets and users, subnets first (spec §6).
    pub fn get_users(&self, session_id: &SessionId) -> Result<GetUsersResponse, Error> {
        let sessions = self.sessions.lock();
        let session = sessions
            .get(session_id)
            .ok_or_else(|| Error::UnknownSession(session_id.to_string()))?;
        let subnets = session.store().get_all_subnets()?;
        let users = session.store().get_all_users()?;
        let mut combined = Vec::with_capacity(subnets.len() + users.len());
        combined.extend(subnets.iter().cloned());
        combined.extend(users.iter().cloned());
        Ok(GetUsersResponse { users: combined })
    }

    pub fn get_requests(
        &self,
        session_id: &SessionId,
        domain_name: &str,
    ) -> Result<GetRequestsResponse, Error> {
        let sessions = self.sessions.lock();
        let session = sessions
            .get(session_id)
            .ok_or_else(|| Error::UnknownSession(session_id.to_string()))?;
        Ok(GetRequestsResponse {
            requests: session.requests_for(domain_name),
        })
    }
}

impl Default for QueryService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apt_core::{Domain, Neighbor, NeighborList};
    use apt_core::Graph;
    use tempfile::tempdir;

    fn write_graph(path: &std::path::Path, graph: &Graph) {
        std::fs::write(path, bincode::serialize(graph).unwrap()).unwrap();
    }

    fn seeded_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("users.ser"), "1.2.3.4\n").unwrap();
        std::fs::write(dir.path().join("subnets.ser"), "").unwrap();
        std::fs::write(dir.path().join("k.txt"), "4\n").unwrap();

        let mut g = Graph::new(Some(4));
        let mut list = NeighborList::new();
        list.push(Neighbor::new(Domain::new("b.com"), 0.7).unwrap());
        g.put(Domain::new("a.com"), list);
        g.ensure_node(Domain::new("b.com"));
        write_graph(&dir.path().join("1.2.3.4_0.ser"), &g);
        dir
    }

    fn request() -> AnalyzeRequest {
        AnalyzeRequest {
            user: "1.2.3.4".into(),
            feature_weights: vec![1.0],
            feature_ordered_weights: vec![1.0],
            prune_threshold_temp: 0.0,
            max_cluster_size_temp: 100.0,
            prune_z_bool: false,
            cluster_z_bool: false,
            whitelist_bool: false,
            white_ongo: String::new(),
            number_requests: 0,
            ranking_weights: [0.0, 1.0, 0.0],
            apt_search: false,
        }
    }

    #[test]
    fn analyze_get_users_and_get_requests_round_trip() {
        let dir = seeded_dir();
        let service = QueryService::new();
        let session_id = SessionId::from("s1");
        service.open_session(session_id.clone(), dir.path());

        let users = service.get_users(&session_id).unwrap();
        assert_eq!(users.users, vec!["1.2.3.4".to_string()]);

        let response = service
            .analyze(&session_id, request(), &CancelToken::new())
            .unwrap()
            .unwrap();
        assert!(response.ranking.iter().any(|e| e.name == "a.com"));

        let requests = service.get_requests(&session_id, "a.com").unwrap();
        assert!(requests.requests.is_empty());
    }

    #[test]
    fn unknown_session_is_an_error() {
        let service = QueryService::new();
        let err = service
            .analyze(&SessionId::from("ghost"), request(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownSession(_)));
    }
}
