//! Transport-agnostic query contract (spec §6): `analyze`, `getUsers`, and
//! `getRequests` over a session-keyed pipeline controller. The actual
//! JSON-RPC wire protocol is an external collaborator this crate is the
//! library for, not something implemented here.

mod error;
mod service;
mod session_id;
mod types;

pub use error::Error;
pub use service::QueryService;
pub use session_id::SessionId;
pub use types::{
    AnalyzeRequest, AnalyzeResponse, AptDomainDto, AptReportDto, GetRequestsRequest,
    GetRequestsResponse, GetUsersResponse, RankedDomainDto,
};

pub mod prelude {
    pub use crate::{
        export_roc_csv, AnalyzeRequest, AnalyzeResponse, Error, GetUsersResponse, QueryService,
        SessionId,
    };
}

/// Renders the ROC curve for a completed ranking as CSV. Kept at the
/// contract layer per spec §1 ("a trivial reducer specified only at the
/// contract level") rather than expanded into a file-writing service.
pub fn export_roc_csv(ranking: &apt_algos::Ranking, total_domains: usize, total_apt: usize) -> String {
    apt_algos::roc_csv(&apt_algos::roc_points(ranking, total_domains, total_apt))
}
