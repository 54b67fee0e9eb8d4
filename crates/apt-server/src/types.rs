use apt_algos::{AptEntry, AptReport, RankEntry};
use apt_pipeline::{AnalyzeOutput, Parameters};
use serde::{Deserialize, Serialize};

/// The JSON-RPC-ish `analyze` request of spec §6. Field names mirror the
/// wire contract exactly; `user` is the external name for what the rest of
/// the engine calls the query `target` (a literal user id or a subnet).
#[derive(Clone, Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub user: String,
    pub feature_weights: Vec<f64>,
    #[serde(default)]
    pub feature_ordered_weights: Vec<f64>,
    pub prune_threshold_temp: f64,
    pub max_cluster_size_temp: f64,
    pub prune_z_bool: bool,
    pub cluster_z_bool: bool,
    pub whitelist_bool: bool,
    #[serde(default)]
    pub white_ongo: String,
    #[serde(default)]
    pub number_requests: i64,
    pub ranking_weights: [f64; 3],
    #[serde(default)]
    pub apt_search: bool,
}

impl AnalyzeRequest {
    /// Parses a single JSON-RPC `analyze` params object (spec §6). The
    /// transport itself lives outside this crate; this is the one seam
    /// where a caller that already has JSON text (rather than a
    /// pre-built `AnalyzeRequest`) can hand it to `QueryService` directly.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl From<AnalyzeRequest> for Parameters {
    fn from(request: AnalyzeRequest) -> Self {
        Parameters {
            target: request.user,
            feature_weights: request.feature_weights,
            feature_ordered_weights: request.feature_ordered_weights,
            prune_threshold_temp: request.prune_threshold_temp,
            max_cluster_size_temp: request.max_cluster_size_temp,
            prune_z_bool: request.prune_z_bool,
            cluster_z_bool: request.cluster_z_bool,
            whitelist_bool: request.whitelist_bool,
            white_ongo: request.white_ongo,
            number_requests: request.number_requests,
            ranking_weights: request.ranking_weights,
            apt_search: request.apt_search,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RankedDomainDto {
    pub name: String,
    pub parents: f64,
    pub children: f64,
    pub requests: usize,
    pub index: f64,
}

impl From<&RankEntry> for RankedDomainDto {
    fn from(entry: &RankEntry) -> Self {
        Self {
            name: entry.name.clone(),
            parents: entry.parents,
            children: entry.children,
            requests: entry.requests,
            index: entry.index,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AptDomainDto {
    pub name: String,
    pub index: f64,
}

impl From<&AptEntry> for AptDomainDto {
    fn from(entry: &AptEntry) -> Self {
        Self {
            name: entry.name.clone(),
            index: entry.index,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AptReportDto {
    pub worst_top_percentile: f64,
    pub apt_domains: Vec<AptDomainDto>,
}

impl From<&AptReport> for AptReportDto {
    fn from(report: &AptReport) -> Self {
        Self {
            worst_top_percentile: report.worst_top_percentile,
            apt_domains: report.apt_domains.iter().map(AptDomainDto::from).collect(),
        }
    }
}

/// The `analyze` response. `filtered_cluster_sizes` reports shape only
/// (domain count per surviving cluster) rather than full request logs;
/// per-domain request detail is fetched on demand via `getRequests`,
/// keeping this response small for the common "just show me the ranking"
/// caller.
#[derive(Clone, Debug, Serialize)]
pub struct AnalyzeResponse {
    pub active_users: Vec<String>,
    pub similarity_mean: f64,
    pub similarity_variance: f64,
    pub hist_similarities: Vec<apt_core::stats::HistBin>,
    pub cluster_mean: f64,
    pub cluster_variance: f64,
    pub hist_clusters: Vec<apt_core::stats::HistBin>,
    pub filtered_cluster_sizes: Vec<usize>,
    pub ranking: Vec<RankedDomainDto>,
    pub apt_report: Option<AptReportDto>,
    pub summary_html: String,
}

impl From<&AnalyzeOutput> for AnalyzeResponse {
    fn from(output: &AnalyzeOutput) -> Self {
        Self {
            active_users: output.active_users.clone(),
            similarity_mean: output.similarity_stats.0,
            similarity_variance: output.similarity_stats.1,
            hist_similarities: output.hist_similarities.clone(),
            cluster_mean: output.cluster_stats.0,
            cluster_variance: output.cluster_stats.1,
            hist_clusters: output.hist_clusters.clone(),
            filtered_cluster_sizes: output
                .filtered_clusters
                .iter()
                .map(apt_core::Graph::node_count)
                .collect(),
            ranking: output.ranking.entries.iter().map(RankedDomainDto::from).collect(),
            apt_report: output.apt_report.as_ref().map(AptReportDto::from),
            summary_html: output.summary_html.clone(),
        }
    }
}

impl AnalyzeResponse {
    /// Renders this response as the JSON-RPC result payload (spec §6).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GetUsersResponse {
    pub users: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GetRequestsRequest {
    pub domain: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct GetRequestsResponse {
    pub requests: Vec<apt_core::Request>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_request_round_trips_through_json() {
        let text = r#"{
            "user": "1.2.3.4",
            "feature_weights": [1.0],
            "prune_threshold_temp": 0.0,
            "max_cluster_size_temp": 10.0,
            "prune_z_bool": false,
            "cluster_z_bool": false,
            "whitelist_bool": false,
            "ranking_weights": [0.0, 1.0, 0.0]
        }"#;
        let request = AnalyzeRequest::from_json(text).unwrap();
        assert_eq!(request.user, "1.2.3.4");
        assert_eq!(request.feature_weights, vec![1.0]);
        assert!(request.feature_ordered_weights.is_empty());
        assert!(!request.apt_search);
    }
}
