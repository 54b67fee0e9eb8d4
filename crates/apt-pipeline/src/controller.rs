//! The eight-stage pipeline controller (C5): target resolution, feature
//! fusion, similarity-based pruning, cluster-size filtering, whitelist
//! suppression and multi-criterion ranking, wired together with a
//! per-stage incremental cache and cooperative cancellation.

use std::sync::Arc;

use apt_algos::{AptReport, RequestCounts, Ranking};
use apt_core::stats::HistBin;
use apt_core::{stats, CancelToken, Graph};

use crate::cache::{stage_key, StageOutput, STAGE_COUNT};
use crate::error::Error;
use crate::parameters::Parameters;
use crate::progress::{ProgressClock, ProgressEvent};
use crate::session::SessionState;

/// Either the UI-mode or the study-mode response carries the same data in
/// this port: both the filtered clusters/stats (for the UI) and the
/// ranking/APT report (for study mode) are cheap to compute together once
/// the pipeline has run, so `analyze` always returns the full set rather
/// than forcing a second pass for the other mode.
#[derive(Clone, Debug)]
pub struct AnalyzeOutput {
    pub active_users: Vec<String>,
    pub similarity_stats: (f64, f64),
    pub hist_similarities: Vec<HistBin>,
    pub cluster_stats: (f64, f64),
    pub hist_clusters: Vec<HistBin>,
    pub filtered_clusters: Vec<Graph>,
    pub ranking: Ranking,
    pub apt_report: Option<AptReport>,
    pub summary_html: String,
}

/// Adapts stage 1's per-user fused graphs to [`apt_algos::RequestCounts`]
/// for the whitelist stage's "any active user below threshold" rule.
struct PerUserRequestCounts<'a>(&'a [(String, Graph)]);

impl RequestCounts for PerUserRequestCounts<'_> {
    fn request_count(&self, user: &str, domain_name: &str) -> usize {
        self.0
            .iter()
            .find(|(name, _)| name == user)
            .and_then(|(_, graph)| graph.get_domain(domain_name))
            .map(|domain| domain.requests.len())
            .unwrap_or(0)
    }
}

#[derive(Default)]
pub struct PipelineController;

impl PipelineController {
    pub fn new() -> Self {
        Self
    }

    /// Walks stages 0..8 in dependency order, recomputing from the first
    /// stage whose fingerprint no longer matches `params` and reusing
    /// `session`'s cache for everything before it (spec §8 property 6).
    /// Returns `Ok(None)` if `cancel` fires mid-query; the cache is left at
    /// the last stage that fully completed.
    pub fn analyze(
        &self,
        session: &mut SessionState,
        params: Parameters,
        cancel: &CancelToken,
        mut progress: impl FnMut(ProgressEvent),
    ) -> Result<Option<AnalyzeOutput>, Error> {
        params.validate()?;
        let clock = ProgressClock::start();
        let mismatch = session.cache.first_mismatch(&params);
        log::debug!("pipeline cache valid through stage {mismatch}");

        let mut active_users: Vec<String> = Vec::new();
        let mut per_user: Vec<(String, Graph)> = Vec::new();
        let mut aggregate = Graph::new(None);
        let mut similarity_stats = (0.0, 0.0);
        let mut hist_similarities: Vec<HistBin> = Vec::new();
        let mut pruned = Graph::new(None);
        let mut cluster_stats = (0.0, 0.0);
        let mut hist_clusters: Vec<HistBin> = Vec::new();
        let mut filtered: Vec<Graph> = Vec::new();
        let mut whitelisted: Vec<Graph> = Vec::new();
        let mut flat = Graph::new(None);
        let mut ranking = Ranking::default();
        let mut apt_report: Option<AptReport> = None;

        for stage in 0..STAGE_COUNT {
            if stage < mismatch {
                match session.cache.get(stage).expect("validated by first_mismatch") {
                    StageOutput::ActiveUsers(users) => active_users = users.clone(),
                    StageOutput::Fusion { per_user: pu, aggregate: agg } => {
                        per_user = pu.clone();
                        aggregate = agg.clone();
                    }
                    StageOutput::SimilarityStats { mean, variance, histogram } => {
                        similarity_stats = (*mean, *variance);
                        hist_similarities = histogram.clone();
                    }
                    StageOutput::Pruned(graph) => pruned = graph.clone(),
                    StageOutput::ClusterStats { mean, variance, histogram } => {
                        cluster_stats = (*mean, *variance);
                        hist_clusters = histogram.clone();
                    }
                    StageOutput::SizeFiltered(components) => filtered = components.clone(),
                    StageOutput::Whitelisted(components) => whitelisted = components.clone(),
                    StageOutput::Ranked { flat: f, ranking: r, apt_report: a } => {
                        flat = f.clone();
                        ranking = r.clone();
                        apt_report = a.clone();
                    }
                }
                continue;
            }

            if cancel.is_cancelled() {
                log::info!("query cancelled before stage {stage}; cache kept through stage {}", stage.saturating_sub(1));
                return Ok(None);
            }

            let output = match stage {
                0 => {
                    let all_users = session.store.get_all_users()?;
                    active_users = resolve_active_users(&params.target, &all_users)?;
                    progress(clock.event(0, format!("resolved {} active user(s)", active_users.len())));
                    StageOutput::ActiveUsers(active_users.clone())
                }
                1 => {
                    // TODO: params.feature_ordered_weights is validated but never
                    // threaded through to fusion; see fuse_all's doc comment.
                    match fuse_all(&session.store, &active_users, &params.feature_weights, cancel)? {
                        Some((pu, agg)) => {
                            per_user = pu;
                            aggregate = agg;
                            progress(clock.event(1, "fused per-user and aggregate graphs"));
                            StageOutput::Fusion {
                                per_user: per_user.clone(),
                                aggregate: aggregate.clone(),
                            }
                        }
                        None => return Ok(None),
                    }
                }
                2 => {
                    let similarities = aggregate.similarities();
                    let (mean, variance) = stats::mean_variance(&similarities);
                    similarity_stats = (mean, variance);
                    hist_similarities = stats::auto_histogram(&similarities);
                    progress(clock.event(2, format!("computed similarity distribution ({} bin(s))", hist_similarities.len())));
                    StageOutput::SimilarityStats {
                        mean,
                        variance,
                        histogram: hist_similarities.clone(),
                    }
                }
                3 => {
                    let (mean, variance) = similarity_stats;
                    let threshold = if params.prune_z_bool {
                        stats::from_z(mean, variance, params.prune_threshold_temp)
                    } else {
                        params.prune_threshold_temp
                    };
                    pruned = aggregate.prune(threshold);
                    progress(clock.event(3, format!("pruned below threshold {threshold:.4}")));
                    StageOutput::Pruned(pruned.clone())
                }
                4 => {
                    let sizes: Vec<f64> = pruned
                        .connected_components()
                        .iter()
                        .map(|c| c.node_count() as f64)
                        .collect();
                    let (mean, variance) = stats::mean_variance(&sizes);
                    cluster_stats = (mean, variance);
                    hist_clusters = stats::auto_histogram(&sizes);
                    progress(clock.event(4, format!("computed cluster-size distribution ({} bin(s))", hist_clusters.len())));
                    StageOutput::ClusterStats {
                        mean,
                        variance,
                        histogram: hist_clusters.clone(),
                    }
                }
                5 => {
                    let (mean, variance) = cluster_stats;
                    let max_size = if params.cluster_z_bool {
                        stats::from_z(mean, variance, params.max_cluster_size_temp)
                    } else {
                        params.max_cluster_size_temp
                    };
                    let max_size = max_size.max(0.0) as usize;
                    let components = pruned.connected_components();
                    filtered = apt_algos::filter_by_size(components, max_size);
                    progress(clock.event(5, format!("kept {} cluster(s) of size <= {max_size}", filtered.len())));
                    StageOutput::SizeFiltered(filtered.clone())
                }
                6 => {
                    if !params.whitelist_bool {
                        whitelisted = filtered.clone();
                        progress(clock.event(6, "whitelist stage disabled"));
                    } else {
                        let whitelist_path = session.store.whitelist_path();
                        let whitelist = apt_algos::Whitelist::load(Some(&whitelist_path), &params.white_ongo);
                        let min_requests = params.number_requests.max(0) as usize;
                        let counts = PerUserRequestCounts(&per_user);
                        match apt_algos::apply_whitelist(
                            filtered.clone(),
                            &whitelist,
                            min_requests,
                            &active_users,
                            &counts,
                            cancel,
                        ) {
                            Some(components) => {
                                whitelisted = components;
                                progress(clock.event(6, "applied whitelist and minimum-requests suppression"));
                            }
                            None => return Ok(None),
                        }
                    }
                    StageOutput::Whitelisted(whitelisted.clone())
                }
                7 => match apt_algos::flatten(&whitelisted, cancel) {
                    Some(f) => {
                        flat = f;
                        ranking = apt_algos::rank(&flat, params.ranking_weights);
                        apt_report = if params.apt_search {
                            apt_algos::apt_report(&ranking)
                        } else {
                            None
                        };
                        progress(clock.event(7, format!("ranked {} domain(s)", ranking.entries.len())));
                        StageOutput::Ranked {
                            flat: flat.clone(),
                            ranking: ranking.clone(),
                            apt_report: apt_report.clone(),
                        }
                    }
                    None => return Ok(None),
                },
                _ => unreachable!(),
            };

            session.cache.commit(stage, stage_key(stage, &params), output);
        }

        session.last_params = Some(params);

        let summary_html = apt_algos::render_summary(&ranking, apt_report.as_ref());
        Ok(Some(AnalyzeOutput {
            active_users,
            similarity_stats,
            hist_similarities,
            cluster_stats,
            hist_clusters,
            filtered_clusters: whitelisted,
            ranking,
            apt_report,
            summary_html,
        }))
    }
}


fn resolve_active_users(target: &str, all_users: &Arc<[String]>) -> Result<Vec<String>, Error> {
    let expanded = apt_store::expand_target(target, all_users);
    if expanded.is_empty() {
        return Err(Error::Validation(format!(
            "target '{target}' matches no known users"
        )));
    }
    if !apt_store::is_subnet_form(target) && !all_users.iter().any(|u| u == target) {
        return Err(Error::Validation(format!("unknown user '{target}'")));
    }
    Ok(expanded)
}

/// Stage 1 in full: fuse each active user's feature bundle into a per-user
/// graph, then fuse every per-user graph into one equally-weighted
/// aggregate. Returns `None` if `cancel` fires mid-fusion.
///
/// `feature_ordered_weights` is validated and carried on `Parameters` but
/// not consumed here, spec leaves its purpose unspecified (open question).
fn fuse_all(
    store: &apt_store::GraphStore,
    active_users: &[String],
    feature_weights: &[f64],
    cancel: &CancelToken,
) -> Result<Option<(Vec<(String, Graph)>, Graph)>, Error> {
    let mut per_user = Vec::with_capacity(active_users.len());
    for user in active_users {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let bundle = store.get_user_graphs(user)?;
        let refs: Vec<&Graph> = bundle.iter().collect();
        match apt_algos::fuse_features(&refs, feature_weights, cancel)? {
            Some(graph) => {
                graph.check_closed()?;
                per_user.push((user.clone(), graph));
            }
            None => return Ok(None),
        }
    }

    if per_user.is_empty() {
        return Ok(Some((per_user, Graph::new(None))));
    }

    let equal_weight = 1.0 / per_user.len() as f64;
    let weights = vec![equal_weight; per_user.len()];
    match apt_algos::fuse_users(&per_user, &weights, cancel)? {
        Some(aggregate) => {
            aggregate.check_closed()?;
            Ok(Some((per_user, aggregate)))
        }
        None => Ok(None),
    }
}
