//! Per-stage fingerprint keys and the cache slots they guard.
//!
//! Each of the eight stages owns one slot holding the fingerprint of the
//! parameter fields it alone consumes, plus its output. A query compares
//! its current `Parameters` against the cached fingerprints stage by
//! stage, in dependency order; the first mismatch invalidates that stage
//! and every stage after it (spec §9's "vector of tagged cache slots").
//! A stage's own key only needs to capture what's *new* at that stage;
//! an upstream change already invalidates everything downstream through
//! the sequential-mismatch walk, so stage N's key never needs to restate
//! stage N-1's inputs.

use apt_algos::{AptReport, Ranking};
use apt_core::Graph;

use crate::parameters::{canon, canon_slice, Parameters};

pub const STAGE_COUNT: usize = 8;

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum KeyPart {
    Bool(bool),
    Bits(u64),
    Int(i64),
    Text(String),
}

pub(crate) type StageKey = Vec<KeyPart>;

pub(crate) fn stage_key(stage: usize, params: &Parameters) -> StageKey {
    match stage {
        0 => vec![KeyPart::Text(params.target.clone())],
        1 => {
            let mut key: Vec<KeyPart> = canon_slice(&params.feature_weights)
                .into_iter()
                .map(KeyPart::Bits)
                .collect();
            key.extend(
                canon_slice(&params.feature_ordered_weights)
                    .into_iter()
                    .map(KeyPart::Bits),
            );
            key
        }
        2 => vec![KeyPart::Bool(params.prune_z_bool)],
        3 => vec![KeyPart::Bits(canon(params.prune_threshold_temp))],
        4 => vec![KeyPart::Bool(params.cluster_z_bool)],
        5 => vec![KeyPart::Bits(canon(params.max_cluster_size_temp))],
        6 => vec![
            KeyPart::Bool(params.whitelist_bool),
            KeyPart::Text(params.white_ongo.clone()),
            KeyPart::Int(params.number_requests),
        ],
        7 => {
            let mut key: Vec<KeyPart> = params
                .ranking_weights
                .iter()
                .map(|&w| KeyPart::Bits(canon(w)))
                .collect();
            key.push(KeyPart::Bool(params.apt_search));
            key
        }
        _ => unreachable!("pipeline has exactly {STAGE_COUNT} stages"),
    }
}

/// Stage outputs have different shapes; one variant per stage rather than
/// a type-erased `Box<dyn Any>`, so `PipelineController` never downcasts.
#[derive(Clone, Debug)]
pub(crate) enum StageOutput {
    ActiveUsers(Vec<String>),
    Fusion {
        per_user: Vec<(String, Graph)>,
        aggregate: Graph,
    },
    SimilarityStats {
        mean: f64,
        variance: f64,
        histogram: Vec<apt_core::stats::HistBin>,
    },
    Pruned(Graph),
    ClusterStats {
        mean: f64,
        variance: f64,
        histogram: Vec<apt_core::stats::HistBin>,
    },
    SizeFiltered(Vec<Graph>),
    Whitelisted(Vec<Graph>),
    Ranked {
        flat: Graph,
        ranking: Ranking,
        apt_report: Option<AptReport>,
    },
}

#[derive(Clone, Debug, Default)]
pub(crate) struct StageCache {
    slots: Vec<Option<(StageKey, StageOutput)>>,
}

impl StageCache {
    pub(crate) fn new() -> Self {
        Self {
            slots: (0..STAGE_COUNT).map(|_| None).collect(),
        }
    }

    /// The first stage index whose cached key doesn't match `params`, or
    /// `STAGE_COUNT` if every cached slot is still valid.
    pub(crate) fn first_mismatch(&self, params: &Parameters) -> usize {
        for stage in 0..STAGE_COUNT {
            let fresh_key = stage_key(stage, params);
            match &self.slots[stage] {
                Some((cached_key, _)) if *cached_key == fresh_key => continue,
                _ => return stage,
            }
        }
        STAGE_COUNT
    }

    pub(crate) fn get(&self, stage: usize) -> Option<&StageOutput> {
        self.slots[stage].as_ref().map(|(_, output)| output)
    }

    pub(crate) fn commit(&mut self, stage: usize, key: StageKey, output: StageOutput) {
        self.slots[stage] = Some((key, output));
    }

    /// Drops every slot from `from` onward, e.g. after a cancellation
    /// leaves a stage half-computed.
    pub(crate) fn invalidate_from(&mut self, from: usize) {
        for slot in &mut self.slots[from..] {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Parameters {
        Parameters {
            target: "1.2.3.4".into(),
            feature_weights: vec![0.5, 0.5],
            feature_ordered_weights: vec![0.5, 0.5],
            prune_threshold_temp: 0.1,
            max_cluster_size_temp: 10.0,
            prune_z_bool: false,
            cluster_z_bool: false,
            whitelist_bool: false,
            white_ongo: String::new(),
            number_requests: 0,
            ranking_weights: [0.4, 0.4, 0.2],
            apt_search: false,
        }
    }

    #[test]
    fn empty_cache_mismatches_at_stage_zero() {
        let cache = StageCache::new();
        assert_eq!(cache.first_mismatch(&params()), 0);
    }

    #[test]
    fn changing_a_mid_stage_field_invalidates_from_there_on() {
        let mut cache = StageCache::new();
        let p = params();
        for stage in 0..STAGE_COUNT {
            cache.commit(stage, stage_key(stage, &p), StageOutput::ActiveUsers(vec![]));
        }
        assert_eq!(cache.first_mismatch(&p), STAGE_COUNT);

        let mut changed = p.clone();
        changed.prune_threshold_temp += 1.0;
        assert_eq!(cache.first_mismatch(&changed), 3);
    }

    #[test]
    fn unrelated_field_change_does_not_invalidate_unrelated_stage() {
        let mut cache = StageCache::new();
        let p = params();
        for stage in 0..STAGE_COUNT {
            cache.commit(stage, stage_key(stage, &p), StageOutput::ActiveUsers(vec![]));
        }
        let mut changed = p.clone();
        changed.white_ongo = "evil.apt".into();
        assert_eq!(cache.first_mismatch(&changed), 6);
    }

    proptest::proptest! {
        /// For any single-field perturbation at a known stage, the first
        /// mismatch is exactly that stage, never earlier (would wrongly
        /// discard valid upstream work) and never later (would serve a
        /// stale result), spec §8 property 6.
        #[test]
        fn single_field_change_invalidates_exactly_its_own_stage(
            delta in 0.1f64..10.0,
            number_requests_delta in 1i64..100,
        ) {
            let p = params();
            let mut cache = StageCache::new();
            for stage in 0..STAGE_COUNT {
                cache.commit(stage, stage_key(stage, &p), StageOutput::ActiveUsers(vec![]));
            }

            let mut target_changed = p.clone();
            target_changed.target = format!("{}x", p.target);
            proptest::prop_assert_eq!(cache.first_mismatch(&target_changed), 0);

            let mut weight_changed = p.clone();
            weight_changed.feature_weights[0] += delta;
            proptest::prop_assert_eq!(cache.first_mismatch(&weight_changed), 1);

            let mut prune_z_changed = p.clone();
            prune_z_changed.prune_z_bool = !p.prune_z_bool;
            proptest::prop_assert_eq!(cache.first_mismatch(&prune_z_changed), 2);

            let mut threshold_changed = p.clone();
            threshold_changed.prune_threshold_temp += delta;
            proptest::prop_assert_eq!(cache.first_mismatch(&threshold_changed), 3);

            let mut cluster_z_changed = p.clone();
            cluster_z_changed.cluster_z_bool = !p.cluster_z_bool;
            proptest::prop_assert_eq!(cache.first_mismatch(&cluster_z_changed), 4);

            let mut max_size_changed = p.clone();
            max_size_changed.max_cluster_size_temp += delta;
            proptest::prop_assert_eq!(cache.first_mismatch(&max_size_changed), 5);

            let mut requests_changed = p.clone();
            requests_changed.number_requests += number_requests_delta;
            proptest::prop_assert_eq!(cache.first_mismatch(&requests_changed), 6);

            let mut ranking_changed = p.clone();
            ranking_changed.ranking_weights[0] += delta;
            proptest::prop_assert_eq!(cache.first_mismatch(&ranking_changed), 7);
        }
    }
}
