use serde::{Deserialize, Serialize};

use crate::error::Error;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-10;

/// A full query, exactly the field list of spec §3/§6.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Parameters {
    pub target: String,
    pub feature_weights: Vec<f64>,
    pub feature_ordered_weights: Vec<f64>,
    pub prune_threshold_temp: f64,
    pub max_cluster_size_temp: f64,
    pub prune_z_bool: bool,
    pub cluster_z_bool: bool,
    pub whitelist_bool: bool,
    pub white_ongo: String,
    pub number_requests: i64,
    pub ranking_weights: [f64; 3],
    pub apt_search: bool,
}

fn weights_sum_to_one(weights: &[f64]) -> bool {
    (weights.iter().sum::<f64>() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
}

impl Parameters {
    /// Implements every `ValidationError` condition of spec §7/§8 property
    /// 1. A failure here means "query refused, no output" at the caller.
    pub fn validate(&self) -> Result<(), Error> {
        if self.target.trim().is_empty() {
            return Err(Error::Validation("target user/subnet must not be empty".into()));
        }

        if self.feature_weights.is_empty() {
            return Err(Error::Validation("feature_weights must not be empty".into()));
        }
        if self.feature_weights.len() != self.feature_ordered_weights.len() {
            return Err(Error::Validation(
                "feature_weights and feature_ordered_weights must have the same length".into(),
            ));
        }

        if self.feature_weights.iter().any(|&w| w < 0.0) {
            return Err(Error::Validation("feature_weights must be non-negative".into()));
        }
        if self.feature_ordered_weights.iter().any(|&w| w < 0.0) {
            return Err(Error::Validation(
                "feature_ordered_weights must be non-negative".into(),
            ));
        }
        if !weights_sum_to_one(&self.feature_weights) {
            return Err(Error::Validation("feature_weights must sum to 1".into()));
        }
        if !weights_sum_to_one(&self.feature_ordered_weights) {
            return Err(Error::Validation(
                "feature_ordered_weights must sum to 1".into(),
            ));
        }

        if !self.prune_z_bool && self.prune_threshold_temp < 0.0 {
            return Err(Error::Validation(
                "prune_threshold_temp must be non-negative in raw mode".into(),
            ));
        }
        if !self.cluster_z_bool && self.max_cluster_size_temp < 0.0 {
            return Err(Error::Validation(
                "max_cluster_size_temp must be non-negative in raw mode".into(),
            ));
        }

        if self.number_requests < 0 {
            return Err(Error::Validation("number_requests must be non-negative".into()));
        }

        // Ranking weight position 2 may be negative (it penalizes request
        // count); positions 0 and 1 may not.
        if self.ranking_weights[0] < 0.0 || self.ranking_weights[1] < 0.0 {
            return Err(Error::Validation(
                "ranking_weights[0] and ranking_weights[1] must be non-negative".into(),
            ));
        }
        if (self.ranking_weights.iter().sum::<f64>() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Validation("ranking_weights must sum to 1".into()));
        }

        Ok(())
    }
}

/// Bit-pattern canonicalization of a float for fingerprint comparisons, to
/// avoid NaN/equality pitfalls (spec §9).
pub(crate) fn canon(x: f64) -> u64 {
    x.to_bits()
}

pub(crate) fn canon_slice(xs: &[f64]) -> Vec<u64> {
    xs.iter().copied().map(canon).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Parameters {
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
    fn valid_parameters_pass() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut p = valid();
        p.feature_weights[0] = -0.1;
        p.feature_weights[1] = 1.1;
        assert!(p.validate().is_err());
    }

    #[test]
    fn weights_not_summing_to_one_are_rejected() {
        let mut p = valid();
        p.feature_weights = vec![0.3, 0.3];
        assert!(p.validate().is_err());
    }

    #[test]
    fn ranking_weight_2_may_be_negative() {
        let mut p = valid();
        p.ranking_weights = [0.6, 0.6, -0.2];
        assert!(p.validate().is_ok());
    }

    #[test]
    fn ranking_weight_0_may_not_be_negative() {
        let mut p = valid();
        p.ranking_weights = [-0.2, 0.6, 0.6];
        assert!(p.validate().is_err());
    }

    #[test]
    fn negative_raw_threshold_without_z_mode_is_rejected() {
        let mut p = valid();
        p.prune_threshold_temp = -1.0;
        assert!(p.validate().is_err());
        p.prune_z_bool = true;
        assert!(p.validate().is_ok());
    }
}
