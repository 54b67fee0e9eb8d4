use std::path::PathBuf;

use apt_pipeline::Parameters;
use clap::{Args, Parser, Subcommand};

use crate::error::Error;

#[derive(Parser, Debug)]
#[command(name = "apt", about = "Run one query against a batch-precomputed APT graph store.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one analyze query and print the ranked domain list.
    Analyze(AnalyzeArgs),
    /// Run one analyze query and print its ROC curve as CSV.
    Roc(RocArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory containing users.ser/subnets.ser/k.txt/<user>_<f>.ser.
    #[arg(long)]
    pub input_dir: PathBuf,

    #[command(flatten)]
    pub params: ParamsArgs,
}

#[derive(Args, Debug)]
pub struct RocArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[command(flatten)]
    pub params: ParamsArgs,

    /// Total number of ranked domains in the ground-truth population.
    #[arg(long)]
    pub total_domains: usize,

    /// Total number of `.apt`-labeled domains in the ground-truth population.
    #[arg(long)]
    pub total_apt: usize,
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// A TOML file holding a full `Parameters` value; overrides every flag
    /// below when given.
    #[arg(long)]
    pub params_file: Option<PathBuf>,

    /// A literal user id or a `a.b.c.d/p` subnet, or `0.0.0.0` for every user.
    #[arg(long)]
    pub user: Option<String>,

    #[arg(long, value_delimiter = ',')]
    pub feature_weights: Vec<f64>,

    #[arg(long, value_delimiter = ',')]
    pub feature_ordered_weights: Vec<f64>,

    #[arg(long, default_value_t = 0.0)]
    pub prune_threshold_temp: f64,

    #[arg(long, default_value_t = 0.0)]
    pub max_cluster_size_temp: f64,

    #[arg(long)]
    pub prune_z_bool: bool,

    #[arg(long)]
    pub cluster_z_bool: bool,

    #[arg(long)]
    pub whitelist_bool: bool,

    #[arg(long, default_value = "")]
    pub white_ongo: String,

    #[arg(long, default_value_t = 0)]
    pub number_requests: i64,

    /// Exactly 3 comma-separated weights: parents, children, requests.
    #[arg(long, value_delimiter = ',')]
    pub ranking_weights: Vec<f64>,

    #[arg(long)]
    pub apt_search: bool,
}

impl ParamsArgs {
    /// Loads `--params-file` if given, otherwise builds a `Parameters`
    /// straight from the flags.
    pub fn resolve(&self) -> Result<Parameters, Error> {
        if let Some(path) = &self.params_file {
            let text = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
                path: path.clone(),
                source,
            })?;
            return Ok(toml::from_str(&text)?);
        }

        let user = self
            .user
            .clone()
            .ok_or_else(|| Error::Usage("--user is required without --params-file".into()))?;
        let ranking_weights: [f64; 3] = self.ranking_weights.clone().try_into().map_err(|_| {
            Error::Usage("--ranking-weights takes exactly 3 comma-separated values".into())
        })?;

        Ok(Parameters {
            target: user,
            feature_weights: self.feature_weights.clone(),
            feature_ordered_weights: self.feature_ordered_weights.clone(),
            prune_threshold_temp: self.prune_threshold_temp,
            max_cluster_size_temp: self.max_cluster_size_temp,
            prune_z_bool: self.prune_z_bool,
            cluster_z_bool: self.cluster_z_bool,
            whitelist_bool: self.whitelist_bool,
            white_ongo: self.white_ongo.clone(),
            number_requests: self.number_requests,
            ranking_weights,
            apt_search: self.apt_search,
        })
    }
}
