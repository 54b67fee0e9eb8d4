//! Graph-algebra layer for the APT domain-shortlisting engine: weighted
//! feature/user fusion (C4), cluster-size filtering and whitelist/minimum-
//! requests suppression (C6), multi-criterion ranking (C7), and ROC-curve
//! reduction (C8). Stateless: the pipeline controller owns staging,
//! caching and cancellation wiring around these functions.

mod error;
mod filter;
mod fusion;
mod rank;
mod roc;

pub use error::Error;
pub use filter::{apply_whitelist, filter_by_size, RequestCounts, Whitelist};
pub use fusion::{fuse_features, fuse_users};
pub use rank::{apt_report, flatten, rank, render_summary, AptEntry, AptReport, RankEntry, Ranking};
pub use roc::{roc_csv, roc_points};

pub mod prelude {
    pub use crate::{
        apply_whitelist, apt_report, filter_by_size, flatten, fuse_features, fuse_users, rank,
        render_summary, roc_csv, roc_points, AptEntry, AptReport, Error, RankEntry, Ranking,
        RequestCounts, Whitelist,
    };
}
