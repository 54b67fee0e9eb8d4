//! The eight-stage pipeline controller (C5) and per-session cache (C9) that
//! turn a validated [`Parameters`] query into a ranked domain list: target
//! resolution, weighted feature/user fusion, similarity-based pruning,
//! cluster-size filtering, whitelist suppression, and multi-criterion
//! ranking, with incremental per-stage caching and cooperative
//! cancellation threaded throughout.

mod cache;
mod controller;
mod error;
mod parameters;
mod progress;
mod session;

pub use controller::{AnalyzeOutput, PipelineController};
pub use error::Error;
pub use parameters::Parameters;
pub use progress::ProgressEvent;
pub use session::SessionState;

pub mod prelude {
    pub use crate::{AnalyzeOutput, Error, Parameters, PipelineController, ProgressEvent, SessionState};
}
