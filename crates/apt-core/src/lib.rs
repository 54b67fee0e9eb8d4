//! Core data model and graph primitive for the APT domain-shortlisting
//! engine: `Request`, `Domain`, `Neighbor`, `NeighborList`, `Graph`, and the
//! mean/variance/z-score/histogram statistics vocabulary the pipeline's
//! prune and cluster-size stages are built on.

mod cancel;
mod domain;
mod error;
mod graph;
mod neighbor;
mod request;
pub mod stats;

pub use cancel::CancelToken;
pub use domain::Domain;
pub use error::Error;
pub use graph::Graph;
pub use neighbor::{Neighbor, NeighborList};
pub use request::Request;

pub mod prelude {
    pub use crate::stats::{
        auto_histogram, clean_histogram, from_z, histogram, mean_variance, sort_by_index, HistBin,
    };
    pub use crate::{CancelToken, Domain, Error, Graph, Neighbor, NeighborList, Request};
}
