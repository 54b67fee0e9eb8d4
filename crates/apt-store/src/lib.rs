//! Reads the batch-precomputed per-user, per-feature k-NN graphs and the
//! users/subnets indexes produced by the (external) batch collaborator,
//! plus subnet-form target expansion for the pipeline's stage 0.

mod bundle;
mod error;
mod store;
mod subnet;

pub use bundle::FeatureGraphBundle;
pub use error::Error;
pub use store::GraphStore;
pub use subnet::{expand_target, is_subnet_form, ALL_USERS_SENTINEL};

pub mod prelude {
    pub use crate::{expand_target, is_subnet_form, FeatureGraphBundle, GraphStore};
}
