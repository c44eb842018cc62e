//! # Collaborator CLIs
//!
//! Typed wrappers that turn harness operations into `gcloud` / `kubectl`
//! argument vectors and parse what comes back.

pub mod gcloud;
pub mod kubectl;

pub use gcloud::Gcloud;
pub use kubectl::{events_mention, is_pod_ready, Kubectl};
