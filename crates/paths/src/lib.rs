//! Shared resource name definitions for Secret Manager and Parameter Manager
//!
//! The harness builds the `__REF__(...)` secret references it embeds in
//! Parameter Manager payloads from [`secret_reference`], and passes
//! [`Location`] to every `gcloud` call.
//!
//! The manifests under `templates/` spell their `resourceName`s out with
//! `$PROJECT_ID`-style tokens instead of calling into this crate. The
//! harness integration tests render those manifests and compare them with
//! [`secret_name`], [`parameter_name`] and [`parameter_version_name`];
//! nothing else keeps the two in step.
//!
//! ## Locations
//!
//! Every resource lives either in the global namespace or in a single region.
//! [`Location`] carries that choice and decides the shape of each name.

pub mod location;
pub mod parameter_manager;
pub mod secret_manager;

pub use location::Location;
pub use parameter_manager::{parameter_name, parameter_version_name};
pub use secret_manager::{secret_name, secret_reference, secret_version_name};
