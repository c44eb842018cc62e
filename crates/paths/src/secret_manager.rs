//! # Secret Manager Names
//!
//! Resource names for secrets and secret versions, global and regional.
//!
//! Global secrets have no `locations/` segment; regional secrets do:
//!
//! - `projects/{project}/secrets/{secret}`
//! - `projects/{project}/locations/{region}/secrets/{secret}`

use crate::location::Location;

/// Full resource name of a secret
pub fn secret_name(project: &str, location: &Location, secret: &str) -> String {
    match location {
        Location::Global => format!("projects/{project}/secrets/{secret}"),
        Location::Regional(region) => {
            format!("projects/{project}/locations/{region}/secrets/{secret}")
        }
    }
}

/// Full resource name of a secret version (`latest` is accepted as a version)
pub fn secret_version_name(
    project: &str,
    location: &Location,
    secret: &str,
    version: &str,
) -> String {
    format!(
        "{}/versions/{version}",
        secret_name(project, location, secret)
    )
}

/// URI used inside a Parameter Manager `__REF__("...")` expression
///
/// Regional secrets must be referenced through their regional endpoint,
/// otherwise the parameter render fails with a not-found error.
pub fn secret_reference(
    project: &str,
    location: &Location,
    secret: &str,
    version: &str,
) -> String {
    let host = match location {
        Location::Global => "secretmanager.googleapis.com".to_string(),
        Location::Regional(region) => format!("secretmanager.{region}.rep.googleapis.com"),
    };
    format!(
        "//{host}/{}",
        secret_version_name(project, location, secret, version)
    )
}
