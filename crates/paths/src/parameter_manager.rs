//! # Parameter Manager Names
//!
//! Parameters always carry a `locations/` segment, `global` included.

use crate::location::Location;

/// Full resource name of a parameter
pub fn parameter_name(project: &str, location: &Location, parameter: &str) -> String {
    format!(
        "projects/{project}/locations/{}/parameters/{parameter}",
        location.as_str()
    )
}

/// Full resource name of a parameter version
pub fn parameter_version_name(
    project: &str,
    location: &Location,
    parameter: &str,
    version: &str,
) -> String {
    format!(
        "{}/versions/{version}",
        parameter_name(project, location, parameter)
    )
}
