//! # Payloads
//!
//! Byte payloads written to cloud resources and the values the provider is
//! expected to mount back.
//!
//! Structured payloads (secrets with extracted keys, parameter versions)
//! share one shape: a `user` key holding [`EXTRACTED_USER`] and a `password`
//! key. Parameter versions hold the password as a Secret Manager reference
//! that Parameter Manager renders on access.

use crate::error::{HarnessError, Result};
use std::fmt;

/// Value stored under the `user` key of every structured payload
pub const EXTRACTED_USER: &str = "admin";

/// Key the extraction tests ask the provider to pull out
pub const EXTRACTED_KEY: &str = "user";

/// Format of a structured payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadFormat {
    Yaml,
    Json,
}

impl PayloadFormat {
    /// Value for `--parameter-format`
    pub fn as_flag(self) -> &'static str {
        match self {
            PayloadFormat::Yaml => "YAML",
            PayloadFormat::Json => "JSON",
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// Structured payload with a literal password
pub fn credentials_payload(format: PayloadFormat, password: &str) -> String {
    match format {
        PayloadFormat::Yaml => format!("user: {EXTRACTED_USER}\npassword: {password}\n"),
        PayloadFormat::Json => {
            serde_json::json!({ "user": EXTRACTED_USER, "password": password }).to_string()
        }
    }
}

/// Parameter version payload whose password references a secret version
pub fn parameter_payload(format: PayloadFormat, secret_reference: &str) -> String {
    credentials_payload(format, &format!("__REF__(\"{secret_reference}\")"))
}

/// What a parameter version built by [`parameter_payload`] renders to
pub fn rendered_parameter(format: PayloadFormat, secret_value: &str) -> String {
    credentials_payload(format, secret_value)
}

/// Value the provider mounts for `extractJSONKey` / `extractYAMLKey`
///
/// String values are mounted as their raw bytes; anything else is mounted in
/// its serialized form.
pub fn extract_key(payload: &[u8], format: PayloadFormat, key: &str) -> Result<Vec<u8>> {
    let what = format!("{format} payload key `{key}`");
    match format {
        PayloadFormat::Json => {
            let value: serde_json::Value =
                serde_json::from_slice(payload).map_err(|e| HarnessError::parse(&what, e))?;
            match value.get(key) {
                Some(serde_json::Value::String(s)) => Ok(s.clone().into_bytes()),
                Some(other) => Ok(other.to_string().into_bytes()),
                None => Err(HarnessError::parse(what, "key not present")),
            }
        }
        PayloadFormat::Yaml => {
            let value: serde_yaml::Value =
                serde_yaml::from_slice(payload).map_err(|e| HarnessError::parse(&what, e))?;
            match value.get(key) {
                Some(serde_yaml::Value::String(s)) => Ok(s.clone().into_bytes()),
                Some(other) => serde_yaml::to_string(other)
                    .map(|s| s.trim_end().as_bytes().to_vec())
                    .map_err(|e| HarnessError::parse(what, e)),
                None => Err(HarnessError::parse(what, "key not present")),
            }
        }
    }
}
