//! # Manifest Templates
//!
//! Manifests under `templates/` carry `$TOKEN` placeholders that are filled
//! from the fixture before `kubectl apply`.
//!
//! Tokens are matched as whole words (`$[A-Z][A-Z0-9_]*`), so `$SECRET_ID`
//! and `$SECRET_ID_REGIONAL` never interfere. Only tokens from
//! [`KNOWN_TOKENS`] are checked: a known token that the caller did not supply
//! is an error, while unknown `$WORDS` (shell variables in container
//! commands) pass through untouched.

use crate::error::{HarnessError, Result};
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Z][A-Z0-9_]*)")
        .expect("Failed to compile template token pattern - this should never happen")
});

/// Every placeholder the templates may use
pub const KNOWN_TOKENS: &[&str] = &[
    "PROJECT_ID",
    "CLUSTER_NAME",
    "ZONE",
    "LOCATION_ID",
    "GCP_PROVIDER_SHA",
    "SECRET_STORE_VERSION",
    "GKE_VERSION",
    "MOUNT_DIR",
    "TEST_SECRET_ID",
    "ROTATION_SECRET_ID",
    "EXTRACT_SECRET_ID",
    "REGIONAL_SECRET_ID",
    "REGIONAL_ROTATION_SECRET_ID",
    "PARAM_SECRET_ID",
    "REGIONAL_PARAM_SECRET_ID",
    "YAML_PARAMETER_ID",
    "JSON_PARAMETER_ID",
    "REGIONAL_YAML_PARAMETER_ID",
    "REGIONAL_JSON_PARAMETER_ID",
    "YAML_VERSION_ID",
    "JSON_VERSION_ID",
    "REGIONAL_YAML_VERSION_ID",
    "REGIONAL_JSON_VERSION_ID",
    "YAML_GLOBAL_MODE",
    "JSON_GLOBAL_MODE",
    "YAML_REGIONAL_MODE",
    "JSON_REGIONAL_MODE",
];

/// Token name (without `$`) to replacement value
#[derive(Debug, Clone, Default)]
pub struct Replacements {
    values: BTreeMap<String, String>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a token; a leading `$` is accepted and stripped
    pub fn set(&mut self, token: &str, value: impl Into<String>) -> &mut Self {
        self.values
            .insert(token.trim_start_matches('$').to_string(), value.into());
        self
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.values
            .get(token.trim_start_matches('$'))
            .map(String::as_str)
    }
}

/// Substitute every supplied token in `template`
///
/// `name` is only used in the error for unexpanded tokens.
pub fn render(name: &str, template: &str, replacements: &Replacements) -> Result<String> {
    let mut missing = BTreeSet::new();

    let rendered = TOKEN_PATTERN.replace_all(template, |caps: &Captures<'_>| {
        let token = &caps[1];
        match replacements.get(token) {
            Some(value) => value.to_string(),
            None => {
                if KNOWN_TOKENS.contains(&token) {
                    missing.insert(format!("${token}"));
                }
                caps[0].to_string()
            }
        }
    });

    if !missing.is_empty() {
        return Err(HarnessError::UnexpandedTokens {
            path: name.to_string(),
            tokens: missing.into_iter().collect(),
        });
    }

    Ok(rendered.into_owned())
}

/// Render `template` into `out_dir`, dropping the `.tmpl` suffix
pub fn render_file(template: &Path, out_dir: &Path, replacements: &Replacements) -> Result<PathBuf> {
    let text =
        std::fs::read_to_string(template).map_err(|e| HarnessError::io(template, e))?;
    let rendered = render(&template.display().to_string(), &text, replacements)?;

    let file_name = template
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.trim_end_matches(".tmpl").to_string())
        .ok_or_else(|| HarnessError::parse("template path", template.display()))?;
    let out_path = out_dir.join(file_name);

    std::fs::write(&out_path, rendered).map_err(|e| HarnessError::io(&out_path, e))?;
    debug!(
        "rendered {} -> {}",
        template.display(),
        out_path.display()
    );

    Ok(out_path)
}
