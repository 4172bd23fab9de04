//! Recipient resolution.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Recipients as they arrive on the wire or in configuration: one token or many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    One(String),
    Many(Vec<String>),
}

impl TargetSpec {
    /// Normalize to an ordered list, dropping blank entries.
    pub fn into_targets(self) -> Vec<String> {
        let targets = match self {
            TargetSpec::One(token) => vec![token],
            TargetSpec::Many(tokens) => tokens,
        };
        targets.into_iter().filter(|t| !t.trim().is_empty()).collect()
    }

    /// Like [`into_targets`](Self::into_targets), but a single string holding a
    /// JSON array is expanded. Configuration stores token lists that way.
    pub fn into_configured_targets(self) -> Vec<String> {
        if let TargetSpec::One(text) = &self {
            if text.trim_start().starts_with('[') {
                match serde_json::from_str::<Vec<String>>(text) {
                    Ok(tokens) => return TargetSpec::Many(tokens).into_targets(),
                    Err(e) => {
                        tracing::warn!(error = %e, "fcm_tokens looks like JSON but does not parse, using it as one token");
                    }
                }
            }
        }
        self.into_targets()
    }
}

impl From<Vec<String>> for TargetSpec {
    fn from(targets: Vec<String>) -> Self {
        TargetSpec::Many(targets)
    }
}

/// Pick the recipients for one request.
///
/// A non-empty override replaces the defaults outright.
pub fn resolve_targets(defaults: &[String], overrides: &[String]) -> Result<Vec<String>> {
    let targets = if overrides.is_empty() {
        defaults.to_vec()
    } else {
        overrides.to_vec()
    };

    if targets.is_empty() {
        return Err(AppError::validation("no targets"));
    }

    Ok(targets)
}
