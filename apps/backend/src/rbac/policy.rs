//! Declarative route policy, loaded once at process start.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One rule: a route pattern plus the roles that may call it.
///
/// Path patterns match segment-wise; `{name}` segments match any single
/// segment and capture it as a parameter. An empty `verbs` list matches any
/// verb. Roles may include the built-in `self` role, which matches when the
/// token subject equals a captured path parameter.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Rule {
    pub path: String,
    #[serde(default)]
    pub verbs: Vec<String>,
    pub roles: Vec<String>,
}

/// Values captured from `{name}` segments during a match.
pub type PathParams = HashMap<String, String>;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    pub rules: Vec<Rule>,
}

impl Policy {
    /// Load the policy file. Malformed policy is a fatal startup error.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read(path).map_err(|e| {
            AppError::config(format!("failed to read policy {}: {e}", path.display()))
        })?;
        Self::from_slice(&raw)
            .map_err(|e| AppError::config(format!("malformed policy {}: {e}", path.display())))
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// First rule matching the verb and path, with captured parameters.
    /// No match means deny by default.
    pub fn matching_rule(&self, verb: &str, path: &str) -> Option<(&Rule, PathParams)> {
        self.rules.iter().find_map(|rule| {
            if !rule.verbs.is_empty()
                && !rule.verbs.iter().any(|v| v.eq_ignore_ascii_case(verb))
            {
                return None;
            }
            match_path(&rule.path, path).map(|params| (rule, params))
        })
    }
}

fn match_path(pattern: &str, path: &str) -> Option<PathParams> {
    let pattern_segments: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path_segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    if pattern_segments.len() != path_segments.len() {
        return None;
    }

    let mut params = PathParams::new();
    for (pat, seg) in pattern_segments.iter().zip(&path_segments) {
        if let Some(name) = pat.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            params.insert(name.to_string(), (*seg).to_string());
        } else if pat != seg {
            return None;
        }
    }
    Some(params)
}
