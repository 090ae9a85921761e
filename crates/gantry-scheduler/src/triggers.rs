//! Trigger evaluation: should an event start a pipeline run?

use gantry_core::event::Event;
use gantry_core::pipeline::PathFilterConfig;

/// Immutable path-exclusion rules for one pipeline.
///
/// Passed explicitly into [`should_run`]; never read from ambient state.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    exclude: Vec<String>,
}

impl PathFilter {
    pub fn new(exclude: Vec<String>) -> Self {
        Self { exclude }
    }

    pub fn from_config(config: &PathFilterConfig) -> Self {
        Self {
            exclude: config.paths_ignore.clone(),
        }
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|p| glob_match(p, path))
    }
}

/// Pure trigger decision.
///
/// A run proceeds iff at least one changed path survives the exclusion
/// filter. Events without path information (manual dispatch, or an
/// unknown change set) run conservatively. A commit touching only
/// excluded paths short-circuits the entire pipeline.
pub fn should_run(event: &Event, filter: &PathFilter) -> bool {
    if !event.has_path_info() {
        return true;
    }

    event
        .changed_paths
        .iter()
        .any(|path| !filter.is_excluded(path))
}

fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" || pattern == "**" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix("/**") {
        // The prefix must end at a path separator; `docs/**` covers the
        // `docs` tree, not siblings like `docs-release-notes.md`.
        return text == prefix || text.starts_with(&format!("{}/", prefix));
    }
    if let Some(prefix) = pattern.strip_suffix("/*") {
        let prefix_slash = format!("{}/", prefix);
        if text.starts_with(&prefix_slash) {
            return !text[prefix_slash.len()..].contains('/');
        }
        return false;
    }
    if pattern.contains('*') {
        let parts: Vec<&str> = pattern.split('*').collect();
        if parts.len() == 2 {
            return text.starts_with(parts[0]) && text.ends_with(parts[1]);
        }
    }
    pattern == text
}
