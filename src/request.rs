//! Generation request payload.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::candidates::WorkItem;

/// Run-wide request settings shared by every work item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDefaults {
    pub additional_prompt: String,
    /// 0 lets the service pick its own budget.
    pub max_iterations: u32,
    pub flakiness: bool,
    /// Empty means the whole file.
    pub function_under_test: String,
    /// 0.0 means unset.
    pub expected_coverage: f64,
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub source_file_path: PathBuf,
    pub root_dir: PathBuf,
    pub additional_prompt: String,
    pub max_iterations: u32,
    pub flakiness: bool,
    pub function_under_test: String,
    pub expected_coverage: f64,
}

impl GenerationRequest {
    pub fn build(item: &WorkItem, root_dir: &Path, defaults: &RequestDefaults) -> Self {
        Self {
            source_file_path: item.path.clone(),
            root_dir: root_dir.to_path_buf(),
            additional_prompt: defaults.additional_prompt.clone(),
            max_iterations: defaults.max_iterations,
            flakiness: defaults.flakiness,
            function_under_test: defaults.function_under_test.clone(),
            expected_coverage: defaults.expected_coverage,
        }
    }
}
