// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project-path extraction: a task belongs to whichever
//! project's `.crewly` marker directory is its nearest ancestor. This is a
//! well-defined path-segment walk, not a regex over the string.

use std::path::{Component, Path};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot determine project from task path")]
pub struct PathExtractionError;

/// Returns the path component immediately preceding a `.crewly` segment.
///
/// `/Users/u/proj/gas-vibe-coder/.crewly/tasks/m0/open/01.md` yields
/// `"gas-vibe-coder"`. A path with no `.crewly` ancestor is rejected.
pub fn project_segment_from_task_path(task_path: &Path) -> Result<String, PathExtractionError> {
    let mut previous: Option<&str> = None;
    for component in task_path.components() {
        if let Component::Normal(name) = component {
            let name = name.to_str().ok_or(PathExtractionError)?;
            if name == ".crewly" {
                return previous.map(str::to_string).ok_or(PathExtractionError);
            }
            previous = Some(name);
        }
    }
    Err(PathExtractionError)
}

/// Name of the status folder a task file currently lives in (its immediate
/// parent directory), e.g. `"open"`, `"in_progress"`.
pub fn status_folder(task_path: &Path) -> Option<&str> {
    task_path.parent()?.file_name()?.to_str()
}

/// Path to the same task filed under a different status folder, i.e. with
/// its immediate parent directory swapped.
pub fn in_status(task_path: &Path, status: &str) -> Option<std::path::PathBuf> {
    let milestone_dir = task_path.parent()?.parent()?;
    let file_name = task_path.file_name()?;
    Some(milestone_dir.join(status).join(file_name))
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
