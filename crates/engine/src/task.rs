// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing and rendering for the task markdown header conventions:
//! title, target role, estimated delay, an optional embedded Output Schema,
//! an optional Retry Info block, and the append-only metadata sections each
//! lifecycle transition writes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TaskParseError {
    #[error("missing title (`# ...` heading)")]
    MissingTitle,
    #[error("multiple Output Schema sections")]
    MultipleSchemaSections,
    #[error("Output Schema section has no fenced code block")]
    MissingSchemaFence,
    #[error("Output Schema is not valid JSON: {0}")]
    MalformedSchema(String),
    #[error("Output Validation Retry Info is not valid JSON: {0}")]
    MalformedRetryInfo(String),
}

/// Parsed `## Task Information` fields plus the title.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskHeader {
    pub title: String,
    pub target_role: Option<String>,
    pub estimated_delay_minutes: Option<u64>,
}

/// Retry metadata rewritten into the task file on each failed validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryInfo {
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(default)]
    pub last_errors: Vec<String>,
    #[serde(default)]
    pub last_attempt_at: Option<chrono::DateTime<chrono::Utc>>,
}

const SCHEMA_HEADER: &str = "## Output Schema";
pub const RETRY_HEADER: &str = "## Output Validation Retry Info";

/// Parses the title and `## Task Information` fields out of a task's
/// markdown content.
pub fn parse_header(content: &str) -> Result<TaskHeader, TaskParseError> {
    let title = content
        .lines()
        .find_map(|line| line.strip_prefix("# ").map(str::trim))
        .ok_or(TaskParseError::MissingTitle)?
        .to_string();

    let mut target_role = None;
    let mut estimated_delay_minutes = None;
    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("- **Target Role**:") {
            target_role = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("- **Estimated Delay**:") {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            estimated_delay_minutes = digits.trim().parse::<u64>().ok();
        }
    }

    Ok(TaskHeader {
        title,
        target_role,
        estimated_delay_minutes,
    })
}

/// Finds the body of the first fenced code block inside the section started
/// by `header`, bounded by the next `## ` heading or end of document.
fn section_body<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)? + header.len();
    let rest = &content[start..];
    let end = rest.find("\n## ").unwrap_or(rest.len());
    let section = &rest[..end];

    let fence_start = section.find("```")? ;
    let after_fence_marker = &section[fence_start + 3..];
    let fence_body_start = after_fence_marker.find('\n')? + 1;
    let fence_body = &after_fence_marker[fence_body_start..];
    let fence_end = fence_body.find("```")?;
    Some(&fence_body[..fence_end])
}

fn count_occurrences(content: &str, needle: &str) -> usize {
    content.matches(needle).count()
}

/// Extracts the embedded Output Schema, if present. Rejects a document with
/// more than one Output Schema section.
pub fn extract_schema(content: &str) -> Result<Option<Value>, TaskParseError> {
    if count_occurrences(content, SCHEMA_HEADER) > 1 {
        return Err(TaskParseError::MultipleSchemaSections);
    }
    let Some(body) = section_body(content, SCHEMA_HEADER) else {
        if content.contains(SCHEMA_HEADER) {
            return Err(TaskParseError::MissingSchemaFence);
        }
        return Ok(None);
    };
    let value =
        serde_json::from_str(body.trim()).map_err(|e| TaskParseError::MalformedSchema(e.to_string()))?;
    Ok(Some(value))
}

/// Extracts the Retry Info block, if present.
pub fn extract_retry_info(content: &str) -> Result<Option<RetryInfo>, TaskParseError> {
    let Some(body) = section_body(content, RETRY_HEADER) else {
        return Ok(None);
    };
    let info = serde_json::from_str(body.trim())
        .map_err(|e| TaskParseError::MalformedRetryInfo(e.to_string()))?;
    Ok(Some(info))
}

/// Canonical markdown for an Output Schema section. Round-trips through
/// [`extract_schema`].
pub fn render_schema_section(schema: &Value) -> String {
    let body = serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".to_string());
    format!("{SCHEMA_HEADER}\n```json\n{body}\n```\n")
}

/// Canonical markdown for a Retry Info section. Round-trips through
/// [`extract_retry_info`].
pub fn render_retry_section(retry: &RetryInfo) -> String {
    let body = serde_json::to_string_pretty(retry).unwrap_or_else(|_| "{}".to_string());
    format!("{RETRY_HEADER}\n```json\n{body}\n```\n")
}

/// Appends a fresh `## <header>` section to the end of the document.
pub fn append_section(content: &str, header: &str, body: &str) -> String {
    let mut out = content.trim_end().to_string();
    out.push_str("\n\n## ");
    out.push_str(header);
    out.push('\n');
    out.push_str(body.trim_end());
    out.push('\n');
    out
}

/// Replaces an existing `## <header>` section's content (up to the next
/// `## ` heading or end of document), or appends it if absent. Used for the
/// Retry Info block, which is rewritten in place rather than accumulated.
pub fn replace_or_append_section(content: &str, full_header_line: &str, rendered_section: &str) -> String {
    let Some(start) = content.find(full_header_line) else {
        let mut out = content.trim_end().to_string();
        out.push_str("\n\n");
        out.push_str(rendered_section.trim_end());
        out.push('\n');
        return out;
    };
    let after_header = start + full_header_line.len();
    let rest = &content[after_header..];
    let section_end = rest.find("\n## ").map(|i| after_header + i + 1).unwrap_or(content.len());

    let mut out = String::new();
    out.push_str(content[..start].trim_end());
    out.push_str("\n\n");
    out.push_str(rendered_section.trim_end());
    out.push('\n');
    if section_end < content.len() {
        out.push('\n');
        out.push_str(content[section_end..].trim_start_matches('\n'));
    }
    out
}

/// Removes an existing `## <header>` section entirely, used by abandonment
/// recovery to strip the Assignment Information block before a task moves
/// back to `/open/`.
pub fn strip_section(content: &str, header: &str) -> String {
    let full_header = format!("## {header}");
    let Some(start) = content.find(&full_header) else {
        return content.to_string();
    };
    let before = content[..start].trim_end();
    let rest = &content[start..];
    let after = rest.find("\n## ").map(|i| rest[i + 1..].to_string()).unwrap_or_default();

    if after.is_empty() {
        format!("{before}\n")
    } else {
        format!("{before}\n\n{after}")
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
