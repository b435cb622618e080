//! JSON output helpers.
//!
//! Reports are emitted as one pretty-printed object with a top-level
//! `success` flag. Failed commands emit the error object instead.

use anyhow::{Context, Result};
use serde::Serialize;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen in
/// practice — `serde_json` only fails on non-finite floats and maps with
/// non-string keys, neither of which appear here).
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Format `report` with a leading `success` field.
///
/// # Errors
///
/// Returns an error if `report` does not serialize to a JSON object.
pub fn format_report<T: Serialize>(report: &T, success: bool) -> Result<String> {
    let mut value = serde_json::to_value(report).context("JSON serialization failed")?;
    let obj = value
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("report is not a JSON object"))?;
    obj.insert("success".to_string(), serde_json::Value::Bool(success));
    serde_json::to_string_pretty(&value).context("JSON serialization failed")
}
