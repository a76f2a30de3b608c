//! Read-model result to plain text

use serde_json::Value;

/// Join every line's `content`, page by page, with newlines.
///
/// Missing `pages`, `lines` or `content` fields are treated as empty.
pub fn flatten_read_result(result: &Value) -> String {
    let lines: Vec<&str> = result
        .get("pages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|page| page.get("lines").and_then(Value::as_array))
        .flatten()
        .filter_map(|line| line.get("content").and_then(Value::as_str))
        .filter(|content| !content.is_empty())
        .collect();

    lines.join("\n").trim().to_string()
}
