//! `<< .Path >>` templates
//!
//! Substitutes dotted paths looked up in a JSON context. Strings render
//! raw, null renders empty and containers render as JSON. A path missing
//! from the context is an error.

use apolo_core::navigable::{field_as_value, value_to_string};
use apolo_core::{AppError, AppResult};
use serde_json::Value;

pub const LEFT_DELIM: &str = "<<";
pub const RIGHT_DELIM: &str = ">>";

pub fn render(template: &str, data: &Value) -> AppResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(LEFT_DELIM) {
        out.push_str(&rest[..start]);
        let after = &rest[start + LEFT_DELIM.len()..];
        let end = after
            .find(RIGHT_DELIM)
            .ok_or_else(|| AppError::Template("unclosed action".to_string()))?;
        out.push_str(&evaluate(after[..end].trim(), data)?);
        rest = &after[end + RIGHT_DELIM.len()..];
    }
    out.push_str(rest);
    Ok(out)
}

fn evaluate(expr: &str, data: &Value) -> AppResult<String> {
    if expr == "." {
        return Ok(value_to_string(data));
    }
    let path = expr
        .strip_prefix('.')
        .ok_or_else(|| AppError::Template(format!("unsupported expression: {}", expr)))?;
    let segments: Vec<&str> = path.split('.').collect();
    field_as_value(data, &segments)
        .map(value_to_string)
        .map_err(|_| AppError::Template(format!("can't evaluate field {}", expr)))
}
