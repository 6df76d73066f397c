//! Schema validation helpers for mneme JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = [
        "$schema",
        "storage",
        "retrieval",
        "retention",
        "truncation",
        "conversations",
    ];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("storage") {
        validate_storage(value, layer, "storage")?;
    }
    if let Some(value) = map.get("retrieval") {
        validate_retrieval(value, layer, "retrieval")?;
    }
    if let Some(value) = map.get("retention") {
        validate_retention(value, layer, "retention")?;
    }
    if let Some(value) = map.get("truncation") {
        validate_truncation(value, layer, "truncation")?;
    }
    if let Some(value) = map.get("conversations") {
        validate_conversations(value, layer, "conversations")?;
    }
    Ok(())
}

/// Validate the "storage" block.
fn validate_storage(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let keys = ["root", "long_term_file", "short_term_file"];
    ensure_allowed_keys(map, &keys, layer, path)?;
    for key in keys {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Validate the "retrieval" block.
fn validate_retrieval(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &[
            "category_threshold",
            "content_threshold",
            "default_limit",
            "search_window",
        ],
        layer,
        path,
    )?;

    for key in ["category_threshold", "content_threshold"] {
        if let Some(value) = map.get(key) {
            expect_f64(value, layer, &join_path(path, key))?;
        }
    }
    if let Some(value) = map.get("default_limit") {
        expect_u64(value, layer, &join_path(path, "default_limit"))?;
    }
    if let Some(value) = map.get("search_window") {
        expect_optional_u64(value, layer, &join_path(path, "search_window"))?;
    }
    Ok(())
}

/// Validate the "retention" block.
fn validate_retention(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["max_age_days", "summary_category"], layer, path)?;

    if let Some(value) = map.get("max_age_days") {
        let days_path = join_path(path, "max_age_days");
        expect_u64(value, layer, &days_path)?;
        if value.as_u64().is_some_and(|days| days > u64::from(u32::MAX)) {
            return Err(invalid_field(layer, &days_path, "value out of range"));
        }
    }
    if let Some(value) = map.get("summary_category") {
        expect_string(value, layer, &join_path(path, "summary_category"))?;
    }
    Ok(())
}

/// Validate the "truncation" block.
fn validate_truncation(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["max_chars", "marker"], layer, path)?;

    if let Some(value) = map.get("max_chars") {
        expect_optional_u64(value, layer, &join_path(path, "max_chars"))?;
    }
    if let Some(value) = map.get("marker") {
        expect_string(value, layer, &join_path(path, "marker"))?;
    }
    Ok(())
}

/// Validate the "conversations" block.
fn validate_conversations(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let keys = ["keep_latest", "recent_limit"];
    ensure_allowed_keys(map, &keys, layer, path)?;
    for key in keys {
        if let Some(value) = map.get(key) {
            expect_u64(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect a non-negative JSON integer or return a typed error.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

/// Like `expect_u64`, but `null` is allowed.
fn expect_optional_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_null() {
        return Ok(());
    }
    expect_u64(value, layer, path)
}

/// Expect a JSON number or return a typed error.
fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
