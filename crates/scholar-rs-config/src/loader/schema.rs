//! Schema validation helpers for Scholar JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(map, &["$schema", "memory", "llm", "history"], layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("memory") {
        validate_memory(value, layer, "memory")?;
    }
    if let Some(value) = map.get("llm") {
        validate_llm(value, layer, "llm")?;
    }
    if let Some(value) = map.get("history") {
        validate_history(value, layer, "history")?;
    }
    Ok(())
}

fn validate_memory(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = ["path", "embeddings", "matching", "recall", "summary"];
    ensure_allowed_keys(map, &allowed, layer, path)?;

    if let Some(value) = map.get("path") {
        expect_string(value, layer, &join_path(path, "path"))?;
    }
    if let Some(value) = map.get("embeddings") {
        let path = join_path(path, "embeddings");
        let map = expect_object(value, layer, &path)?;
        ensure_allowed_keys(map, &["enabled", "dimensions"], layer, &path)?;
        check_fields(
            map,
            layer,
            &path,
            &[("enabled", Kind::Bool), ("dimensions", Kind::Integer)],
        )?;
    }
    if let Some(value) = map.get("matching") {
        let path = join_path(path, "matching");
        let map = expect_object(value, layer, &path)?;
        let fields = [
            ("prefix_chars", Kind::Integer),
            ("overlap_ratio", Kind::Number),
            ("similarity_threshold", Kind::Number),
        ];
        ensure_allowed_keys(map, &field_names(&fields), layer, &path)?;
        check_fields(map, layer, &path, &fields)?;
    }
    if let Some(value) = map.get("recall") {
        let path = join_path(path, "recall");
        let map = expect_object(value, layer, &path)?;
        let fields = [("limit", Kind::Integer), ("default_query", Kind::String)];
        ensure_allowed_keys(map, &field_names(&fields), layer, &path)?;
        check_fields(map, layer, &path, &fields)?;
        if let Some(Value::String(query)) = map.get("default_query")
            && query.trim().is_empty()
        {
            return Err(invalid_field(
                layer,
                &join_path(&path, "default_query"),
                "must not be empty",
            ));
        }
    }
    if let Some(value) = map.get("summary") {
        let path = join_path(path, "summary");
        let map = expect_object(value, layer, &path)?;
        let fields = [
            ("enabled", Kind::Bool),
            ("message_window", Kind::Integer),
            ("every_n_turns", Kind::Integer),
        ];
        ensure_allowed_keys(map, &field_names(&fields), layer, &path)?;
        check_fields(map, layer, &path, &fields)?;
    }
    Ok(())
}

fn validate_llm(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let fields = [
        ("provider", Kind::String),
        ("model", Kind::String),
        ("api_key_env", Kind::String),
        ("temperature", Kind::Number),
    ];
    ensure_allowed_keys(map, &field_names(&fields), layer, path)?;
    check_fields(map, layer, path, &fields)?;
    if let Some(provider) = map.get("provider").and_then(Value::as_str)
        && provider != "google"
    {
        return Err(invalid_field(
            layer,
            &join_path(path, "provider"),
            "unsupported provider",
        ));
    }
    Ok(())
}

fn validate_history(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let fields = [("capacity", Kind::Integer), ("ttl_secs", Kind::Integer)];
    ensure_allowed_keys(map, &field_names(&fields), layer, path)?;
    check_fields(map, layer, path, &fields)
}

/// Expected JSON kind of a scalar field.
#[derive(Debug, Clone, Copy)]
enum Kind {
    Bool,
    Integer,
    Number,
    String,
}

fn field_names<'a>(fields: &[(&'a str, Kind)]) -> Vec<&'a str> {
    fields.iter().map(|(name, _)| *name).collect()
}

/// Check every present field against its expected kind.
fn check_fields(
    map: &Map<String, Value>,
    layer: &str,
    path: &str,
    fields: &[(&str, Kind)],
) -> Result<(), ConfigError> {
    for (name, kind) in fields {
        let Some(value) = map.get(*name) else {
            continue;
        };
        let ok = match kind {
            Kind::Bool => value.is_boolean(),
            Kind::Integer => value.is_u64(),
            Kind::Number => value.is_number(),
            Kind::String => value.is_string(),
        };
        if !ok {
            let message = match kind {
                Kind::Bool => "expected bool",
                Kind::Integer => "expected non-negative integer",
                Kind::Number => "expected number",
                Kind::String => "expected string",
            };
            return Err(invalid_field(layer, &join_path(path, name), message));
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

fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_string() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(invalid_field(layer, &join_path(path, key), "unknown key")),
        None => Ok(()),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{path}"),
        message: message.to_string(),
    }
}
