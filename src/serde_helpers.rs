//! Serde helpers for lenient decoding of backend payloads.
//!
//! When the `tracing` feature is enabled, unknown fields encountered while decoding are
//! logged as warnings, which helps spot backend changes without failing the decode.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Kind};

/// Deserialize JSON, logging unknown fields.
///
/// Unknown fields trigger warnings but do not cause deserialization to fail. On failure the
/// path of the offending field is logged.
#[cfg(feature = "tracing")]
pub fn deserialize_with_warnings<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    use std::any::type_name;

    tracing::trace!(
        type_name = %type_name::<T>(),
        json = %value,
        "deserializing JSON"
    );

    let original = value.clone();
    let mut unknown_paths: Vec<String> = Vec::new();

    let result: T = serde_ignored::deserialize(value, |path| {
        unknown_paths.push(path.to_string());
    })
    .inspect_err(|_| {
        let json_str = original.to_string();
        let jd = &mut serde_json::Deserializer::from_str(&json_str);
        let path_result: Result<T, _> = serde_path_to_error::deserialize(jd);
        if let Err(path_err) = path_result {
            let path = path_err.path().to_string();
            tracing::error!(
                type_name = %type_name::<T>(),
                path = %path,
                value = %format_value(lookup_value(&original, &path)),
                error = %path_err.inner(),
                "deserialization failed"
            );
        }
    })
    .map_err(|e| Error::with_source(Kind::Decode, e))?;

    if !unknown_paths.is_empty() {
        let type_name = type_name::<T>();
        for path in unknown_paths {
            tracing::warn!(
                type_name = %type_name,
                field = %path,
                value = %format_value(lookup_value(&original, &path)),
                "unknown field in payload"
            );
        }
    }

    Ok(result)
}

/// Pass-through deserialization when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub fn deserialize_with_warnings<T: DeserializeOwned>(value: Value) -> crate::Result<T> {
    serde_json::from_value(value).map_err(|e| Error::with_source(Kind::Decode, e))
}

/// Look up a value by a `serde_ignored` / `serde_path_to_error` path such as
/// `payload.data[0].title` or `?.message.content`.
#[cfg(feature = "tracing")]
fn lookup_value<'value>(value: &'value Value, path: &str) -> Option<&'value Value> {
    path.split(['.', '[', ']'])
        .filter(|segment| !segment.is_empty() && *segment != "?")
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
            _ => None,
        })
}

#[cfg(feature = "tracing")]
fn format_value(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<unable to retrieve>".to_owned(),
    }
}
