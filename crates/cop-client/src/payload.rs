//! JSON payload helpers.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Reject payloads that are not valid JSON.
pub fn validate_json(payload: &[u8]) -> Result<()> {
    serde_json::from_slice::<serde::de::IgnoredAny>(payload)
        .map(|_| ())
        .map_err(|e| Error::InvalidPayload(format!("value must be a valid JSON document: {}", e)))
}

/// Refresh a local payload from a fetched object.
///
/// Only fields already present in `local` take the server's values from the
/// response's `data` object, so server-generated fields do not show up as
/// drift. Without a local payload the whole `data` object is returned.
pub fn merge_known_fields(local: Option<&str>, remote: &[u8]) -> Result<String> {
    let response: Value = serde_json::from_slice(remote)?;
    let Some(data) = response.get("data").and_then(Value::as_object) else {
        return Err(Error::InvalidPayload(
            "response has no 'data' object".to_string(),
        ));
    };

    let merged = match local.filter(|l| !l.trim().is_empty()) {
        None => data.clone(),
        Some(local) => {
            let mut fields: Map<String, Value> = serde_json::from_str(local).map_err(|e| {
                Error::InvalidPayload(format!("local payload is not a JSON object: {}", e))
            })?;
            for (key, value) in data {
                if let Some(slot) = fields.get_mut(key) {
                    *slot = value.clone();
                }
            }
            fields
        }
    };

    Ok(serde_json::to_string(&merged)?)
}
