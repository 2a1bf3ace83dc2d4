//! Response envelope decoding
//!
//! Every API response is checked the same way: 2xx status, a JSON body, and
//! no `error` envelope. Server `warnings` are logged and otherwise ignored.

use crate::error::{Error, Result};
use crate::types::{HttpResponse, JsonValue};
use tracing::warn;

/// Decode a response body into JSON, surfacing HTTP and API errors
pub fn decode_envelope(response: HttpResponse) -> Result<JsonValue> {
    if !response.is_success() {
        return Err(Error::http_status(response.status, response.body));
    }

    let body: JsonValue = serde_json::from_str(&response.body)
        .map_err(|e| Error::invalid_json(&response.url, e))?;

    if let Some(error) = body.get("error") {
        let code = error
            .get("code")
            .and_then(JsonValue::as_str)
            .unwrap_or("unknown");
        let info = error
            .get("info")
            .and_then(JsonValue::as_str)
            .unwrap_or_default();
        return Err(Error::api(code, info));
    }

    if let Some(warnings) = body.get("warnings") {
        warn!("Server warnings from {}: {warnings}", response.url);
    }

    Ok(body)
}

/// Remove the payload under `key`; `null` counts as absent
pub fn take_key(body: &mut JsonValue, key: &str) -> Option<JsonValue> {
    match body.as_object_mut()?.remove(key)? {
        JsonValue::Null => None,
        value => Some(value),
    }
}
