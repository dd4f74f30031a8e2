//! Responses
//!
//! Raw responses as read off the wire, the payload handed back to callers,
//! and the default decode/classify/reshape steps services build on.

use crate::error::{Result, StacError};
use crate::util::convert::convert_keys_to_snake_case;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::collections::BTreeMap;

/// A fully read HTTP response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: String,
    pub body: Bytes,
}

impl RawResponse {
    /// Read the whole body of a response
    pub async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let body = response.bytes().await?;

        Ok(Self {
            status,
            headers,
            url,
            body,
        })
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Last path segment of the request URL, lowercased
    pub fn last_path_segment(&self) -> String {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// Decoded result of an API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,

    /// Decoded body (object or array)
    pub data: serde_json::Value,

    /// Response headers, when requested
    pub headers: Option<BTreeMap<String, String>>,
}

impl ApiResponse {
    /// Look up a top-level field of an object body
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Look up a value by JSON pointer (e.g. "/_embedded/osdi:people")
    pub fn pointer(&self, pointer: &str) -> Option<&serde_json::Value> {
        self.data.pointer(pointer)
    }

    /// Deserialize the body into a typed value
    pub fn into_typed<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.data)?)
    }
}

/// Decode a body as JSON
///
/// Empty bodies decode to `{}`. A body that is not JSON is an error on
/// success and kept as a string on failure so the error classifier can
/// report it.
pub fn decode_body(response: &RawResponse) -> Result<serde_json::Value> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Object(Default::default()));
    }

    match serde_json::from_slice(&response.body) {
        Ok(value) => Ok(value),
        Err(_) if !response.status.is_success() => Ok(serde_json::Value::String(response.text())),
        Err(e) => {
            let text = response.text();
            Err(StacError::Response(format!(
                "Failed to parse response: {}. Body: {}",
                e,
                truncate(&text, 500)
            )))
        }
    }
}

/// Apply casing to a decoded body
pub fn reshape(data: serde_json::Value, use_snake_case: bool) -> serde_json::Value {
    if use_snake_case {
        convert_keys_to_snake_case(data)
    } else {
        data
    }
}

/// Default error classification by status code
pub fn classify_status(service: &str, status: u16, data: &serde_json::Value) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(StacError::Auth {
            service: service.to_string(),
            message: detail_text(data),
        }),
        _ => Err(StacError::Api {
            service: service.to_string(),
            status,
            detail: data.clone(),
        }),
    }
}

/// Flatten headers into a sorted map; repeated headers are comma joined
pub fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

fn detail_text(data: &serde_json::Value) -> String {
    match data {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Object(map) if map.is_empty() => "no detail".to_string(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            url: "https://api.example.com/v4/People/Find?x=1".to_string(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(&raw(200, "")).unwrap(), json!({}));
        assert_eq!(decode_body(&raw(204, "  \n")).unwrap(), json!({}));
        assert_eq!(decode_body(&raw(200, r#"[1, 2]"#)).unwrap(), json!([1, 2]));
        assert_eq!(
            decode_body(&raw(502, "<html>Bad Gateway</html>")).unwrap(),
            json!("<html>Bad Gateway</html>")
        );
        assert!(matches!(
            decode_body(&raw(200, "not json")),
            Err(StacError::Response(_))
        ));
    }

    #[test]
    fn test_classify_status_never_passes_failures() {
        assert!(classify_status("svc", 200, &json!({})).is_ok());
        assert!(classify_status("svc", 204, &json!({})).is_ok());

        for status in [300u16, 400, 404, 409, 422, 500, 503] {
            match classify_status("svc", status, &json!({"message": "nope"})) {
                Err(StacError::Api { status: s, detail, .. }) => {
                    assert_eq!(s, status);
                    assert_eq!(detail, json!({"message": "nope"}));
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        assert!(matches!(
            classify_status("svc", 401, &json!("expired")),
            Err(StacError::Auth { message, .. }) if message == "expired"
        ));
        assert!(matches!(
            classify_status("svc", 403, &json!({})),
            Err(StacError::Auth { .. })
        ));
    }

    #[test]
    fn test_reshape_and_pointer() {
        let data = reshape(json!({"nextPageLink": null, "items": [{"vanId": 1}]}), true);
        let response = ApiResponse {
            status: 200,
            data,
            headers: None,
        };
        assert_eq!(response.pointer("/items/0/van_id"), Some(&json!(1)));
        assert!(response.get("next_page_link").is_some());
    }

    #[test]
    fn test_last_path_segment() {
        assert_eq!(raw(200, "").last_path_segment(), "find");
    }

    #[test]
    fn test_header_map_joins_repeats() {
        let mut headers = HeaderMap::new();
        headers.append("x-a", "1".parse().unwrap());
        headers.append("x-a", "2".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());

        let map = header_map(&headers);
        assert_eq!(map["x-a"], "1, 2");
        assert_eq!(map["content-type"], "application/json");
    }
}
