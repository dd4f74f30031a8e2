//! Blue State Digital
//!
//! Every call is signed: `api_ver`, `api_id` and `api_ts` go on the query
//! string together with `api_mac`, an HMAC-SHA1 of
//!
//! ```text
//! {api_id}\n{api_ts}\n{endpoint}\napi_ver=2&api_id={api_id}&api_ts={api_ts}[&k=v...]
//! ```
//!
//! keyed by the API secret. Responses are XML and come back as JSON values:
//! repeated elements become arrays, empty elements `null`, and attributes
//! are dropped.

use crate::client::response::{self, RawResponse};
use crate::client::service::Service;
use crate::client::HttpClient;
use crate::config::settings::require;
use crate::config::{BsdConfig, HttpSettings};
use crate::error::{Result, StacError};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub const BSD_API_VERSION: &str = "2";

pub struct BsdService {
    base_url: String,
    api_id: String,
    signer: HmacSha1,
}

impl BsdService {
    pub fn new(
        base_url: impl Into<String>,
        api_id: impl Into<String>,
        api_secret: &str,
    ) -> Result<Self> {
        let signer = HmacSha1::new_from_slice(api_secret.as_bytes())
            .map_err(|e| StacError::Config(format!("Invalid BSD API secret: {}", e)))?;
        Ok(Self {
            base_url: base_url.into(),
            api_id: api_id.into(),
            signer,
        })
    }

    pub fn from_config(config: &BsdConfig) -> Result<Self> {
        let url = require(&config.url, "bsd", "url", "BSD_URL")?;
        let api_id = require(&config.api_id, "bsd", "api_id", "BSD_API_ID")?;
        let api_secret = require(&config.api_secret, "bsd", "api_secret", "BSD_API_SECRET")?;
        Self::new(url, api_id, &api_secret)
    }

    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    /// Hex HMAC-SHA1 for a call to `endpoint` at `timestamp`
    pub fn api_mac(&self, timestamp: &str, endpoint: &str, params: &[(String, String)]) -> String {
        let mut query = format!(
            "api_ver={}&api_id={}&api_ts={}",
            BSD_API_VERSION, self.api_id, timestamp
        );
        for (key, value) in params {
            query.push_str(&format!("&{}={}", key, value));
        }

        let mut mac = self.signer.clone();
        mac.update(format!("{}\n{}\n{}\n{}", self.api_id, timestamp, endpoint, query).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Signing parameters followed by the caller's own
    pub fn signed_params(
        &self,
        timestamp: &str,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Vec<(String, String)> {
        let mut signed = vec![
            ("api_ver".to_string(), BSD_API_VERSION.to_string()),
            ("api_id".to_string(), self.api_id.clone()),
            ("api_ts".to_string(), timestamp.to_string()),
            ("api_mac".to_string(), self.api_mac(timestamp, endpoint, params)),
        ];
        signed.extend(params.iter().cloned());
        signed
    }
}

#[async_trait]
impl Service for BsdService {
    fn name(&self) -> &str {
        "bsd"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn query_params(&self, endpoint: &str, params: &[(String, String)]) -> Vec<(String, String)> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.signed_params(&timestamp, endpoint, params)
    }

    fn snake_case_by_default(&self) -> bool {
        true
    }

    fn transform_response(&self, response: &RawResponse, use_snake_case: bool) -> Result<Value> {
        let text = response.text();
        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        let data = match parse_xml(&text) {
            Ok(data) => data,
            Err(_) if !response.status.is_success() => Value::String(text),
            Err(e) => return Err(e),
        };
        Ok(response::reshape(data, use_snake_case))
    }
}

pub type BsdClient = HttpClient<BsdService>;

impl BsdClient {
    pub fn from_config(config: &BsdConfig, settings: HttpSettings) -> Result<Self> {
        Ok(HttpClient::new(BsdService::from_config(config)?, settings))
    }
}

/// Parse an XML document into nested JSON objects keyed by element name
pub fn parse_xml(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // (name, children, text) per open element; the bottom entry is the document
    let mut stack: Vec<(String, Map<String, Value>, String)> =
        vec![(String::new(), Map::new(), String::new())];

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push((element_name(&start), Map::new(), String::new())),
            Event::Empty(start) => {
                if let Some((_, children, _)) = stack.last_mut() {
                    insert_child(children, element_name(&start), Value::Null);
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?;
                if let Some((_, _, buffer)) = stack.last_mut() {
                    buffer.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some((_, _, buffer)) = stack.last_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                if stack.len() < 2 {
                    return Err(xml_error("unexpected closing tag"));
                }
                if let Some((name, children, text)) = stack.pop() {
                    let value = element_value(children, text);
                    if let Some((_, parent, _)) = stack.last_mut() {
                        insert_child(parent, name, value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    match stack.pop() {
        Some((_, document, _)) if stack.is_empty() => Ok(Value::Object(document)),
        _ => Err(xml_error("unclosed element")),
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn element_value(mut children: Map<String, Value>, text: String) -> Value {
    match (children.is_empty(), text.is_empty()) {
        (true, true) => Value::Null,
        (true, false) => Value::String(text),
        (false, true) => Value::Object(children),
        (false, false) => {
            children.insert("#text".to_string(), Value::String(text));
            Value::Object(children)
        }
    }
}

/// Repeated names collect into an array in document order
fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

fn xml_error(e: impl std::fmt::Display) -> StacError {
    StacError::Response(format!("Invalid XML: {}", e))
}
