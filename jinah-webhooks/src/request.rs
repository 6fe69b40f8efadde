//! Inbound webhook request

use crate::{Result, WebhookError};
use jinah_payments::normalize::NormalizeContext;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// An inbound webhook HTTP request
///
/// Header names are stored lowercased, so lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub method: String,
    pub path: String,
    headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl WebhookRequest {
    /// A `POST` request with the given body
    pub fn post(path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: "POST".to_string(),
            path: path.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn insert_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.trim().to_ascii_lowercase(), value.into());
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// User agent, falling back to the `User-Agent` header
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent
            .as_deref()
            .or_else(|| self.header("user-agent"))
    }

    /// Decode the body as JSON
    pub fn body_json(&self) -> Result<Value> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Err(WebhookError::PayloadError("Empty request body".to_string()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Request details carried into the normalized payload
    pub fn normalize_context(&self) -> NormalizeContext {
        let headers: Map<String, Value> = self
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        NormalizeContext {
            client_ip: self.client_ip.clone(),
            user_agent: self.user_agent().map(str::to_string),
            headers,
        }
    }
}
