use reqwest::blocking::{multipart, Client, RequestBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const ERROR_BODY_PREVIEW: usize = 300;

/// Error shape shared with the IPC envelope so handlers can forward it as-is.
#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

impl UpstreamError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(code: &str, message: impl Into<String>, details: Value) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: Some(details),
        }
    }
}

/// Client for the analytics backend. Holds the session context injected via
/// `session.configure`; nothing here is global or persisted.
#[derive(Debug)]
pub struct Backend {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl Backend {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, UpstreamError> {
        let trimmed = base_url.trim().trim_end_matches('/').to_string();
        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(UpstreamError::new(
                "bad_params",
                "baseUrl must start with http:// or https://",
            ));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| UpstreamError::new("upstream_unreachable", e.to_string()))?;
        Ok(Self {
            base_url: trimmed,
            token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, UpstreamError> {
        let req = self.http.get(self.url(path)).query(query);
        self.run("GET", path, req)
    }

    pub fn post_json(&self, path: &str, body: &Value) -> Result<Value, UpstreamError> {
        let req = self.http.post(self.url(path)).json(body);
        self.run("POST", path, req)
    }

    pub fn put_json(&self, path: &str, body: &Value) -> Result<Value, UpstreamError> {
        let req = self.http.put(self.url(path)).json(body);
        self.run("PUT", path, req)
    }

    /// Multipart upload. Files are read into memory by the caller so the
    /// request carries a known length instead of a chunked stream. The upload
    /// endpoint is not guaranteed to answer with JSON; an empty or non-JSON
    /// success body is passed through rather than rejected.
    pub fn post_files(
        &self,
        path: &str,
        query: &[(String, String)],
        files: Vec<(String, String, Vec<u8>)>,
    ) -> Result<Value, UpstreamError> {
        let mut form = multipart::Form::new();
        for (field, file_name, bytes) in files {
            form = form.part(field, multipart::Part::bytes(bytes).file_name(file_name));
        }
        let req = self.http.post(self.url(path)).query(query).multipart(form);
        let resp = self.send("POST", path, req)?;
        let text = resp.text().unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    fn run(&self, method: &str, path: &str, req: RequestBuilder) -> Result<Value, UpstreamError> {
        let resp = self.send(method, path, req)?;
        resp.json::<Value>()
            .map_err(|e| UpstreamError::new("bad_upstream_json", e.to_string()))
    }

    fn send(
        &self,
        method: &str,
        path: &str,
        mut req: RequestBuilder,
    ) -> Result<reqwest::blocking::Response, UpstreamError> {
        let request_id = Uuid::new_v4().to_string();
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req = req.header("x-request-id", &request_id);

        debug!(method, path, %request_id, "upstream request");
        let resp = req
            .send()
            .map_err(|e| UpstreamError::new("upstream_unreachable", e.to_string()))?;

        let status = resp.status();
        match status.as_u16() {
            401 => {
                warn!(path, %request_id, "upstream rejected session");
                Err(UpstreamError::new(
                    "unauthorized",
                    "session rejected by the analytics backend",
                ))
            }
            404 => Err(UpstreamError::new(
                "not_found",
                format!("{} not found upstream", path),
            )),
            code if !status.is_success() => {
                let body = resp.text().unwrap_or_default();
                let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
                Err(UpstreamError::with_details(
                    "upstream_status",
                    format!("upstream returned status {}", code),
                    json!({ "status": code, "body": preview }),
                ))
            }
            _ => Ok(resp),
        }
    }
}

/// Appends a filter parameter unless it is absent, blank, or the UI's "all"
/// sentinel; the backend treats a missing filter as unfiltered.
pub fn push_filter(query: &mut Vec<(String, String)>, key: &str, value: Option<&str>) {
    let Some(value) = value else { return };
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        return;
    }
    query.push((key.to_string(), trimmed.to_string()));
}
