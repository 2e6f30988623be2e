use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::upstream::{Backend, UpstreamError};

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn opt_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Optional positive integer parameter; present-but-malformed is an error.
pub fn opt_pos_int(req: &Request, key: &str, max: u64) -> Result<Option<u64>, serde_json::Value> {
    let Some(raw) = req.params.get(key) else {
        return Ok(None);
    };
    if raw.is_null() {
        return Ok(None);
    }
    let Some(value) = raw.as_u64() else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a positive integer", key),
            None,
        ));
    };
    if value == 0 || value > max {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be in range 1..={}", key, max),
            None,
        ));
    }
    Ok(Some(value))
}

pub fn backend<'a>(state: &'a AppState, req: &Request) -> Result<&'a Backend, serde_json::Value> {
    state
        .backend
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_session", "configure a session first", None))
}

pub fn upstream_err(req: &Request, e: UpstreamError) -> serde_json::Value {
    err(&req.id, &e.code, e.message, e.details)
}
