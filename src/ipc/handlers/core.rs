use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{opt_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::upstream::Backend;
use serde_json::json;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "sessionConfigured": state.backend.is_some(),
            "baseUrl": state.backend.as_ref().map(|b| b.base_url().to_string()),
        }),
    )
}

/// Replaces the previous session wholesale. The token accessor is an injected
/// context object, not a global: the UI shell owns the login flow and hands
/// the bearer token over here.
fn handle_session_configure(state: &mut AppState, req: &Request) -> serde_json::Value {
    let base_url = match required_str(req, "baseUrl") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let token = opt_str(req, "accessToken");

    match Backend::new(&base_url, token) {
        Ok(backend) => {
            let base = backend.base_url().to_string();
            state.backend = Some(backend);
            // A new session may point at a different deployment.
            state.semester_order = None;
            info!(base_url = %base, "session configured");
            ok(&req.id, json!({ "baseUrl": base }))
        }
        Err(e) => err(&req.id, &e.code, e.message, e.details),
    }
}

fn handle_session_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.backend = None;
    state.semester_order = None;
    ok(&req.id, json!({ "cleared": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.configure" => Some(handle_session_configure(state, req)),
        "session.clear" => Some(handle_session_clear(state, req)),
        _ => None,
    }
}
