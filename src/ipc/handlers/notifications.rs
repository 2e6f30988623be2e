use crate::ipc::error::ok;
use crate::ipc::helpers::{backend, opt_pos_int, required_str, upstream_err};
use crate::ipc::types::{AppState, Request};
use crate::view;
use serde_json::{json, Value};

const MAX_PAGE_SIZE: u64 = 200;

fn page_query(req: &Request) -> Result<Vec<(String, String)>, serde_json::Value> {
    let mut query = Vec::new();
    if let Some(offset) = opt_pos_int(req, "offset", u64::MAX)? {
        query.push(("offset".to_string(), offset.to_string()));
    }
    if let Some(limit) = opt_pos_int(req, "limit", MAX_PAGE_SIZE)? {
        query.push(("limit".to_string(), limit.to_string()));
    }
    Ok(query)
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = match page_query(req) {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.get_json("data/notification", &query) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    let rows: Vec<Value> = raw
        .get("data")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(view::notification_row).collect())
        .unwrap_or_default();
    let meta = view::parse_page_meta(raw.get("meta"));
    let total_unread = raw
        .get("meta")
        .and_then(|m| m.get("totalUnread"))
        .cloned()
        .unwrap_or(json!(0));

    let mut meta_json = view::meta_json(&meta);
    meta_json["totalUnread"] = total_unread;

    ok(
        &req.id,
        json!({
            "notifications": rows,
            "meta": meta_json,
            "hasMore": view::has_more(&meta),
        }),
    )
}

fn handle_mark_read(state: &mut AppState, req: &Request) -> serde_json::Value {
    let notification_id = match required_str(req, "notificationId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.put_json(&format!("data/notification/{}", notification_id), &json!({})) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    ok(&req.id, json!({ "updated": raw }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "notifications.list" => Some(handle_list(state, req)),
        "notifications.markRead" => Some(handle_mark_read(state, req)),
        _ => None,
    }
}
