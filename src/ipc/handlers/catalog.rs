use crate::ipc::error::ok;
use crate::ipc::helpers::{backend, upstream_err};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

/// The backend returns a bare array of `{id, name}` records; some deployments
/// wrap it in `{data: [...]}`. Anything else degrades to an empty list.
fn catalog_entries(raw: &Value) -> Vec<Value> {
    let items = raw
        .as_array()
        .or_else(|| raw.get("data").and_then(Value::as_array));
    let Some(items) = items else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            json!({
                "id": item.get("id").cloned().unwrap_or(Value::Null),
                "name": item.get("name").cloned().unwrap_or(Value::Null),
            })
        })
        .collect()
}

fn handle_list(state: &mut AppState, req: &Request, path: &str) -> serde_json::Value {
    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.get_json(path, &[]) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    let entries = catalog_entries(&raw);

    // The semester list is the ordering authority for range validation.
    if req.method == "catalog.semesters" {
        state.semester_order = Some(
            entries
                .iter()
                .filter_map(|e| e.get("id").and_then(Value::as_str).map(str::to_string))
                .collect(),
        );
    }

    ok(&req.id, json!({ "items": entries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let path = match req.method.as_str() {
        "catalog.departments" => "data/department",
        "catalog.majors" => "data/major",
        "catalog.classes" => "data/class",
        "catalog.semesters" => "data/semester",
        _ => return None,
    };
    Some(handle_list(state, req, path))
}
