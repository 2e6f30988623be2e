use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{backend, opt_pos_int, required_str, upstream_err};
use crate::ipc::types::{AppState, Request};
use crate::view;
use serde_json::{json, Value};
use std::path::Path;

const MAX_PAGE_SIZE: u64 = 200;

fn handle_history(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut query: Vec<(String, String)> = Vec::new();
    match opt_pos_int(req, "offset", u64::MAX) {
        Ok(Some(offset)) => query.push(("offset".to_string(), offset.to_string())),
        Ok(None) => {}
        Err(resp) => return resp,
    }
    match opt_pos_int(req, "limit", MAX_PAGE_SIZE) {
        Ok(Some(limit)) => query.push(("limit".to_string(), limit.to_string())),
        Ok(None) => {}
        Err(resp) => return resp,
    }

    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.get_json("data/upload-event", &query) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    let events: Vec<Value> = raw
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| raw.as_array())
        .map(|items| items.iter().map(view::upload_event_row).collect())
        .unwrap_or_default();

    ok(
        &req.id,
        json!({
            "events": events,
            "meta": raw.get("meta").cloned().unwrap_or(Value::Null),
        }),
    )
}

fn read_csv(path: &str) -> anyhow::Result<(String, Vec<u8>)> {
    let bytes = std::fs::read(path)?;
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv")
        .to_string();
    Ok((file_name, bytes))
}

/// Forwards the two performance CSVs as-is; parsing and validation are the
/// backend's job. Progress arrives later through the upload-event pipeline.
fn handle_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let semester = match required_str(req, "semester") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course_path = match required_str(req, "studentCourseCsv") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let process_path = match required_str(req, "studentProcessCsv") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let (course_name, course_bytes) = match read_csv(&course_path) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "io_failed", format!("read {}: {}", course_path, e), None),
    };
    let (process_name, process_bytes) = match read_csv(&process_path) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "io_failed", format!("read {}: {}", process_path, e), None),
    };

    let query = vec![("semester".to_string(), semester.clone())];
    let files = vec![
        ("studentCourseCsv".to_string(), course_name, course_bytes),
        ("studentProcessCsv".to_string(), process_name, process_bytes),
    ];

    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.post_files("data/upload-csv", &query, files) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    ok(
        &req.id,
        json!({
            "semester": semester,
            "accepted": true,
            "response": raw,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "uploads.history" => Some(handle_history(state, req)),
        "uploads.submit" => Some(handle_submit(state, req)),
        _ => None,
    }
}
