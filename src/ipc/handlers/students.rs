use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{backend, opt_pos_int, opt_str, required_str, upstream_err};
use crate::ipc::types::{AppState, Request};
use crate::upstream::push_filter;
use crate::view;
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use std::path::Path;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 200;

fn handle_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let start = match required_str(req, "startSemester") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let end = match required_str(req, "endSemester") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    // "offset" is the backend's 1-based page index, not a row offset.
    let offset = match opt_pos_int(req, "offset", u64::MAX) {
        Ok(v) => v.unwrap_or(1),
        Err(resp) => return resp,
    };
    let limit = match opt_pos_int(req, "limit", MAX_PAGE_SIZE) {
        Ok(v) => v.unwrap_or(DEFAULT_PAGE_SIZE),
        Err(resp) => return resp,
    };

    let mut query: Vec<(String, String)> = vec![
        ("startSemester".to_string(), start),
        ("endSemester".to_string(), end),
        ("offset".to_string(), offset.to_string()),
        ("limit".to_string(), limit.to_string()),
    ];
    for key in ["departmentId", "majorId", "classId"] {
        push_filter(&mut query, key, opt_str(req, key).as_deref());
    }
    if let Some(keyword) = opt_str(req, "keyword") {
        query.push(("keyword".to_string(), keyword));
    }

    let generation = state.next_generation("studentSearch");

    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.get_json("data/students-by-semester-range", &query) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    let items = raw
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let meta = view::parse_page_meta(raw.get("meta"));

    ok(
        &req.id,
        json!({
            "generation": generation,
            "students": view::student_picker_entries(&items),
            "meta": view::meta_json(&meta),
            "hasMore": view::has_more(&meta),
            "totalStudents": raw.get("totalStudents").cloned().unwrap_or(json!(0)),
            "semesters": raw.get("semesters").cloned().unwrap_or(json!([])),
        }),
    )
}

fn handle_info(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.get_json(&format!("data/student/{}", student_id), &[]) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    let processes = raw
        .get("studentProcesses")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    ok(
        &req.id,
        json!({
            "student": raw,
            "chartSeries": view::student_chart_series(&processes),
            "latest": view::latest_process_summary(&processes),
        }),
    )
}

fn handle_courses(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let semester_id = match required_str(req, "semesterId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let query = vec![
        ("semesterId".to_string(), semester_id),
        ("studentId".to_string(), student_id),
    ];
    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.get_json("data/student-course", &query) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    ok(&req.id, json!({ "courses": raw }))
}

fn write_report(output_path: &str, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output_path, bytes)?;
    Ok(())
}

/// Fetches the backend-rendered PDF report and writes it next to the UI.
/// The report body arrives as `{ buffer: base64, contentType }`.
fn handle_report(state: &mut AppState, req: &Request) -> serde_json::Value {
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let output_path = match required_str(req, "outputPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.get_json(&format!("data/generate-student-pdf-report/{}", student_id), &[]) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    let Some(buffer) = raw.get("buffer").and_then(Value::as_str) else {
        return err(&req.id, "bad_upstream_json", "report response missing buffer", None);
    };
    let bytes = match general_purpose::STANDARD.decode(buffer) {
        Ok(b) => b,
        Err(e) => {
            return err(
                &req.id,
                "bad_upstream_json",
                format!("report buffer is not valid base64: {}", e),
                None,
            )
        }
    };

    if let Err(e) = write_report(&output_path, &bytes) {
        return err(&req.id, "io_failed", format!("write {}: {}", output_path, e), None);
    }

    ok(
        &req.id,
        json!({
            "outputPath": output_path,
            "bytes": bytes.len(),
            "contentType": raw.get("contentType").cloned().unwrap_or(Value::Null),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.search" => Some(handle_search(state, req)),
        "students.info" => Some(handle_info(state, req)),
        "students.courses" => Some(handle_courses(state, req)),
        "students.report" => Some(handle_report(state, req)),
        _ => None,
    }
}
