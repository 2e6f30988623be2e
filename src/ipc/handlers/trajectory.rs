use crate::chart;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{backend, opt_str, required_str, upstream_err};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn parse_threshold_rates(req: &Request) -> Result<Vec<i64>, serde_json::Value> {
    let Some(raw) = req.params.get("thresholdRates").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "missing thresholdRates", None));
    };
    let mut out = Vec::new();
    for v in raw {
        let Some(rate) = v.as_i64() else {
            return Err(err(
                &req.id,
                "bad_params",
                "thresholdRates must contain only integers",
                None,
            ));
        };
        if !(1..=100).contains(&rate) {
            return Err(err(
                &req.id,
                "bad_params",
                "thresholdRates must be percentages in range 1..=100",
                Some(json!({ "rate": rate })),
            ));
        }
        if !out.contains(&rate) {
            out.push(rate);
        }
    }
    if out.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            "thresholdRates must contain at least one rate",
            None,
        ));
    }
    Ok(out)
}

fn parse_student_ids(req: &Request) -> Result<Vec<String>, serde_json::Value> {
    let Some(raw) = req.params.get("studentIds") else {
        return Ok(Vec::new());
    };
    if raw.is_null() {
        return Ok(Vec::new());
    }
    let Some(items) = raw.as_array() else {
        return Err(err(&req.id, "bad_params", "studentIds must be an array", None));
    };
    let mut out = Vec::new();
    for v in items {
        let Some(id) = v.as_str() else {
            return Err(err(
                &req.id,
                "bad_params",
                "studentIds must contain only strings",
                None,
            ));
        };
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(err(
                &req.id,
                "bad_params",
                "studentIds must not contain empty ids",
                None,
            ));
        }
        if !out.iter().any(|existing: &String| existing == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    Ok(out)
}

/// The cached semester catalog defines "before". When either endpoint is not
/// in the cache (or nothing was fetched yet), the backend arbitrates.
fn validate_range(
    state: &AppState,
    req: &Request,
    start: &str,
    end: &str,
) -> Option<serde_json::Value> {
    if start == end {
        return Some(err(
            &req.id,
            "bad_params",
            "endSemester must differ from startSemester",
            None,
        ));
    }
    if let Some(order) = &state.semester_order {
        let start_idx = order.iter().position(|id| id == start);
        let end_idx = order.iter().position(|id| id == end);
        if let (Some(start_idx), Some(end_idx)) = (start_idx, end_idx) {
            if start_idx >= end_idx {
                return Some(err(
                    &req.id,
                    "bad_params",
                    "endSemester must come after startSemester",
                    Some(json!({ "startSemester": start, "endSemester": end })),
                ));
            }
        }
    }
    None
}

fn chart_model(resp: &chart::TrajectoryResponse) -> serde_json::Value {
    let rows = chart::build_chart_rows(resp);
    let tooltips: Vec<Value> = rows
        .iter()
        .map(|row| json!(chart::tooltip_lines(resp, row)))
        .collect();
    json!({
        "semesters": resp.semesters.clone(),
        "totalStudents": resp.total_students,
        "rows": rows,
        "tooltips": tooltips,
        "thresholdSeries": chart::threshold_series(resp),
        "studentSeries": chart::student_series(resp),
    })
}

fn handle_analyze(state: &mut AppState, req: &Request) -> serde_json::Value {
    let start = match required_str(req, "startSemester") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let end = match required_str(req, "endSemester") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let rates = match parse_threshold_rates(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let student_ids = match parse_student_ids(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Some(resp) = validate_range(state, req, &start, &end) {
        return resp;
    }

    let generation = state.next_generation("trajectory");

    let mut body = json!({
        "startSemester": start,
        "endSemester": end,
        "thresholdRates": rates,
        "studentIds": student_ids,
    });
    for key in ["departmentId", "majorId", "classId"] {
        if let Some(value) = opt_str(req, key) {
            if !value.eq_ignore_ascii_case("all") {
                body[key] = json!(value);
            }
        }
    }

    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.post_json("data/cpa-trajectory", &body) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    let resp: chart::TrajectoryResponse = match serde_json::from_value(raw) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "bad_upstream_json",
                format!("trajectory response: {}", e),
                None,
            )
        }
    };

    let mut model = chart_model(&resp);
    model["generation"] = json!(generation);
    ok(&req.id, model)
}

/// The pure reshaping contract, exposed locally: reshape an already-fetched
/// response without any network I/O (the dialog consumer path).
fn handle_reshape(req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("response") else {
        return err(&req.id, "bad_params", "missing response", None);
    };
    let resp: chart::TrajectoryResponse = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("response: {}", e), None),
    };

    ok(&req.id, chart_model(&resp))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "trajectory.analyze" => Some(handle_analyze(state, req)),
        "trajectory.reshape" => Some(handle_reshape(req)),
        _ => None,
    }
}
