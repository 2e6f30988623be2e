use crate::ipc::error::ok;
use crate::ipc::helpers::{backend, opt_str, upstream_err};
use crate::ipc::types::{AppState, Request};
use crate::upstream::push_filter;
use crate::view;
use serde_json::json;

fn handle_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut query: Vec<(String, String)> = Vec::new();
    for key in ["semesterId", "departmentId", "majorId", "classId"] {
        push_filter(&mut query, key, opt_str(req, key).as_deref());
    }

    let generation = state.next_generation("statistics");

    let raw = {
        let be = match backend(state, req) {
            Ok(b) => b,
            Err(resp) => return resp,
        };
        match be.get_json("data/statistic", &query) {
            Ok(v) => v,
            Err(e) => return upstream_err(req, e),
        }
    };

    let mut overview = view::statistic_overview(&raw);
    overview["generation"] = json!(generation);
    ok(&req.id, overview)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "statistics.overview" => Some(handle_overview(state, req)),
        _ => None,
    }
}
