
use serde_json::{json, Value};
use test_support::{error_code, request_err, request_ok, spawn_sidecar, MockBackend};

#[test]
fn fetching_methods_require_a_configured_session() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    for (id, method, params) in [
        ("1", "statistics.overview", json!({})),
        ("2", "catalog.departments", json!({})),
        (
            "3",
            "trajectory.analyze",
            json!({ "startSemester": "2023A", "endSemester": "2023B", "thresholdRates": [10] }),
        ),
        ("4", "notifications.list", json!({})),
        ("5", "uploads.history", json!({})),
    ] {
        let error = request_err(&mut stdin, &mut reader, id, method, params);
        assert_eq!(error_code(&error), "no_session", "method {}", method);
    }
}

#[test]
fn configure_rejects_non_http_urls_and_reports_state() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "session.configure",
        json!({ "baseUrl": "ftp://example.edu" }),
    );
    assert_eq!(error_code(&error), "bad_params");

    let configured = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.configure",
        json!({ "baseUrl": "http://127.0.0.1:9/" }),
    );
    // Trailing slash is normalized away.
    assert_eq!(configured.get("baseUrl"), Some(&json!("http://127.0.0.1:9")));

    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    assert_eq!(health.get("sessionConfigured"), Some(&json!(true)));
    assert_eq!(health.get("baseUrl"), Some(&json!("http://127.0.0.1:9")));
}

#[test]
fn upstream_401_maps_to_unauthorized() {
    let mock = MockBackend::start();
    mock.route_status("GET", "/data/statistic", 401, json!({ "message": "expired" }));
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.configure",
        json!({ "baseUrl": mock.base_url, "accessToken": "stale" }),
    );
    let error = request_err(&mut stdin, &mut reader, "2", "statistics.overview", json!({}));
    assert_eq!(error_code(&error), "unauthorized");
}

#[test]
fn upstream_404_maps_to_not_found_and_5xx_to_upstream_status() {
    let mock = MockBackend::start();
    mock.route_status("GET", "/data/statistic", 500, json!({ "message": "boom" }));
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.configure",
        json!({ "baseUrl": mock.base_url }),
    );

    // The mock answers 404 for anything without a route.
    let missing = request_err(&mut stdin, &mut reader, "2", "catalog.departments", json!({}));
    assert_eq!(error_code(&missing), "not_found");

    let failed = request_err(&mut stdin, &mut reader, "3", "statistics.overview", json!({}));
    assert_eq!(error_code(&failed), "upstream_status");
    assert_eq!(
        failed.get("details").and_then(|d| d.get("status")),
        Some(&json!(500))
    );
}

#[test]
fn clearing_the_session_drops_the_backend() {
    let mock = MockBackend::start();
    mock.route("GET", "/data/department", json!([{ "id": "d1", "name": "CS" }]));
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.configure",
        json!({ "baseUrl": mock.base_url }),
    );
    let departments = request_ok(&mut stdin, &mut reader, "2", "catalog.departments", json!({}));
    let items = departments.get("items").and_then(Value::as_array).expect("items");
    assert_eq!(items[0].get("name"), Some(&json!("CS")));

    let _ = request_ok(&mut stdin, &mut reader, "3", "session.clear", json!({}));
    let error = request_err(&mut stdin, &mut reader, "4", "catalog.departments", json!({}));
    assert_eq!(error_code(&error), "no_session");
}
