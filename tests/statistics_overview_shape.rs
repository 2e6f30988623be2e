
use serde_json::{json, Value};
use test_support::{request_ok, spawn_sidecar, MockBackend};

#[test]
fn overview_shapes_totals_breakdowns_and_series() {
    let mock = MockBackend::start();
    mock.route(
        "GET",
        "/data/statistic",
        json!({
            "averageCPA": [
                { "semester": "2023A", "averageCPA": 2.95 },
                { "semester": "2023B", "averageCPA": 3.02 },
            ],
            "averageGPA": 2.88,
            "totalStudents": 1450,
            "totalStudentIn": 400,
            "totalStudentOut": 310,
            "studentGraduationOnTimeRate": 58.5,
            "studentUngraduationRate": 12.0,
            "studentGraduationLateRate": 29.5,
            "studentInWarningRate": 7.2,
            "studentGraduationNumber": 260,
            "studentUngraduationNumber": 54,
            "studentGraduationLateNumber": 131,
            "studentInWarningNumber": 104,
            "studentWarningOneRate": 4.0,
            "studentWarningTwoRate": 2.2,
            "studentWarningThreeRate": 1.0,
            "studentExcellentRate": 3.5,
            "studentVeryGoodRate": 18.0,
            "studentGoodRate": 41.0,
            "studentMediumRate": 30.0,
            "studentBadRate": 7.5,
        }),
    );
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.configure",
        json!({ "baseUrl": mock.base_url }),
    );
    let overview = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "statistics.overview",
        json!({ "semesterId": "2023B", "departmentId": "all", "majorId": "m-01" }),
    );

    assert_eq!(overview.get("generation"), Some(&json!(1)));
    assert_eq!(overview["totals"]["students"], json!(1450));
    assert_eq!(overview["totals"]["averageGpa"], json!(2.88));

    let series = overview["averageCpa"].as_array().expect("averageCpa");
    assert_eq!(series.len(), 2);
    assert_eq!(series[1], json!({ "semester": "2023B", "cpa": 3.02 }));

    let classification = overview["classification"].as_array().expect("classification");
    assert_eq!(classification[0]["key"], json!("excellent"));
    assert_eq!(classification[0]["rate"], json!(3.5));
    assert_eq!(classification[4]["rate"], json!(7.5));

    assert_eq!(overview["warnings"]["overall"]["rate"], json!(7.2));
    assert_eq!(overview["warnings"]["overall"]["count"], json!(104));
    let levels = overview["warnings"]["levels"].as_array().expect("levels");
    assert_eq!(levels[2]["rate"], json!(1.0));

    let graduation = overview["graduation"].as_array().expect("graduation");
    assert_eq!(graduation[0]["key"], json!("onTime"));
    assert_eq!(graduation[0]["count"], json!(260));
    assert_eq!(graduation[2]["key"], json!("notGraduated"));
    assert_eq!(graduation[2]["rate"], json!(12.0));

    // semesterId and the concrete major pass through; "all" is omitted.
    let seen = mock.last_request("GET", "/data/statistic").expect("statistic request");
    assert!(seen.query.contains("semesterId=2023B"), "query: {}", seen.query);
    assert!(seen.query.contains("majorId=m-01"));
    assert!(!seen.query.contains("departmentId"));
}

#[test]
fn overview_generation_is_monotonic_per_view() {
    let mock = MockBackend::start();
    mock.route("GET", "/data/statistic", json!({ "totalStudents": 10 }));
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "session.configure",
        json!({ "baseUrl": mock.base_url }),
    );
    let first = request_ok(&mut stdin, &mut reader, "2", "statistics.overview", json!({}));
    let second = request_ok(&mut stdin, &mut reader, "3", "statistics.overview", json!({}));
    assert_eq!(first.get("generation"), Some(&json!(1)));
    assert_eq!(second.get("generation"), Some(&json!(2)));

    // Counters missing upstream surface as null rather than vanishing.
    assert_eq!(second["totals"]["studentsIn"], Value::Null);
    assert_eq!(second["warnings"]["overall"]["count"], Value::Null);
}
