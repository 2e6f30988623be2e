use chrono::DateTime;
use serde_json::{json, Value};

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Upstream timestamps are RFC 3339; the views want a short stable form.
/// Unparseable input falls through as-is rather than being dropped.
pub fn display_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

pub fn parse_page_meta(raw: Option<&Value>) -> PageMeta {
    let get = |key: &str| raw.and_then(|m| m.get(key)).and_then(Value::as_i64).unwrap_or(0);
    PageMeta {
        page: get("page"),
        limit: get("limit"),
        total: get("total"),
        total_pages: get("totalPages"),
    }
}

pub fn has_more(meta: &PageMeta) -> bool {
    meta.page < meta.total_pages
}

pub fn meta_json(meta: &PageMeta) -> Value {
    json!({
        "page": meta.page,
        "limit": meta.limit,
        "total": meta.total,
        "totalPages": meta.total_pages,
    })
}

/// Picker entries for the student selection list. A missing class label
/// renders as an empty string, not null.
pub fn student_picker_entries(items: &[Value]) -> Vec<Value> {
    items
        .iter()
        .map(|item| {
            json!({
                "studentId": item.get("studentId").cloned().unwrap_or(Value::Null),
                "studentName": item.get("studentName").cloned().unwrap_or(Value::Null),
                "class": str_field(item, "class").unwrap_or(""),
            })
        })
        .collect()
}

/// GPA/CPA series for the per-student chart. The backend delivers processes
/// newest-first; the chart runs chronologically.
pub fn student_chart_series(processes: &[Value]) -> Vec<Value> {
    processes
        .iter()
        .rev()
        .map(|p| {
            json!({
                "semester": p.get("semester").cloned().unwrap_or(Value::Null),
                "gpa": p.get("gpa").cloned().unwrap_or(Value::Null),
                "cpa": p.get("cpa").cloned().unwrap_or(Value::Null),
            })
        })
        .collect()
}

/// The first process row is the most recent semester's standing.
pub fn latest_process_summary(processes: &[Value]) -> Value {
    let Some(latest) = processes.first() else {
        return Value::Null;
    };
    json!({
        "semester": latest.get("semester").cloned().unwrap_or(Value::Null),
        "gpa": latest.get("gpa").cloned().unwrap_or(Value::Null),
        "cpa": latest.get("cpa").cloned().unwrap_or(Value::Null),
        "registeredCredits": latest.get("registeredCredits").cloned().unwrap_or(Value::Null),
        "debtCredits": latest.get("debtCredits").cloned().unwrap_or(Value::Null),
        "warningLevel": latest.get("warningLevel").cloned().unwrap_or(Value::Null),
    })
}

fn segment(key: &str, label: &str, rate: Value, count: Value) -> Value {
    let mut seg = json!({ "key": key, "label": label, "rate": rate });
    if !count.is_null() {
        seg["count"] = count;
    }
    seg
}

/// Overview view model for the statistics page: headline totals, the
/// average-CPA-per-semester line series, and the classification, warning and
/// graduation breakdowns. Counters missing upstream come through as null.
pub fn statistic_overview(raw: &Value) -> Value {
    let field = |key: &str| raw.get(key).cloned().unwrap_or(Value::Null);

    let average_cpa: Vec<Value> = raw
        .get("averageCPA")
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .map(|p| {
                    json!({
                        "semester": p.get("semester").cloned().unwrap_or(Value::Null),
                        "cpa": p.get("averageCPA").cloned().unwrap_or(Value::Null),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "totals": {
            "students": field("totalStudents"),
            "studentsIn": field("totalStudentIn"),
            "studentsOut": field("totalStudentOut"),
            "averageGpa": field("averageGPA"),
        },
        "averageCpa": average_cpa,
        "classification": [
            segment("excellent", "Excellent", field("studentExcellentRate"), Value::Null),
            segment("veryGood", "Very good", field("studentVeryGoodRate"), Value::Null),
            segment("good", "Good", field("studentGoodRate"), Value::Null),
            segment("medium", "Medium", field("studentMediumRate"), Value::Null),
            segment("weak", "Weak", field("studentBadRate"), Value::Null),
        ],
        "warnings": {
            "overall": {
                "rate": field("studentInWarningRate"),
                "count": field("studentInWarningNumber"),
            },
            "levels": [
                segment("level1", "Warning level 1", field("studentWarningOneRate"), Value::Null),
                segment("level2", "Warning level 2", field("studentWarningTwoRate"), Value::Null),
                segment("level3", "Warning level 3", field("studentWarningThreeRate"), Value::Null),
            ],
        },
        "graduation": [
            segment(
                "onTime",
                "Graduated on time",
                field("studentGraduationOnTimeRate"),
                field("studentGraduationNumber"),
            ),
            segment(
                "late",
                "Graduated late",
                field("studentGraduationLateRate"),
                field("studentGraduationLateNumber"),
            ),
            segment(
                "notGraduated",
                "Not graduated",
                field("studentUngraduationRate"),
                field("studentUngraduationNumber"),
            ),
        ],
    })
}

fn stage_display(started: Option<&str>, completed: Option<&str>) -> String {
    match (started, completed) {
        (Some(s), Some(c)) => format!("{} - {}", display_timestamp(s), display_timestamp(c)),
        (Some(s), None) => format!("Started: {}", display_timestamp(s)),
        _ => "Not started".to_string(),
    }
}

/// One pipeline stage of an upload event. A failure message always wins; a
/// completed stage needs an explicit success flag to count as success.
pub fn upload_stage(
    event: &Value,
    started_key: &str,
    completed_key: &str,
    failed_key: &str,
    success_key: &str,
) -> Value {
    let started = str_field(event, started_key);
    let completed = str_field(event, completed_key);
    let failed = str_field(event, failed_key);
    let success = event.get(success_key).and_then(Value::as_bool);

    let state = if failed.is_some() {
        "failed"
    } else if completed.is_some() {
        if success == Some(true) {
            "success"
        } else {
            "failed"
        }
    } else if started.is_some() {
        "running"
    } else {
        "pending"
    };

    json!({
        "state": state,
        "startedAt": started,
        "completedAt": completed,
        "failedMessage": failed,
        "display": stage_display(started, completed),
    })
}

/// Shapes one upload event into its import / statistic / predict stages.
pub fn upload_event_row(event: &Value) -> Value {
    let created_at = str_field(event, "createdAt");
    json!({
        "id": event.get("id").cloned().unwrap_or(Value::Null),
        "createdAt": created_at,
        "createdAtDisplay": created_at.map(display_timestamp),
        "import": upload_stage(
            event,
            "importStartedAt",
            "importCompletedAt",
            "importFailedMessage",
            "isImportSuccess",
        ),
        "statistic": upload_stage(
            event,
            "statisticStartedAt",
            "statisticCompletedAt",
            "statisticFailedMessage",
            "isStatisticSuccess",
        ),
        "predict": upload_stage(
            event,
            "predictStartedAt",
            "predictCompletedAt",
            "predictFailedMessage",
            "isPredictSuccess",
        ),
    })
}

pub fn notification_row(item: &Value) -> Value {
    let mut row = item.clone();
    if let Some(created_at) = str_field(item, "createdAt").map(display_timestamp) {
        if let Some(obj) = row.as_object_mut() {
            obj.insert("createdAtDisplay".to_string(), json!(created_at));
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_timestamp_formats_rfc3339_and_passes_through_garbage() {
        assert_eq!(display_timestamp("2024-03-05T09:30:00+07:00"), "2024-03-05 09:30");
        assert_eq!(display_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn page_meta_has_more_only_below_total_pages() {
        let meta = parse_page_meta(Some(&json!({ "page": 1, "limit": 20, "total": 45, "totalPages": 3 })));
        assert!(has_more(&meta));
        let last = parse_page_meta(Some(&json!({ "page": 3, "limit": 20, "total": 45, "totalPages": 3 })));
        assert!(!has_more(&last));
        let empty = parse_page_meta(None);
        assert_eq!(empty.total, 0);
        assert!(!has_more(&empty));
    }

    #[test]
    fn student_chart_series_reverses_to_chronological_order() {
        let processes = vec![
            json!({ "semester": "2022B", "gpa": 3.0, "cpa": 3.1 }),
            json!({ "semester": "2022A", "gpa": 2.8, "cpa": 3.2 }),
        ];
        let series = student_chart_series(&processes);
        assert_eq!(series[0]["semester"], "2022A");
        assert_eq!(series[1]["semester"], "2022B");
        assert_eq!(latest_process_summary(&processes)["semester"], "2022B");
    }

    #[test]
    fn upload_stage_states() {
        let event = json!({
            "importStartedAt": "2024-01-01T00:00:00Z",
            "importCompletedAt": "2024-01-01T00:05:00Z",
            "isImportSuccess": true,
            "statisticStartedAt": "2024-01-01T00:05:00Z",
            "isStatisticSuccess": false,
            "predictFailedMessage": "model unavailable",
        });
        let import = upload_stage(
            &event,
            "importStartedAt",
            "importCompletedAt",
            "importFailedMessage",
            "isImportSuccess",
        );
        assert_eq!(import["state"], "success");
        assert_eq!(import["display"], "2024-01-01 00:00 - 2024-01-01 00:05");

        let statistic = upload_stage(
            &event,
            "statisticStartedAt",
            "statisticCompletedAt",
            "statisticFailedMessage",
            "isStatisticSuccess",
        );
        assert_eq!(statistic["state"], "running");

        let predict = upload_stage(
            &event,
            "predictStartedAt",
            "predictCompletedAt",
            "predictFailedMessage",
            "isPredictSuccess",
        );
        assert_eq!(predict["state"], "failed");
        assert_eq!(predict["display"], "Not started");
    }

    #[test]
    fn statistic_overview_maps_series_and_breakdowns() {
        let raw = json!({
            "totalStudents": 1200,
            "averageGPA": 2.9,
            "averageCPA": [
                { "semester": "2023A", "averageCPA": 2.95 },
                { "semester": "2023B", "averageCPA": 3.01 },
            ],
            "studentExcellentRate": 4.2,
            "studentInWarningRate": 6.5,
            "studentInWarningNumber": 78,
            "studentGraduationOnTimeRate": 61.0,
            "studentGraduationNumber": 300,
        });
        let overview = statistic_overview(&raw);
        assert_eq!(overview["totals"]["students"], 1200);
        assert_eq!(overview["averageCpa"][1]["cpa"], 3.01);
        assert_eq!(overview["classification"][0]["rate"], 4.2);
        assert_eq!(overview["warnings"]["overall"]["count"], 78);
        assert_eq!(overview["graduation"][0]["count"], 300);
        // Counter absent upstream: surfaced as null, not dropped.
        assert_eq!(overview["graduation"][1]["rate"], Value::Null);
    }
}
