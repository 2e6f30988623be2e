use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Stroke used for the average-CPA line and its tooltip entry.
pub const AVERAGE_STROKE: &str = "#2563eb";
/// Stroke used for the median-CPA line and its tooltip entry.
pub const MEDIAN_STROKE: &str = "#dc2626";

/// Cycled by selection index for individually picked students. The 6th
/// selection reuses the 1st color; the legend disambiguates by name.
pub const STUDENT_PALETTE: [&str; 5] = ["#8884d8", "#82ca9d", "#ffc658", "#ff7300", "#8dd1e1"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemesterPoint {
    pub semester: String,
    #[serde(default)]
    pub cpa: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdCohort {
    // The live backend spells this "threshHold".
    #[serde(alias = "threshHold")]
    pub threshold: i64,
    #[serde(alias = "cpaTrajectory", default)]
    pub trajectories: Vec<Vec<SemesterPoint>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedStudentTrajectory {
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(alias = "cpaTrajectory", default)]
    pub trajectory: Vec<SemesterPoint>,
}

/// One analysis response from the backend. `semesters` is the authoritative
/// ordered axis; every other series is aligned against it by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryResponse {
    #[serde(rename = "averageCPA", default)]
    pub average_cpa: Vec<SemesterPoint>,
    #[serde(rename = "medianCPA", default)]
    pub median_cpa: Vec<SemesterPoint>,
    #[serde(alias = "thresholdStudents", default)]
    pub threshold_cohorts: Vec<ThresholdCohort>,
    #[serde(alias = "specificStudents", default)]
    pub named_students: Vec<NamedStudentTrajectory>,
    #[serde(default)]
    pub semesters: Vec<String>,
    #[serde(default)]
    pub total_students: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStats {
    pub min: f64,
    pub max: f64,
    pub center: f64,
    pub range: f64,
}

/// Band statistics for one cohort at one semester, or `None` when no member
/// has a usable value there. A recorded CPA of exactly 0 counts as "no real
/// score" upstream and is excluded along with nulls and negative values.
pub fn band_stats_at(cohort: &ThresholdCohort, semester: &str) -> Option<BandStats> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut any = false;
    for trajectory in &cohort.trajectories {
        let Some(cpa) = trajectory
            .iter()
            .find(|p| p.semester == semester)
            .and_then(|p| p.cpa)
        else {
            continue;
        };
        if cpa <= 0.0 {
            continue;
        }
        any = true;
        if cpa < min {
            min = cpa;
        }
        if cpa > max {
            max = cpa;
        }
    }
    if !any {
        return None;
    }
    Some(BandStats {
        min,
        max,
        center: (min + max) / 2.0,
        range: max - min,
    })
}

fn cpa_at(series: &[SemesterPoint], semester: &str) -> Value {
    series
        .iter()
        .find(|p| p.semester == semester)
        .and_then(|p| p.cpa)
        .map(|v| json!(v))
        .unwrap_or(Value::Null)
}

/// One chart row per semester, in the server-provided order. Threshold fields
/// are always present (all four null when the cohort has no data that
/// semester); named-student keys are set only where a value exists, so the
/// charting layer skips the point instead of drawing a gap.
pub fn build_chart_rows(resp: &TrajectoryResponse) -> Vec<Map<String, Value>> {
    resp.semesters
        .iter()
        .map(|semester| {
            let mut row = Map::new();
            row.insert("semester".to_string(), json!(semester));
            row.insert("averageCPA".to_string(), cpa_at(&resp.average_cpa, semester));
            row.insert("medianCPA".to_string(), cpa_at(&resp.median_cpa, semester));

            for cohort in &resp.threshold_cohorts {
                let t = cohort.threshold;
                match band_stats_at(cohort, semester) {
                    Some(band) => {
                        row.insert(format!("threshold_{}_min", t), json!(band.min));
                        row.insert(format!("threshold_{}_max", t), json!(band.max));
                        row.insert(format!("threshold_{}_center", t), json!(band.center));
                        row.insert(format!("threshold_{}_range", t), json!(band.range));
                    }
                    None => {
                        row.insert(format!("threshold_{}_min", t), Value::Null);
                        row.insert(format!("threshold_{}_max", t), Value::Null);
                        row.insert(format!("threshold_{}_center", t), Value::Null);
                        row.insert(format!("threshold_{}_range", t), Value::Null);
                    }
                }
            }

            for student in &resp.named_students {
                let point = student
                    .trajectory
                    .iter()
                    .find(|p| p.semester == *semester)
                    .and_then(|p| p.cpa);
                if let Some(cpa) = point {
                    row.insert(format!("student_{}", student.student_id), json!(cpa));
                }
            }

            row
        })
        .collect()
}

pub fn threshold_fill(threshold: i64) -> &'static str {
    match threshold {
        5 => "#fde68a",
        10 => "#fdba74",
        15 => "#f87171",
        20 => "#a78bfa",
        25 => "#6ee7b7",
        30 => "#93c5fd",
        _ => "#d1d5db",
    }
}

pub fn threshold_stroke(threshold: i64) -> &'static str {
    match threshold {
        5 => "#d97706",
        10 => "#c2410c",
        15 => "#b91c1c",
        20 => "#6d28d9",
        25 => "#047857",
        30 => "#1d4ed8",
        _ => "#4b5563",
    }
}

pub fn student_color(index: usize) -> &'static str {
    STUDENT_PALETTE[index % STUDENT_PALETTE.len()]
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSeries {
    pub threshold: i64,
    pub label: String,
    pub fill: &'static str,
    pub stroke: &'static str,
    pub min_key: String,
    pub max_key: String,
    pub center_key: String,
    pub range_key: String,
}

pub fn threshold_series(resp: &TrajectoryResponse) -> Vec<ThresholdSeries> {
    resp.threshold_cohorts
        .iter()
        .map(|cohort| {
            let t = cohort.threshold;
            ThresholdSeries {
                threshold: t,
                label: format!("{}% Threshold", t),
                fill: threshold_fill(t),
                stroke: threshold_stroke(t),
                min_key: format!("threshold_{}_min", t),
                max_key: format!("threshold_{}_max", t),
                center_key: format!("threshold_{}_center", t),
                range_key: format!("threshold_{}_range", t),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSeries {
    pub student_id: String,
    pub student_name: String,
    pub label: String,
    pub key: String,
    pub color: &'static str,
}

pub fn student_series(resp: &TrajectoryResponse) -> Vec<StudentSeries> {
    resp.named_students
        .iter()
        .enumerate()
        .map(|(index, student)| StudentSeries {
            student_id: student.student_id.clone(),
            student_name: student.student_name.clone(),
            label: format!("Student {}", student.student_name),
            key: format!("student_{}", student.student_id),
            color: student_color(index),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipLine {
    pub label: String,
    pub color: String,
}

/// Hover summary for one chart row: average/median lines, named students
/// with a value at that semester, then each threshold band's min–max span.
pub fn tooltip_lines(resp: &TrajectoryResponse, row: &Map<String, Value>) -> Vec<TooltipLine> {
    let mut lines = Vec::new();

    if let Some(avg) = row.get("averageCPA").and_then(Value::as_f64) {
        lines.push(TooltipLine {
            label: format!("Average CPA: {:.2}", avg),
            color: AVERAGE_STROKE.to_string(),
        });
    }
    if let Some(median) = row.get("medianCPA").and_then(Value::as_f64) {
        lines.push(TooltipLine {
            label: format!("Median CPA: {:.2}", median),
            color: MEDIAN_STROKE.to_string(),
        });
    }

    for (index, student) in resp.named_students.iter().enumerate() {
        let key = format!("student_{}", student.student_id);
        if let Some(cpa) = row.get(&key).and_then(Value::as_f64) {
            lines.push(TooltipLine {
                label: format!("{} ({}): {:.2}", student.student_name, student.student_id, cpa),
                color: student_color(index).to_string(),
            });
        }
    }

    for cohort in &resp.threshold_cohorts {
        let t = cohort.threshold;
        let min = row.get(&format!("threshold_{}_min", t)).and_then(Value::as_f64);
        let max = row.get(&format!("threshold_{}_max", t)).and_then(Value::as_f64);
        if let (Some(min), Some(max)) = (min, max) {
            lines.push(TooltipLine {
                label: format!("{}% Threshold: {:.2} - {:.2}", t, min, max),
                color: threshold_stroke(t).to_string(),
            });
        }
    }

    lines
}
