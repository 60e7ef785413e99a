use crate::calc::{self, CellWarning, Report};
use crate::curriculum::Curriculum;
use crate::ipc::error::ok;
use crate::ipc::helpers::{session, store_err};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

pub fn warnings_json(warnings: &[CellWarning]) -> Vec<serde_json::Value> {
    warnings
        .iter()
        .map(|w| {
            json!({
                "student": w.student,
                "subjectKey": w.column,
                "code": w.error.code(),
                "message": w.error.to_string(),
            })
        })
        .collect()
}

fn report_json(curriculum: &Curriculum, report: &Report) -> serde_json::Value {
    let students: Vec<serde_json::Value> = report
        .ranking()
        .into_iter()
        .map(|s| {
            json!({
                "name": s.name,
                "overallAverage": s.overall_average,
                "overallRank": s.overall_rank,
                "units": s.units.iter().map(|u| json!({
                    "unit": u.unit,
                    "average": u.average,
                    "rank": u.rank,
                    "gradedSubjects": u.graded_subjects,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    let unit_rankings: Vec<serde_json::Value> = curriculum
        .unit_ids()
        .map(|unit| {
            let entries: Vec<serde_json::Value> = report
                .unit_ranking(unit)
                .into_iter()
                .map(|e| json!({ "name": e.name, "average": e.average, "rank": e.rank }))
                .collect();
            json!({ "unit": unit, "entries": entries })
        })
        .collect();

    let ranked_count = report
        .students
        .values()
        .filter(|s| s.overall_average.is_some())
        .count();

    json!({
        "units": curriculum.units().iter().map(|u| json!({
            "id": u.id,
            "coefficient": u.coefficient,
        })).collect::<Vec<_>>(),
        "students": students,
        "rankedCount": ranked_count,
        "unitRankings": unit_rankings,
        "warnings": warnings_json(&report.warnings),
    })
}

fn handle_report_get(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, serde_json::Value> {
    let session = session(state, req)?;
    let table = session.store.read().map_err(|e| store_err(req, e))?;
    let report = calc::compute_report(&session.curriculum, &table);
    if !report.warnings.is_empty() {
        tracing::warn!(
            count = report.warnings.len(),
            "grade table has cells that were left out of the averages"
        );
    }
    Ok(ok(&req.id, report_json(&session.curriculum, &report)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "report.get" => handle_report_get(state, req),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|e| e))
}
