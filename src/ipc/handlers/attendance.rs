use crate::attendance::{AttendanceRecorder, MarkOutcome, DATE_FORMAT};
use crate::db::AttendanceRecord;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::service::{self, RecognizeOutcome};
use chrono::NaiveDate;
use serde_json::json;

fn outcome_json(roll: &str, outcome: &MarkOutcome) -> serde_json::Value {
    let mut v = json!(outcome);
    v["roll"] = json!(roll);
    v["message"] = json!(outcome.message(roll));
    v
}

async fn attendance_mark(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = helpers::store(state)?;
    let roll = helpers::required_str(params, "roll")?;
    let outcome = AttendanceRecorder::new(store).mark_attendance(&roll).await?;
    Ok(outcome_json(&roll, &outcome))
}

async fn attendance_recognize(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = helpers::store(state)?;
    let reply = helpers::service_reply(params)?;
    let recorder = AttendanceRecorder::new(store);
    match service::recognize(&recorder, &reply).await? {
        RecognizeOutcome::NotRecognized { message } => Ok(json!({
            "status": "notRecognized",
            "message": message,
        })),
        RecognizeOutcome::Recognized { roll, outcome } => {
            let mut v = outcome_json(&roll, &outcome);
            v["recognized"] = json!(true);
            Ok(v)
        }
    }
}

/// Records for one date (default: today), optionally narrowed to one roll.
async fn attendance_list(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = helpers::store(state)?;
    let roll = helpers::optional_str(params, "roll")?.filter(|r| !r.is_empty());
    let date = helpers::optional_str(params, "date")?.filter(|d| !d.is_empty());
    if let Some(d) = date.as_deref() {
        if NaiveDate::parse_from_str(d, DATE_FORMAT).is_err() {
            return Err(HandlerErr {
                code: "bad_params",
                message: "date must be YYYY-MM-DD".to_string(),
                details: Some(json!({ "date": d })),
            });
        }
    }

    let records: Vec<AttendanceRecord> = match (roll.as_deref(), date.as_deref()) {
        (Some(r), Some(d)) => store
            .attendance_for(r)
            .await?
            .into_iter()
            .filter(|rec| rec.date == d)
            .collect(),
        (Some(r), None) => store.attendance_for(r).await?,
        (None, Some(d)) => store.attendance_on(d).await?,
        (None, None) => {
            let today = chrono::Local::now().format(DATE_FORMAT).to_string();
            store.attendance_on(&today).await?
        }
    };
    Ok(json!({ "records": records }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "attendance.mark" => attendance_mark(state, &req.params).await,
        "attendance.recognize" => attendance_recognize(state, &req.params).await,
        "attendance.list" => attendance_list(state, &req.params).await,
        _ => return None,
    };
    Some(respond(&req.id, res))
}
