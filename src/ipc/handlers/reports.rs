use crate::calc;
use crate::export;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::periods;
use serde_json::json;
use std::path::PathBuf;

async fn periods_list(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let store = helpers::store(state)?;
    let periods = periods::list_periods(store).await?;
    // Only the sentinel means there is nothing to pick from.
    let has_data = periods.len() > 1;
    Ok(json!({ "periods": periods, "hasData": has_data }))
}

async fn settings_get(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let store = helpers::store(state)?;
    let working_days = store.working_days().await?;
    Ok(json!({ "workingDays": working_days }))
}

async fn reports_calculate(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = helpers::store(state)?;
    let period = helpers::period(params)?;
    let working_days = helpers::working_days(params)?;
    let report = calc::calculate(store, &period, working_days).await?;
    Ok(json!(report))
}

async fn reports_export_csv(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let store = helpers::store(state)?;
    let out = PathBuf::from(helpers::required_str(params, "outPath")?);
    let period = helpers::period(params)?;
    let working_days = helpers::working_days(params)?;
    let report = calc::calculate(store, &period, working_days).await?;

    let rows_exported =
        export::write_student_rows_csv(&report.student_rows, &out).map_err(|e| HandlerErr {
            code: "io_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "path": out.to_string_lossy() })),
        })?;
    tracing::info!(path = %out.to_string_lossy(), rows = rows_exported, "report exported");
    Ok(json!({
        "path": out.to_string_lossy(),
        "period": report.period,
        "rowsExported": rows_exported,
    }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "periods.list" => periods_list(state).await,
        "settings.get" => settings_get(state).await,
        "reports.calculate" => reports_calculate(state, &req.params).await,
        "reports.exportCsv" => reports_export_csv(state, &req.params).await,
        _ => return None,
    };
    Some(respond(&req.id, res))
}
