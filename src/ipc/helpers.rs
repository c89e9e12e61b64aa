use crate::db::Store;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::AppState;
use crate::periods::Period;
use crate::service::ServiceReply;
use serde_json::json;

pub fn store(state: &AppState) -> Result<&Store, HandlerErr> {
    state.store.as_ref().ok_or_else(|| HandlerErr {
        code: "no_workspace",
        message: "select a workspace first".to_string(),
        details: None,
    })
}

/// A non-empty string param, trimmed.
pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.trim().to_string()))
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a string", key))),
    }
}

/// `period` defaults to "all" when absent.
pub fn period(params: &serde_json::Value) -> Result<Period, HandlerErr> {
    let Some(raw) = optional_str(params, "period")? else {
        return Ok(Period::All);
    };
    Period::parse(&raw).map_err(|e| HandlerErr {
        code: "bad_params",
        message: e.to_string(),
        details: Some(json!({ "period": raw })),
    })
}

/// `workingDays` as an integer or numeric string; absent or null means "use the
/// stored value".
pub fn working_days(params: &serde_json::Value) -> Result<Option<i64>, HandlerErr> {
    let bad = || HandlerErr {
        code: "bad_params",
        message: "workingDays must be an integer".to_string(),
        details: Some(json!({ "workingDays": params.get("workingDays") })),
    };
    match params.get("workingDays") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n.as_i64().map(Some).ok_or_else(bad),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| bad()),
        Some(_) => Err(bad()),
    }
}

pub fn service_reply(params: &serde_json::Value) -> Result<ServiceReply, HandlerErr> {
    let Some(raw) = params.get("reply") else {
        return Err(HandlerErr::bad_params("missing reply"));
    };
    serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid reply: {}", e)))
}
