use crate::backup;
use crate::db::Store;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn workspace(state: &AppState) -> Result<PathBuf, HandlerErr> {
    state.workspace.clone().ok_or_else(|| HandlerErr {
        code: "no_workspace",
        message: "select a workspace first".to_string(),
        details: None,
    })
}

fn io_failed(e: anyhow::Error) -> HandlerErr {
    HandlerErr {
        code: "io_failed",
        message: format!("{e:#}"),
        details: None,
    }
}

fn export_bundle(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let workspace = workspace(state)?;
    let out = PathBuf::from(helpers::required_str(params, "outPath")?);
    let summary = backup::export_workspace_bundle(&workspace, &out).map_err(io_failed)?;
    tracing::info!(path = %out.to_string_lossy(), bundle_id = %summary.bundle_id, "workspace exported");
    Ok(json!({
        "bundleFormat": summary.bundle_format,
        "bundleId": summary.bundle_id,
        "dbSha256": summary.db_sha256,
        "entryCount": summary.entry_count,
    }))
}

/// The open store is closed before the file is replaced and reopened afterwards,
/// whether or not the import succeeded.
async fn import_bundle(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let workspace = workspace(state)?;
    let input = PathBuf::from(helpers::required_str(params, "inPath")?);

    if let Some(store) = state.store.take() {
        store.close();
    }
    let imported = backup::import_workspace_bundle(&input, &workspace).map_err(io_failed);
    let reopened = Store::open(&workspace).await;
    if let Ok(store) = &reopened {
        state.store = Some(store.clone());
    }

    let summary = imported?;
    reopened?;
    tracing::info!(path = %input.to_string_lossy(), format = %summary.bundle_format_detected, "workspace imported");
    Ok(json!({ "bundleFormatDetected": summary.bundle_format_detected }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "backup.exportWorkspaceBundle" => export_bundle(state, &req.params),
        "backup.importWorkspaceBundle" => import_bundle(state, &req.params).await,
        _ => return None,
    };
    Some(respond(&req.id, res))
}
