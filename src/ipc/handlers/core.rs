use crate::backup::BUNDLE_FORMAT;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn health(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace_display(),
        "dbOpen": state.db.is_some(),
        "bundleFormat": BUNDLE_FORMAT
    }))
}

fn workspace_select(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let Some(path) = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
    else {
        return Err(HandlerErr::bad_params("missing params.path"));
    };

    if let Err(e) = state.open_workspace(&path) {
        return Err(HandlerErr::new("db_open_failed", format!("{e:#}"))
            .with_details(json!({ "path": path.to_string_lossy() })));
    }
    tracing::info!("workspace opened: {}", path.to_string_lossy());
    Ok(json!({ "workspacePath": state.workspace_display() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "health" => health(state, req),
        "workspace.select" => workspace_select(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
