use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::{Path, PathBuf};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "storePath": state.store.as_ref().map(|p| p.to_string_lossy().to_string()),
            "storeOpen": state.db.is_some(),
        }),
    )
}

/// Opens `<path>/lms.sqlite3`, replacing any store already open.
pub fn open_store(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let conn = db::open_db(path)?;
    state.store = Some(path.to_path_buf());
    state.db = Some(conn);
    tracing::info!(store = %path.display(), "store opened");
    Ok(())
}

fn handle_store_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_store(state, &path) {
        Ok(()) => ok(&req.id, json!({ "storePath": path.to_string_lossy() })),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "store.open" => Some(handle_store_open(state, req)),
        _ => None,
    }
}
