use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;
use std::time::Instant;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let started = Instant::now();
    let resp = dispatch(state, &req);
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match resp.get("error").and_then(|e| e.get("code")).and_then(|c| c.as_str()) {
        None => tracing::info!(id = %req.id, method = %req.method, elapsed_ms, "request ok"),
        Some(code) => tracing::warn!(
            id = %req.id,
            method = %req.method,
            code,
            elapsed_ms,
            "request failed"
        ),
    }
    resp
}

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::course::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::section::try_handle(state, req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
