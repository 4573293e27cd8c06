pub mod core;
pub mod course;
pub mod section;

use serde::Serialize;

use crate::error::{AnalyticsError, Result};
use crate::ipc::error::{err, fail, ok};
use crate::ipc::params;
use crate::ipc::types::{AppState, Request};
use crate::pipeline::ReportContext;

/// Runs one report: store check, caller, context, then `build`.
fn report<T: Serialize>(
    state: &AppState,
    req: &Request,
    build: impl FnOnce(&ReportContext<'_>, &serde_json::Value) -> Result<T>,
) -> serde_json::Value {
    let outcome = state
        .db
        .as_ref()
        .ok_or(AnalyticsError::NoStore)
        .and_then(|conn| {
            let caller = params::caller(&req.params)?;
            let ctx = ReportContext::new(conn, caller, &state.config)?;
            build(&ctx, &req.params)
        });
    match outcome {
        Ok(body) => match serde_json::to_value(body) {
            Ok(v) => ok(&req.id, v),
            Err(e) => err(&req.id, "internal", e.to_string(), None),
        },
        Err(e) => fail(&req.id, &e),
    }
}
