use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde_json::json;
use time::OffsetDateTime;

use crate::models::user::Capability;
use crate::routes::{engine_error_response, require, session::Actor};
use crate::state::AppState;

/// On-demand SLA sweep, same path the background worker takes.
pub async fn run_sla_scan(State(state): State<AppState>, Actor(actor): Actor) -> Response {
    if let Err(resp) = require(&actor, Capability::RunBreachScan) {
        return resp;
    }

    match state
        .engine
        .run_breach_scan(OffsetDateTime::now_utc())
        .await
    {
        Ok(count) => Json(json!({ "success": true, "breach_count": count })).into_response(),
        Err(err) => engine_error_response(err),
    }
}
