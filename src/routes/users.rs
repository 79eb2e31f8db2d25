use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::models::user::Capability;
use crate::responses::JsonResponse;
use crate::routes::{require, session::Actor};
use crate::state::AppState;

/// Assignable staff, for triage and assignment views.
pub async fn list_agents(State(state): State<AppState>, Actor(actor): Actor) -> Response {
    if let Err(resp) = require(&actor, Capability::SelfAssign) {
        return resp;
    }

    match state.users.list_agents().await {
        Ok(agents) => Json(json!({ "success": true, "agents": agents })).into_response(),
        Err(err) => {
            error!(error = ?err, "DB error listing agents");
            JsonResponse::server_error("Failed to list agents").into_response()
        }
    }
}
