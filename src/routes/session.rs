use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use tracing::error;
use uuid::Uuid;

use crate::models::user::User;
use crate::responses::JsonResponse;
use crate::state::AppState;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// The authenticated caller, resolved from the identity header the upstream
/// auth proxy sets. Authentication itself lives outside this service; every
/// handler receives the actor as an explicit value.
#[derive(Debug)]
pub struct Actor(pub User);

impl FromRequestParts<AppState> for Actor {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Response> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| JsonResponse::unauthorized("Missing actor identity").into_response())?;

        let actor_id = Uuid::parse_str(raw)
            .map_err(|_| JsonResponse::unauthorized("Invalid actor identity").into_response())?;

        match state.users.find_user_by_id(actor_id).await {
            Ok(Some(user)) if user.is_active => Ok(Actor(user)),
            Ok(_) => Err(JsonResponse::unauthorized("Unknown or inactive actor").into_response()),
            Err(err) => {
                error!(%actor_id, error = ?err, "Failed to resolve actor");
                Err(JsonResponse::server_error("Failed to resolve actor").into_response())
            }
        }
    }
}
