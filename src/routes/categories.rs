use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::models::category::CreateCategory;
use crate::models::user::Capability;
use crate::responses::JsonResponse;
use crate::routes::{require, session::Actor};
use crate::state::AppState;

pub async fn list_categories(State(state): State<AppState>, Actor(_actor): Actor) -> Response {
    match state.tickets.list_categories().await {
        Ok(categories) => {
            Json(json!({ "success": true, "categories": categories })).into_response()
        }
        Err(err) => {
            error!(error = ?err, "DB error listing categories");
            JsonResponse::server_error("Failed to list categories").into_response()
        }
    }
}

pub async fn create_category(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<CreateCategory>,
) -> Response {
    if let Err(resp) = require(&actor, Capability::ManageCategories) {
        return resp;
    }
    if payload.name.trim().is_empty() {
        return JsonResponse::bad_request("Category name must not be empty").into_response();
    }

    match state
        .tickets
        .insert_category(payload.name.trim(), payload.description.as_deref())
        .await
    {
        Ok(category) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "category": category })),
        )
            .into_response(),
        Err(err) => {
            error!(error = ?err, "DB error creating category");
            JsonResponse::server_error("Failed to create category").into_response()
        }
    }
}
