pub mod admin;
pub mod categories;
pub mod reports;
pub mod session;
pub mod tickets;
pub mod users;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::{error, warn};

use crate::engine::EngineError;
use crate::models::user::{Capability, User};
use crate::responses::JsonResponse;
use crate::state::AppState;

/// The full API surface. Layers (tracing, rate limiting, CORS) are applied
/// by the caller.
pub fn api_router(state: AppState) -> Router {
    let ticket_routes = Router::new()
        .route(
            "/",
            post(tickets::create_ticket).get(tickets::list_tickets),
        )
        .route("/{ticket_id}", get(tickets::get_ticket))
        .route("/{ticket_id}/comments", post(tickets::add_comment))
        .route("/{ticket_id}/status", post(tickets::change_status))
        .route("/{ticket_id}/priority", post(tickets::change_priority))
        .route("/{ticket_id}/assign", post(tickets::assign_ticket))
        .route("/{ticket_id}/rate", post(tickets::rate_ticket))
        .route("/{ticket_id}/sla", get(tickets::ticket_sla))
        .route("/{ticket_id}/suggestions", get(tickets::ticket_suggestions));

    let report_routes = Router::new()
        .route("/sla", get(reports::global_sla_report))
        .route("/agents/{agent_id}", get(reports::agent_sla_report));

    let admin_routes = Router::new().route("/sla-scan", post(admin::run_sla_scan));

    Router::new()
        .nest("/api/tickets", ticket_routes)
        .route(
            "/api/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/api/users/agents", get(users::list_agents))
        .nest("/api/reports", report_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}

/// Single authorization check for the route boundary: the capability table
/// decides, the guard logs refusals.
pub(crate) fn require(user: &User, capability: Capability) -> Result<(), Response> {
    if user.role.can(capability) {
        Ok(())
    } else {
        warn!(
            user_id = %user.id,
            role = %user.role,
            required = ?capability,
            "capability check refused"
        );
        Err(JsonResponse::forbidden("Insufficient permissions").into_response())
    }
}

pub(crate) fn engine_error_response(err: EngineError) -> Response {
    match err {
        EngineError::Validation(msg) => JsonResponse::bad_request(&msg).into_response(),
        EngineError::NotFound(msg) => JsonResponse::not_found(&msg).into_response(),
        EngineError::Forbidden(msg) => JsonResponse::forbidden(&msg).into_response(),
        EngineError::Conflict(msg) => JsonResponse::conflict(&msg).into_response(),
        EngineError::Database(err) => {
            error!(error = ?err, "engine database error");
            JsonResponse::server_error("Internal error").into_response()
        }
    }
}
