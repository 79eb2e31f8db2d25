use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::ticket_repository::TicketFilter;
use crate::models::ticket::{
    CreateComment, CreateTicket, RateTicket, TicketPriority, TicketStatus,
};
use crate::models::user::Capability;
use crate::responses::JsonResponse;
use crate::routes::{engine_error_response, require, session::Actor};
use crate::sla::evaluator;
use crate::state::AppState;

pub async fn create_ticket(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(payload): Json<CreateTicket>,
) -> Response {
    if let Err(resp) = require(&actor, Capability::CreateTickets) {
        return resp;
    }

    match state
        .engine
        .create_ticket(&actor, payload, OffsetDateTime::now_utc())
        .await
    {
        Ok(ticket) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "ticket": ticket })),
        )
            .into_response(),
        Err(err) => engine_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<ListTicketsQuery>,
) -> Response {
    let status = match query.status.as_deref().map(TicketStatus::parse) {
        Some(None) => return JsonResponse::bad_request("Invalid status filter").into_response(),
        other => other.flatten(),
    };
    let priority = match query.priority.as_deref().map(TicketPriority::parse) {
        Some(None) => return JsonResponse::bad_request("Invalid priority filter").into_response(),
        other => other.flatten(),
    };

    let filter = TicketFilter {
        created_by: query.created_by,
        assigned_to: query.assigned_to,
        status,
        priority,
    };

    match state.engine.list_tickets(&actor, filter).await {
        Ok(tickets) => {
            Json(json!({ "success": true, "tickets": tickets })).into_response()
        }
        Err(err) => engine_error_response(err),
    }
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(ticket_id): Path<Uuid>,
) -> Response {
    match state.engine.get_ticket(&actor, ticket_id).await {
        Ok((ticket, comments)) => Json(json!({
            "success": true,
            "ticket": ticket,
            "comments": comments,
        }))
        .into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub async fn add_comment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<CreateComment>,
) -> Response {
    match state
        .engine
        .add_comment(&actor, ticket_id, payload, OffsetDateTime::now_utc())
        .await
    {
        Ok((ticket, comment)) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "ticket": ticket, "comment": comment })),
        )
            .into_response(),
        Err(err) => engine_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatus {
    pub status: String,
}

pub async fn change_status(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<ChangeStatus>,
) -> Response {
    if let Err(resp) = require(&actor, Capability::UpdateTickets) {
        return resp;
    }

    match state
        .engine
        .change_status(&actor, ticket_id, &payload.status, OffsetDateTime::now_utc())
        .await
    {
        Ok(ticket) => Json(json!({ "success": true, "ticket": ticket })).into_response(),
        Err(err) => engine_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePriority {
    pub priority: String,
}

pub async fn change_priority(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<ChangePriority>,
) -> Response {
    if let Err(resp) = require(&actor, Capability::UpdateTickets) {
        return resp;
    }

    match state
        .engine
        .change_priority(
            &actor,
            ticket_id,
            &payload.priority,
            OffsetDateTime::now_utc(),
        )
        .await
    {
        Ok(ticket) => Json(json!({ "success": true, "ticket": ticket })).into_response(),
        Err(err) => engine_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignTicket {
    pub assigned_to: Option<Uuid>,
}

pub async fn assign_ticket(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<AssignTicket>,
) -> Response {
    // Agents may pull tickets onto their own queue; reassigning anyone else
    // needs the full assignment capability.
    let capability = if payload.assigned_to == Some(actor.id) {
        Capability::SelfAssign
    } else {
        Capability::AssignTickets
    };
    if let Err(resp) = require(&actor, capability) {
        return resp;
    }

    match state
        .engine
        .assign(
            &actor,
            ticket_id,
            payload.assigned_to,
            OffsetDateTime::now_utc(),
        )
        .await
    {
        Ok(ticket) => Json(json!({ "success": true, "ticket": ticket })).into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub async fn rate_ticket(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(ticket_id): Path<Uuid>,
    Json(payload): Json<RateTicket>,
) -> Response {
    match state
        .engine
        .rate(&actor, ticket_id, payload, OffsetDateTime::now_utc())
        .await
    {
        Ok(ticket) => Json(json!({ "success": true, "ticket": ticket })).into_response(),
        Err(err) => engine_error_response(err),
    }
}

/// Read-only SLA panel for a single ticket: state plus countdown.
pub async fn ticket_sla(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(ticket_id): Path<Uuid>,
) -> Response {
    let now = OffsetDateTime::now_utc();
    match state.engine.get_ticket(&actor, ticket_id).await {
        Ok((ticket, _)) => Json(json!({
            "success": true,
            "sla_status": evaluator::sla_state(&ticket, now),
            "time_remaining": evaluator::time_remaining(&ticket, now),
            "sla_due_date": ticket.sla_due_date,
            "sla_breached": ticket.sla_breached,
        }))
        .into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub async fn ticket_suggestions(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(ticket_id): Path<Uuid>,
) -> Response {
    if let Err(resp) = require(&actor, Capability::UpdateTickets) {
        return resp;
    }

    let (ticket, comments) = match state.engine.get_ticket(&actor, ticket_id).await {
        Ok(found) => found,
        Err(err) => return engine_error_response(err),
    };

    if !state.assist.is_available() {
        return Json(json!({ "success": true, "available": false, "suggestions": [] }))
            .into_response();
    }

    match state.assist.suggest(&ticket, &comments).await {
        Ok(suggestions) => Json(json!({
            "success": true,
            "available": true,
            "suggestions": suggestions,
        }))
        .into_response(),
        Err(err) => {
            tracing::error!(ticket_number = %ticket.ticket_number, error = %err,
                            "assist suggestion failed");
            JsonResponse::server_error("Suggestion service failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Json, Path, State};
    use axum::http::StatusCode;
    use uuid::Uuid;

    use super::*;
    use crate::db::mock_db::MockDb;
    use crate::models::user::{User, UserRole};

    fn seeded() -> (Arc<MockDb>, AppState, User, User) {
        let db = Arc::new(MockDb::default());
        let customer = User {
            id: Uuid::new_v4(),
            email: "c@example.com".into(),
            first_name: "Cara".into(),
            last_name: "Customer".into(),
            role: UserRole::Customer,
            is_active: true,
        };
        let agent = User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Agent".into(),
            role: UserRole::SupportAgent,
            is_active: true,
        };
        db.seed_user(customer.clone());
        db.seed_user(agent.clone());
        let state = AppState::for_tests(db.clone());
        (db, state, customer, agent)
    }

    #[tokio::test]
    async fn create_ticket_returns_created() {
        let (_, state, customer, _) = seeded();
        let resp = create_ticket(
            State(state),
            Actor(customer),
            Json(CreateTicket {
                title: "broken laptop".into(),
                description: "blue screen".into(),
                priority: Some("high".into()),
                category_id: None,
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn customer_cannot_change_status() {
        let (_, state, customer, _) = seeded();
        let resp = change_status(
            State(state),
            Actor(customer),
            Path(Uuid::new_v4()),
            Json(ChangeStatus {
                status: "closed".into(),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn agent_can_self_assign_but_not_assign_others() {
        let (_, state, customer, agent) = seeded();
        let created = create_ticket(
            State(state.clone()),
            Actor(customer.clone()),
            Json(CreateTicket {
                title: "t".into(),
                description: "d".into(),
                priority: None,
                category_id: None,
            }),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let body = axum::body::to_bytes(created.into_body(), 64 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let ticket_id: Uuid =
            serde_json::from_value(json["ticket"]["id"].clone()).unwrap();

        let to_self = assign_ticket(
            State(state.clone()),
            Actor(agent.clone()),
            Path(ticket_id),
            Json(AssignTicket {
                assigned_to: Some(agent.id),
            }),
        )
        .await;
        assert_eq!(to_self.status(), StatusCode::OK);

        let to_other = assign_ticket(
            State(state),
            Actor(agent),
            Path(ticket_id),
            Json(AssignTicket {
                assigned_to: Some(customer.id),
            }),
        )
        .await;
        assert_eq!(to_other.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn database_failure_maps_to_internal_error() {
        let db = Arc::new(MockDb {
            should_fail: true,
            ..Default::default()
        });
        let state = AppState::for_tests(db);
        let customer = User {
            id: Uuid::new_v4(),
            email: "c@example.com".into(),
            first_name: "Cara".into(),
            last_name: "Customer".into(),
            role: UserRole::Customer,
            is_active: true,
        };

        let resp = list_tickets(
            State(state),
            Actor(customer),
            axum::extract::Query(ListTicketsQuery {
                status: None,
                priority: None,
                assigned_to: None,
                created_by: None,
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn invalid_status_filter_is_bad_request() {
        let (_, state, customer, _) = seeded();
        let resp = list_tickets(
            State(state),
            Actor(customer),
            axum::extract::Query(ListTicketsQuery {
                status: Some("bogus".into()),
                priority: None,
                assigned_to: None,
                created_by: None,
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn suggestions_report_unavailable_without_api_key() {
        let (_, state, customer, agent) = seeded();
        let created = create_ticket(
            State(state.clone()),
            Actor(customer),
            Json(CreateTicket {
                title: "t".into(),
                description: "d".into(),
                priority: None,
                category_id: None,
            }),
        )
        .await;
        let body = axum::body::to_bytes(created.into_body(), 64 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let ticket_id: Uuid =
            serde_json::from_value(json["ticket"]["id"].clone()).unwrap();

        let resp = ticket_suggestions(State(state), Actor(agent), Path(ticket_id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 64 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["available"], serde_json::json!(false));
    }
}
