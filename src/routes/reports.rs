use axum::{
    extract::{Json, Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::user::Capability;
use crate::responses::JsonResponse;
use crate::routes::{engine_error_response, require, session::Actor};
use crate::state::AppState;

const DEFAULT_WINDOW_DAYS: i64 = 30;
const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub days: Option<i64>,
}

fn window_days(query: &ReportQuery) -> Result<i64, Response> {
    let days = query.days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if (1..=MAX_WINDOW_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(JsonResponse::bad_request("days must be between 1 and 365").into_response())
    }
}

pub async fn global_sla_report(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<ReportQuery>,
) -> Response {
    if let Err(resp) = require(&actor, Capability::ViewReports) {
        return resp;
    }
    let days = match window_days(&query) {
        Ok(days) => days,
        Err(resp) => return resp,
    };

    match state
        .engine
        .global_metrics(days, OffsetDateTime::now_utc())
        .await
    {
        Ok(report) => Json(json!({
            "success": true,
            "window_days": days,
            "metrics": report,
        }))
        .into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub async fn agent_sla_report(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(agent_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Response {
    if let Err(resp) = require(&actor, Capability::ViewReports) {
        return resp;
    }
    let days = match window_days(&query) {
        Ok(days) => days,
        Err(resp) => return resp,
    };

    match state
        .engine
        .agent_metrics(agent_id, days, OffsetDateTime::now_utc())
        .await
    {
        // No resolved tickets in the window is a distinct signal, not a
        // zero-filled report.
        Ok(None) => {
            JsonResponse::not_found("No resolved tickets for this agent in the window")
                .into_response()
        }
        Ok(Some(report)) => Json(json!({
            "success": true,
            "agent_id": agent_id,
            "window_days": days,
            "metrics": report,
        }))
        .into_response(),
        Err(err) => engine_error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use super::*;
    use crate::db::mock_db::MockDb;
    use crate::models::user::{User, UserRole};

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "u@example.com".into(),
            first_name: "U".into(),
            last_name: "Ser".into(),
            role,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn reports_are_gated_on_the_reports_capability() {
        let state = AppState::for_tests(Arc::new(MockDb::default()));
        let resp = global_sla_report(
            State(state),
            Actor(user(UserRole::SupportAgent)),
            Query(ReportQuery { days: None }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn empty_agent_window_is_not_found() {
        let state = AppState::for_tests(Arc::new(MockDb::default()));
        let resp = agent_sla_report(
            State(state),
            Actor(user(UserRole::TeamLeader)),
            Path(Uuid::new_v4()),
            Query(ReportQuery { days: Some(30) }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_window_is_rejected() {
        let state = AppState::for_tests(Arc::new(MockDb::default()));
        let resp = global_sla_report(
            State(state),
            Actor(user(UserRole::Admin)),
            Query(ReportQuery { days: Some(4000) }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
