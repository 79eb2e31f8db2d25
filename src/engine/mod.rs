pub mod error;

use std::sync::Arc;

use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::ticket_repository::{NewComment, NewTicket, TicketFilter, TicketRepository};
use crate::db::user_repository::UserRepository;
use crate::models::ticket::{
    CreateComment, CreateTicket, RateTicket, Ticket, TicketComment, TicketPriority, TicketStatus,
};
use crate::models::user::{Capability, User};
use crate::services::notifier::TicketNotifier;
use crate::sla::{evaluator, metrics, policy};

pub use error::EngineError;

const TICKET_NUMBER_ATTEMPTS: usize = 20;

/// The ticket lifecycle engine. Pure function of its explicit inputs
/// (actor, payload, `now`) plus the repositories: no ambient user context,
/// no wall-clock reads inside the core paths.
pub struct TicketEngine {
    tickets: Arc<dyn TicketRepository>,
    users: Arc<dyn UserRepository>,
    notifier: Arc<dyn TicketNotifier>,
    /// Policy hook: staff reply on an `open` ticket moves it to `in_progress`.
    auto_progress_on_staff_reply: bool,
}

impl TicketEngine {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn TicketNotifier>,
        auto_progress_on_staff_reply: bool,
    ) -> Self {
        Self {
            tickets,
            users,
            notifier,
            auto_progress_on_staff_reply,
        }
    }

    pub async fn create_ticket(
        &self,
        actor: &User,
        payload: CreateTicket,
        now: OffsetDateTime,
    ) -> Result<Ticket, EngineError> {
        let title = payload.title.trim();
        let description = payload.description.trim();
        if title.is_empty() {
            return Err(EngineError::validation("title must not be empty"));
        }
        if description.is_empty() {
            return Err(EngineError::validation("description must not be empty"));
        }

        let priority = match payload.priority.as_deref() {
            Some(raw) => {
                let (priority, fell_back) = policy::resolve_priority(raw);
                if fell_back {
                    // Fail-soft by contract, but operators need to see it.
                    warn!(raw, "unknown ticket priority, defaulting to medium");
                }
                priority
            }
            None => TicketPriority::Medium,
        };

        if let Some(category_id) = payload.category_id {
            if !self.tickets.category_exists(category_id).await? {
                return Err(EngineError::validation("unknown category"));
            }
        }

        let ticket_number = self.generate_ticket_number(now).await?;
        let ticket = self
            .tickets
            .insert_ticket(NewTicket {
                ticket_number,
                title: title.to_owned(),
                description: description.to_owned(),
                priority,
                category_id: payload.category_id,
                created_by: actor.id,
                sla_due_date: evaluator::due_date(now, priority),
                created_at: now,
            })
            .await?;

        self.notifier.ticket_created(&ticket);
        Ok(ticket)
    }

    pub async fn add_comment(
        &self,
        actor: &User,
        ticket_id: Uuid,
        payload: CreateComment,
        now: OffsetDateTime,
    ) -> Result<(Ticket, TicketComment), EngineError> {
        if payload.content.trim().is_empty() {
            return Err(EngineError::validation("comment must not be empty"));
        }
        if payload.is_internal && !actor.role.is_staff() {
            return Err(EngineError::forbidden("internal notes are staff-only"));
        }
        if !actor.role.is_staff() && !actor.role.can(Capability::CommentOwnTickets) {
            return Err(EngineError::forbidden("commenting not permitted for this role"));
        }

        let ticket = self.load_ticket(ticket_id).await?;
        ensure_ticket_access(actor, &ticket)?;

        // First externally-visible staff reply stamps the response time;
        // both side effects commit in the same transaction as the comment.
        let stamp_first_response = actor.role.is_staff() && !payload.is_internal;
        let auto_progress = self.auto_progress_on_staff_reply && actor.role.is_staff();

        let (ticket, comment) = self
            .tickets
            .insert_comment(
                NewComment {
                    ticket_id,
                    author_id: actor.id,
                    content: payload.content,
                    is_internal: payload.is_internal,
                    created_at: now,
                },
                stamp_first_response,
                auto_progress,
            )
            .await?;

        self.notifier.comment_added(&ticket, &comment);
        Ok((ticket, comment))
    }

    pub async fn change_status(
        &self,
        actor: &User,
        ticket_id: Uuid,
        raw_status: &str,
        now: OffsetDateTime,
    ) -> Result<Ticket, EngineError> {
        let status = TicketStatus::parse(raw_status)
            .ok_or_else(|| EngineError::validation(format!("invalid status: {raw_status}")))?;

        let ticket = self.load_ticket(ticket_id).await?;
        ensure_ticket_access(actor, &ticket)?;
        let previous = ticket.status;

        let updated = self
            .tickets
            .update_status(ticket_id, status, now)
            .await?
            .ok_or_else(|| EngineError::not_found("ticket not found"))?;

        if previous != updated.status {
            self.notifier.status_changed(&updated, previous);
        }
        Ok(updated)
    }

    pub async fn change_priority(
        &self,
        actor: &User,
        ticket_id: Uuid,
        raw_priority: &str,
        now: OffsetDateTime,
    ) -> Result<Ticket, EngineError> {
        let priority = TicketPriority::parse(raw_priority)
            .ok_or_else(|| EngineError::validation(format!("invalid priority: {raw_priority}")))?;

        let ticket = self.load_ticket(ticket_id).await?;
        ensure_ticket_access(actor, &ticket)?;

        // Due date always derives from creation time, never from the change
        // time; the breach flag follows the new due date against `now`.
        let sla_due_date = evaluator::due_date(ticket.created_at, priority);
        let sla_breached = sla_due_date <= now;

        self.tickets
            .update_priority(ticket_id, priority, sla_due_date, sla_breached, now)
            .await?
            .ok_or_else(|| EngineError::not_found("ticket not found"))
    }

    pub async fn assign(
        &self,
        actor: &User,
        ticket_id: Uuid,
        assignee: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<Ticket, EngineError> {
        let ticket = self.load_ticket(ticket_id).await?;
        ensure_ticket_access(actor, &ticket)?;

        if let Some(agent_id) = assignee {
            let agent = self
                .users
                .find_user_by_id(agent_id)
                .await?
                .ok_or_else(|| EngineError::not_found("agent not found"))?;
            if !agent.role.is_staff() {
                return Err(EngineError::validation("assignee must be a staff member"));
            }
        }

        self.tickets
            .update_assignee(ticket_id, assignee, now)
            .await?
            .ok_or_else(|| EngineError::not_found("ticket not found"))
    }

    pub async fn rate(
        &self,
        actor: &User,
        ticket_id: Uuid,
        payload: RateTicket,
        now: OffsetDateTime,
    ) -> Result<Ticket, EngineError> {
        if !(1..=5).contains(&payload.rating) {
            return Err(EngineError::validation("rating must be between 1 and 5"));
        }

        let ticket = self.load_ticket(ticket_id).await?;
        if ticket.created_by != actor.id {
            return Err(EngineError::validation(
                "only the ticket creator may rate it",
            ));
        }
        if !ticket.status.is_terminal() {
            return Err(EngineError::validation(
                "ticket must be resolved or closed before rating",
            ));
        }

        self.tickets
            .record_rating(ticket_id, payload.rating, payload.feedback.as_deref(), now)
            .await?
            .ok_or_else(|| EngineError::not_found("ticket not found"))
    }

    /// Sweeps every overdue open ticket and records new breaches. The
    /// repository does the flagging as one conditional update, so the sweep
    /// is idempotent and safe to run alongside live ticket mutation.
    pub async fn run_breach_scan(&self, now: OffsetDateTime) -> Result<u64, EngineError> {
        let flagged = self.tickets.mark_breached_due(now).await?;

        for ticket in &flagged {
            warn!(
                ticket_number = %ticket.ticket_number,
                priority = %ticket.priority,
                due_date = ?ticket.sla_due_date,
                assigned_to = ?ticket.assigned_to,
                "SLA breach detected"
            );
            self.notifier.sla_breached(ticket);
        }

        if !flagged.is_empty() {
            info!(count = flagged.len(), "SLA breach scan flagged tickets");
        }
        Ok(flagged.len() as u64)
    }

    pub async fn global_metrics(
        &self,
        days: i64,
        now: OffsetDateTime,
    ) -> Result<metrics::SlaReport, EngineError> {
        let tickets = self
            .tickets
            .list_resolved_between(now - Duration::days(days), now, None)
            .await?;
        Ok(metrics::aggregate(&tickets).unwrap_or_else(metrics::SlaReport::empty))
    }

    /// `None` means no tickets resolved by this agent in the window, which
    /// callers must not conflate with full compliance on zero tickets.
    pub async fn agent_metrics(
        &self,
        agent_id: Uuid,
        days: i64,
        now: OffsetDateTime,
    ) -> Result<Option<metrics::SlaReport>, EngineError> {
        let tickets = self
            .tickets
            .list_resolved_between(now - Duration::days(days), now, Some(agent_id))
            .await?;
        Ok(metrics::aggregate(&tickets))
    }

    pub async fn get_ticket(
        &self,
        actor: &User,
        ticket_id: Uuid,
    ) -> Result<(Ticket, Vec<TicketComment>), EngineError> {
        let ticket = self.load_ticket(ticket_id).await?;
        ensure_ticket_access(actor, &ticket)?;
        let comments = self
            .tickets
            .list_comments(ticket_id, actor.role.is_staff())
            .await?;
        Ok((ticket, comments))
    }

    /// Listing scoped by the capability table: full visibility, the actor's
    /// assignment queue, or the actor's own tickets.
    pub async fn list_tickets(
        &self,
        actor: &User,
        mut filter: TicketFilter,
    ) -> Result<Vec<Ticket>, EngineError> {
        if !actor.role.can(Capability::ViewAllTickets) {
            if actor.role.can(Capability::ViewAssignedTickets) {
                filter.assigned_to = Some(actor.id);
            } else {
                filter.created_by = Some(actor.id);
            }
        }
        Ok(self.tickets.list_tickets(filter).await?)
    }

    async fn load_ticket(&self, ticket_id: Uuid) -> Result<Ticket, EngineError> {
        self.tickets
            .find_ticket(ticket_id)
            .await?
            .ok_or_else(|| EngineError::not_found("ticket not found"))
    }

    async fn generate_ticket_number(&self, now: OffsetDateTime) -> Result<String, EngineError> {
        for _ in 0..TICKET_NUMBER_ATTEMPTS {
            let number = format!(
                "TK-{}-{:05}",
                now.year(),
                rand::rng().random_range(10000..=99999)
            );
            if !self.tickets.ticket_number_exists(&number).await? {
                return Ok(number);
            }
        }
        Err(EngineError::conflict(
            "could not allocate a unique ticket number",
        ))
    }
}

/// Boundary guard: staff may touch any ticket; everyone else needs the
/// own-ticket capability and must be the creator.
pub fn ensure_ticket_access(actor: &User, ticket: &Ticket) -> Result<(), EngineError> {
    let owns = ticket.created_by == actor.id && actor.role.can(Capability::ViewOwnTickets);
    if actor.role.is_staff() || owns {
        Ok(())
    } else {
        Err(EngineError::forbidden("no access to this ticket"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::MockDb;
    use crate::models::user::UserRole;
    use crate::services::notifier::NoopNotifier;
    use time::macros::datetime;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{role}@example.com"),
            first_name: "Test".into(),
            last_name: "User".into(),
            role,
            is_active: true,
        }
    }

    fn setup(auto_progress: bool) -> (Arc<MockDb>, TicketEngine) {
        let db = Arc::new(MockDb::default());
        let engine = TicketEngine::new(
            db.clone(),
            db.clone(),
            Arc::new(NoopNotifier),
            auto_progress,
        );
        (db, engine)
    }

    fn t0() -> OffsetDateTime {
        datetime!(2026-04-01 09:00 UTC)
    }

    async fn create(
        engine: &TicketEngine,
        creator: &User,
        priority: &str,
        now: OffsetDateTime,
    ) -> Ticket {
        engine
            .create_ticket(
                creator,
                CreateTicket {
                    title: "VPN down".into(),
                    description: "cannot connect since this morning".into(),
                    priority: Some(priority.into()),
                    category_id: None,
                },
                now,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_sets_open_status_and_priority_due_date() {
        let (_, engine) = setup(true);
        let customer = user(UserRole::Customer);

        let ticket = create(&engine, &customer, "critical", t0()).await;
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::Critical);
        assert_eq!(ticket.sla_due_date, Some(t0() + Duration::hours(4)));
        assert!(!ticket.sla_breached);
        assert!(ticket.ticket_number.starts_with("TK-2026-"));
    }

    #[tokio::test]
    async fn create_with_unknown_priority_falls_back_to_medium() {
        let (_, engine) = setup(true);
        let customer = user(UserRole::Customer);

        let ticket = create(&engine, &customer, "urgent", t0()).await;
        assert_eq!(ticket.priority, TicketPriority::Medium);
        assert_eq!(ticket.sla_due_date, Some(t0() + Duration::hours(72)));
    }

    #[tokio::test]
    async fn create_rejects_empty_title() {
        let (_, engine) = setup(true);
        let customer = user(UserRole::Customer);

        let result = engine
            .create_ticket(
                &customer,
                CreateTicket {
                    title: "   ".into(),
                    description: "desc".into(),
                    priority: None,
                    category_id: None,
                },
                t0(),
            )
            .await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn staff_reply_stamps_first_response_exactly_once() {
        let (db, engine) = setup(false);
        let customer = user(UserRole::Customer);
        let agent = user(UserRole::SupportAgent);
        let ticket = create(&engine, &customer, "high", t0()).await;

        let first = t0() + Duration::hours(1);
        engine
            .add_comment(
                &agent,
                ticket.id,
                CreateComment {
                    content: "looking into it".into(),
                    is_internal: false,
                },
                first,
            )
            .await
            .unwrap();
        assert_eq!(db.ticket(ticket.id).unwrap().first_response_at, Some(first));

        // A later staff reply must not move the stamp.
        engine
            .add_comment(
                &agent,
                ticket.id,
                CreateComment {
                    content: "fixed".into(),
                    is_internal: false,
                },
                t0() + Duration::hours(3),
            )
            .await
            .unwrap();
        assert_eq!(db.ticket(ticket.id).unwrap().first_response_at, Some(first));
    }

    #[tokio::test]
    async fn internal_note_and_customer_reply_do_not_stamp_first_response() {
        let (db, engine) = setup(false);
        let customer = user(UserRole::Customer);
        let agent = user(UserRole::SupportAgent);
        let ticket = create(&engine, &customer, "high", t0()).await;

        engine
            .add_comment(
                &agent,
                ticket.id,
                CreateComment {
                    content: "internal triage note".into(),
                    is_internal: true,
                },
                t0() + Duration::hours(1),
            )
            .await
            .unwrap();
        engine
            .add_comment(
                &customer,
                ticket.id,
                CreateComment {
                    content: "any update?".into(),
                    is_internal: false,
                },
                t0() + Duration::hours(2),
            )
            .await
            .unwrap();

        assert_eq!(db.ticket(ticket.id).unwrap().first_response_at, None);
    }

    #[tokio::test]
    async fn customer_cannot_write_internal_notes() {
        let (_, engine) = setup(false);
        let customer = user(UserRole::Customer);
        let ticket = create(&engine, &customer, "low", t0()).await;

        let result = engine
            .add_comment(
                &customer,
                ticket.id,
                CreateComment {
                    content: "sneaky".into(),
                    is_internal: true,
                },
                t0(),
            )
            .await;
        assert!(matches!(result, Err(EngineError::Forbidden(_))));
    }

    #[tokio::test]
    async fn staff_reply_auto_progresses_open_ticket_when_enabled() {
        let (db, engine) = setup(true);
        let customer = user(UserRole::Customer);
        let agent = user(UserRole::SupportAgent);
        let ticket = create(&engine, &customer, "high", t0()).await;

        engine
            .add_comment(
                &agent,
                ticket.id,
                CreateComment {
                    content: "on it".into(),
                    is_internal: false,
                },
                t0() + Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(
            db.ticket(ticket.id).unwrap().status,
            TicketStatus::InProgress
        );
    }

    #[tokio::test]
    async fn auto_progress_disabled_leaves_status_alone() {
        let (db, engine) = setup(false);
        let customer = user(UserRole::Customer);
        let agent = user(UserRole::SupportAgent);
        let ticket = create(&engine, &customer, "high", t0()).await;

        engine
            .add_comment(
                &agent,
                ticket.id,
                CreateComment {
                    content: "on it".into(),
                    is_internal: false,
                },
                t0() + Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(db.ticket(ticket.id).unwrap().status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn resolving_twice_keeps_the_first_resolved_at() {
        let (db, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let customer = user(UserRole::Customer);
        let ticket = create(&engine, &customer, "medium", t0()).await;

        let first = t0() + Duration::hours(5);
        engine
            .change_status(&agent, ticket.id, "resolved", first)
            .await
            .unwrap();
        engine
            .change_status(&agent, ticket.id, "open", t0() + Duration::hours(6))
            .await
            .unwrap();
        engine
            .change_status(&agent, ticket.id, "resolved", t0() + Duration::hours(7))
            .await
            .unwrap();

        assert_eq!(db.ticket(ticket.id).unwrap().resolved_at, Some(first));
    }

    #[tokio::test]
    async fn closing_stamps_closed_at_once() {
        let (db, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let customer = user(UserRole::Customer);
        let ticket = create(&engine, &customer, "medium", t0()).await;

        let first = t0() + Duration::hours(2);
        engine
            .change_status(&agent, ticket.id, "closed", first)
            .await
            .unwrap();
        engine
            .change_status(&agent, ticket.id, "closed", t0() + Duration::hours(9))
            .await
            .unwrap();
        assert_eq!(db.ticket(ticket.id).unwrap().closed_at, Some(first));
    }

    #[tokio::test]
    async fn unknown_status_string_is_a_validation_error() {
        let (_, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let customer = user(UserRole::Customer);
        let ticket = create(&engine, &customer, "medium", t0()).await;

        let result = engine
            .change_status(&agent, ticket.id, "escalated", t0())
            .await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn priority_change_recomputes_due_date_from_creation_time() {
        let (_, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let customer = user(UserRole::Customer);
        let ticket = create(&engine, &customer, "low", t0()).await;
        assert_eq!(ticket.sla_due_date, Some(t0() + Duration::hours(168)));

        // At t0+1h the new critical window (due t0+4h) is still in the
        // future, so no breach.
        let updated = engine
            .change_priority(&agent, ticket.id, "critical", t0() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(updated.sla_due_date, Some(t0() + Duration::hours(4)));
        assert!(!updated.sla_breached);

        // Same change applied at t0+5h lands past the new window.
        let updated = engine
            .change_priority(&agent, ticket.id, "critical", t0() + Duration::hours(5))
            .await
            .unwrap();
        assert!(updated.sla_breached);
    }

    #[tokio::test]
    async fn priority_relaxation_clears_a_recorded_breach() {
        let (db, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let customer = user(UserRole::Customer);
        let ticket = create(&engine, &customer, "critical", t0()).await;

        assert_eq!(engine.run_breach_scan(t0() + Duration::hours(5)).await.unwrap(), 1);
        assert!(db.ticket(ticket.id).unwrap().sla_breached);

        // Moving to low pushes the due date to t0+168h, ahead of now.
        let updated = engine
            .change_priority(&agent, ticket.id, "low", t0() + Duration::hours(5))
            .await
            .unwrap();
        assert!(!updated.sla_breached);
        assert_eq!(updated.sla_due_date, Some(t0() + Duration::hours(168)));
    }

    #[tokio::test]
    async fn breach_scan_flags_once_and_is_idempotent() {
        let (db, engine) = setup(false);
        let customer = user(UserRole::Customer);
        let ticket = create(&engine, &customer, "critical", t0()).await;

        assert_eq!(engine.run_breach_scan(t0() + Duration::hours(5)).await.unwrap(), 1);
        assert!(db.ticket(ticket.id).unwrap().sla_breached);
        assert_eq!(engine.run_breach_scan(t0() + Duration::hours(6)).await.unwrap(), 0);
        assert!(db.ticket(ticket.id).unwrap().sla_breached);
    }

    #[tokio::test]
    async fn breach_scan_skips_resolved_and_future_tickets() {
        let (db, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let customer = user(UserRole::Customer);
        let overdue_but_resolved = create(&engine, &customer, "critical", t0()).await;
        let _still_in_window = create(&engine, &customer, "low", t0()).await;
        engine
            .change_status(&agent, overdue_but_resolved.id, "resolved", t0() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(engine.run_breach_scan(t0() + Duration::hours(5)).await.unwrap(), 0);
        assert!(!db.ticket(overdue_but_resolved.id).unwrap().sla_breached);
    }

    #[tokio::test]
    async fn rating_requires_terminal_status_and_creator() {
        let (db, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let customer = user(UserRole::Customer);
        let ticket = create(&engine, &customer, "medium", t0()).await;

        let open_attempt = engine
            .rate(
                &customer,
                ticket.id,
                RateTicket {
                    rating: 3,
                    feedback: Some("ok".into()),
                },
                t0(),
            )
            .await;
        assert!(matches!(open_attempt, Err(EngineError::Validation(_))));

        engine
            .change_status(&agent, ticket.id, "closed", t0() + Duration::hours(1))
            .await
            .unwrap();

        let by_agent = engine
            .rate(
                &agent,
                ticket.id,
                RateTicket {
                    rating: 3,
                    feedback: None,
                },
                t0() + Duration::hours(2),
            )
            .await;
        assert!(matches!(by_agent, Err(EngineError::Validation(_))));

        engine
            .rate(
                &customer,
                ticket.id,
                RateTicket {
                    rating: 3,
                    feedback: Some("ok".into()),
                },
                t0() + Duration::hours(2),
            )
            .await
            .unwrap();
        let stored = db.ticket(ticket.id).unwrap();
        assert_eq!(stored.rating, Some(3));
        assert_eq!(stored.feedback.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn rating_outside_one_to_five_is_rejected() {
        let (_, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let customer = user(UserRole::Customer);
        let ticket = create(&engine, &customer, "medium", t0()).await;
        engine
            .change_status(&agent, ticket.id, "resolved", t0())
            .await
            .unwrap();

        for rating in [0, 6, -1] {
            let result = engine
                .rate(
                    &customer,
                    ticket.id,
                    RateTicket {
                        rating,
                        feedback: None,
                    },
                    t0(),
                )
                .await;
            assert!(matches!(result, Err(EngineError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn assignment_requires_an_existing_staff_user() {
        let (db, engine) = setup(false);
        let leader = user(UserRole::TeamLeader);
        let agent = user(UserRole::SupportAgent);
        let customer = user(UserRole::Customer);
        db.seed_user(agent.clone());
        db.seed_user(customer.clone());
        let ticket = create(&engine, &customer, "medium", t0()).await;

        let missing = engine
            .assign(&leader, ticket.id, Some(Uuid::new_v4()), t0())
            .await;
        assert!(matches!(missing, Err(EngineError::NotFound(_))));

        let to_customer = engine
            .assign(&leader, ticket.id, Some(customer.id), t0())
            .await;
        assert!(matches!(to_customer, Err(EngineError::Validation(_))));

        let assigned = engine
            .assign(&leader, ticket.id, Some(agent.id), t0())
            .await
            .unwrap();
        assert_eq!(assigned.assigned_to, Some(agent.id));

        let unassigned = engine.assign(&leader, ticket.id, None, t0()).await.unwrap();
        assert_eq!(unassigned.assigned_to, None);
    }

    #[tokio::test]
    async fn customers_cannot_touch_other_peoples_tickets() {
        let (_, engine) = setup(false);
        let alice = user(UserRole::Customer);
        let mallory = user(UserRole::Customer);
        let ticket = create(&engine, &alice, "medium", t0()).await;

        let result = engine.get_ticket(&mallory, ticket.id).await;
        assert!(matches!(result, Err(EngineError::Forbidden(_))));

        let comment = engine
            .add_comment(
                &mallory,
                ticket.id,
                CreateComment {
                    content: "hi".into(),
                    is_internal: false,
                },
                t0(),
            )
            .await;
        assert!(matches!(comment, Err(EngineError::Forbidden(_))));
    }

    #[tokio::test]
    async fn customers_see_only_public_comments() {
        let (_, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let customer = user(UserRole::Customer);
        let ticket = create(&engine, &customer, "medium", t0()).await;

        engine
            .add_comment(
                &agent,
                ticket.id,
                CreateComment {
                    content: "internal".into(),
                    is_internal: true,
                },
                t0(),
            )
            .await
            .unwrap();
        engine
            .add_comment(
                &agent,
                ticket.id,
                CreateComment {
                    content: "public".into(),
                    is_internal: false,
                },
                t0(),
            )
            .await
            .unwrap();

        let (_, seen_by_customer) = engine.get_ticket(&customer, ticket.id).await.unwrap();
        assert_eq!(seen_by_customer.len(), 1);
        let (_, seen_by_agent) = engine.get_ticket(&agent, ticket.id).await.unwrap();
        assert_eq!(seen_by_agent.len(), 2);
    }

    #[tokio::test]
    async fn listing_is_scoped_by_role() {
        let (db, engine) = setup(false);
        let admin = user(UserRole::Admin);
        let agent = user(UserRole::SupportAgent);
        let leader = user(UserRole::TeamLeader);
        let alice = user(UserRole::Customer);
        let bob = user(UserRole::Customer);
        db.seed_user(agent.clone());
        let a = create(&engine, &alice, "medium", t0()).await;
        let _b = create(&engine, &bob, "medium", t0()).await;
        engine
            .assign(&leader, a.id, Some(agent.id), t0())
            .await
            .unwrap();

        assert_eq!(
            engine
                .list_tickets(&admin, TicketFilter::default())
                .await
                .unwrap()
                .len(),
            2
        );
        // Agents see their assignment queue, not every ticket.
        let agent_view = engine
            .list_tickets(&agent, TicketFilter::default())
            .await
            .unwrap();
        assert_eq!(agent_view.len(), 1);
        assert_eq!(agent_view[0].id, a.id);
        assert_eq!(
            engine
                .list_tickets(&alice, TicketFilter::default())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn repository_failure_surfaces_as_a_database_error() {
        let db = Arc::new(MockDb {
            should_fail: true,
            ..Default::default()
        });
        let engine = TicketEngine::new(db.clone(), db, Arc::new(NoopNotifier), false);
        let customer = user(UserRole::Customer);

        let result = engine
            .create_ticket(
                &customer,
                CreateTicket {
                    title: "t".into(),
                    description: "d".into(),
                    priority: None,
                    category_id: None,
                },
                t0(),
            )
            .await;
        assert!(matches!(result, Err(EngineError::Database(_))));
    }

    #[tokio::test]
    async fn metrics_flow_through_the_engine_window() {
        let (_, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let leader = user(UserRole::TeamLeader);
        let customer = user(UserRole::Customer);

        let ticket = create(&engine, &customer, "medium", t0()).await;
        engine
            .assign(&leader, ticket.id, None, t0())
            .await
            .ok();
        engine
            .change_status(&agent, ticket.id, "resolved", t0() + Duration::hours(10))
            .await
            .unwrap();

        let now = t0() + Duration::days(2);
        let report = engine.global_metrics(30, now).await.unwrap();
        assert_eq!(report.total_tickets, 1);
        assert_eq!(report.on_time, 1);
        assert_eq!(report.sla_compliance_rate, 100.0);
        assert_eq!(report.avg_resolution_hours, 10.0);

        // Window ends before the resolution: nothing counted.
        let stale = engine.global_metrics(30, t0() - Duration::days(60)).await.unwrap();
        assert_eq!(stale.total_tickets, 0);
        assert_eq!(stale.sla_compliance_rate, 0.0);
    }

    #[tokio::test]
    async fn agent_metrics_distinguish_no_data_from_zero_compliance() {
        let (db, engine) = setup(false);
        let agent = user(UserRole::SupportAgent);
        let leader = user(UserRole::TeamLeader);
        let customer = user(UserRole::Customer);
        db.seed_user(agent.clone());

        let idle_agent = engine
            .agent_metrics(agent.id, 30, t0())
            .await
            .unwrap();
        assert!(idle_agent.is_none());

        let ticket = create(&engine, &customer, "critical", t0()).await;
        engine
            .assign(&leader, ticket.id, Some(agent.id), t0())
            .await
            .unwrap();
        engine
            .change_status(&agent, ticket.id, "resolved", t0() + Duration::hours(10))
            .await
            .unwrap();

        let report = engine
            .agent_metrics(agent.id, 30, t0() + Duration::days(1))
            .await
            .unwrap()
            .expect("agent resolved a ticket in the window");
        // Resolved at +10h against a 4h window: breached.
        assert_eq!(report.breached, 1);
        assert_eq!(report.sla_compliance_rate, 0.0);
    }
}
