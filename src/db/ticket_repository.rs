use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::category::Category;
use crate::models::ticket::{Ticket, TicketComment, TicketPriority, TicketStatus};

/// Fully-specified ticket row ready for insertion; the engine owns number
/// generation and due-date computation before this reaches storage.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub category_id: Option<Uuid>,
    pub created_by: Uuid,
    pub sla_due_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub is_internal: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub created_by: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn insert_ticket(&self, new: NewTicket) -> Result<Ticket, sqlx::Error>;

    async fn find_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error>;

    async fn ticket_number_exists(&self, number: &str) -> Result<bool, sqlx::Error>;

    async fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>, sqlx::Error>;

    /// Writes the comment and its ticket side effects in one transaction:
    /// `updated_at` always moves; `stamp_first_response` sets
    /// `first_response_at` if and only if it is still null; `auto_progress`
    /// moves an `open` ticket to `in_progress`. A reader never observes the
    /// comment without its side effects. Returns the updated ticket row.
    async fn insert_comment(
        &self,
        new: NewComment,
        stamp_first_response: bool,
        auto_progress: bool,
    ) -> Result<(Ticket, TicketComment), sqlx::Error>;

    async fn list_comments(
        &self,
        ticket_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<TicketComment>, sqlx::Error>;

    /// Applies a status change and its timestamp side effects in one
    /// statement: `resolved_at`/`closed_at` are only written on first entry.
    async fn update_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error>;

    /// Writes the new priority together with its recomputed due date and
    /// breach flag, atomically.
    async fn update_priority(
        &self,
        ticket_id: Uuid,
        priority: TicketPriority,
        sla_due_date: OffsetDateTime,
        sla_breached: bool,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error>;

    async fn update_assignee(
        &self,
        ticket_id: Uuid,
        assignee: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error>;

    async fn record_rating(
        &self,
        ticket_id: Uuid,
        rating: i32,
        feedback: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error>;

    /// Compare-and-set breach sweep: flags every overdue, non-terminal,
    /// not-yet-breached ticket and returns the rows this call flagged.
    /// Concurrent sweeps each observe a disjoint set.
    async fn mark_breached_due(&self, now: OffsetDateTime) -> Result<Vec<Ticket>, sqlx::Error>;

    async fn list_resolved_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        assignee: Option<Uuid>,
    ) -> Result<Vec<Ticket>, sqlx::Error>;

    async fn insert_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, sqlx::Error>;

    async fn list_categories(&self) -> Result<Vec<Category>, sqlx::Error>;

    async fn category_exists(&self, category_id: Uuid) -> Result<bool, sqlx::Error>;
}
