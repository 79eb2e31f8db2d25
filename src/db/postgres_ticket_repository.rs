use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::ticket_repository::{NewComment, NewTicket, TicketFilter, TicketRepository};
use crate::models::category::Category;
use crate::models::ticket::{Ticket, TicketComment, TicketPriority, TicketStatus};

const TICKET_COLUMNS: &str = r#"
    id, ticket_number, title, description, status, priority, category_id,
    created_by, assigned_to, created_at, updated_at, first_response_at,
    resolved_at, closed_at, sla_due_date, sla_breached, rating, feedback
"#;

pub struct PostgresTicketRepository {
    pub pool: PgPool,
}

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn insert_ticket(&self, new: NewTicket) -> Result<Ticket, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tickets
                (ticket_number, title, description, status, priority, category_id,
                 created_by, sla_due_date, created_at, updated_at)
            VALUES ($1, $2, $3, 'open', $4, $5, $6, $7, $8, $8)
            RETURNING {TICKET_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Ticket>(&query)
            .bind(&new.ticket_number)
            .bind(&new.title)
            .bind(&new.description)
            .bind(new.priority)
            .bind(new.category_id)
            .bind(new.created_by)
            .bind(new.sla_due_date)
            .bind(new.created_at)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");

        sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn ticket_number_exists(&self, number: &str) -> Result<bool, sqlx::Error> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM tickets WHERE ticket_number = $1)")
                .bind(number)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.0)
    }

    async fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM tickets
            WHERE ($1::uuid IS NULL OR created_by = $1)
              AND ($2::uuid IS NULL OR assigned_to = $2)
              AND ($3::ticket_status IS NULL OR status = $3)
              AND ($4::ticket_priority IS NULL OR priority = $4)
            ORDER BY created_at DESC
            "#
        );

        sqlx::query_as::<_, Ticket>(&query)
            .bind(filter.created_by)
            .bind(filter.assigned_to)
            .bind(filter.status)
            .bind(filter.priority)
            .fetch_all(&self.pool)
            .await
    }

    async fn insert_comment(
        &self,
        new: NewComment,
        stamp_first_response: bool,
        auto_progress: bool,
    ) -> Result<(Ticket, TicketComment), sqlx::Error> {
        // Comment row and every ticket side effect commit together; no
        // reader sees the comment without its timestamp or status change.
        let mut tx = self.pool.begin().await?;

        let comment = sqlx::query_as::<_, TicketComment>(
            r#"
            INSERT INTO ticket_comments (ticket_id, author_id, content, is_internal, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, ticket_id, author_id, content, is_internal, created_at
            "#,
        )
        .bind(new.ticket_id)
        .bind(new.author_id)
        .bind(&new.content)
        .bind(new.is_internal)
        .bind(new.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let query = format!(
            r#"
            UPDATE tickets
            SET updated_at = $2,
                first_response_at = CASE WHEN $3
                                         THEN COALESCE(first_response_at, $2)
                                         ELSE first_response_at END,
                status = CASE WHEN $4 AND status = 'open'::ticket_status
                              THEN 'in_progress'::ticket_status ELSE status END
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        );
        let ticket = sqlx::query_as::<_, Ticket>(&query)
            .bind(new.ticket_id)
            .bind(new.created_at)
            .bind(stamp_first_response)
            .bind(auto_progress)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((ticket, comment))
    }

    async fn list_comments(
        &self,
        ticket_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<TicketComment>, sqlx::Error> {
        sqlx::query_as::<_, TicketComment>(
            r#"
            SELECT id, ticket_id, author_id, content, is_internal, created_at
            FROM ticket_comments
            WHERE ticket_id = $1 AND ($2 OR is_internal = FALSE)
            ORDER BY created_at ASC
            "#,
        )
        .bind(ticket_id)
        .bind(include_internal)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tickets
            SET status = $2,
                resolved_at = CASE WHEN $2 = 'resolved'::ticket_status
                                   THEN COALESCE(resolved_at, $3) ELSE resolved_at END,
                closed_at = CASE WHEN $2 = 'closed'::ticket_status
                                 THEN COALESCE(closed_at, $3) ELSE closed_at END,
                updated_at = $3
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_id)
            .bind(status)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_priority(
        &self,
        ticket_id: Uuid,
        priority: TicketPriority,
        sla_due_date: OffsetDateTime,
        sla_breached: bool,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tickets
            SET priority = $2, sla_due_date = $3, sla_breached = $4, updated_at = $5
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_id)
            .bind(priority)
            .bind(sla_due_date)
            .bind(sla_breached)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_assignee(
        &self,
        ticket_id: Uuid,
        assignee: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tickets
            SET assigned_to = $2, updated_at = $3
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_id)
            .bind(assignee)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    async fn record_rating(
        &self,
        ticket_id: Uuid,
        rating: i32,
        feedback: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tickets
            SET rating = $2, feedback = $3, updated_at = $4
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Ticket>(&query)
            .bind(ticket_id)
            .bind(rating)
            .bind(feedback)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    async fn mark_breached_due(&self, now: OffsetDateTime) -> Result<Vec<Ticket>, sqlx::Error> {
        // Single conditional UPDATE: concurrent sweeps and in-flight ticket
        // mutations each win exactly once per row.
        let query = format!(
            r#"
            UPDATE tickets
            SET sla_breached = TRUE, updated_at = $1
            WHERE sla_due_date <= $1
              AND status NOT IN ('resolved'::ticket_status, 'closed'::ticket_status)
              AND sla_breached = FALSE
            RETURNING {TICKET_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Ticket>(&query)
            .bind(now)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_resolved_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        assignee: Option<Uuid>,
    ) -> Result<Vec<Ticket>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM tickets
            WHERE resolved_at >= $1
              AND resolved_at <= $2
              AND ($3::uuid IS NULL OR assigned_to = $3)
            ORDER BY resolved_at ASC
            "#
        );

        sqlx::query_as::<_, Ticket>(&query)
            .bind(start)
            .bind(end)
            .bind(assignee)
            .fetch_all(&self.pool)
            .await
    }

    async fn insert_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, is_active, created_at)
            VALUES ($1, $2, TRUE, now())
            RETURNING id, name, description, is_active, created_at
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, is_active, created_at
            FROM categories
            WHERE is_active = TRUE
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn category_exists(&self, category_id: Uuid) -> Result<bool, sqlx::Error> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND is_active = TRUE)",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }
}
