use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::ticket_repository::{NewComment, NewTicket, TicketFilter, TicketRepository};
use crate::db::user_repository::UserRepository;
use crate::models::category::Category;
use crate::models::ticket::{Ticket, TicketComment, TicketPriority, TicketStatus};
use crate::models::user::User;

/// In-memory stand-in for the Postgres repositories. Mirrors the conditional
/// write semantics of the real queries (first-write-wins timestamps, breach
/// compare-and-set) so engine tests exercise the same contract.
#[derive(Default)]
pub struct MockDb {
    pub tickets: Mutex<HashMap<Uuid, Ticket>>,
    pub comments: Mutex<Vec<TicketComment>>,
    pub categories: Mutex<Vec<Category>>,
    pub users: Mutex<HashMap<Uuid, User>>,
    pub should_fail: bool,
}

impl MockDb {
    fn guard(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }

    pub fn seed_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn seed_ticket(&self, ticket: Ticket) {
        self.tickets.lock().unwrap().insert(ticket.id, ticket);
    }

    pub fn ticket(&self, ticket_id: Uuid) -> Option<Ticket> {
        self.tickets.lock().unwrap().get(&ticket_id).cloned()
    }
}

#[async_trait]
impl TicketRepository for MockDb {
    async fn insert_ticket(&self, new: NewTicket) -> Result<Ticket, sqlx::Error> {
        self.guard()?;
        let ticket = Ticket {
            id: Uuid::new_v4(),
            ticket_number: new.ticket_number,
            title: new.title,
            description: new.description,
            status: TicketStatus::Open,
            priority: new.priority,
            category_id: new.category_id,
            created_by: new.created_by,
            assigned_to: None,
            created_at: new.created_at,
            updated_at: new.created_at,
            first_response_at: None,
            resolved_at: None,
            closed_at: None,
            sla_due_date: Some(new.sla_due_date),
            sla_breached: false,
            rating: None,
            feedback: None,
        };
        self.tickets
            .lock()
            .unwrap()
            .insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn find_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
        self.guard()?;
        Ok(self.ticket(ticket_id))
    }

    async fn ticket_number_exists(&self, number: &str) -> Result<bool, sqlx::Error> {
        self.guard()?;
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .values()
            .any(|t| t.ticket_number == number))
    }

    async fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>, sqlx::Error> {
        self.guard()?;
        let mut results: Vec<Ticket> = self
            .tickets
            .lock()
            .unwrap()
            .values()
            .filter(|t| filter.created_by.is_none_or(|id| t.created_by == id))
            .filter(|t| filter.assigned_to.is_none_or(|id| t.assigned_to == Some(id)))
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| filter.priority.is_none_or(|p| t.priority == p))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    async fn insert_comment(
        &self,
        new: NewComment,
        stamp_first_response: bool,
        auto_progress: bool,
    ) -> Result<(Ticket, TicketComment), sqlx::Error> {
        self.guard()?;
        let comment = TicketComment {
            id: Uuid::new_v4(),
            ticket_id: new.ticket_id,
            author_id: new.author_id,
            content: new.content,
            is_internal: new.is_internal,
            created_at: new.created_at,
        };
        // Side effects apply under the same lock as the comment, matching
        // the single transaction the real repository uses.
        let mut tickets = self.tickets.lock().unwrap();
        let ticket = tickets
            .get_mut(&new.ticket_id)
            .ok_or_else(|| sqlx::Error::RowNotFound)?;
        if stamp_first_response {
            ticket.first_response_at.get_or_insert(new.created_at);
        }
        if auto_progress && ticket.status == TicketStatus::Open {
            ticket.status = TicketStatus::InProgress;
        }
        ticket.updated_at = new.created_at;
        let ticket = ticket.clone();
        self.comments.lock().unwrap().push(comment.clone());
        Ok((ticket, comment))
    }

    async fn list_comments(
        &self,
        ticket_id: Uuid,
        include_internal: bool,
    ) -> Result<Vec<TicketComment>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.ticket_id == ticket_id)
            .filter(|c| include_internal || !c.is_internal)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        self.guard()?;
        let mut tickets = self.tickets.lock().unwrap();
        Ok(tickets.get_mut(&ticket_id).map(|ticket| {
            ticket.status = status;
            if status == TicketStatus::Resolved {
                ticket.resolved_at.get_or_insert(now);
            }
            if status == TicketStatus::Closed {
                ticket.closed_at.get_or_insert(now);
            }
            ticket.updated_at = now;
            ticket.clone()
        }))
    }

    async fn update_priority(
        &self,
        ticket_id: Uuid,
        priority: TicketPriority,
        sla_due_date: OffsetDateTime,
        sla_breached: bool,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        self.guard()?;
        let mut tickets = self.tickets.lock().unwrap();
        Ok(tickets.get_mut(&ticket_id).map(|ticket| {
            ticket.priority = priority;
            ticket.sla_due_date = Some(sla_due_date);
            ticket.sla_breached = sla_breached;
            ticket.updated_at = now;
            ticket.clone()
        }))
    }

    async fn update_assignee(
        &self,
        ticket_id: Uuid,
        assignee: Option<Uuid>,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        self.guard()?;
        let mut tickets = self.tickets.lock().unwrap();
        Ok(tickets.get_mut(&ticket_id).map(|ticket| {
            ticket.assigned_to = assignee;
            ticket.updated_at = now;
            ticket.clone()
        }))
    }

    async fn record_rating(
        &self,
        ticket_id: Uuid,
        rating: i32,
        feedback: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        self.guard()?;
        let mut tickets = self.tickets.lock().unwrap();
        Ok(tickets.get_mut(&ticket_id).map(|ticket| {
            ticket.rating = Some(rating);
            ticket.feedback = feedback.map(str::to_owned);
            ticket.updated_at = now;
            ticket.clone()
        }))
    }

    async fn mark_breached_due(&self, now: OffsetDateTime) -> Result<Vec<Ticket>, sqlx::Error> {
        self.guard()?;
        let mut flagged = Vec::new();
        let mut tickets = self.tickets.lock().unwrap();
        for ticket in tickets.values_mut() {
            let due_passed = ticket.sla_due_date.is_some_and(|due| due <= now);
            if due_passed && !ticket.status.is_terminal() && !ticket.sla_breached {
                ticket.sla_breached = true;
                ticket.updated_at = now;
                flagged.push(ticket.clone());
            }
        }
        Ok(flagged)
    }

    async fn list_resolved_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        assignee: Option<Uuid>,
    ) -> Result<Vec<Ticket>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .values()
            .filter(|t| {
                t.resolved_at
                    .is_some_and(|resolved| resolved >= start && resolved <= end)
            })
            .filter(|t| assignee.is_none_or(|id| t.assigned_to == Some(id)))
            .cloned()
            .collect())
    }

    async fn insert_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category, sqlx::Error> {
        self.guard()?;
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            description: description.map(str::to_owned),
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        self.categories.lock().unwrap().push(category.clone());
        Ok(category)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, sqlx::Error> {
        self.guard()?;
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn category_exists(&self, category_id: Uuid) -> Result<bool, sqlx::Error> {
        self.guard()?;
        Ok(self
            .categories
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.id == category_id && c.is_active))
    }
}

#[async_trait]
impl UserRepository for MockDb {
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        self.guard()?;
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn list_agents(&self) -> Result<Vec<User>, sqlx::Error> {
        self.guard()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| {
                u.is_active
                    && matches!(
                        u.role,
                        crate::models::user::UserRole::SupportAgent
                            | crate::models::user::UserRole::TeamLeader
                    )
            })
            .cloned()
            .collect())
    }
}
