use tracing::info;

use crate::models::ticket::{Ticket, TicketComment, TicketStatus};

/// Event hooks the engine fires after a mutation commits. Implementations
/// own delivery (email, Teams, webhooks); a hook must never fail the
/// mutation that triggered it, so the methods are infallible by contract.
pub trait TicketNotifier: Send + Sync {
    fn ticket_created(&self, ticket: &Ticket);
    fn comment_added(&self, ticket: &Ticket, comment: &TicketComment);
    fn status_changed(&self, ticket: &Ticket, previous: TicketStatus);
    fn sla_breached(&self, ticket: &Ticket);
}

/// Default notifier: structured log lines only.
pub struct LogNotifier;

impl TicketNotifier for LogNotifier {
    fn ticket_created(&self, ticket: &Ticket) {
        info!(
            ticket_number = %ticket.ticket_number,
            priority = %ticket.priority,
            "ticket created"
        );
    }

    fn comment_added(&self, ticket: &Ticket, comment: &TicketComment) {
        info!(
            ticket_number = %ticket.ticket_number,
            internal = comment.is_internal,
            "comment added"
        );
    }

    fn status_changed(&self, ticket: &Ticket, previous: TicketStatus) {
        info!(
            ticket_number = %ticket.ticket_number,
            from = %previous,
            to = %ticket.status,
            "status changed"
        );
    }

    fn sla_breached(&self, ticket: &Ticket) {
        info!(ticket_number = %ticket.ticket_number, "sla breach recorded");
    }
}

/// Notifier for tests and environments with notifications disabled.
pub struct NoopNotifier;

impl TicketNotifier for NoopNotifier {
    fn ticket_created(&self, _: &Ticket) {}
    fn comment_added(&self, _: &Ticket, _: &TicketComment) {}
    fn status_changed(&self, _: &Ticket, _: TicketStatus) {}
    fn sla_breached(&self, _: &Ticket) {}
}
