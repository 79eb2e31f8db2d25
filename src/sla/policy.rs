use time::Duration;

use crate::models::ticket::TicketPriority;

/// Resolution window granted to each priority.
pub fn sla_hours(priority: TicketPriority) -> i64 {
    match priority {
        TicketPriority::Critical => 4,
        TicketPriority::High => 24,
        TicketPriority::Medium => 72,
        TicketPriority::Low => 168,
    }
}

pub fn sla_window(priority: TicketPriority) -> Duration {
    Duration::hours(sla_hours(priority))
}

/// Lenient priority parsing for intake paths. Unknown values fall back to
/// `medium` rather than rejecting the ticket; the second element tells the
/// caller the fallback fired so it can be logged as a data-integrity signal.
pub fn resolve_priority(raw: &str) -> (TicketPriority, bool) {
    match TicketPriority::parse(raw) {
        Some(priority) => (priority, false),
        None => (TicketPriority::Medium, true),
    }
}
