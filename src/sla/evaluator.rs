use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::models::ticket::{Ticket, TicketPriority};
use crate::sla::policy;

/// Tickets due within this margin count as at risk on dashboards.
const AT_RISK_WINDOW: Duration = Duration::hours(2);

pub fn due_date(created_at: OffsetDateTime, priority: TicketPriority) -> OffsetDateTime {
    created_at + policy::sla_window(priority)
}

/// True iff the ticket has a due date, is still open in the lifecycle sense,
/// and the due date has passed. Pure check; recording the breach is the
/// storage layer's conditional update.
pub fn is_breached(ticket: &Ticket, now: OffsetDateTime) -> bool {
    match ticket.sla_due_date {
        Some(due) => !ticket.status.is_terminal() && now > due,
        None => false,
    }
}

#[derive(Debug, Serialize, PartialEq, Eq, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum SlaState {
    NoSla,
    Met,
    Breached,
    AtRisk,
    OnTrack,
}

pub fn sla_state(ticket: &Ticket, now: OffsetDateTime) -> SlaState {
    let Some(due) = ticket.sla_due_date else {
        return SlaState::NoSla;
    };

    if ticket.status.is_terminal() {
        return match ticket.resolved_at {
            Some(resolved) if resolved <= due => SlaState::Met,
            _ => SlaState::Breached,
        };
    }

    let remaining = due - now;
    if remaining <= Duration::ZERO {
        SlaState::Breached
    } else if remaining <= AT_RISK_WINDOW {
        SlaState::AtRisk
    } else {
        SlaState::OnTrack
    }
}

/// Countdown to the due date at the precision a dashboard renders: a
/// days/hours split beyond a day, hours/minutes inside one, and an overdue
/// marker once the deadline has passed.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum TimeRemaining {
    Overdue {
        breached: bool,
        overdue_hours: f64,
    },
    DaysHours {
        days: i64,
        hours: i64,
        total_hours: f64,
    },
    HoursMinutes {
        hours: i64,
        minutes: i64,
        total_hours: f64,
    },
}

pub fn time_remaining(ticket: &Ticket, now: OffsetDateTime) -> Option<TimeRemaining> {
    let due = ticket.sla_due_date?;
    if ticket.status.is_terminal() {
        return None;
    }

    let remaining = due - now;
    let total_hours = remaining.as_seconds_f64() / 3600.0;

    if remaining <= Duration::ZERO {
        return Some(TimeRemaining::Overdue {
            breached: true,
            overdue_hours: total_hours.abs(),
        });
    }

    if total_hours > 24.0 {
        Some(TimeRemaining::DaysHours {
            days: (total_hours / 24.0) as i64,
            hours: (total_hours % 24.0) as i64,
            total_hours,
        })
    } else {
        Some(TimeRemaining::HoursMinutes {
            hours: total_hours as i64,
            minutes: ((total_hours % 1.0) * 60.0) as i64,
            total_hours,
        })
    }
}
