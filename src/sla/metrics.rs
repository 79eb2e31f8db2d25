use serde::Serialize;

use crate::models::ticket::Ticket;

/// SLA performance over a reporting window of resolved tickets.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct SlaReport {
    pub total_tickets: usize,
    pub on_time: usize,
    pub breached: usize,
    pub sla_compliance_rate: f64,
    pub avg_resolution_hours: f64,
    pub avg_first_response_hours: f64,
}

impl SlaReport {
    pub fn empty() -> Self {
        Self {
            total_tickets: 0,
            on_time: 0,
            breached: 0,
            sla_compliance_rate: 0.0,
            avg_resolution_hours: 0.0,
            avg_first_response_hours: 0.0,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregates a window of resolved tickets into an [`SlaReport`].
///
/// Tickets missing either `resolved_at` or `sla_due_date` are excluded from
/// the on-time/breached tally but still count toward the resolution average
/// when `resolved_at` is present. The first-response average divides by the
/// subset that actually has a first response, not the window size. Returns
/// `None` on an empty window so callers can distinguish "no data" from
/// "zero compliance".
pub fn aggregate(tickets: &[Ticket]) -> Option<SlaReport> {
    if tickets.is_empty() {
        return None;
    }

    let mut on_time = 0;
    let mut breached = 0;
    let mut total_resolution_hours = 0.0;
    let mut total_first_response_hours = 0.0;
    let mut tickets_with_response = 0;

    for ticket in tickets {
        if let (Some(resolved), Some(due)) = (ticket.resolved_at, ticket.sla_due_date) {
            if resolved <= due {
                on_time += 1;
            } else {
                breached += 1;
            }
        }

        if let Some(hours) = ticket.resolution_time_hours() {
            total_resolution_hours += hours;
        }

        if let Some(hours) = ticket.response_time_hours() {
            total_first_response_hours += hours;
            tickets_with_response += 1;
        }
    }

    let total_tickets = tickets.len();
    let judged = on_time + breached;
    let compliance = if judged > 0 {
        on_time as f64 / judged as f64 * 100.0
    } else {
        0.0
    };
    let avg_first_response = if tickets_with_response > 0 {
        total_first_response_hours / tickets_with_response as f64
    } else {
        0.0
    };

    Some(SlaReport {
        total_tickets,
        on_time,
        breached,
        sla_compliance_rate: round2(compliance),
        avg_resolution_hours: round2(total_resolution_hours / total_tickets as f64),
        avg_first_response_hours: round2(avg_first_response),
    })
}
