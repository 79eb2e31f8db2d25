use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(sqlx::Type, Debug, Deserialize, Serialize, PartialEq, Eq, Copy, Clone)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    SupportAgent,
    TeamLeader,
    Admin,
}

impl UserRole {
    /// Staff roles record first responses and may work tickets they do not own.
    pub fn is_staff(self) -> bool {
        matches!(self, Self::SupportAgent | Self::TeamLeader | Self::Admin)
    }

    /// Role → capability table. Admin holds everything; the other rows match
    /// what each role needs to do its job and nothing more.
    pub fn can(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Self::Admin => true,
            Self::TeamLeader => matches!(
                capability,
                CreateTickets
                    | ViewAllTickets
                    | UpdateTickets
                    | AssignTickets
                    | SelfAssign
                    | ManageCategories
                    | ViewReports
                    | RunBreachScan
            ),
            Self::SupportAgent => matches!(
                capability,
                CreateTickets | ViewAssignedTickets | UpdateTickets | SelfAssign
            ),
            Self::Customer => matches!(
                capability,
                CreateTickets | ViewOwnTickets | CommentOwnTickets
            ),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Customer => "customer",
            Self::SupportAgent => "support_agent",
            Self::TeamLeader => "team_leader",
            Self::Admin => "admin",
        };
        write!(f, "{}", s)
    }
}

/// The closed set of actions the role table grants. Route guards consult
/// this through [`UserRole::can`] instead of comparing role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CreateTickets,
    ViewOwnTickets,
    ViewAssignedTickets,
    ViewAllTickets,
    UpdateTickets,
    CommentOwnTickets,
    AssignTickets,
    SelfAssign,
    ManageCategories,
    ViewReports,
    RunBreachScan,
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
