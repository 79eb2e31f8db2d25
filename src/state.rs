use std::sync::Arc;

use crate::db::{ticket_repository::TicketRepository, user_repository::UserRepository};
use crate::engine::TicketEngine;
use crate::services::assist::AssistService;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TicketEngine>,
    pub tickets: Arc<dyn TicketRepository>,
    pub users: Arc<dyn UserRepository>,
    pub assist: Arc<dyn AssistService>,
}

#[cfg(test)]
impl AppState {
    /// State wired entirely onto one in-memory [`MockDb`].
    pub fn for_tests(db: Arc<crate::db::mock_db::MockDb>) -> Self {
        use crate::services::{assist::NoopAssist, notifier::NoopNotifier};

        let engine = Arc::new(TicketEngine::new(
            db.clone(),
            db.clone(),
            Arc::new(NoopNotifier),
            true,
        ));
        AppState {
            engine,
            tickets: db.clone(),
            users: db,
            assist: Arc::new(NoopAssist),
        }
    }
}
