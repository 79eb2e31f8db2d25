use async_trait::async_trait;
use uuid::Uuid;

use crate::models::user::User;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;

    /// Active staff eligible for assignment (support agents and team leaders).
    async fn list_agents(&self) -> Result<Vec<User>, sqlx::Error>;
}
