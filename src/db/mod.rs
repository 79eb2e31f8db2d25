pub mod mock_db;
pub mod postgres_ticket_repository;
pub mod postgres_user_repository;
pub mod ticket_repository;
pub mod user_repository;
