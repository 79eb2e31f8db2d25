pub mod category;
pub mod ticket;
pub mod user;
