pub mod assist;
pub mod notifier;
