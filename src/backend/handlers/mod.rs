pub mod entries;
pub mod notifications;
pub mod users;
