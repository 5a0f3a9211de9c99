pub mod attendance;
pub mod reports;
pub mod settings;
pub mod users;
