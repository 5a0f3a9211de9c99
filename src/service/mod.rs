//! Core operations. Handlers in `api/` and `auth/handlers.rs` only adapt
//! HTTP to these calls.

pub mod attendance;
pub mod report;
pub mod settings;
pub mod users;
