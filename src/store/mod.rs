//! Persistence backends.
//!
//! The traits describe only what the services need: create, read, update and
//! delete by id, plus filter-by-field and sort. `MySqlStore` is used in
//! production, `MemoryStore` for local runs and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::attendance::AttendanceEntry;
use crate::model::settings::Settings;
use crate::model::user::{NewUser, User, UserCredentials, UserPatch};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `StoreError::Duplicate` when the email is taken.
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User>;

    async fn find_user(&self, id: u64) -> StoreResult<Option<User>>;

    /// Includes the password hash, for authentication only.
    async fn find_credentials_by_email(&self, email: &str)
    -> StoreResult<Option<UserCredentials>>;

    async fn email_exists(&self, email: &str) -> StoreResult<bool>;

    /// Newest first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn all_emails(&self) -> StoreResult<Vec<String>>;

    /// `Ok(None)` when the user does not exist.
    async fn update_user(
        &self,
        id: u64,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;

    /// Returns the removed user's email, if there was one.
    async fn delete_user(&self, id: u64) -> StoreResult<Option<String>>;
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Opens a new entry. Fails with `StoreError::Duplicate` when the user
    /// already has an open one.
    async fn insert_open_entry(
        &self,
        user_id: u64,
        check_in: DateTime<Utc>,
    ) -> StoreResult<AttendanceEntry>;

    async fn find_entry(&self, id: u64) -> StoreResult<Option<AttendanceEntry>>;

    async fn find_open_entry(&self, user_id: u64) -> StoreResult<Option<AttendanceEntry>>;

    async fn close_entry(
        &self,
        id: u64,
        check_out: DateTime<Utc>,
        regular_hours: f64,
    ) -> StoreResult<Option<AttendanceEntry>>;

    async fn set_overtime_hours(&self, id: u64, hours: f64)
    -> StoreResult<Option<AttendanceEntry>>;

    /// Most recent check-in first.
    async fn entries_for_user(&self, user_id: u64) -> StoreResult<Vec<AttendanceEntry>>;

    async fn latest_entry_for_user(&self, user_id: u64) -> StoreResult<Option<AttendanceEntry>>;

    async fn delete_entry(&self, id: u64) -> StoreResult<bool>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenRecord {
    pub jti: String,
    pub user_id: u64,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn store_refresh_token(
        &self,
        jti: &str,
        user_id: u64,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn find_refresh_token(&self, jti: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Returns true if the token was active before this call.
    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool>;

    async fn revoke_user_refresh_tokens(&self, user_id: u64) -> StoreResult<u64>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load_settings(&self, user_id: u64) -> StoreResult<Option<Settings>>;

    async fn save_settings(&self, user_id: u64, settings: &Settings) -> StoreResult<()>;
}

/// Everything a backend has to provide.
pub trait Store: UserStore + AttendanceStore + SessionStore + SettingsStore {}

impl<T: UserStore + AttendanceStore + SessionStore + SettingsStore> Store for T {}
