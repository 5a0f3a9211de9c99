use std::sync::Arc;
use std::time::Duration;

use crate::auth::password::PasswordHasher;
use crate::store::{AttendanceStore, SessionStore, SettingsStore, Store, UserStore};
use crate::utils::email_filter::EmailFilter;
use crate::utils::token_denylist::TokenDenylist;

/// Shared per-process handles, injected into handlers as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub attendance: Arc<dyn AttendanceStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub hasher: PasswordHasher,
    pub email_filter: Arc<EmailFilter>,
    pub denylist: TokenDenylist,
}

impl AppState {
    pub fn new<S: Store + 'static>(store: Arc<S>, hasher: PasswordHasher, access_ttl: Duration) -> Self {
        Self {
            users: store.clone(),
            attendance: store.clone(),
            sessions: store.clone(),
            settings: store,
            hasher,
            email_filter: Arc::new(EmailFilter::new()),
            denylist: TokenDenylist::new(access_ttl),
        }
    }
}

#[cfg(test)]
pub fn test_state() -> AppState {
    AppState::new(
        Arc::new(crate::store::MemoryStore::new()),
        crate::auth::password::test_hasher(),
        Duration::from_secs(900),
    )
}
