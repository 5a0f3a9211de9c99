use std::time::Duration;

use moka::future::Cache;

/// Revoked access tokens, remembered until they would have expired anyway.
///
/// Two kinds of entries: single tokens by `jti` (logout), and whole users by
/// a revoked-before timestamp (deletion, role or password change).
#[derive(Clone)]
pub struct TokenDenylist {
    tokens: Cache<String, ()>,
    users: Cache<u64, i64>,
}

impl TokenDenylist {
    /// `ttl` should match the access token lifetime.
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: Cache::builder()
                .max_capacity(500_000)
                .time_to_live(ttl)
                .build(),
            users: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn revoke_token(&self, jti: &str) {
        self.tokens.insert(jti.to_string(), ()).await;
    }

    /// Every token for `user_id` issued before `at_ms` is rejected. Take `at_ms`
    /// from `jwt::stamp_ms` so later logins are never caught.
    pub async fn revoke_user(&self, user_id: u64, at_ms: i64) {
        self.users.insert(user_id, at_ms).await;
    }

    pub async fn is_revoked(&self, jti: &str, user_id: u64, issued_at_ms: i64) -> bool {
        if self.tokens.get(jti).await.is_some() {
            return true;
        }
        matches!(self.users.get(&user_id).await, Some(at_ms) if issued_at_ms < at_ms)
    }
}
