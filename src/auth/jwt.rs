use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    error::ServiceError,
    model::user::User,
    models::{Claims, TokenType},
};

pub fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

static LAST_STAMP_MS: AtomicI64 = AtomicI64::new(0);

/// Wall clock in milliseconds, strictly increasing within the process.
/// Token issue and session revocation share it, so the two never tie.
pub fn stamp_ms() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_STAMP_MS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_STAMP_MS.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

fn issue(
    user: &User,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), ServiceError> {
    let issued_at = now();
    let claims = Claims {
        user_id: user.id,
        sub: user.email.clone(),
        role: user.role,
        iat: issued_at,
        iat_ms: stamp_ms(),
        exp: issued_at + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Token encoding failed");
        ServiceError::Storage(format!("token encoding failed: {}", e))
    })?;

    Ok((token, claims))
}

pub fn generate_access_token(
    user: &User,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), ServiceError> {
    issue(user, TokenType::Access, secret, ttl)
}

pub fn generate_refresh_token(
    user: &User,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), ServiceError> {
    issue(user, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn user() -> User {
        User {
            id: 3,
            full_name: "Jane".into(),
            email: "jane@company.com".into(),
            phone: "1".into(),
            role: Role::Owner,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trip() {
        let (token, issued) = generate_access_token(&user(), "secret", 900).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id, 3);
        assert_eq!(claims.role, Role::Owner);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.exp, claims.iat + 900);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) = generate_refresh_token(&user(), "secret", 900).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn stamps_never_repeat() {
        let stamps: Vec<i64> = (0..1_000).map(|_| stamp_ms()).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));

        let (_, a) = generate_access_token(&user(), "secret", 900).unwrap();
        let revoked_at = stamp_ms();
        let (_, b) = generate_access_token(&user(), "secret", 900).unwrap();
        assert!(a.iat_ms < revoked_at && revoked_at < b.iat_ms);
    }

    #[test]
    fn jti_is_unique_per_token() {
        let (_, a) = generate_access_token(&user(), "secret", 900).unwrap();
        let (_, b) = generate_access_token(&user(), "secret", 900).unwrap();
        assert_ne!(a.jti, b.jti);
    }
}
