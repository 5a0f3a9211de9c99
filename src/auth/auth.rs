use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::{error::ServiceError, model::role::Role};

/// The authenticated caller, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
    pub jti: String,
    /// Milliseconds, see `jwt::stamp_ms`.
    pub issued_at_ms: i64,
}

impl FromRequest for AuthUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ServiceError::Unauthorized("Missing or invalid token".to_string())),
        )
    }
}

impl AuthUser {
    pub fn require_owner(&self) -> Result<(), ServiceError> {
        if self.role.is_owner() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Owner only".to_string()))
        }
    }

    /// Owners reach everyone's records, everybody else only their own.
    pub fn can_access(&self, user_id: u64) -> bool {
        self.role.is_owner() || self.user_id == user_id
    }

    pub fn require_access(&self, user_id: u64) -> Result<(), ServiceError> {
        if self.can_access(user_id) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "You can only access your own records".to_string(),
            ))
        }
    }
}

#[cfg(test)]
pub fn test_actor(user_id: u64, role: Role) -> AuthUser {
    AuthUser {
        user_id,
        email: format!("user{}@company.com", user_id),
        role,
        jti: format!("jti-{}", user_id),
        issued_at_ms: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_reaches_everyone() {
        let owner = test_actor(1, Role::Owner);
        assert!(owner.can_access(99));
        assert!(owner.require_owner().is_ok());
    }

    #[test]
    fn employee_reaches_only_self() {
        let employee = test_actor(2, Role::Employee);
        assert!(employee.can_access(2));
        assert!(!employee.can_access(3));
        assert!(matches!(
            employee.require_owner(),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            employee.require_access(3),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
