use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

/// A user as seen by clients. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[schema(example = "jane@company.com")]
    pub email: String,
    #[schema(example = "+8801712345678")]
    pub phone: String,
    #[schema(value_type = String, example = "Employee")]
    pub role: Role,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<Utc>,
}

/// Stored form of a user, including the hash. Only the identity service sees this.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Validated input for a new user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub password_hash: String,
}

/// Fields to change on an existing user. `None` leaves the stored value as is.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.role.is_none()
            && self.password_hash.is_none()
    }
}

/// Accepts `something@something.something`.
pub fn is_valid_email(email: &str) -> bool {
    // any '@' with a local part before it and a dotted remainder after it qualifies
    email.match_indices('@').any(|(i, _)| {
        let domain = &email[i + 1..];
        i > 0
            && domain
                .char_indices()
                .any(|(j, c)| c == '.' && j > 0 && j + 1 < domain.len())
    })
}
