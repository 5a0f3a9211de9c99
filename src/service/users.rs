use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::config::BootstrapOwner;
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::model::role::Role;
use crate::model::user::{NewUser, User, UserPatch, is_valid_email};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserInput {
    #[schema(example = "Jane Doe")]
    pub full_name: String,
    #[schema(example = "jane@company.com")]
    pub email: String,
    #[schema(example = "+8801712345678")]
    pub phone: String,
    pub password: String,
    /// Defaults to Employee.
    #[schema(value_type = Option<String>, example = "Employee")]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[schema(value_type = Option<String>)]
    pub role: Option<Role>,
    /// Blank means "keep the current password".
    pub password: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(value: &str, field: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("Please provide a {}.", field)));
    }
    Ok(trimmed.to_string())
}

fn validated_email(email: &str) -> ServiceResult<String> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(ServiceError::Validation(
            "Please fill a valid email address.".to_string(),
        ));
    }
    Ok(email)
}

fn user_not_found() -> ServiceError {
    ServiceError::NotFound("User not found.".to_string())
}

fn map_duplicate(e: StoreError) -> ServiceError {
    match e {
        StoreError::Duplicate => ServiceError::DuplicateEmail,
        other => other.into(),
    }
}

/// Filter first, store second: a filter miss is definitive.
async fn email_taken(state: &AppState, email: &str) -> ServiceResult<bool> {
    if !state.email_filter.might_exist(email) {
        return Ok(false);
    }
    Ok(state.users.email_exists(email).await?)
}

/// Tokens issued before now stop working, for this user only.
async fn revoke_sessions(state: &AppState, user_id: u64) -> ServiceResult<()> {
    state
        .denylist
        .revoke_user(user_id, crate::auth::jwt::stamp_ms())
        .await;
    let revoked = state.sessions.revoke_user_refresh_tokens(user_id).await?;
    debug!(user_id, revoked, "Sessions revoked");
    Ok(())
}

#[instrument(skip(state, input), fields(email = %input.email))]
pub async fn create_user(
    state: &AppState,
    input: CreateUserInput,
    now: DateTime<Utc>,
) -> ServiceResult<User> {
    let full_name = required(&input.full_name, "full name")?;
    let email = validated_email(&input.email)?;
    let phone = required(&input.phone, "phone number")?;
    if input.password.is_empty() {
        return Err(ServiceError::Validation("Password is required.".to_string()));
    }

    if email_taken(state, &email).await? {
        return Err(ServiceError::DuplicateEmail);
    }

    let password_hash = state.hasher.hash_password(&input.password)?;
    let user = state
        .users
        .insert_user(
            NewUser {
                full_name,
                email,
                phone,
                role: input.role.unwrap_or_default(),
                password_hash,
            },
            now,
        )
        .await
        .map_err(map_duplicate)?;

    state.email_filter.insert(&user.email);
    info!(user_id = user.id, role = %user.role, "User created");
    Ok(user)
}

/// Self-service sign-up. Always creates an Employee.
pub async fn register(
    state: &AppState,
    full_name: &str,
    email: &str,
    phone: &str,
    password: &str,
    now: DateTime<Utc>,
) -> ServiceResult<User> {
    create_user(
        state,
        CreateUserInput {
            full_name: full_name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            password: password.to_string(),
            role: Some(Role::Employee),
        },
        now,
    )
    .await
}

/// Same failure for an unknown email and a wrong password.
#[instrument(skip(state, password))]
pub async fn authenticate(state: &AppState, email: &str, password: &str) -> ServiceResult<User> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(ServiceError::AuthenticationFailure);
    }

    let Some(credentials) = state.users.find_credentials_by_email(&email).await? else {
        debug!("Invalid credentials: user not found");
        // burn comparable time so a miss is not faster than a mismatch
        let _ = state.hasher.hash_password(password);
        return Err(ServiceError::AuthenticationFailure);
    };

    if !state
        .hasher
        .verify_password(password, &credentials.password_hash)
    {
        debug!(user_id = credentials.user.id, "Invalid credentials: password mismatch");
        return Err(ServiceError::AuthenticationFailure);
    }

    Ok(credentials.user)
}

pub async fn list_users(state: &AppState, actor: &AuthUser) -> ServiceResult<Vec<User>> {
    actor.require_owner()?;
    Ok(state.users.list_users().await?)
}

pub async fn get_user(state: &AppState, actor: &AuthUser, id: u64) -> ServiceResult<User> {
    actor.require_access(id)?;
    state.users.find_user(id).await?.ok_or_else(user_not_found)
}

#[instrument(skip(state, actor, input), fields(actor_id = actor.user_id))]
pub async fn update_user(
    state: &AppState,
    actor: &AuthUser,
    id: u64,
    input: UpdateUserInput,
    now: DateTime<Utc>,
) -> ServiceResult<User> {
    actor.require_access(id)?;
    if input.role.is_some() {
        actor.require_owner()?;
    }

    let current = state.users.find_user(id).await?.ok_or_else(user_not_found)?;

    let mut patch = UserPatch {
        full_name: input
            .full_name
            .as_deref()
            .map(|v| required(v, "full name"))
            .transpose()?,
        email: input.email.as_deref().map(validated_email).transpose()?,
        phone: input
            .phone
            .as_deref()
            .map(|v| required(v, "phone number"))
            .transpose()?,
        role: input.role,
        password_hash: None,
    };

    if let Some(password) = input.password.as_deref() {
        if !password.trim().is_empty() {
            patch.password_hash = Some(state.hasher.hash_password(password)?);
        }
    }

    if patch.email.as_deref() == Some(current.email.as_str()) {
        patch.email = None;
    }
    if let Some(email) = patch.email.as_deref() {
        if email_taken(state, email).await? {
            return Err(ServiceError::DuplicateEmail);
        }
    }

    if patch.is_empty() {
        return Ok(current);
    }

    let invalidates_sessions = patch.password_hash.is_some()
        || patch.role.is_some_and(|role| role != current.role);

    let updated = state
        .users
        .update_user(id, patch, now)
        .await
        .map_err(map_duplicate)?
        .ok_or_else(user_not_found)?;

    if updated.email != current.email {
        state.email_filter.remove(&current.email);
        state.email_filter.insert(&updated.email);
    }
    if invalidates_sessions {
        revoke_sessions(state, id).await?;
    }

    info!(user_id = id, "User updated");
    Ok(updated)
}

/// Attendance of the removed user stays in place.
#[instrument(skip(state, actor), fields(actor_id = actor.user_id))]
pub async fn delete_user(state: &AppState, actor: &AuthUser, id: u64) -> ServiceResult<()> {
    actor.require_owner()?;
    if actor.user_id == id {
        return Err(ServiceError::Validation(
            "You cannot delete your own account.".to_string(),
        ));
    }

    match state.users.delete_user(id).await? {
        Some(email) => {
            state.email_filter.remove(&email);
            revoke_sessions(state, id).await?;
            info!(user_id = id, "User deleted");
        }
        None => debug!(user_id = id, "Delete requested for absent user"),
    }
    Ok(())
}

/// Creates the configured owner account unless its email is already registered.
pub async fn ensure_owner(state: &AppState, owner: &BootstrapOwner) -> ServiceResult<Option<User>> {
    let email = normalize_email(&owner.email);
    if state.users.email_exists(&email).await? {
        return Ok(None);
    }

    let user = create_user(
        state,
        CreateUserInput {
            full_name: owner.full_name.clone(),
            email,
            phone: "-".to_string(),
            password: owner.password.clone(),
            role: Some(Role::Owner),
        },
        Utc::now(),
    )
    .await?;
    warn!(user_id = user.id, "Bootstrap owner account created");
    Ok(Some(user))
}
