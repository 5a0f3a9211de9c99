use crate::{
    auth::auth::AuthUser,
    error::{ApiResponse, ServiceError},
    service::users::{self, CreateUserInput, UpdateUserInput},
    state::AppState,
};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use tracing::debug;

/// Create a user with any role
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserInput,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Missing or malformed field"),
        (status = 403, description = "Owner only"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateUserInput>,
) -> Result<HttpResponse, ServiceError> {
    auth.require_owner()?;
    let user = users::create_user(&state, payload.into_inner(), Utc::now()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(user)))
}

/// List users, newest first
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Owner only")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let list = users::list_users(&state, &auth).await?;
    debug!(count = list.len(), "Listed users");
    Ok(HttpResponse::Ok().json(ApiResponse::ok(list)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 403, description = "Not your profile"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ServiceError> {
    let user = users::get_user(&state, &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

/// Update a profile. Only owners may change roles.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    request_body = UpdateUserInput,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Malformed field"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateUserInput>,
) -> Result<HttpResponse, ServiceError> {
    let user = users::update_user(
        &state,
        &auth,
        path.into_inner(),
        payload.into_inner(),
        Utc::now(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

/// Delete a user. Their attendance stays on record.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "Deleted (or already absent)"),
        (status = 400, description = "Cannot delete your own account"),
        (status = 403, description = "Owner only")
    ),
    tag = "Users",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ServiceError> {
    users::delete_user(&state, &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::done("User deleted.")))
}
