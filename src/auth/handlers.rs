use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
    },
    config::Config,
    error::{ApiResponse, ServiceError, ServiceResult},
    model::user::User,
    models::{LoginReqDto, LogoutReq, RefreshReq, RegisterReq, TokenPair, TokenType},
    service::users,
    state::AppState,
};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

fn session_expired() -> ServiceError {
    ServiceError::Unauthorized("Invalid or expired refresh token".to_string())
}

/// Issues an access/refresh pair and records the refresh token.
async fn issue_tokens(state: &AppState, config: &Config, user: &User) -> ServiceResult<TokenPair> {
    let (access_token, _) =
        generate_access_token(user, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(user, &config.jwt_secret, config.refresh_token_ttl)?;

    let expires_at = DateTime::<Utc>::from_timestamp(refresh_claims.exp as i64, 0)
        .ok_or_else(|| ServiceError::Storage("refresh expiry out of range".to_string()))?;

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");
    state
        .sessions
        .store_refresh_token(&refresh_claims.jti, user.id, expires_at)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Self-service registration. New accounts are always employees.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Missing or malformed field"),
        (status = 409, description = "Email already registered", body = Object, example = json!({
            "success": false,
            "message": "An account with this email already exists."
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(state, body), fields(email = %body.email))]
pub async fn register(
    body: web::Json<RegisterReq>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let user = users::register(
        &state,
        &body.full_name,
        &body.email,
        &body.phone,
        &body.password,
        Utc::now(),
    )
    .await?;

    info!(user_id = user.id, "User registered");
    Ok(HttpResponse::Created().json(ApiResponse::ok(user)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "success": false,
            "message": "Invalid credentials."
        }))
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, config, body), fields(email = %body.email))]
pub async fn login(
    body: web::Json<LoginReqDto>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServiceError> {
    info!("Login request received");

    let user = users::authenticate(&state, &body.email, &body.password).await?;
    let tokens = issue_tokens(&state, &config, &user).await?;

    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tokens)))
}

/// Exchanges a refresh token for a new pair. The presented token is revoked.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshReq,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Invalid, expired or revoked refresh token")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    body: web::Json<RefreshReq>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServiceError> {
    let claims = verify_token(&body.refresh_token, &config.jwt_secret).map_err(|e| {
        debug!(error = %e, "Refresh token rejected");
        session_expired()
    })?;

    if claims.token_type != TokenType::Refresh {
        return Err(session_expired());
    }

    let record = match state.sessions.find_refresh_token(&claims.jti).await? {
        Some(r) if !r.revoked && r.expires_at > Utc::now() && r.user_id == claims.user_id => r,
        _ => return Err(session_expired()),
    };

    // a concurrent refresh with the same token loses here
    if !state.sessions.revoke_refresh_token(&record.jti).await? {
        return Err(session_expired());
    }

    // role or email may have changed since the token was issued
    let user = state
        .users
        .find_user(record.user_id)
        .await?
        .ok_or_else(session_expired)?;

    let tokens = issue_tokens(&state, &config, &user).await?;
    info!(user_id = user.id, "Tokens refreshed");
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tokens)))
}

/// Revokes the presented access token and, if given, the refresh token.
#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutReq,
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_logout", skip_all, fields(user_id = auth.user_id))]
pub async fn logout(
    auth: AuthUser,
    body: Option<web::Json<LogoutReq>>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServiceError> {
    state.denylist.revoke_token(&auth.jti).await;

    let refresh = body.and_then(|b| b.into_inner().refresh_token);
    if let Some(token) = refresh {
        // only the caller's own refresh tokens; anything else is ignored
        match verify_token(&token, &config.jwt_secret) {
            Ok(claims)
                if claims.token_type == TokenType::Refresh && claims.user_id == auth.user_id =>
            {
                state.sessions.revoke_refresh_token(&claims.jti).await?;
            }
            _ => debug!("Ignoring unusable refresh token on logout"),
        }
    }

    info!("Logged out");
    Ok(HttpResponse::Ok().json(ApiResponse::done("Logged out")))
}

/// Profile of the authenticated caller.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, ServiceError> {
    let user = users::get_user(&state, &auth, auth.user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}
