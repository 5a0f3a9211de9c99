use crate::{
    auth::auth::AuthUser,
    error::{ApiResponse, ServiceError},
    service::settings::{self, SettingsUpdate},
    state::AppState,
};
use actix_web::{HttpResponse, web};

#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "Saved settings, or the defaults", body = Settings)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn get_settings(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let current = settings::get_settings(state.settings.as_ref(), &auth).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(current)))
}

#[utoipa::path(
    put,
    path = "/api/settings",
    request_body = SettingsUpdate,
    responses(
        (status = 200, description = "Saved settings", body = Settings),
        (status = 400, description = "Blank name, unknown logo or non-numeric rate")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn update_settings(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<SettingsUpdate>,
) -> Result<HttpResponse, ServiceError> {
    let saved =
        settings::update_settings(state.settings.as_ref(), &auth, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(saved)))
}

/// Logos the workspace may pick from
#[utoipa::path(
    get,
    path = "/api/settings/logos",
    responses(
        (status = 200, description = "Available logos", body = [LogoOption])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn list_logos() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(settings::logo_options()))
}
