use crate::auth::auth::AuthUser;
use crate::error::{ApiResponse, ServiceError};
use crate::service::attendance::{self, RECENT_LIMIT};
use crate::state::AppState;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Defaults to the caller. Owners may name anyone.
    pub user_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecentQuery {
    pub user_id: Option<u64>,
    /// Defaults to 5.
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OvertimeReq {
    #[schema(example = 1.5)]
    pub overtime_hours: f64,
}

/// Check-in for the caller
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    responses(
        (status = 201, description = "Checked in", body = AttendanceEntry),
        (status = 409, description = "Already clocked in", body = Object, example = json!({
            "success": false,
            "message": "You are already checked in. Check out before checking in again."
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let entry = attendance::check_in(state.attendance.as_ref(), &auth, Utc::now()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(entry)))
}

/// Check-out of an open entry
#[utoipa::path(
    post,
    path = "/api/attendance/{id}/check-out",
    params(("id" = u64, Path, description = "Attendance entry id")),
    responses(
        (status = 200, description = "Checked out", body = AttendanceEntry),
        (status = 400, description = "Entry already checked out"),
        (status = 403, description = "Entry belongs to someone else"),
        (status = 404, description = "Attendance record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ServiceError> {
    let entry_id = path.into_inner();
    let entry =
        attendance::check_out(state.attendance.as_ref(), &auth, entry_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(entry)))
}

/// Record overtime hours on an entry (replaces the previous value)
#[utoipa::path(
    put,
    path = "/api/attendance/{id}/overtime",
    params(("id" = u64, Path, description = "Attendance entry id")),
    request_body = OvertimeReq,
    responses(
        (status = 200, description = "Overtime recorded", body = AttendanceEntry),
        (status = 400, description = "Negative or non-numeric hours"),
        (status = 404, description = "Attendance record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn add_overtime(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    body: web::Json<OvertimeReq>,
) -> Result<HttpResponse, ServiceError> {
    let entry = attendance::add_overtime_hours(
        state.attendance.as_ref(),
        &auth,
        path.into_inner(),
        body.overtime_hours,
    )
    .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(entry)))
}

/// All entries of a user, most recent check-in first
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(UserQuery),
    responses(
        (status = 200, description = "Attendance entries", body = [AttendanceEntry]),
        (status = 403, description = "Not your records")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = query.user_id.unwrap_or(auth.user_id);
    let entries = attendance::list_for_user(state.attendance.as_ref(), &auth, user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(entries)))
}

#[utoipa::path(
    get,
    path = "/api/attendance/latest",
    params(UserQuery),
    responses(
        (status = 200, description = "Latest entry, or null", body = AttendanceEntry)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn latest_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = query.user_id.unwrap_or(auth.user_id);
    let entry = attendance::latest_for_user(state.attendance.as_ref(), &auth, user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(entry)))
}

/// Whether the user is currently clocked in
#[utoipa::path(
    get,
    path = "/api/attendance/status",
    params(UserQuery),
    responses(
        (status = 200, description = "Clock status", body = ClockStatus)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn clock_status(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = query.user_id.unwrap_or(auth.user_id);
    let status = attendance::clock_status(state.attendance.as_ref(), &auth, user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(status)))
}

#[utoipa::path(
    get,
    path = "/api/attendance/recent",
    params(RecentQuery),
    responses(
        (status = 200, description = "Most recent entries", body = [AttendanceEntry])
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn recent_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<RecentQuery>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = query.user_id.unwrap_or(auth.user_id);
    let limit = query.limit.unwrap_or(RECENT_LIMIT);
    let entries =
        attendance::recent_for_user(state.attendance.as_ref(), &auth, user_id, limit).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(entries)))
}

#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    params(("id" = u64, Path, description = "Attendance entry id")),
    responses(
        (status = 200, description = "Deleted (or already absent)"),
        (status = 403, description = "Entry belongs to someone else")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn delete_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ServiceError> {
    attendance::delete_entry(state.attendance.as_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::done("Attendance record deleted.")))
}
