use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::{ApiResponse, ServiceError},
    service::{
        attendance,
        report::{self, Period, Rates, Window},
        settings,
    },
    state::AppState,
};
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;
use std::str::FromStr;
use tracing::debug;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    /// `today`, `week` or `month` (default).
    pub period: Option<String>,
    /// Defaults to the caller. Owners may name anyone.
    pub user_id: Option<u64>,
    /// Overrides the caller's saved hourly rate.
    pub hourly_rate: Option<f64>,
    /// Overrides the caller's saved overtime rate.
    pub ot_hourly_rate: Option<f64>,
}

/// Hours and salary estimate for the current day, week or month
#[utoipa::path(
    get,
    path = "/api/reports/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Summary for the window", body = Summary),
        (status = 400, description = "Unknown period or non-numeric rate"),
        (status = 403, description = "Not your records")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Reports"
)]
pub async fn summary(
    auth: AuthUser,
    state: web::Data<AppState>,
    config: web::Data<Config>,
    query: web::Query<SummaryQuery>,
) -> Result<HttpResponse, ServiceError> {
    let period = match query.period.as_deref().map(str::trim) {
        None | Some("") => Period::default(),
        Some(raw) => Period::from_str(raw)
            .map_err(|_| ServiceError::Validation(format!("Unknown period '{}'.", raw)))?,
    };

    let saved = Rates::from(&settings::get_settings(state.settings.as_ref(), &auth).await?);
    let rates = Rates::validated(
        query.hourly_rate.unwrap_or(saved.hourly_rate),
        query.ot_hourly_rate.unwrap_or(saved.ot_hourly_rate),
    )?;

    let user_id = query.user_id.unwrap_or(auth.user_id);
    let entries = attendance::list_for_user(state.attendance.as_ref(), &auth, user_id).await?;

    let window = Window::for_period(period, Utc::now(), config.report_offset);
    let summary = report::summarize(&entries, &window, rates, config.report_offset);
    debug!(user_id, %period, lines = summary.lines.len(), "Summary computed");

    Ok(HttpResponse::Ok().json(ApiResponse::ok(summary)))
}
