use crate::api::attendance::OvertimeReq;
use crate::model::attendance::{AttendanceEntry, ClockState};
use crate::model::role::Role;
use crate::model::settings::{AppLogo, Settings};
use crate::model::user::User;
use crate::models::{LoginReqDto, LogoutReq, RefreshReq, RegisterReq, TokenPair};
use crate::service::attendance::ClockStatus;
use crate::service::report::{Period, Rates, ReportLine, Summary};
use crate::service::settings::{LogoOption, SettingsUpdate};
use crate::service::users::{CreateUserInput, UpdateUserInput};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timeclock API",
        version = "1.0.0",
        description = r#"
## Employee Time Tracking

Employees clock in and out, owners manage accounts, and everybody gets
weekly and monthly summaries of hours worked with a salary estimate.

### Key Features
- **Attendance**
  - Check-in / check-out, overtime hours, current clock status
- **Reports**
  - Today / week / month totals with salary at configurable rates
- **Users**
  - Owner-managed accounts with Owner and Employee roles
- **Settings**
  - Per-user app name, logo and default rates

### Security
Everything except `/auth/*` and `/health` needs a **JWT Bearer** access token.
Access tokens are short lived; use `/auth/refresh` with the refresh token.

### Response Format
Every response is an envelope: `{"success": true, "data": ...}` or
`{"success": false, "message": "..."}`.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::add_overtime,
        crate::api::attendance::list_attendance,
        crate::api::attendance::latest_attendance,
        crate::api::attendance::clock_status,
        crate::api::attendance::recent_attendance,
        crate::api::attendance::delete_attendance,

        crate::api::users::create_user,
        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::update_user,
        crate::api::users::delete_user,

        crate::api::reports::summary,

        crate::api::settings::get_settings,
        crate::api::settings::update_settings,
        crate::api::settings::list_logos
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            RefreshReq,
            LogoutReq,
            TokenPair,
            User,
            Role,
            CreateUserInput,
            UpdateUserInput,
            AttendanceEntry,
            ClockState,
            ClockStatus,
            OvertimeReq,
            Period,
            Rates,
            ReportLine,
            Summary,
            Settings,
            AppLogo,
            SettingsUpdate,
            LogoOption
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token APIs"),
        (name = "Attendance", description = "Attendance ledger APIs"),
        (name = "Users", description = "User management APIs"),
        (name = "Reports", description = "Hours and salary summaries"),
        (name = "Settings", description = "Per-user preferences"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_resource() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/api/me",
            "/api/attendance/check-in",
            "/api/attendance/{id}/check-out",
            "/api/users/{id}",
            "/api/reports/summary",
            "/api/settings/logos",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
