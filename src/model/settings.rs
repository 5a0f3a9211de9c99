use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

pub const DEFAULT_APP_NAME: &str = "Whole Mart";
pub const DEFAULT_HOURLY_RATE: f64 = 200.0;
pub const DEFAULT_OT_HOURLY_RATE: f64 = 400.0;

/// Fixed set of logos a workspace can pick from.
#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
pub enum AppLogo {
    HardHat,
    Building2,
    Factory,
    #[default]
    Store,
    Briefcase,
    ClipboardCheck,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Settings {
    #[schema(example = "Whole Mart")]
    pub app_name: String,
    #[schema(value_type = String, example = "Store")]
    pub app_logo: AppLogo,
    #[schema(example = 200.0)]
    pub hourly_rate: f64,
    #[schema(example = 400.0)]
    pub ot_hourly_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            app_logo: AppLogo::default(),
            hourly_rate: DEFAULT_HOURLY_RATE,
            ot_hourly_rate: DEFAULT_OT_HOURLY_RATE,
        }
    }
}
