use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::{ServiceError, ServiceResult};
use crate::model::settings::{AppLogo, Settings};
use crate::store::SettingsStore;

/// Partial update; absent fields keep their saved value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SettingsUpdate {
    pub app_name: Option<String>,
    #[schema(example = "Factory")]
    pub app_logo: Option<String>,
    pub hourly_rate: Option<f64>,
    pub ot_hourly_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LogoOption {
    #[schema(example = "HardHat")]
    pub name: String,
}

/// Saved settings of the caller, or the defaults if nothing was saved yet.
pub async fn get_settings(store: &dyn SettingsStore, actor: &AuthUser) -> ServiceResult<Settings> {
    Ok(store
        .load_settings(actor.user_id)
        .await?
        .unwrap_or_default())
}

fn validated_rate(value: f64, field: &str) -> ServiceResult<f64> {
    if !value.is_finite() {
        return Err(ServiceError::Validation(format!("{} must be a number.", field)));
    }
    Ok(value)
}

#[instrument(skip(store, actor, update), fields(user_id = actor.user_id))]
pub async fn update_settings(
    store: &dyn SettingsStore,
    actor: &AuthUser,
    update: SettingsUpdate,
) -> ServiceResult<Settings> {
    let mut settings = get_settings(store, actor).await?;

    if let Some(name) = update.app_name {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation(
                "App name cannot be empty.".to_string(),
            ));
        }
        settings.app_name = name.to_string();
    }
    if let Some(logo) = update.app_logo {
        settings.app_logo = AppLogo::from_str(logo.trim())
            .map_err(|_| ServiceError::Validation(format!("Unknown logo '{}'.", logo)))?;
    }
    if let Some(rate) = update.hourly_rate {
        settings.hourly_rate = validated_rate(rate, "Hourly rate")?;
    }
    if let Some(rate) = update.ot_hourly_rate {
        settings.ot_hourly_rate = validated_rate(rate, "Overtime hourly rate")?;
    }

    store.save_settings(actor.user_id, &settings).await?;
    info!("Settings saved");
    Ok(settings)
}

pub fn logo_options() -> Vec<LogoOption> {
    AppLogo::iter()
        .map(|logo| LogoOption {
            name: logo.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::auth::test_actor;
    use crate::model::role::Role;
    use crate::store::MemoryStore;

    #[actix_web::test]
    async fn defaults_until_saved() {
        let store = MemoryStore::new();
        let me = test_actor(1, Role::Employee);
        assert_eq!(get_settings(&store, &me).await.unwrap(), Settings::default());
    }

    #[actix_web::test]
    async fn partial_update_keeps_other_fields() {
        let store = MemoryStore::new();
        let me = test_actor(1, Role::Employee);
        let saved = update_settings(
            &store,
            &me,
            SettingsUpdate {
                app_logo: Some("Factory".into()),
                hourly_rate: Some(150.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(saved.app_logo, AppLogo::Factory);
        assert_eq!(saved.hourly_rate, 150.0);
        assert_eq!(saved.app_name, "Whole Mart");
        assert_eq!(saved.ot_hourly_rate, 400.0);

        assert_eq!(get_settings(&store, &me).await.unwrap(), saved);
        // other users are untouched
        let other = test_actor(2, Role::Employee);
        assert_eq!(get_settings(&store, &other).await.unwrap(), Settings::default());
    }

    #[actix_web::test]
    async fn rejects_invalid_values() {
        let store = MemoryStore::new();
        let me = test_actor(1, Role::Employee);
        for update in [
            SettingsUpdate {
                app_name: Some("  ".into()),
                ..Default::default()
            },
            SettingsUpdate {
                app_logo: Some("Rocket".into()),
                ..Default::default()
            },
            SettingsUpdate {
                ot_hourly_rate: Some(f64::NAN),
                ..Default::default()
            },
        ] {
            assert!(matches!(
                update_settings(&store, &me, update).await,
                Err(ServiceError::Validation(_))
            ));
        }
        assert_eq!(get_settings(&store, &me).await.unwrap(), Settings::default());
    }

    #[test]
    fn lists_every_logo() {
        let names: Vec<String> = logo_options().into_iter().map(|l| l.name).collect();
        assert_eq!(names.len(), 6);
        assert!(names.contains(&"ClipboardCheck".to_string()));
    }
}
