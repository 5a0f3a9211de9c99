use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use sqlx::{FromRow, MySqlPool};

use super::{
    AttendanceStore, RefreshTokenRecord, SessionStore, SettingsStore, StoreResult, UserStore,
};
use crate::error::StoreError;
use crate::model::attendance::AttendanceEntry;
use crate::model::role::Role;
use crate::model::settings::{AppLogo, Settings};
use crate::model::user::{NewUser, User, UserCredentials, UserPatch};
use crate::utils::db_utils::{SqlValue, build_update_sql, execute_update};

const USER_COLUMNS: &str = "id, full_name, email, phone, role, created_at, updated_at";
const ENTRY_COLUMNS: &str = "id, user_id, check_in, check_out, regular_hours, overtime_hours";

#[derive(FromRow)]
struct UserRow {
    id: u64,
    full_name: String,
    email: String,
    phone: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.role)
            .map_err(|_| StoreError::Internal(format!("unknown role '{}' for user {}", row.role, row.id)))?;
        Ok(User {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password: String,
}

#[derive(FromRow)]
struct RefreshTokenRow {
    jti: String,
    user_id: u64,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

#[derive(FromRow)]
struct SettingsRow {
    app_name: String,
    app_logo: String,
    hourly_rate: f64,
    ot_hourly_rate: f64,
}

/// MySQL backend. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for MySqlStore {
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (full_name, email, phone, role, password, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.to_string())
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_user(result.last_insert_id())
            .await?
            .ok_or_else(|| StoreError::Internal("inserted user vanished".to_string()))
    }

    async fn find_user(&self, id: u64) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, CredentialsRow>(&format!(
            "SELECT {USER_COLUMNS}, password FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(UserCredentials {
                user: User::try_from(r.user)?,
                password_hash: r.password,
            })
        })
        .transpose()
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn all_emails(&self) -> StoreResult<Vec<String>> {
        let mut stream = sqlx::query_as::<_, (String,)>("SELECT email FROM users").fetch(&self.pool);

        let mut emails = Vec::new();
        while let Some(row) = stream.next().await {
            let (email,) = row?;
            emails.push(email);
        }
        Ok(emails)
    }

    async fn update_user(
        &self,
        id: u64,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut fields = Vec::new();
        if let Some(full_name) = patch.full_name {
            fields.push(("full_name", SqlValue::String(full_name)));
        }
        if let Some(email) = patch.email {
            fields.push(("email", SqlValue::String(email)));
        }
        if let Some(phone) = patch.phone {
            fields.push(("phone", SqlValue::String(phone)));
        }
        if let Some(role) = patch.role {
            fields.push(("role", SqlValue::String(role.to_string())));
        }
        if let Some(hash) = patch.password_hash {
            fields.push(("password", SqlValue::String(hash)));
        }
        fields.push(("updated_at", SqlValue::DateTime(now)));

        if let Some(update) = build_update_sql("users", fields, "id", id) {
            execute_update(&self.pool, update).await?;
        }

        self.find_user(id).await
    }

    async fn delete_user(&self, id: u64) -> StoreResult<Option<String>> {
        let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(email)
    }
}

#[async_trait]
impl AttendanceStore for MySqlStore {
    async fn insert_open_entry(
        &self,
        user_id: u64,
        check_in: DateTime<Utc>,
    ) -> StoreResult<AttendanceEntry> {
        // uq_attendance_open rejects a second open row for the same user
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (user_id, check_in, overtime_hours)
            VALUES (?, ?, 0)
            "#,
        )
        .bind(user_id)
        .bind(check_in)
        .execute(&self.pool)
        .await?;

        self.find_entry(result.last_insert_id())
            .await?
            .ok_or_else(|| StoreError::Internal("inserted attendance entry vanished".to_string()))
    }

    async fn find_entry(&self, id: u64) -> StoreResult<Option<AttendanceEntry>> {
        let entry = sqlx::query_as::<_, AttendanceEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM attendance WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn find_open_entry(&self, user_id: u64) -> StoreResult<Option<AttendanceEntry>> {
        let entry = sqlx::query_as::<_, AttendanceEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM attendance
            WHERE user_id = ? AND check_out IS NULL
            ORDER BY check_in DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn close_entry(
        &self,
        id: u64,
        check_out: DateTime<Utc>,
        regular_hours: f64,
    ) -> StoreResult<Option<AttendanceEntry>> {
        let result = sqlx::query(
            "UPDATE attendance SET check_out = ?, regular_hours = ? WHERE id = ? AND check_out IS NULL",
        )
        .bind(check_out)
        .bind(regular_hours)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_entry(id).await
    }

    async fn set_overtime_hours(
        &self,
        id: u64,
        hours: f64,
    ) -> StoreResult<Option<AttendanceEntry>> {
        sqlx::query("UPDATE attendance SET overtime_hours = ? WHERE id = ?")
            .bind(hours)
            .bind(id)
            .execute(&self.pool)
            .await?;

        self.find_entry(id).await
    }

    async fn entries_for_user(&self, user_id: u64) -> StoreResult<Vec<AttendanceEntry>> {
        let entries = sqlx::query_as::<_, AttendanceEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM attendance WHERE user_id = ? ORDER BY check_in DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn latest_entry_for_user(&self, user_id: u64) -> StoreResult<Option<AttendanceEntry>> {
        let entry = sqlx::query_as::<_, AttendanceEntry>(&format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM attendance
            WHERE user_id = ?
            ORDER BY check_in DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn delete_entry(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionStore for MySqlStore {
    async fn store_refresh_token(
        &self,
        jti: &str,
        user_id: u64,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_refresh_token(&self, jti: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            "SELECT jti, user_id, expires_at, revoked FROM refresh_tokens WHERE jti = ?",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| RefreshTokenRecord {
            jti: r.jti,
            user_id: r.user_id,
            expires_at: r.expires_at,
            revoked: r.revoked,
        }))
    }

    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE")
                .bind(jti)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_user_refresh_tokens(&self, user_id: u64) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = ? AND revoked = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SettingsStore for MySqlStore {
    async fn load_settings(&self, user_id: u64) -> StoreResult<Option<Settings>> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT app_name, app_logo, hourly_rate, ot_hourly_rate FROM user_settings WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let app_logo = AppLogo::from_str(&r.app_logo).map_err(|_| {
                StoreError::Internal(format!("unknown logo '{}' for user {}", r.app_logo, user_id))
            })?;
            Ok(Settings {
                app_name: r.app_name,
                app_logo,
                hourly_rate: r.hourly_rate,
                ot_hourly_rate: r.ot_hourly_rate,
            })
        })
        .transpose()
    }

    async fn save_settings(&self, user_id: u64, settings: &Settings) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, app_name, app_logo, hourly_rate, ot_hourly_rate)
            VALUES (?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                app_name = VALUES(app_name),
                app_logo = VALUES(app_logo),
                hourly_rate = VALUES(hourly_rate),
                ot_hourly_rate = VALUES(ot_hourly_rate)
            "#,
        )
        .bind(user_id)
        .bind(&settings.app_name)
        .bind(settings.app_logo.to_string())
        .bind(settings.hourly_rate)
        .bind(settings.ot_hourly_rate)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
