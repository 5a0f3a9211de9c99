use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::model::attendance::{AttendanceEntry, ClockState, regular_hours_between};
use crate::store::AttendanceStore;

pub const RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ClockStatus {
    pub state: ClockState,
    /// The open entry when clocked in, otherwise the most recent one.
    pub entry: Option<AttendanceEntry>,
}

fn entry_not_found() -> ServiceError {
    ServiceError::NotFound("Attendance record not found.".to_string())
}

fn already_checked_out() -> ServiceError {
    ServiceError::Validation("Attendance record is already checked out.".to_string())
}

async fn load_entry(
    store: &dyn AttendanceStore,
    actor: &AuthUser,
    entry_id: u64,
) -> ServiceResult<AttendanceEntry> {
    let entry = store.find_entry(entry_id).await?.ok_or_else(entry_not_found)?;
    actor.require_access(entry.user_id)?;
    Ok(entry)
}

/// Opens a new entry for the caller.
#[instrument(skip(store, actor), fields(user_id = actor.user_id))]
pub async fn check_in(
    store: &dyn AttendanceStore,
    actor: &AuthUser,
    now: DateTime<Utc>,
) -> ServiceResult<AttendanceEntry> {
    if store.find_open_entry(actor.user_id).await?.is_some() {
        return Err(ServiceError::AlreadyClockedIn);
    }

    // a concurrent check-in can still race past the read; the store's
    // uniqueness rule settles it
    match store.insert_open_entry(actor.user_id, now).await {
        Ok(entry) => {
            info!(entry_id = entry.id, "Checked in");
            Ok(entry)
        }
        Err(StoreError::Duplicate) => Err(ServiceError::AlreadyClockedIn),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(store, actor), fields(user_id = actor.user_id))]
pub async fn check_out(
    store: &dyn AttendanceStore,
    actor: &AuthUser,
    entry_id: u64,
    now: DateTime<Utc>,
) -> ServiceResult<AttendanceEntry> {
    let entry = load_entry(store, actor, entry_id).await?;

    if !entry.is_open() {
        return Err(already_checked_out());
    }
    if now < entry.check_in {
        return Err(ServiceError::Validation(
            "Check-out time cannot be before check-in time.".to_string(),
        ));
    }

    let hours = regular_hours_between(entry.check_in, now);
    let Some(updated) = store.close_entry(entry_id, now, hours).await? else {
        // closed or removed by another request since the read above
        return Err(match store.find_entry(entry_id).await? {
            Some(_) => already_checked_out(),
            None => entry_not_found(),
        });
    };

    info!(entry_id, regular_hours = hours, "Checked out");
    Ok(updated)
}

#[instrument(skip(store, actor), fields(user_id = actor.user_id))]
pub async fn add_overtime_hours(
    store: &dyn AttendanceStore,
    actor: &AuthUser,
    entry_id: u64,
    hours: f64,
) -> ServiceResult<AttendanceEntry> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(ServiceError::Validation(
            "Overtime hours must be a non-negative number.".to_string(),
        ));
    }

    load_entry(store, actor, entry_id).await?;

    let updated = store
        .set_overtime_hours(entry_id, hours)
        .await?
        .ok_or_else(entry_not_found)?;

    info!(entry_id, overtime_hours = hours, "Overtime recorded");
    Ok(updated)
}

pub async fn latest_for_user(
    store: &dyn AttendanceStore,
    actor: &AuthUser,
    user_id: u64,
) -> ServiceResult<Option<AttendanceEntry>> {
    actor.require_access(user_id)?;
    Ok(store.latest_entry_for_user(user_id).await?)
}

/// All entries, most recent check-in first.
pub async fn list_for_user(
    store: &dyn AttendanceStore,
    actor: &AuthUser,
    user_id: u64,
) -> ServiceResult<Vec<AttendanceEntry>> {
    actor.require_access(user_id)?;
    Ok(store.entries_for_user(user_id).await?)
}

pub async fn recent_for_user(
    store: &dyn AttendanceStore,
    actor: &AuthUser,
    user_id: u64,
    limit: usize,
) -> ServiceResult<Vec<AttendanceEntry>> {
    let mut entries = list_for_user(store, actor, user_id).await?;
    entries.truncate(limit);
    Ok(entries)
}

pub async fn clock_status(
    store: &dyn AttendanceStore,
    actor: &AuthUser,
    user_id: u64,
) -> ServiceResult<ClockStatus> {
    let latest = latest_for_user(store, actor, user_id).await?;
    let state = match &latest {
        Some(entry) if entry.is_open() => ClockState::ClockedIn,
        _ => ClockState::ClockedOut,
    };
    Ok(ClockStatus {
        state,
        entry: latest,
    })
}

/// Removing an entry that is already gone succeeds.
#[instrument(skip(store, actor), fields(user_id = actor.user_id))]
pub async fn delete_entry(
    store: &dyn AttendanceStore,
    actor: &AuthUser,
    entry_id: u64,
) -> ServiceResult<()> {
    let Some(entry) = store.find_entry(entry_id).await? else {
        return Ok(());
    };
    actor.require_access(entry.user_id)?;

    store.delete_entry(entry_id).await?;
    info!(entry_id, "Attendance record deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::auth::test_actor;
    use crate::model::role::Role;
    use crate::store::{MemoryStore, StoreResult};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    fn nine_am() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap()
    }

    #[actix_web::test]
    async fn check_in_then_out_computes_hours() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);

        let entry = check_in(&store, &jane, nine_am()).await.unwrap();
        assert!(entry.is_open());
        assert_eq!(entry.regular_hours, None);
        assert_eq!(entry.overtime_hours, 0.0);

        let closed = check_out(&store, &jane, entry.id, nine_am() + Duration::minutes(510))
            .await
            .unwrap();
        assert_eq!(closed.regular_hours, Some(8.5));
        assert_eq!(closed.check_out, Some(nine_am() + Duration::minutes(510)));
    }

    #[actix_web::test]
    async fn second_check_in_while_open_conflicts() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);

        check_in(&store, &jane, nine_am()).await.unwrap();
        let err = check_in(&store, &jane, nine_am() + Duration::minutes(1))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::AlreadyClockedIn);
        assert_eq!(store.entries_for_user(1).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn check_out_unknown_entry_is_not_found() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);
        let open = check_in(&store, &jane, nine_am()).await.unwrap();

        let err = check_out(&store, &jane, 999, nine_am()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        // nothing else was touched
        let still_open = store.find_entry(open.id).await.unwrap().unwrap();
        assert!(still_open.is_open());
    }

    #[actix_web::test]
    async fn check_out_twice_is_rejected() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);
        let entry = check_in(&store, &jane, nine_am()).await.unwrap();
        check_out(&store, &jane, entry.id, nine_am() + Duration::hours(1))
            .await
            .unwrap();

        let err = check_out(&store, &jane, entry.id, nine_am() + Duration::hours(2))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let entry = store.find_entry(entry.id).await.unwrap().unwrap();
        assert_eq!(entry.regular_hours, Some(1.0));
    }

    #[actix_web::test]
    async fn check_out_before_check_in_is_rejected() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);
        let entry = check_in(&store, &jane, nine_am()).await.unwrap();
        let err = check_out(&store, &jane, entry.id, nine_am() - Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[actix_web::test]
    async fn negative_overtime_leaves_entry_unchanged() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);
        let entry = check_in(&store, &jane, nine_am()).await.unwrap();
        add_overtime_hours(&store, &jane, entry.id, 1.5).await.unwrap();

        for bad in [-0.5, f64::NAN, f64::INFINITY] {
            let err = add_overtime_hours(&store, &jane, entry.id, bad)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
        let entry = store.find_entry(entry.id).await.unwrap().unwrap();
        assert_eq!(entry.overtime_hours, 1.5);
    }

    #[actix_web::test]
    async fn overtime_overwrites() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);
        let entry = check_in(&store, &jane, nine_am()).await.unwrap();
        add_overtime_hours(&store, &jane, entry.id, 3.0).await.unwrap();
        let updated = add_overtime_hours(&store, &jane, entry.id, 2.0).await.unwrap();
        assert_eq!(updated.overtime_hours, 2.0);

        let err = add_overtime_hours(&store, &jane, 404, 1.0).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[actix_web::test]
    async fn clock_status_follows_latest_entry() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);

        let status = clock_status(&store, &jane, 1).await.unwrap();
        assert_eq!(status.state, ClockState::ClockedOut);
        assert_eq!(status.entry, None);

        let entry = check_in(&store, &jane, nine_am()).await.unwrap();
        let status = clock_status(&store, &jane, 1).await.unwrap();
        assert_eq!(status.state, ClockState::ClockedIn);
        assert_eq!(status.entry.as_ref().map(|e| e.id), Some(entry.id));

        check_out(&store, &jane, entry.id, nine_am() + Duration::hours(8))
            .await
            .unwrap();
        let status = clock_status(&store, &jane, 1).await.unwrap();
        assert_eq!(status.state, ClockState::ClockedOut);
        assert_eq!(status.entry.map(|e| e.regular_hours), Some(Some(8.0)));
    }

    #[actix_web::test]
    async fn employees_cannot_touch_other_entries() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);
        let joe = test_actor(2, Role::Employee);
        let owner = test_actor(3, Role::Owner);
        let entry = check_in(&store, &jane, nine_am()).await.unwrap();

        assert!(matches!(
            check_out(&store, &joe, entry.id, nine_am() + Duration::hours(1)).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            list_for_user(&store, &joe, 1).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            delete_entry(&store, &joe, entry.id).await,
            Err(ServiceError::Forbidden(_))
        ));

        // the owner can
        assert_eq!(list_for_user(&store, &owner, 1).await.unwrap().len(), 1);
        check_out(&store, &owner, entry.id, nine_am() + Duration::hours(1))
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);
        let entry = check_in(&store, &jane, nine_am()).await.unwrap();

        delete_entry(&store, &jane, entry.id).await.unwrap();
        delete_entry(&store, &jane, entry.id).await.unwrap();
        assert!(list_for_user(&store, &jane, 1).await.unwrap().is_empty());
        // deleting the open entry frees the user to check in again
        check_in(&store, &jane, nine_am()).await.unwrap();
    }

    #[actix_web::test]
    async fn recent_is_capped() {
        let store = MemoryStore::new();
        let jane = test_actor(1, Role::Employee);
        for day in 0..7 {
            let start = nine_am() + Duration::days(day);
            let entry = check_in(&store, &jane, start).await.unwrap();
            check_out(&store, &jane, entry.id, start + Duration::hours(8))
                .await
                .unwrap();
        }
        let recent = recent_for_user(&store, &jane, 1, RECENT_LIMIT).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].check_in, nine_am() + Duration::days(6));
    }

    /// Lets a competing check-out land between our read and our write.
    struct RacingCheckOut {
        inner: MemoryStore,
    }

    #[async_trait]
    impl AttendanceStore for RacingCheckOut {
        async fn insert_open_entry(
            &self,
            user_id: u64,
            check_in: DateTime<Utc>,
        ) -> StoreResult<AttendanceEntry> {
            self.inner.insert_open_entry(user_id, check_in).await
        }

        async fn find_entry(&self, id: u64) -> StoreResult<Option<AttendanceEntry>> {
            self.inner.find_entry(id).await
        }

        async fn find_open_entry(&self, user_id: u64) -> StoreResult<Option<AttendanceEntry>> {
            self.inner.find_open_entry(user_id).await
        }

        async fn close_entry(
            &self,
            id: u64,
            check_out: DateTime<Utc>,
            regular_hours: f64,
        ) -> StoreResult<Option<AttendanceEntry>> {
            self.inner.close_entry(id, check_out, 0.5).await?;
            self.inner.close_entry(id, check_out, regular_hours).await
        }

        async fn set_overtime_hours(
            &self,
            id: u64,
            hours: f64,
        ) -> StoreResult<Option<AttendanceEntry>> {
            self.inner.set_overtime_hours(id, hours).await
        }

        async fn entries_for_user(&self, user_id: u64) -> StoreResult<Vec<AttendanceEntry>> {
            self.inner.entries_for_user(user_id).await
        }

        async fn latest_entry_for_user(
            &self,
            user_id: u64,
        ) -> StoreResult<Option<AttendanceEntry>> {
            self.inner.latest_entry_for_user(user_id).await
        }

        async fn delete_entry(&self, id: u64) -> StoreResult<bool> {
            self.inner.delete_entry(id).await
        }
    }

    #[actix_web::test]
    async fn losing_a_concurrent_check_out_keeps_the_winner() {
        let store = RacingCheckOut {
            inner: MemoryStore::new(),
        };
        let jane = test_actor(1, Role::Employee);
        let entry = check_in(&store, &jane, nine_am()).await.unwrap();

        let err = check_out(&store, &jane, entry.id, nine_am() + Duration::hours(8))
            .await
            .unwrap_err();
        assert_eq!(err, already_checked_out());

        let stored = store.find_entry(entry.id).await.unwrap().unwrap();
        assert_eq!(stored.regular_hours, Some(0.5));
    }
}
