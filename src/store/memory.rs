use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    AttendanceStore, RefreshTokenRecord, SessionStore, SettingsStore, StoreResult, UserStore,
};
use crate::error::StoreError;
use crate::model::attendance::AttendanceEntry;
use crate::model::settings::Settings;
use crate::model::user::{NewUser, User, UserCredentials, UserPatch};

/// Process-local backend. Data lives as long as the process does.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<u64, UserCredentials>>,
    entries: RwLock<BTreeMap<u64, AttendanceEntry>>,
    refresh_tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
    settings: RwLock<HashMap<u64, Settings>>,
    next_user_id: AtomicU64,
    next_entry_id: AtomicU64,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_newest_first(mut entries: Vec<AttendanceEntry>) -> Vec<AttendanceEntry> {
        entries.sort_by(|a, b| b.check_in.cmp(&a.check_in).then(b.id.cmp(&a.id)));
        entries
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser, now: DateTime<Utc>) -> StoreResult<User> {
        let mut users = write(&self.users);
        if users.values().any(|u| u.user.email == user.email) {
            return Err(StoreError::Duplicate);
        }

        let id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = User {
            id,
            full_name: user.full_name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(
            id,
            UserCredentials {
                user: record.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(record)
    }

    async fn find_user(&self, id: u64) -> StoreResult<Option<User>> {
        Ok(read(&self.users).get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> StoreResult<Option<UserCredentials>> {
        Ok(read(&self.users)
            .values()
            .find(|c| c.user.email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> StoreResult<bool> {
        Ok(read(&self.users).values().any(|c| c.user.email == email))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = read(&self.users).values().map(|c| c.user.clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn all_emails(&self) -> StoreResult<Vec<String>> {
        Ok(read(&self.users)
            .values()
            .map(|c| c.user.email.clone())
            .collect())
    }

    async fn update_user(
        &self,
        id: u64,
        patch: UserPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut users = write(&self.users);

        if let Some(email) = &patch.email {
            if users
                .iter()
                .any(|(other, c)| *other != id && &c.user.email == email)
            {
                return Err(StoreError::Duplicate);
            }
        }

        let Some(record) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(full_name) = patch.full_name {
            record.user.full_name = full_name;
        }
        if let Some(email) = patch.email {
            record.user.email = email;
        }
        if let Some(phone) = patch.phone {
            record.user.phone = phone;
        }
        if let Some(role) = patch.role {
            record.user.role = role;
        }
        if let Some(hash) = patch.password_hash {
            record.password_hash = hash;
        }
        record.user.updated_at = now;

        Ok(Some(record.user.clone()))
    }

    async fn delete_user(&self, id: u64) -> StoreResult<Option<String>> {
        Ok(write(&self.users).remove(&id).map(|c| c.user.email))
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn insert_open_entry(
        &self,
        user_id: u64,
        check_in: DateTime<Utc>,
    ) -> StoreResult<AttendanceEntry> {
        let mut entries = write(&self.entries);
        if entries.values().any(|e| e.user_id == user_id && e.is_open()) {
            return Err(StoreError::Duplicate);
        }

        let id = self.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = AttendanceEntry {
            id,
            user_id,
            check_in,
            check_out: None,
            regular_hours: None,
            overtime_hours: 0.0,
        };
        entries.insert(id, entry.clone());
        Ok(entry)
    }

    async fn find_entry(&self, id: u64) -> StoreResult<Option<AttendanceEntry>> {
        Ok(read(&self.entries).get(&id).cloned())
    }

    async fn find_open_entry(&self, user_id: u64) -> StoreResult<Option<AttendanceEntry>> {
        Ok(read(&self.entries)
            .values()
            .filter(|e| e.user_id == user_id && e.is_open())
            .max_by_key(|e| (e.check_in, e.id))
            .cloned())
    }

    async fn close_entry(
        &self,
        id: u64,
        check_out: DateTime<Utc>,
        regular_hours: f64,
    ) -> StoreResult<Option<AttendanceEntry>> {
        let mut entries = write(&self.entries);
        Ok(entries
            .get_mut(&id)
            .filter(|entry| entry.is_open())
            .map(|entry| {
                entry.check_out = Some(check_out);
                entry.regular_hours = Some(regular_hours);
                entry.clone()
            }))
    }

    async fn set_overtime_hours(
        &self,
        id: u64,
        hours: f64,
    ) -> StoreResult<Option<AttendanceEntry>> {
        let mut entries = write(&self.entries);
        Ok(entries.get_mut(&id).map(|entry| {
            entry.overtime_hours = hours;
            entry.clone()
        }))
    }

    async fn entries_for_user(&self, user_id: u64) -> StoreResult<Vec<AttendanceEntry>> {
        let entries = read(&self.entries)
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        Ok(Self::sorted_newest_first(entries))
    }

    async fn latest_entry_for_user(&self, user_id: u64) -> StoreResult<Option<AttendanceEntry>> {
        Ok(read(&self.entries)
            .values()
            .filter(|e| e.user_id == user_id)
            .max_by_key(|e| (e.check_in, e.id))
            .cloned())
    }

    async fn delete_entry(&self, id: u64) -> StoreResult<bool> {
        Ok(write(&self.entries).remove(&id).is_some())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn store_refresh_token(
        &self,
        jti: &str,
        user_id: u64,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tokens = write(&self.refresh_tokens);
        if tokens.contains_key(jti) {
            return Err(StoreError::Duplicate);
        }
        tokens.insert(
            jti.to_string(),
            RefreshTokenRecord {
                jti: jti.to_string(),
                user_id,
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn find_refresh_token(&self, jti: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        Ok(read(&self.refresh_tokens).get(jti).cloned())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> StoreResult<bool> {
        let mut tokens = write(&self.refresh_tokens);
        Ok(match tokens.get_mut(jti) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                true
            }
            _ => false,
        })
    }

    async fn revoke_user_refresh_tokens(&self, user_id: u64) -> StoreResult<u64> {
        let mut tokens = write(&self.refresh_tokens);
        let mut revoked = 0;
        for record in tokens.values_mut() {
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load_settings(&self, user_id: u64) -> StoreResult<Option<Settings>> {
        Ok(read(&self.settings).get(&user_id).cloned())
    }

    async fn save_settings(&self, user_id: u64, settings: &Settings) -> StoreResult<()> {
        write(&self.settings).insert(user_id, settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use chrono::{Duration, TimeZone};

    fn new_user(email: &str) -> NewUser {
        NewUser {
            full_name: "Jane Doe".into(),
            email: email.into(),
            phone: "555-0100".into(),
            role: Role::Employee,
            password_hash: "hash".into(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap()
    }

    #[actix_web::test]
    async fn rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@b.co"), t0()).await.unwrap();
        let err = store.insert_user(new_user("a@b.co"), t0()).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn email_change_to_taken_address_is_rejected() {
        let store = MemoryStore::new();
        store.insert_user(new_user("a@b.co"), t0()).await.unwrap();
        let second = store.insert_user(new_user("c@d.co"), t0()).await.unwrap();
        let patch = UserPatch {
            email: Some("a@b.co".into()),
            ..Default::default()
        };
        let err = store.update_user(second.id, patch, t0()).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[actix_web::test]
    async fn one_open_entry_per_user() {
        let store = MemoryStore::new();
        let open = store.insert_open_entry(1, t0()).await.unwrap();
        assert!(matches!(
            store.insert_open_entry(1, t0()).await,
            Err(StoreError::Duplicate)
        ));
        // other users are unaffected
        store.insert_open_entry(2, t0()).await.unwrap();

        store
            .close_entry(open.id, t0() + Duration::hours(1), 1.0)
            .await
            .unwrap();
        store
            .insert_open_entry(1, t0() + Duration::hours(2))
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn an_entry_closes_only_once() {
        let store = MemoryStore::new();
        let open = store.insert_open_entry(1, t0()).await.unwrap();
        let first = store
            .close_entry(open.id, t0() + Duration::hours(2), 2.0)
            .await
            .unwrap()
            .unwrap();

        let second = store
            .close_entry(open.id, t0() + Duration::hours(5), 5.0)
            .await
            .unwrap();
        assert!(second.is_none());

        let stored = store.find_entry(open.id).await.unwrap().unwrap();
        assert_eq!(stored.check_out, first.check_out);
        assert_eq!(stored.regular_hours, Some(2.0));
        assert!(store.close_entry(999, t0(), 1.0).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn entries_sorted_by_check_in_descending() {
        let store = MemoryStore::new();
        for days in [3, 1, 2] {
            let e = store
                .insert_open_entry(1, t0() + Duration::days(days))
                .await
                .unwrap();
            store
                .close_entry(e.id, e.check_in + Duration::hours(1), 1.0)
                .await
                .unwrap();
        }
        let listed = store.entries_for_user(1).await.unwrap();
        let days: Vec<_> = listed.iter().map(|e| e.check_in).collect();
        assert_eq!(
            days,
            vec![
                t0() + Duration::days(3),
                t0() + Duration::days(2),
                t0() + Duration::days(1)
            ]
        );
        let latest = store.latest_entry_for_user(1).await.unwrap().unwrap();
        assert_eq!(latest.check_in, t0() + Duration::days(3));
    }

    #[actix_web::test]
    async fn refresh_token_revocation_is_one_shot() {
        let store = MemoryStore::new();
        store
            .store_refresh_token("jti-1", 1, t0() + Duration::days(7))
            .await
            .unwrap();
        assert!(store.revoke_refresh_token("jti-1").await.unwrap());
        assert!(!store.revoke_refresh_token("jti-1").await.unwrap());
        assert!(!store.revoke_refresh_token("missing").await.unwrap());
        assert!(store.find_refresh_token("jti-1").await.unwrap().unwrap().revoked);
    }
}
