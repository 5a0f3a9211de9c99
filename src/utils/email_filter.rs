use std::sync::{PoisonError, RwLock};

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;

use crate::store::UserStore;

/// Expected capacity and false-positive rate.
/// The filter grows on its own past the capacity.
const FILTER_CAPACITY: usize = 10_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Fast negative check for "is this email registered?".
///
/// `false` from `might_exist` is definitive; `true` must be confirmed against
/// the store.
pub struct EmailFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for EmailFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

impl EmailFilter {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }

    /// Check if an email might be registered (false positives possible)
    pub fn might_exist(&self, email: &str) -> bool {
        let email = normalize(email);
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&email)
    }

    pub fn insert(&self, email: &str) {
        let email = normalize(email);
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&email);
    }

    pub fn remove(&self, email: &str) {
        let email = normalize(email);
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&email);
    }

    /// Load every registered email, inserting in batches
    pub async fn warmup(&self, store: &dyn UserStore, batch_size: usize) -> Result<usize> {
        let emails = store
            .all_emails()
            .await
            .map_err(|e| anyhow!("loading emails failed: {}", e))?;

        let total = emails.len();
        for batch in emails.chunks(batch_size.max(1)) {
            self.insert_batch(batch);
        }

        log::info!("Email filter warmup complete: {} users", total);
        Ok(total)
    }

    fn insert_batch(&self, emails: &[String]) {
        let mut filter = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        for email in emails {
            filter.add(&normalize(email));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::model::user::NewUser;
    use crate::store::MemoryStore;
    use chrono::Utc;

    #[test]
    fn insert_then_remove() {
        let filter = EmailFilter::new();
        assert!(!filter.might_exist("jane@company.com"));
        filter.insert("Jane@Company.com");
        assert!(filter.might_exist("jane@company.com"));
        filter.remove("jane@company.com");
        assert!(!filter.might_exist("jane@company.com"));
    }

    #[actix_web::test]
    async fn warmup_loads_existing_users() {
        let store = MemoryStore::new();
        for email in ["a@x.io", "b@x.io", "c@x.io"] {
            store
                .insert_user(
                    NewUser {
                        full_name: "Someone".into(),
                        email: email.into(),
                        phone: "1".into(),
                        role: Role::Employee,
                        password_hash: "h".into(),
                    },
                    Utc::now(),
                )
                .await
                .unwrap();
        }

        let filter = EmailFilter::new();
        assert_eq!(filter.warmup(&store, 2).await.unwrap(), 3);
        assert!(filter.might_exist("b@x.io"));
    }
}
