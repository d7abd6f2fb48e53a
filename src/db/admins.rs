// Administrator directory keyed by SSO subject

use chrono::{DateTime, Utc};

use super::memory_store::{MemoryStore, Table};
use crate::models::admin::AdminAccount;

#[derive(Debug, Default)]
pub struct AdminRepository {
    store: MemoryStore<Table<AdminAccount>>,
}

impl AdminRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision on first login, refresh profile fields on later ones.
    /// The account id is stable for a given external subject.
    pub async fn upsert_by_subject(
        &self,
        external_subject: &str,
        email: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> AdminAccount {
        let mut table = self.store.write().await;

        let existing = table
            .values()
            .find(|a| a.external_subject == external_subject)
            .map(|a| a.id);

        if let Some(id) = existing {
            if let Some(account) = table.get_mut(id) {
                account.email = email.to_string();
                account.display_name = display_name.to_string();
                account.last_login_at = now;
                return account.clone();
            }
        }

        table
            .insert_with(|id| AdminAccount {
                id,
                email: email.to_string(),
                display_name: display_name.to_string(),
                external_subject: external_subject.to_string(),
                created_at: now,
                last_login_at: now,
            })
            .clone()
    }

    pub async fn find_by_id(&self, id: i64) -> Option<AdminAccount> {
        self.store.read().await.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_keeps_id() {
        let repo = AdminRepository::new();
        let first = repo
            .upsert_by_subject("kc-1", "a@x.com", "A", Utc::now())
            .await;
        let again = repo
            .upsert_by_subject("kc-1", "a2@x.com", "A2", Utc::now())
            .await;
        let other = repo
            .upsert_by_subject("kc-2", "b@x.com", "B", Utc::now())
            .await;

        assert_eq!(first.id, again.id);
        assert_eq!(again.email, "a2@x.com");
        assert_ne!(first.id, other.id);
    }
}
