//! Session storage seam and its implementations.
//!
//! The store is a durable key-value mapping from token to session record.
//! Records are written under both the session and the wallet token so either
//! credential can resolve the session. `set`/`del` acknowledge with a
//! boolean; callers treat a falsy acknowledgment as a failure.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fred::prelude::*;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use super::types::{AppUser, SessionToken, WalletToken};

fn session_key(token: &SessionToken) -> String {
    format!("session:{token}")
}

fn wallet_key(token: &WalletToken) -> String {
    format!("wallet:{token}")
}

/// Durable token-to-session mapping. Implementations must be safe to share
/// across request tasks; per-key operations are assumed atomic, nothing more.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Persist the session record under both tokens.
    async fn set(&self, user: &AppUser) -> Result<bool>;

    /// Resolve a session token into its record, if one exists.
    async fn get(&self, token: &SessionToken) -> Result<Option<AppUser>>;

    /// Delete the record under both tokens. `Ok(false)` when either key was
    /// not present.
    async fn del(&self, session_token: &SessionToken, wallet_token: &WalletToken) -> Result<bool>;
}

/// Redis-backed session storage.
pub struct RedisSessionStorage {
    client: Client,
}

impl RedisSessionStorage {
    /// Connect to the store.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self> {
        let config = Config::from_url(url).context("Invalid session store URL")?;
        let client = Client::new(
            config,
            None,
            None,
            Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
        );
        client
            .init()
            .await
            .context("Failed to connect to the session store")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SessionStorage for RedisSessionStorage {
    async fn set(&self, user: &AppUser) -> Result<bool> {
        let record = serde_json::to_string(user).context("failed to serialize session record")?;
        self.client
            .set::<(), _, _>(session_key(&user.session_token), record.clone(), None, None, false)
            .await
            .context("failed to write session record")?;
        self.client
            .set::<(), _, _>(wallet_key(&user.wallet_token), record, None, None, false)
            .await
            .context("failed to write wallet record")?;
        debug!(fiscal_code = %user.fiscal_code, "session record stored");
        Ok(true)
    }

    async fn get(&self, token: &SessionToken) -> Result<Option<AppUser>> {
        let record: Option<String> = self
            .client
            .get(session_key(token))
            .await
            .context("failed to read session record")?;
        record
            .map(|json| serde_json::from_str(&json).context("corrupted session record"))
            .transpose()
    }

    async fn del(&self, session_token: &SessionToken, wallet_token: &WalletToken) -> Result<bool> {
        let removed: u64 = self
            .client
            .del(vec![session_key(session_token), wallet_key(wallet_token)])
            .await
            .context("failed to delete session record")?;
        Ok(removed == 2)
    }
}

/// In-process session storage for tests and local development.
#[derive(Default)]
pub struct MemorySessionStorage {
    records: RwLock<HashMap<String, AppUser>>,
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held (two per live session).
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn set(&self, user: &AppUser) -> Result<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow::anyhow!("session storage lock poisoned"))?;
        records.insert(session_key(&user.session_token), user.clone());
        records.insert(wallet_key(&user.wallet_token), user.clone());
        Ok(true)
    }

    async fn get(&self, token: &SessionToken) -> Result<Option<AppUser>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("session storage lock poisoned"))?;
        Ok(records.get(&session_key(token)).cloned())
    }

    async fn del(&self, session_token: &SessionToken, wallet_token: &WalletToken) -> Result<bool> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow::anyhow!("session storage lock poisoned"))?;
        let session_removed = records.remove(&session_key(session_token)).is_some();
        let wallet_removed = records.remove(&wallet_key(wallet_token)).is_some();
        Ok(session_removed && wallet_removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::types::{to_app_user, SpidLevel, SpidUser};

    fn sample_user(session: &str, wallet: &str) -> AppUser {
        to_app_user(
            SpidUser {
                name: "Mario".to_string(),
                surname: "Rossi".to_string(),
                fiscal_code: "RSSMRA80A01H501U".to_string(),
                email: None,
                spid_level: SpidLevel::L2,
                spid_idp: "idp1.example".to_string(),
            },
            SessionToken::new(session.to_string()),
            WalletToken::new(wallet.to_string()),
        )
    }

    #[tokio::test]
    async fn memory_store_round_trips_by_session_token() {
        let store = MemorySessionStorage::new();
        let user = sample_user("s1", "w1");

        assert!(store.set(&user).await.expect("set"));
        let found = store
            .get(&SessionToken::new("s1".to_string()))
            .await
            .expect("get");
        assert_eq!(found, Some(user));
    }

    #[tokio::test]
    async fn memory_store_delete_removes_both_keys() {
        let store = MemorySessionStorage::new();
        let user = sample_user("s2", "w2");
        store.set(&user).await.expect("set");
        assert_eq!(store.len(), 2);

        let removed = store
            .del(&user.session_token, &user.wallet_token)
            .await
            .expect("del");
        assert!(removed);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn memory_store_delete_of_unknown_session_acks_false() {
        let store = MemorySessionStorage::new();
        let removed = store
            .del(
                &SessionToken::new("missing".to_string()),
                &WalletToken::new("missing".to_string()),
            )
            .await
            .expect("del");
        assert!(!removed);
    }

    #[tokio::test]
    async fn memory_store_get_of_unknown_token_is_none() {
        let store = MemorySessionStorage::new();
        let found = store
            .get(&SessionToken::new("missing".to_string()))
            .await
            .expect("get");
        assert_eq!(found, None);
    }
}
