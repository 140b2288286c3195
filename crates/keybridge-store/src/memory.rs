use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use keybridge_core::{Error, GeneralFlowStore, ProxyAuthorizationCode, Transaction};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct MemoryFlowStore {
    inner: Arc<MemoryFlowStoreInner>,
}

pub(crate) struct MemoryFlowStoreInner {
    pub(crate) transactions: RwLock<HashMap<String, Transaction>>,
    pub(crate) codes: RwLock<HashMap<String, ProxyAuthorizationCode>>,
}

impl MemoryFlowStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryFlowStoreInner {
                transactions: RwLock::new(HashMap::new()),
                codes: RwLock::new(HashMap::new()),
            }),
        }
    }
}

impl Default for MemoryFlowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneralFlowStore for MemoryFlowStore {
    async fn insert_transaction(&self, txn: Transaction) -> Result<(), Error> {
        let now = Utc::now();
        let mut transactions = self.inner.transactions.write().await;
        // inserts double as the sweep for entries nothing ever takes
        transactions.retain(|_, entry| !entry.is_expired(now));
        transactions.insert(txn.txn_id.clone(), txn);
        Ok(())
    }

    async fn take_transaction(&self, txn_id: &str) -> Result<Option<Transaction>, Error> {
        let removed = self.inner.transactions.write().await.remove(txn_id);
        Ok(removed.filter(|txn| !txn.is_expired(Utc::now())))
    }

    async fn insert_code(&self, code: ProxyAuthorizationCode) -> Result<(), Error> {
        let now = Utc::now();
        let mut codes = self.inner.codes.write().await;
        codes.retain(|_, entry| !entry.is_expired(now));
        codes.insert(code.code.clone(), code);
        Ok(())
    }

    async fn take_code(&self, code: &str) -> Result<Option<ProxyAuthorizationCode>, Error> {
        let removed = self.inner.codes.write().await.remove(code);
        Ok(removed.filter(|entry| !entry.is_expired(Utc::now())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use url::Url;
    use uuid::Uuid;

    fn transaction(ttl_secs: i64) -> Transaction {
        Transaction {
            txn_id: Uuid::new_v4().to_string(),
            client_redirect_uri: Url::parse("http://localhost:8666/callback").unwrap(),
            client_state: Some("client-state".to_string()),
            client_pkce_challenge: "challenge".to_string(),
            client_id: Some("client".to_string()),
            scopes: vec!["openid".to_string()],
            upstream_pkce_verifier: None,
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        }
    }

    fn code(value: &str, ttl_secs: i64) -> ProxyAuthorizationCode {
        ProxyAuthorizationCode {
            code: value.to_string(),
            client_redirect_uri: Url::parse("http://localhost:8666/callback").unwrap(),
            client_pkce_challenge: "challenge".to_string(),
            client_id: None,
            idp_tokens: serde_json::json!({
                "access_token": "upstream-access",
                "token_type": "Bearer",
            }),
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        }
    }

    #[tokio::test]
    async fn transaction_take_is_single_use() {
        let store = MemoryFlowStore::new();
        let txn = transaction(60);
        let txn_id = txn.txn_id.clone();

        store.insert_transaction(txn).await.unwrap();
        assert!(store.take_transaction(&txn_id).await.unwrap().is_some());
        assert!(store.take_transaction(&txn_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn code_take_is_single_use() {
        let store = MemoryFlowStore::new();
        store.insert_code(code("once", 60)).await.unwrap();

        assert!(store.take_code("once").await.unwrap().is_some());
        assert!(store.take_code("once").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_ids_yield_none() {
        let store = MemoryFlowStore::new();
        assert!(store.take_transaction("missing").await.unwrap().is_none());
        assert!(store.take_code("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let store = MemoryFlowStore::new();
        let txn = transaction(-1);
        let txn_id = txn.txn_id.clone();
        store.insert_transaction(txn).await.unwrap();
        assert!(store.take_transaction(&txn_id).await.unwrap().is_none());

        store.insert_code(code("expired", -1)).await.unwrap();
        assert!(store.take_code("expired").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_sweeps_dead_entries() {
        let store = MemoryFlowStore::new();
        store.insert_code(code("dead", -1)).await.unwrap();
        store.insert_code(code("alive", 60)).await.unwrap();
        assert_eq!(store.inner.codes.read().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_code_takes_have_one_winner() {
        let store = MemoryFlowStore::new();
        store.insert_code(code("contended", 60)).await.unwrap();

        let attempts = (0..16).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.take_code("contended").await.unwrap() })
        });
        let results = futures::future::join_all(attempts).await;
        let winners = results
            .into_iter()
            .filter(|result| matches!(result, Ok(Some(_))))
            .count();
        assert_eq!(winners, 1);
    }
}
