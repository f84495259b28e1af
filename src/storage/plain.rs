//! Plain Store
//!
//! 값을 JSON 텍스트 그대로 저장합니다. 암호화 비용이 없으므로 배치 연산은 한 번에 처리하고,
//! 전체 삭제는 병렬로 실행합니다.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;

use crate::db::Database;
use crate::error::StoreResult;
use crate::storage::{logical_key, namespaced, KeyValueStore, PLAIN_NAMESPACE};

pub struct PlainStore {
    db: Database,
}

impl PlainStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for PlainStore {
    fn namespace(&self) -> &str {
        PLAIN_NAMESPACE
    }

    fn is_encrypted(&self) -> bool {
        false
    }

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()> {
        let text = serde_json::to_string(value)?;
        self.db
            .set_item(&namespaced(PLAIN_NAMESPACE, key), &text)
            .await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        match self.db.get_item(&namespaced(PLAIN_NAMESPACE, key)).await? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.db.remove_item(&namespaced(PLAIN_NAMESPACE, key)).await
    }

    async fn multi_get(&self, keys: &[String]) -> StoreResult<HashMap<String, Value>> {
        let stored: Vec<String> = keys
            .iter()
            .map(|key| namespaced(PLAIN_NAMESPACE, key))
            .collect();
        let mut values = HashMap::with_capacity(keys.len());
        for (key, (_, text)) in keys.iter().zip(self.db.multi_get(&stored).await?) {
            let Some(text) = text else {
                continue;
            };
            match serde_json::from_str(&text) {
                Ok(value) => {
                    values.insert(key.clone(), value);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping unreadable entry");
                }
            }
        }
        Ok(values)
    }

    async fn multi_set(&self, entries: &[(String, Value)]) -> StoreResult<()> {
        let mut rows = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            rows.push((namespaced(PLAIN_NAMESPACE, key), serde_json::to_string(value)?));
        }
        self.db.multi_set(rows).await
    }

    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        let stored: Vec<String> = keys
            .iter()
            .map(|key| namespaced(PLAIN_NAMESPACE, key))
            .collect();
        self.db.multi_remove(&stored).await
    }

    async fn list_keys(&self) -> StoreResult<Vec<String>> {
        let stored = self.db.keys_with_prefix(PLAIN_NAMESPACE).await?;
        Ok(stored
            .iter()
            .filter_map(|key| logical_key(PLAIN_NAMESPACE, key))
            .map(str::to_string)
            .collect())
    }

    async fn clear_all(&self) -> StoreResult<()> {
        let stored = self.db.keys_with_prefix(PLAIN_NAMESPACE).await?;
        let results = join_all(stored.iter().map(|key| self.db.remove_item(key))).await;
        for (key, result) in stored.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(key = %key, code = e.code(), error = %e, "failed to erase entry");
            }
        }
        Ok(())
    }
}
