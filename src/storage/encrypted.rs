//! Encrypted Store
//!
//! 값을 JSON으로 직렬화한 뒤 envelope 레코드로 암호화해서 저장합니다.
//! - 복호화 실패(변조/손상/알 수 없는 버전)는 "값 없음"으로 취급
//! - 마스터키를 쓸 수 없으면 모든 연산이 `KeyUnavailable`로 실패
//! - 배치 연산은 키 하나씩 순차 실행

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use zeroize::Zeroizing;

use crate::db::Database;
use crate::error::StoreResult;
use crate::secrets::{envelope, KeyManager, MasterKey};
use crate::storage::{logical_key, namespaced, KeyValueStore, ENCRYPTED_NAMESPACE};

pub struct EncryptedStore {
    db: Database,
    keys: Arc<KeyManager>,
}

impl EncryptedStore {
    pub fn new(db: Database, keys: Arc<KeyManager>) -> Self {
        Self { db, keys }
    }

    /// 마스터키를 쓸 수 없으면 어떤 연산도 진행하지 않음
    async fn ensure_key(&self) -> StoreResult<()> {
        self.keys.get_or_create_master_key().await.map(|_| ())
    }

    async fn read(&self, key: &str, master_key: &MasterKey) -> StoreResult<Option<Value>> {
        let Some(record) = self
            .db
            .get_item(&namespaced(ENCRYPTED_NAMESPACE, key))
            .await?
        else {
            return Ok(None);
        };

        let plaintext = match envelope::decrypt(&record, master_key) {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(reason) => {
                tracing::warn!(key = %key, %reason, "discarding unreadable record");
                return Ok(None);
            }
        };
        Ok(Some(serde_json::from_slice(&plaintext)?))
    }
}

#[async_trait]
impl KeyValueStore for EncryptedStore {
    fn namespace(&self) -> &str {
        ENCRYPTED_NAMESPACE
    }

    fn is_encrypted(&self) -> bool {
        true
    }

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()> {
        let master_key = self.keys.get_or_create_master_key().await?;
        let plaintext = Zeroizing::new(serde_json::to_vec(value)?);
        let record = envelope::encrypt(&plaintext, &master_key);
        self.db
            .set_item(&namespaced(ENCRYPTED_NAMESPACE, key), &record)
            .await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let master_key = self.keys.get_or_create_master_key().await?;
        self.read(key, &master_key).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.ensure_key().await?;
        self.db
            .remove_item(&namespaced(ENCRYPTED_NAMESPACE, key))
            .await
    }

    async fn multi_get(&self, keys: &[String]) -> StoreResult<HashMap<String, Value>> {
        let master_key = self.keys.get_or_create_master_key().await?;
        let mut values = HashMap::with_capacity(keys.len());
        for key in keys {
            match self.read(key, &master_key).await {
                Ok(Some(value)) => {
                    values.insert(key.clone(), value);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key = %key, code = e.code(), error = %e, "skipping unreadable entry");
                }
            }
        }
        Ok(values)
    }

    async fn multi_set(&self, entries: &[(String, Value)]) -> StoreResult<()> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        self.ensure_key().await?;
        for key in keys {
            self.db
                .remove_item(&namespaced(ENCRYPTED_NAMESPACE, key))
                .await?;
        }
        Ok(())
    }

    async fn list_keys(&self) -> StoreResult<Vec<String>> {
        self.ensure_key().await?;
        let stored = self.db.keys_with_prefix(ENCRYPTED_NAMESPACE).await?;
        Ok(stored
            .iter()
            .filter_map(|key| logical_key(ENCRYPTED_NAMESPACE, key))
            .map(str::to_string)
            .collect())
    }

    async fn clear_all(&self) -> StoreResult<()> {
        self.ensure_key().await?;
        let stored = self.db.keys_with_prefix(ENCRYPTED_NAMESPACE).await?;
        for key in &stored {
            if let Err(e) = self.db.remove_item(key).await {
                tracing::warn!(key = %key, code = e.code(), error = %e, "failed to erase entry");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::secrets::envelope::FORMAT_VERSION;
    use crate::secrets::MemorySecretStore;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde_json::json;

    fn store_with(secrets: Arc<MemorySecretStore>) -> (EncryptedStore, Database) {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let keys = Arc::new(KeyManager::new(secrets));
        (EncryptedStore::new(db.clone(), keys), db)
    }

    fn store() -> (EncryptedStore, Database) {
        store_with(Arc::new(MemorySecretStore::new()))
    }

    #[tokio::test]
    async fn test_values_are_not_stored_in_plaintext() {
        let (store, db) = store();
        store
            .set("profile", &json!({"medicalNotes": "insulin"}))
            .await
            .unwrap();

        let raw = db
            .get_item("@talkbox_secure:profile")
            .await
            .unwrap()
            .unwrap();
        assert!(!raw.contains("insulin"));
        assert_eq!(BASE64.decode(&raw).unwrap()[0], FORMAT_VERSION);

        assert_eq!(
            store.get("profile").await.unwrap(),
            Some(json!({"medicalNotes": "insulin"}))
        );
    }

    #[tokio::test]
    async fn test_overwrite_replaces_record() {
        let (store, db) = store();
        store.set("k", &json!("v1")).await.unwrap();
        let first = db.get_item("@talkbox_secure:k").await.unwrap();
        store.set("k", &json!("v1")).await.unwrap();
        let second = db.get_item("@talkbox_secure:k").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.get("k").await.unwrap(), Some(json!("v1")));
    }

    #[tokio::test]
    async fn test_tampered_record_reads_as_absent() {
        let (store, db) = store();
        store.set("history", &json!(["hello"])).await.unwrap();

        let raw = db.get_item("@talkbox_secure:history").await.unwrap().unwrap();
        let mut bytes = BASE64.decode(&raw).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        db.set_item("@talkbox_secure:history", &BASE64.encode(&bytes))
            .await
            .unwrap();

        assert_eq!(store.get("history").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_record_reads_as_absent() {
        let (store, db) = store();
        db.set_item("@talkbox_secure:gallery", "definitely not a record")
            .await
            .unwrap();

        assert_eq!(store.get("gallery").await.unwrap(), None);
        assert!(store
            .multi_get(&["gallery".to_string()])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_secret_store_fails_every_operation() {
        let (store, db) = store_with(Arc::new(MemorySecretStore::unavailable()));
        db.set_item("@talkbox_secure:profile", "stale record")
            .await
            .unwrap();
        let keys = vec!["profile".to_string()];

        let unavailable =
            |result: StoreResult<()>| matches!(result, Err(StoreError::KeyUnavailable(_)));
        assert!(unavailable(store.set("k", &json!(1)).await));
        assert!(unavailable(store.get("k").await.map(|_| ())));
        assert!(unavailable(store.remove("profile").await));
        assert!(unavailable(store.multi_get(&keys).await.map(|_| ())));
        assert!(unavailable(
            store.multi_set(&[("k".to_string(), json!(1))]).await
        ));
        assert!(unavailable(store.multi_remove(&keys).await));
        assert!(unavailable(store.list_keys().await.map(|_| ())));
        assert!(unavailable(store.clear_all().await));

        // 아무 것도 지워지지 않음
        assert_eq!(
            db.get_item("@talkbox_secure:profile").await.unwrap(),
            Some("stale record".to_string())
        );
    }

    #[tokio::test]
    async fn test_multi_get_skips_unreadable_entry_and_keeps_others() {
        let (store, db) = store();
        store.set("profile", &json!({"name": "Ana"})).await.unwrap();
        store.set("settings", &json!({"textSize": 18})).await.unwrap();
        db.set_item("@talkbox_secure:history", "not a record")
            .await
            .unwrap();

        let values = store
            .multi_get(&[
                "profile".to_string(),
                "history".to_string(),
                "settings".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values["profile"], json!({"name": "Ana"}));
        assert_eq!(values["settings"], json!({"textSize": 18}));
    }

    #[tokio::test]
    async fn test_records_readable_after_restart() {
        let secrets = Arc::new(MemorySecretStore::new());
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        {
            let keys = Arc::new(KeyManager::new(secrets.clone()));
            let store = EncryptedStore::new(db.clone(), keys);
            store.set("categories", &json!([{"id": "food"}])).await.unwrap();
        }

        let keys = Arc::new(KeyManager::new(secrets.clone()));
        let store = EncryptedStore::new(db, keys);
        assert_eq!(
            store.get("categories").await.unwrap(),
            Some(json!([{"id": "food"}]))
        );
    }

    #[tokio::test]
    async fn test_batch_operations_and_clear() {
        let (store, db) = store();
        db.set_item("@talkbox:profile", "{}").await.unwrap();

        store
            .multi_set(&[
                ("a".to_string(), json!({"x": 1})),
                ("b".to_string(), json!("two")),
            ])
            .await
            .unwrap();
        assert_eq!(
            store.list_keys().await.unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );

        let values = store
            .multi_get(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values["a"], json!({"x": 1}));

        store.multi_remove(&["a".to_string()]).await.unwrap();
        assert_eq!(store.list_keys().await.unwrap(), vec!["b".to_string()]);

        store.clear_all().await.unwrap();
        assert!(store.list_keys().await.unwrap().is_empty());
        // 평문 namespace는 그대로
        assert_eq!(
            db.get_item("@talkbox:profile").await.unwrap(),
            Some("{}".to_string())
        );
    }
}
