//! Storage Facade
//!
//! 호출자에게 노출되는 단일 저장소 API. 선택된 백엔드와 무관하게 같은 결과를 돌려주며,
//! 어떤 연산도 에러를 호출자에게 던지지 않습니다 (`bool` / `Option`으로 평탄화 + 로그).

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::storage::migrate::{migrate_namespace, MigrationResult};
use crate::storage::KeyValueStore;

fn report(op: &'static str, key: &str, err: &StoreError) {
    tracing::error!(op, key = %key, code = err.code(), error = %err, "storage operation failed");
}

/// 저장소 파사드
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// 암호화 백엔드 사용 여부
    pub fn is_encrypted_backend_active(&self) -> bool {
        self.backend.is_encrypted()
    }

    /// 현재 백엔드의 namespace prefix
    pub fn namespace(&self) -> &str {
        self.backend.namespace()
    }

    pub async fn set(&self, key: &str, value: &Value) -> bool {
        match self.backend.set(key, value).await {
            Ok(()) => true,
            Err(e) => {
                report("set", key, &e);
                false
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                report("get", key, &e);
                None
            }
        }
    }

    pub async fn remove(&self, key: &str) -> bool {
        match self.backend.remove(key).await {
            Ok(()) => true,
            Err(e) => {
                report("remove", key, &e);
                false
            }
        }
    }

    /// 값이 있는 키만 담긴 맵. 실패 시 빈 맵.
    pub async fn multi_get(&self, keys: &[String]) -> HashMap<String, Value> {
        match self.backend.multi_get(keys).await {
            Ok(values) => values,
            Err(e) => {
                report("multi_get", &keys.join(","), &e);
                HashMap::new()
            }
        }
    }

    pub async fn multi_set(&self, entries: &[(String, Value)]) -> bool {
        match self.backend.multi_set(entries).await {
            Ok(()) => true,
            Err(e) => {
                let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                report("multi_set", &keys.join(","), &e);
                false
            }
        }
    }

    pub async fn multi_remove(&self, keys: &[String]) -> bool {
        match self.backend.multi_remove(keys).await {
            Ok(()) => true,
            Err(e) => {
                report("multi_remove", &keys.join(","), &e);
                false
            }
        }
    }

    pub async fn list_keys(&self) -> Vec<String> {
        match self.backend.list_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                report("list_keys", "*", &e);
                Vec::new()
            }
        }
    }

    /// 현재 namespace 전체 삭제
    ///
    /// 사용자가 명시적으로 "모두 지우기"를 실행할 때만 호출되며, 개별 항목 삭제 실패는
    /// 로그만 남기고 성공으로 보고합니다.
    pub async fn clear_all(&self) -> bool {
        match self.backend.clear_all().await {
            Ok(()) => true,
            Err(e) => {
                report("clear_all", "*", &e);
                false
            }
        }
    }

    /// 타입 값을 JSON으로 직렬화해서 저장
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, &value).await,
            Err(e) => {
                report("set", key, &StoreError::Serialization(e));
                false
            }
        }
    }

    /// 저장된 값을 타입으로 역직렬화 (모양이 다르면 `None`)
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                report("get", key, &StoreError::Serialization(e));
                None
            }
        }
    }

    /// 알려진 모든 논리 키를 한 번의 `multi_get`으로 읽고, 값이 없는 키는 기본값으로 채움
    ///
    /// 앱 시작 시 1회 사용합니다.
    pub async fn load_all_with_defaults(
        &self,
        defaults: &[(String, Value)],
    ) -> HashMap<String, Value> {
        let keys: Vec<String> = defaults.iter().map(|(key, _)| key.clone()).collect();
        let mut values = self.multi_get(&keys).await;
        for (key, default) in defaults {
            values
                .entry(key.clone())
                .or_insert_with(|| default.clone());
        }
        values
    }

    /// 다른 백엔드의 데이터를 현재 백엔드로 옮김 (사용자가 명시적으로 실행)
    ///
    /// 같은 namespace끼리는 옮기지 않습니다.
    pub async fn migrate_from(&self, source: &dyn KeyValueStore) -> Option<MigrationResult> {
        if source.namespace() == self.backend.namespace() {
            tracing::warn!(namespace = %source.namespace(), "refusing to migrate a namespace onto itself");
            return None;
        }
        match migrate_namespace(source, self.backend.as_ref()).await {
            Ok(result) => Some(result),
            Err(e) => {
                report("migrate", source.namespace(), &e);
                None
            }
        }
    }
}
