//! Storage 모듈
//!
//! 두 백엔드가 같은 `KeyValueStore` 계약을 구현합니다.
//! - `PlainStore`: 평문 JSON (프리뷰/개발 환경 전용)
//! - `EncryptedStore`: envelope 레코드
//!
//! 어떤 백엔드를 쓸지는 프로세스 시작 시 `select_backend`가 한 번만 결정합니다.

pub mod encrypted;
pub mod facade;
pub mod migrate;
pub mod plain;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::db::Database;
use crate::error::StoreResult;
use crate::secrets::KeyManager;

pub use encrypted::EncryptedStore;
pub use facade::Storage;
pub use migrate::MigrationResult;
pub use plain::PlainStore;

/// 평문 백엔드 namespace prefix
pub const PLAIN_NAMESPACE: &str = "@talkbox:";

/// 암호화 백엔드 namespace prefix
pub const ENCRYPTED_NAMESPACE: &str = "@talkbox_secure:";

/// 백엔드 공통 계약
///
/// 없는 키는 에러가 아니라 `None`이며, 빈 namespace에서도 모든 호출이 안전해야 합니다.
/// `multi_get` 결과에는 값이 있는 키만 들어갑니다.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 이 백엔드가 사용하는 namespace prefix
    fn namespace(&self) -> &str;

    /// 값을 암호화해서 저장하는지 여부
    fn is_encrypted(&self) -> bool;

    async fn set(&self, key: &str, value: &Value) -> StoreResult<()>;

    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    async fn remove(&self, key: &str) -> StoreResult<()>;

    async fn multi_get(&self, keys: &[String]) -> StoreResult<HashMap<String, Value>>;

    /// 키 단위로 저장하며 배치 전체는 원자적이지 않습니다.
    async fn multi_set(&self, entries: &[(String, Value)]) -> StoreResult<()>;

    async fn multi_remove(&self, keys: &[String]) -> StoreResult<()>;

    /// 자기 namespace의 논리 키 목록 (prefix 제거)
    async fn list_keys(&self) -> StoreResult<Vec<String>>;

    /// 자기 namespace 전체 삭제 (best-effort)
    async fn clear_all(&self) -> StoreResult<()>;
}

/// 논리 키 → 저장소 키
pub(crate) fn namespaced(namespace: &str, key: &str) -> String {
    format!("{}{}", namespace, key)
}

/// 저장소 키 → 논리 키 (다른 namespace면 `None`)
pub(crate) fn logical_key<'a>(namespace: &str, stored: &'a str) -> Option<&'a str> {
    stored.strip_prefix(namespace)
}

/// 백엔드 선택 (프로세스 시작 시 1회)
///
/// `secure_store_available`이 참이면 `EncryptedStore`, 아니면 `PlainStore`를 사용합니다.
/// 세션 중에는 다시 평가하지 않으며, 키체인 오류가 나도 평문으로 전환하지 않습니다.
pub fn select_backend(
    secure_store_available: bool,
    db: Database,
    key_manager: KeyManager,
) -> Storage {
    let backend: Arc<dyn KeyValueStore> = if secure_store_available {
        tracing::info!(namespace = ENCRYPTED_NAMESPACE, "using encrypted storage backend");
        Arc::new(EncryptedStore::new(db, Arc::new(key_manager)))
    } else {
        tracing::warn!(
            namespace = PLAIN_NAMESPACE,
            "secure store unavailable, using plain storage backend"
        );
        Arc::new(PlainStore::new(db))
    };
    Storage::new(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;

    fn memory_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_namespaces_are_distinct() {
        assert_ne!(PLAIN_NAMESPACE, ENCRYPTED_NAMESPACE);
        assert!(!PLAIN_NAMESPACE.starts_with(ENCRYPTED_NAMESPACE));
        assert!(!ENCRYPTED_NAMESPACE.starts_with(PLAIN_NAMESPACE));
    }

    #[test]
    fn test_key_mapping() {
        let stored = namespaced(PLAIN_NAMESPACE, "profile");
        assert_eq!(stored, "@talkbox:profile");
        assert_eq!(logical_key(PLAIN_NAMESPACE, &stored), Some("profile"));
        assert_eq!(logical_key(ENCRYPTED_NAMESPACE, &stored), None);
    }

    #[tokio::test]
    async fn test_select_backend_follows_capability_flag() {
        let keys = || KeyManager::new(Arc::new(MemorySecretStore::new()));

        let secure = select_backend(true, memory_db(), keys());
        assert!(secure.is_encrypted_backend_active());

        let plain = select_backend(false, memory_db(), keys());
        assert!(!plain.is_encrypted_backend_active());
    }
}
