//! Database Module
//!
//! 두 백엔드가 공유하는 기기 전역 키-값 영역 (SQLite `kv_store` 테이블).
//! 개별 키 단위 set/get/remove는 원자적이며, 여러 키에 걸친 트랜잭션은 제공하지 않습니다.

mod schema;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension};

use crate::error::{StoreError, StoreResult};

/// 데이터베이스 래퍼
///
/// `rusqlite::Connection`은 blocking API이므로 모든 호출은
/// `spawn_blocking` 위에서 실행됩니다.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// 새 데이터베이스 연결 생성
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 메모리 DB (테스트/프리뷰용)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 데이터베이스 스키마 초기화
    pub fn initialize(&self) -> StoreResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(())
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|e| StoreError::Lock(e.to_string()))?;
            f(&*guard)
        })
        .await?
    }

    /// 단일 값 조회 (없으면 `None`)
    pub async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let value = conn
                .query_row("SELECT value FROM kv_store WHERE key = ?1", [&key], |row| {
                    row.get::<_, String>(0)
                })
                .optional()?;
            Ok(value)
        })
        .await
    }

    /// 단일 값 저장 (기존 값은 통째로 교체)
    pub async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?1, ?2)",
                (&key, &value),
            )?;
            Ok(())
        })
        .await
    }

    /// 단일 값 삭제 (없는 키는 무시)
    pub async fn remove_item(&self, key: &str) -> StoreResult<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", [&key])?;
            Ok(())
        })
        .await
    }

    /// 여러 값 조회. 요청 순서대로 `(key, value)` 쌍을 반환합니다.
    pub async fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<(String, Option<String>)>> {
        let keys = keys.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("SELECT value FROM kv_store WHERE key = ?1")?;
            let mut out = Vec::with_capacity(keys.len());
            for key in keys {
                let value = stmt
                    .query_row([&key], |row| row.get::<_, String>(0))
                    .optional()?;
                out.push((key, value));
            }
            Ok(out)
        })
        .await
    }

    /// 여러 값 저장. 키 단위로 쓰며 배치 전체는 원자적이지 않습니다.
    pub async fn multi_set(&self, entries: Vec<(String, String)>) -> StoreResult<()> {
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare("INSERT OR REPLACE INTO kv_store (key, value) VALUES (?1, ?2)")?;
            for (key, value) in &entries {
                stmt.execute((key, value))?;
            }
            Ok(())
        })
        .await
    }

    /// 여러 값 삭제
    pub async fn multi_remove(&self, keys: &[String]) -> StoreResult<()> {
        let keys = keys.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("DELETE FROM kv_store WHERE key = ?1")?;
            for key in &keys {
                stmt.execute([key])?;
            }
            Ok(())
        })
        .await
    }

    /// 특정 prefix로 시작하는 모든 키 조회
    ///
    /// LIKE 대신 substr 비교를 사용하므로 `%`, `_`가 들어간 prefix도 그대로 매칭됩니다.
    pub async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let prefix = prefix.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key FROM kv_store WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
            )?;
            let iter = stmt.query_map([&prefix], |row| row.get::<_, String>(0))?;
            let mut keys = Vec::new();
            for key in iter {
                keys.push(key?);
            }
            Ok(keys)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn memory_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let db = memory_db();

        assert_eq!(db.get_item("a").await.unwrap(), None);

        db.set_item("a", "1").await.unwrap();
        db.set_item("a", "2").await.unwrap();
        assert_eq!(db.get_item("a").await.unwrap(), Some("2".to_string()));

        db.remove_item("a").await.unwrap();
        db.remove_item("a").await.unwrap();
        assert_eq!(db.get_item("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multi_ops_keep_request_order() {
        let db = memory_db();
        db.multi_set(vec![
            ("x".to_string(), "1".to_string()),
            ("y".to_string(), "2".to_string()),
        ])
        .await
        .unwrap();

        let keys = vec!["y".to_string(), "missing".to_string(), "x".to_string()];
        let values = db.multi_get(&keys).await.unwrap();
        assert_eq!(
            values,
            vec![
                ("y".to_string(), Some("2".to_string())),
                ("missing".to_string(), None),
                ("x".to_string(), Some("1".to_string())),
            ]
        );

        db.multi_remove(&["x".to_string(), "y".to_string()])
            .await
            .unwrap();
        assert!(db.keys_with_prefix("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prefix_match_is_literal() {
        let db = memory_db();
        db.set_item("@a_b:one", "1").await.unwrap();
        db.set_item("@aXb:two", "2").await.unwrap();
        db.set_item("other", "3").await.unwrap();

        let keys = db.keys_with_prefix("@a_b:").await.unwrap();
        assert_eq!(keys, vec!["@a_b:one".to_string()]);
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.db");

        {
            let db = Database::new(&path).unwrap();
            db.initialize().unwrap();
            db.set_item("k", "v").await.unwrap();
        }

        let db = Database::new(&path).unwrap();
        db.initialize().unwrap();
        assert_eq!(db.get_item("k").await.unwrap(), Some("v".to_string()));
    }
}
