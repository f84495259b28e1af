//! Namespace 마이그레이션
//!
//! 평문 백엔드에 남아 있는 데이터를 암호화 백엔드로 옮깁니다.
//! 백엔드가 바뀌어도 이전 scheme의 데이터를 암묵적으로 읽지 않으므로,
//! 이 작업은 사용자가 Settings에서 명시적으로 실행할 때만 수행됩니다.

use serde::Serialize;

use crate::error::StoreResult;
use crate::storage::KeyValueStore;

/// 마이그레이션 결과
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub migrated: usize,
    pub failed: usize,
    pub details: Vec<String>,
}

/// `source` namespace의 모든 키를 `target`으로 복사하고, 성공한 키는 `source`에서 삭제
///
/// 키 단위로 진행하므로 중간에 실패해도 이미 옮긴 키는 유지됩니다.
pub async fn migrate_namespace(
    source: &dyn KeyValueStore,
    target: &dyn KeyValueStore,
) -> StoreResult<MigrationResult> {
    let mut result = MigrationResult::default();

    for key in source.list_keys().await? {
        let value = match source.get(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                result.details.push(format!("✗ {} unreadable", key));
                result.failed += 1;
                continue;
            }
            Err(e) => {
                result.details.push(format!("✗ {} failed: {}", key, e));
                result.failed += 1;
                continue;
            }
        };

        match target.set(&key, &value).await {
            Ok(()) => {
                if let Err(e) = source.remove(&key).await {
                    tracing::warn!(key = %key, error = %e, "migrated entry could not be removed from source");
                }
                result.details.push(format!("✓ {}", key));
                result.migrated += 1;
            }
            Err(e) => {
                result.details.push(format!("✗ {} failed: {}", key, e));
                result.failed += 1;
            }
        }
    }

    tracing::info!(
        from = %source.namespace(),
        to = %target.namespace(),
        migrated = result.migrated,
        failed = result.failed,
        "namespace migration finished"
    );
    Ok(result)
}
