//! Key Manager - 마스터키 생명주기 관리
//!
//! - 마스터키는 Secret Store에서 1회 로드 (없으면 생성 후 저장)
//! - 이후에는 메모리 캐시만 사용 (Secret Store 재접근 없음)
//! - 회전/만료/다중 키 없음: 설치당 키 1개

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::OnceCell;
use zeroize::Zeroize;

use crate::error::{StoreError, StoreResult};
use crate::secrets::keychain::{SecretStore, SecretStoreError};

/// 마스터키 길이 (256-bit)
pub const MASTER_KEY_LEN: usize = 32;

/// 기본 마스터키 엔트리 이름
pub const DEFAULT_MASTER_KEY_NAME: &str = "talkbox:master_key_v1";

/// Zeroize가 적용된 마스터키 래퍼
///
/// 바이트는 크레이트 밖으로 노출되지 않으며, envelope 코덱에 불투명 핸들로만 전달됩니다.
pub struct MasterKey {
    bytes: [u8; MASTER_KEY_LEN],
}

impl MasterKey {
    pub(crate) fn from_bytes(bytes: [u8; MASTER_KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub(crate) fn bytes(&self) -> &[u8; MASTER_KEY_LEN] {
        &self.bytes
    }

    /// 마스터키 생성 (CSPRNG)
    fn generate() -> Self {
        let mut bytes = [0u8; MASTER_KEY_LEN];
        rand::thread_rng().fill(&mut bytes);
        Self { bytes }
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// Key Manager
///
/// 앱 시작 시 1회 생성하여 Encrypted Store에 핸들로 전달합니다.
/// 캐시는 첫 성공 시 한 번만 채워지고 이후 읽기 전용입니다.
pub struct KeyManager {
    store: Arc<dyn SecretStore>,
    key_name: String,
    cached: OnceCell<Arc<MasterKey>>,
}

impl KeyManager {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self::with_key_name(store, DEFAULT_MASTER_KEY_NAME)
    }

    pub fn with_key_name(store: Arc<dyn SecretStore>, key_name: impl Into<String>) -> Self {
        Self {
            store,
            key_name: key_name.into(),
            cached: OnceCell::new(),
        }
    }

    /// 마스터키 조회 (없으면 생성)
    ///
    /// 동시에 여러 번 호출되어도 Secret Store 접근과 키 생성은 한 번만 일어납니다.
    /// Secret Store에 접근할 수 없으면 `KeyUnavailable`로 실패하며 대체 키는 만들지 않습니다.
    pub async fn get_or_create_master_key(&self) -> StoreResult<Arc<MasterKey>> {
        self.cached
            .get_or_try_init(|| async { self.load_or_create().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// 메모리에 캐시된 키가 있는지 확인 (Secret Store 접근 없음)
    pub fn has_cached_key(&self) -> bool {
        self.cached.initialized()
    }

    async fn load_or_create(&self) -> StoreResult<MasterKey> {
        match self.store.read_secret(&self.key_name).await {
            Ok(Some(mut bytes)) => {
                if bytes.len() != MASTER_KEY_LEN {
                    bytes.zeroize();
                    tracing::error!(key_name = %self.key_name, "stored master key has wrong length");
                    return Err(StoreError::InvalidMasterKey);
                }
                let mut key = [0u8; MASTER_KEY_LEN];
                key.copy_from_slice(&bytes);
                bytes.zeroize();
                let master_key = MasterKey::from_bytes(key);
                key.zeroize();
                tracing::debug!(key_name = %self.key_name, "master key loaded from secret store");
                Ok(master_key)
            }
            Ok(None) => {
                tracing::info!(key_name = %self.key_name, "no master key found, generating new one");
                let key = MasterKey::generate();
                self.store
                    .write_secret(&self.key_name, key.bytes())
                    .await
                    .map_err(map_secret_store_error)?;
                tracing::info!(key_name = %self.key_name, "new master key saved to secret store");
                Ok(key)
            }
            Err(e) => Err(map_secret_store_error(e)),
        }
    }
}

fn map_secret_store_error(err: SecretStoreError) -> StoreError {
    match err {
        SecretStoreError::BadEncoding => StoreError::InvalidMasterKey,
        other => StoreError::KeyUnavailable(other.to_string()),
    }
}
