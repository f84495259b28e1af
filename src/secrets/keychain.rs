//! Secret Store 구현
//!
//! OS 키체인/키링을 사용해 마스터키 같은 작은 시크릿을 저장합니다.
//! 키체인이 없는 실행 환경(프리뷰/테스트)을 위해 메모리 구현도 제공합니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use keyring::{Entry, Error as KeyringError};

/// 키체인 접근 가능 여부 확인용 엔트리 이름
const PROBE_ENTRY: &str = "talkbox:probe";

/// Secret Store 오류
#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    /// 현재 실행 환경이 보호된 시크릿 저장소를 제공하지 않음
    #[error("Secret store unavailable: {0}")]
    Unavailable(String),

    #[error("Secret store error: {0}")]
    Platform(String),

    #[error("Stored secret is not valid base64")]
    BadEncoding,
}

/// 플랫폼 시크릿 저장소 계약
///
/// 코어는 이 trait을 소비만 하며, 구현체는 시작 시 주입됩니다.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// 시크릿 읽기 (없으면 `None`)
    async fn read_secret(&self, name: &str) -> Result<Option<Vec<u8>>, SecretStoreError>;

    /// 시크릿 쓰기
    async fn write_secret(&self, name: &str, value: &[u8]) -> Result<(), SecretStoreError>;
}

fn map_keyring_error(err: KeyringError) -> SecretStoreError {
    match err {
        KeyringError::NoStorageAccess(e) => SecretStoreError::Unavailable(e.to_string()),
        KeyringError::PlatformFailure(e) => SecretStoreError::Unavailable(e.to_string()),
        other => SecretStoreError::Platform(other.to_string()),
    }
}

/// OS 키체인 기반 Secret Store
///
/// 키체인은 문자열만 저장하므로 바이트는 base64로 인코딩합니다.
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
}

impl KeyringSecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// 현재 실행 환경에서 키체인에 접근 가능한지 확인 (blocking)
    ///
    /// 엔트리가 없다는 응답도 "접근 가능"으로 취급합니다.
    pub fn probe(&self) -> bool {
        let entry = match Entry::new(&self.service, PROBE_ENTRY) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "keychain entry could not be created");
                return false;
            }
        };
        match entry.get_password() {
            Ok(_) | Err(KeyringError::NoEntry) => true,
            Err(e) => {
                tracing::debug!(error = %e, "keychain probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl SecretStore for KeyringSecretStore {
    async fn read_secret(&self, name: &str) -> Result<Option<Vec<u8>>, SecretStoreError> {
        let service = self.service.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &name).map_err(map_keyring_error)?;
            let encoded = match entry.get_password() {
                Ok(value) => value,
                Err(KeyringError::NoEntry) => return Ok(None),
                Err(e) => return Err(map_keyring_error(e)),
            };
            let bytes = BASE64
                .decode(encoded.as_bytes())
                .map_err(|_| SecretStoreError::BadEncoding)?;
            Ok(Some(bytes))
        })
        .await
        .map_err(|e| SecretStoreError::Platform(e.to_string()))?
    }

    async fn write_secret(&self, name: &str, value: &[u8]) -> Result<(), SecretStoreError> {
        let service = self.service.clone();
        let name = name.to_string();
        let encoded = BASE64.encode(value);
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &name).map_err(map_keyring_error)?;
            entry.set_password(&encoded).map_err(map_keyring_error)
        })
        .await
        .map_err(|e| SecretStoreError::Platform(e.to_string()))?
    }
}

/// 메모리 기반 Secret Store
///
/// 프로세스 재시작 시뮬레이션을 위해 `Arc`로 공유해서 사용합니다.
#[derive(Debug)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
    available: bool,
    reads: AtomicUsize,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self {
            secrets: Mutex::new(HashMap::new()),
            available: true,
            reads: AtomicUsize::new(0),
        }
    }

    /// 모든 호출이 `Unavailable`로 실패하는 저장소
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// 지금까지 `read_secret`이 호출된 횟수
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), SecretStoreError> {
        if self.available {
            Ok(())
        } else {
            Err(SecretStoreError::Unavailable(
                "no secret store in this context".to_string(),
            ))
        }
    }
}

impl Default for MemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn read_secret(&self, name: &str) -> Result<Option<Vec<u8>>, SecretStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let secrets = self
            .secrets
            .lock()
            .map_err(|e| SecretStoreError::Platform(e.to_string()))?;
        Ok(secrets.get(name).cloned())
    }

    async fn write_secret(&self, name: &str, value: &[u8]) -> Result<(), SecretStoreError> {
        self.check_available()?;
        let mut secrets = self
            .secrets
            .lock()
            .map_err(|e| SecretStoreError::Platform(e.to_string()))?;
        secrets.insert(name.to_string(), value.to_vec());
        Ok(())
    }
}
