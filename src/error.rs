//! TalkBox Error Types
//!
//! 저장소 코어 전역 에러 타입 정의

use thiserror::Error;

/// 저장소 코어 에러
///
/// 백엔드 내부에서만 `Result`로 전파되고, 파사드(`Storage`)에서
/// `bool` / `Option`으로 평탄화됩니다.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Master key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("Invalid master key format")]
    InvalidMasterKey,

    #[error("Storage lock poisoned: {0}")]
    Lock(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// 로그 필드용 안정적인 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Database(_) => "DB_ERROR",
            StoreError::Io(_) => "IO_ERROR",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
            StoreError::KeyUnavailable(_) => "KEY_UNAVAILABLE",
            StoreError::InvalidMasterKey => "INVALID_MASTER_KEY",
            StoreError::Lock(_) => "LOCK_ERROR",
            StoreError::Task(_) => "TASK_ERROR",
            StoreError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}

/// 저장소 결과 타입
pub type StoreResult<T> = Result<T, StoreError>;
