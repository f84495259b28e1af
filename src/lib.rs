//! TalkBox - 암호화 로컬 저장소 코어
//!
//! 의사소통 보조 앱의 개인 데이터(프로필, 연락처, 의료 메모, 기록)를
//! 기기에 저장하는 키-값 저장소입니다. 키체인을 쓸 수 있으면 envelope 암호화 백엔드,
//! 쓸 수 없으면 평문 백엔드를 시작 시 한 번 선택합니다.

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod models;
pub mod secrets;
pub mod storage;
pub mod telemetry;

use std::sync::Arc;

pub use config::{SecureStoreMode, StoreConfig};
pub use entities::AppData;
pub use error::{StoreError, StoreResult};
pub use storage::{select_backend, Storage};

use crate::db::Database;
use crate::secrets::{KeyManager, KeyringSecretStore};

/// 설정에 따라 DB를 열고 백엔드를 선택해 `Storage`를 만듭니다 (앱 시작 시 1회)
pub async fn open(config: &StoreConfig) -> StoreResult<Storage> {
    let data_dir = config.data_dir.clone();
    let database_path = config.database_path();
    let db = tokio::task::spawn_blocking(move || -> StoreResult<Database> {
        std::fs::create_dir_all(&data_dir)?;
        let db = Database::new(&database_path)?;
        db.initialize()?;
        Ok(db)
    })
    .await??;

    let keychain = KeyringSecretStore::new(config.keychain_service.clone());
    let secure_store_available = match config.secure_store {
        SecureStoreMode::On => true,
        SecureStoreMode::Off => false,
        SecureStoreMode::Auto => {
            let probe = keychain.clone();
            tokio::task::spawn_blocking(move || probe.probe()).await?
        }
    };
    tracing::info!(
        mode = ?config.secure_store,
        secure_store_available,
        "storage capability resolved"
    );

    let key_manager = KeyManager::with_key_name(Arc::new(keychain), config.master_key_name.clone());
    Ok(select_backend(secure_store_available, db, key_manager))
}

/// `.env`/환경 변수 설정을 읽고, 로깅을 켠 뒤 저장소를 엽니다
pub async fn start() -> StoreResult<Storage> {
    let config = StoreConfig::from_env()?;
    if let Err(e) = telemetry::init_tracing(&config.log_level) {
        // 호스트 앱이 이미 subscriber를 설치한 경우
        tracing::debug!(error = %e, "tracing subscriber not installed");
    }
    open(&config).await
}
