//! 저장소 설정
//!
//! `.env` 파일(있으면)을 먼저 로드한 뒤 환경 변수에서 읽습니다.
//! 설정되지 않은 값은 기본값을 사용합니다.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};
use crate::secrets::manager::DEFAULT_MASTER_KEY_NAME;

/// 보호된 시크릿 저장소 사용 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureStoreMode {
    /// 키체인 접근 가능 여부를 시작 시 확인
    Auto,
    On,
    Off,
}

impl FromStr for SecureStoreMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SecureStoreMode::Auto),
            "on" | "true" | "1" => Ok(SecureStoreMode::On),
            "off" | "false" | "0" => Ok(SecureStoreMode::Off),
            other => Err(StoreError::Config(format!(
                "TALKBOX_SECURE_STORE must be auto, on or off (got {:?})",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    pub keychain_service: String,
    pub master_key_name: String,
    pub secure_store: SecureStoreMode,
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            database_file: "talkbox.db".to_string(),
            keychain_service: "com.talkbox.app".to_string(),
            master_key_name: DEFAULT_MASTER_KEY_NAME.to_string(),
            secure_store: SecureStoreMode::Auto,
            log_level: "info".to_string(),
        }
    }
}

impl StoreConfig {
    /// `.env` + 환경 변수에서 설정 로드
    pub fn from_env() -> StoreResult<Self> {
        // production에서는 .env가 없을 수 있으므로 실패해도 무시
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 임의의 조회 함수로 설정 구성 (테스트에서 환경 변수 대신 사용)
    pub fn from_lookup<F>(lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let secure_store = match read("TALKBOX_SECURE_STORE") {
            Some(value) => value.parse()?,
            None => defaults.secure_store,
        };

        let database_file = read("TALKBOX_DB_FILE").unwrap_or(defaults.database_file);
        if database_file.contains('/') || database_file.contains('\\') {
            return Err(StoreError::Config(
                "TALKBOX_DB_FILE must be a file name, not a path".to_string(),
            ));
        }

        Ok(Self {
            data_dir: read("TALKBOX_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            database_file,
            keychain_service: read("TALKBOX_KEYCHAIN_SERVICE").unwrap_or(defaults.keychain_service),
            master_key_name: read("TALKBOX_MASTER_KEY_NAME").unwrap_or(defaults.master_key_name),
            secure_store,
            log_level: read("TALKBOX_LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// DB 파일 경로
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.secure_store, SecureStoreMode::Auto);
        assert_eq!(config.master_key_name, "talkbox:master_key_v1");
        assert_eq!(config.database_path(), PathBuf::from("./data/talkbox.db"));
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("TALKBOX_DATA_DIR", "/tmp/tb"),
            ("TALKBOX_SECURE_STORE", "OFF"),
            ("TALKBOX_LOG_LEVEL", "debug"),
            ("TALKBOX_KEYCHAIN_SERVICE", "  "),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/tb"));
        assert_eq!(config.secure_store, SecureStoreMode::Off);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.keychain_service, "com.talkbox.app");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[("TALKBOX_SECURE_STORE", "maybe")]))
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");

        let err =
            StoreConfig::from_lookup(lookup(&[("TALKBOX_DB_FILE", "../x.db")])).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
