//! 로깅 초기화

use tracing_subscriber::EnvFilter;

use crate::error::{StoreError, StoreResult};

/// 전역 tracing subscriber 설치
///
/// `RUST_LOG`가 있으면 그것을, 없으면 `log_level`을 필터로 사용합니다.
/// 이미 설치되어 있으면 `Config` 에러를 반환합니다.
pub fn init_tracing(log_level: &str) -> StoreResult<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .map_err(|e| StoreError::Config(format!("invalid log level {:?}: {}", log_level, e)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .map_err(|e| StoreError::Config(format!("failed to initialise tracing subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_is_installed_once() {
        assert!(init_tracing("debug").is_ok());
        tracing::info!("subscriber installed");

        let err = init_tracing("debug").unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
