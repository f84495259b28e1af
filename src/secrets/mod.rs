//! Secrets 모듈
//!
//! Master Key + Envelope 레코드 아키텍처로 저장 데이터를 보호합니다.
//!
//! - Secret Store(키체인)에는 마스터키 1개만 저장 (`talkbox:master_key_v1`)
//! - 각 값은 호출마다 새 nonce로 개별 암호화 (`envelope`)
//! - 마스터키는 `KeyManager`가 메모리 캐시로 보관

pub mod envelope;
pub mod keychain;
pub mod manager;

pub use envelope::AuthenticationFailure;
pub use keychain::{KeyringSecretStore, MemorySecretStore, SecretStore, SecretStoreError};
pub use manager::{KeyManager, MasterKey};
