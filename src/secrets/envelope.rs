//! Envelope 레코드 암호화/복호화
//!
//! 레코드 포맷 (v1), 전체를 base64 텍스트로 저장:
//! - version: 1 byte (`FORMAT_VERSION`)
//! - nonce: 12 bytes (호출마다 새로 생성)
//! - ciphertext: N bytes (평문과 같은 길이)
//! - tag: 32 bytes = SHA-256(master_key ‖ nonce ‖ ciphertext)
//!
//! 키스트림 블록 i = SHA-256(master_key ‖ nonce ‖ offset_be64), offset = i * 32.
//! 복호화는 태그 검증이 끝난 뒤에만 키스트림을 만듭니다 (verify-then-decrypt).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::secrets::manager::MasterKey;

/// 현재 레코드 포맷 버전
pub const FORMAT_VERSION: u8 = 1;

/// Nonce 길이 (96-bit)
pub const NONCE_LEN: usize = 12;

/// 인증 태그 길이 (SHA-256 출력)
pub const TAG_LEN: usize = 32;

const HEADER_LEN: usize = 1 + NONCE_LEN;
const MIN_RECORD_LEN: usize = HEADER_LEN + TAG_LEN;
const KEYSTREAM_BLOCK_LEN: usize = 32;

/// 복호화 실패 사유
///
/// 호출자 입장에서는 모두 "값 없음"과 동일하게 취급됩니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationFailure {
    #[error("record is not valid base64")]
    Encoding,

    #[error("record too short: {0} bytes")]
    Truncated(usize),

    #[error("unsupported record version: {0}")]
    UnsupportedVersion(u8),

    #[error("authentication tag mismatch")]
    TagMismatch,
}

/// 평문을 암호화하여 base64 레코드로 반환
pub fn encrypt(plaintext: &[u8], key: &MasterKey) -> String {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill(&mut nonce);
    encrypt_with_nonce(plaintext, key, &nonce)
}

fn encrypt_with_nonce(plaintext: &[u8], key: &MasterKey, nonce: &[u8; NONCE_LEN]) -> String {
    let mut record = Vec::with_capacity(MIN_RECORD_LEN + plaintext.len());
    record.push(FORMAT_VERSION);
    record.extend_from_slice(nonce);

    let body_start = record.len();
    record.extend_from_slice(plaintext);
    apply_keystream(key, nonce, &mut record[body_start..]);

    let tag = compute_tag(key, nonce, &record[body_start..]);
    record.extend_from_slice(&tag);

    BASE64.encode(&record)
}

/// base64 레코드를 검증 후 복호화
pub fn decrypt(record: &str, key: &MasterKey) -> Result<Vec<u8>, AuthenticationFailure> {
    let raw = BASE64
        .decode(record.as_bytes())
        .map_err(|_| AuthenticationFailure::Encoding)?;

    if raw.len() < MIN_RECORD_LEN {
        return Err(AuthenticationFailure::Truncated(raw.len()));
    }
    if raw[0] != FORMAT_VERSION {
        return Err(AuthenticationFailure::UnsupportedVersion(raw[0]));
    }

    let nonce = &raw[1..HEADER_LEN];
    let (ciphertext, tag) = raw[HEADER_LEN..].split_at(raw.len() - MIN_RECORD_LEN);

    let expected = compute_tag(key, nonce, ciphertext);
    if !constant_time_eq(&expected, tag) {
        return Err(AuthenticationFailure::TagMismatch);
    }

    let mut plaintext = ciphertext.to_vec();
    apply_keystream(key, nonce, &mut plaintext);
    Ok(plaintext)
}

/// 키스트림을 `data`에 XOR (암호화/복호화 공용)
fn apply_keystream(key: &MasterKey, nonce: &[u8], data: &mut [u8]) {
    for (index, chunk) in data.chunks_mut(KEYSTREAM_BLOCK_LEN).enumerate() {
        let offset = (index * KEYSTREAM_BLOCK_LEN) as u64;
        let block = Sha256::new()
            .chain_update(key.bytes())
            .chain_update(nonce)
            .chain_update(offset.to_be_bytes())
            .finalize();
        for (byte, k) in chunk.iter_mut().zip(block.iter()) {
            *byte ^= k;
        }
    }
}

fn compute_tag(key: &MasterKey, nonce: &[u8], ciphertext: &[u8]) -> [u8; TAG_LEN] {
    let digest = Sha256::new()
        .chain_update(key.bytes())
        .chain_update(nonce)
        .chain_update(ciphertext)
        .finalize();
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&digest);
    tag
}

/// 길이가 같으면 내용과 무관하게 같은 시간이 걸리는 비교
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    std::hint::black_box(diff) == 0
}
