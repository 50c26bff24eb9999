//! AES-128 block codec for SmartView payloads.
//!
//! The TV encrypts each 16-byte block independently with the session key (no IV,
//! no chaining) after PKCS#7 padding. Replies from the device additionally carry
//! null bytes after the padding, which are trimmed before the padding is checked.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::error::{SamError, SamResult};

/// Cipher block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Session key size in bytes.
pub const KEY_SIZE: usize = 16;

fn cipher(key: &[u8]) -> SamResult<Aes128> {
    Aes128::new_from_slice(key).map_err(|_| SamError::InvalidKey(key.len()))
}

/// Pad `plaintext` with PKCS#7 and encrypt it block by block.
///
/// An empty plaintext still produces one full block of padding.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> SamResult<Vec<u8>> {
    let cipher = cipher(key)?;

    let padding = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
    let mut data = Vec::with_capacity(plaintext.len() + padding);
    data.extend_from_slice(plaintext);
    data.resize(plaintext.len() + padding, padding as u8);

    for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(aes::Block::from_mut_slice(chunk));
    }

    Ok(data)
}

/// Decrypt `ciphertext` block by block and strip its padding.
pub fn decrypt(key: &[u8], ciphertext: &[u8]) -> SamResult<Vec<u8>> {
    let cipher = cipher(key)?;

    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(SamError::InvalidLength(ciphertext.len()));
    }

    let mut data = ciphertext.to_vec();
    for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(aes::Block::from_mut_slice(chunk));
    }

    // The device appends null bytes after the PKCS#7 padding.
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    data.truncate(end);

    let unpadded = pkcs7_unpad(&data)?;
    data.truncate(unpadded);
    Ok(data)
}

/// Validate PKCS#7 padding and return the length of the unpadded data.
fn pkcs7_unpad(data: &[u8]) -> SamResult<usize> {
    let pad = *data.last().ok_or(SamError::InvalidPadding)?;
    let pad_len = pad as usize;

    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > data.len() {
        return Err(SamError::InvalidPadding);
    }

    let start = data.len() - pad_len;
    if data[start..].iter().any(|&b| b != pad) {
        return Err(SamError::InvalidPadding);
    }

    Ok(start)
}

/// Render bytes as the device's body format: `"12, 0, 255"`.
pub fn to_byte_list(data: &[u8]) -> String {
    data.iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a session key from its 32-character hex form.
pub fn session_key_from_hex(hex_key: &str) -> SamResult<[u8; KEY_SIZE]> {
    if hex_key.len() != KEY_SIZE * 2 {
        return Err(SamError::Configuration(format!(
            "invalid session key, expected a {}-character hex string",
            KEY_SIZE * 2
        )));
    }
    let bytes = hex::decode(hex_key)
        .map_err(|e| SamError::Configuration(format!("cannot decode session key: {e}")))?;
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&bytes);
    Ok(key)
}
