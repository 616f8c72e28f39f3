//! AES-CBC helpers for the encryption layer.
//!
//! Encrypted payloads carry a fresh 16-byte IV as their first block;
//! plaintext is padded PKCS#5-style on encrypt and the padding stripped on
//! decrypt.

use crate::error::EncryptionError;
use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::Rng;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Encrypts with AES-CBC, prepending a random IV. The key length selects
/// AES-128 or AES-256.
pub fn encrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let mut iv = [0u8; 16];
    rand::thread_rng().fill(&mut iv);
    encrypt_with_iv(key, &iv, data)
}

/// Encrypts with AES-CBC under a caller-chosen IV, prepending it.
pub fn encrypt_with_iv(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let padded_len = (data.len() / 16 + 1) * 16;
    let mut buf = vec![0u8; padded_len];
    buf[..data.len()].copy_from_slice(data);

    let ciphertext_len = match key.len() {
        16 => {
            let enc = Aes128CbcEnc::new_from_slices(key, iv)
                .map_err(|e| EncryptionError::CipherFailed(e.to_string()))?;
            enc.encrypt_padded_mut::<Pkcs7>(&mut buf, data.len())
                .map_err(|e| EncryptionError::CipherFailed(format!("{:?}", e)))?
                .len()
        }
        32 => {
            let enc = Aes256CbcEnc::new_from_slices(key, iv)
                .map_err(|e| EncryptionError::CipherFailed(e.to_string()))?;
            enc.encrypt_padded_mut::<Pkcs7>(&mut buf, data.len())
                .map_err(|e| EncryptionError::CipherFailed(format!("{:?}", e)))?
                .len()
        }
        other => {
            return Err(EncryptionError::CipherFailed(format!(
                "AES key must be 16 or 32 bytes, got {}",
                other
            )))
        }
    };
    buf.truncate(ciphertext_len);

    let mut out = Vec::with_capacity(16 + buf.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(&buf);
    Ok(out)
}

/// Decrypts AES-CBC data whose first 16 bytes are the IV.
pub fn decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    if data.len() < 32 || data.len() % 16 != 0 {
        return Err(EncryptionError::CipherFailed(format!(
            "AES payload length {} is not a whole number of blocks plus IV",
            data.len()
        )));
    }
    let (iv, ciphertext) = data.split_at(16);
    let mut buf = ciphertext.to_vec();

    let plain_len = match key.len() {
        16 => {
            let dec = Aes128CbcDec::new_from_slices(key, iv)
                .map_err(|e| EncryptionError::CipherFailed(e.to_string()))?;
            dec.decrypt_padded_mut::<Pkcs7>(&mut buf)
                .map_err(|e| EncryptionError::CipherFailed(format!("{:?}", e)))?
                .len()
        }
        32 => {
            let dec = Aes256CbcDec::new_from_slices(key, iv)
                .map_err(|e| EncryptionError::CipherFailed(e.to_string()))?;
            dec.decrypt_padded_mut::<Pkcs7>(&mut buf)
                .map_err(|e| EncryptionError::CipherFailed(format!("{:?}", e)))?
                .len()
        }
        other => {
            return Err(EncryptionError::CipherFailed(format!(
                "AES key must be 16 or 32 bytes, got {}",
                other
            )))
        }
    };
    buf.truncate(plain_len);
    Ok(buf)
}

/// AES-256-CBC without padding, zero-IV allowed; used for the UE/OE values.
pub fn cbc256_no_padding(
    key: &[u8],
    iv: &[u8; 16],
    data: &[u8],
    encrypting: bool,
) -> Result<Vec<u8>, EncryptionError> {
    if data.len() % 16 != 0 {
        return Err(EncryptionError::CipherFailed(
            "data must be block-aligned for no-padding mode".to_string(),
        ));
    }
    let mut buf = data.to_vec();
    if encrypting {
        let enc = Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|e| EncryptionError::CipherFailed(e.to_string()))?;
        enc.encrypt_padded_mut::<NoPadding>(&mut buf, data.len())
            .map_err(|e| EncryptionError::CipherFailed(format!("{:?}", e)))?;
    } else {
        let dec = Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|e| EncryptionError::CipherFailed(e.to_string()))?;
        dec.decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|e| EncryptionError::CipherFailed(format!("{:?}", e)))?;
    }
    Ok(buf)
}

/// Single-block AES-256-ECB; used for the /Perms value.
pub fn ecb256_block(key: &[u8], block: &[u8; 16], encrypting: bool) -> Result<[u8; 16], EncryptionError> {
    use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

    let cipher = aes::Aes256::new_from_slice(key)
        .map_err(|e| EncryptionError::CipherFailed(e.to_string()))?;
    let mut b = aes::cipher::generic_array::GenericArray::clone_from_slice(block);
    if encrypting {
        cipher.encrypt_block(&mut b);
    } else {
        cipher.decrypt_block(&mut b);
    }
    let mut out = [0u8; 16];
    out.copy_from_slice(&b);
    Ok(out)
}
