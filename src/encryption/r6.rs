//! Key schedule for the revision 6 (AES-256) security handler.
//!
//! Revision 6 drops the MD5/RC4 machinery: passwords are stretched with the
//! iterated SHA-2 hash (algorithm 2.A), the file key is random, and the /UE
//! and /OE entries carry it wrapped under password-derived keys. Per-object
//! key mixing does not apply; every object uses the file key directly.

use super::aes;
use crate::error::EncryptionError;
use rand::Rng;
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key material for a revision 6 document.
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct R6Keys {
    /// The 32-byte file encryption key.
    pub file_key: Vec<u8>,
    /// The /O entry (48 bytes).
    pub o_entry: Vec<u8>,
    /// The /U entry (48 bytes).
    pub u_entry: Vec<u8>,
    /// The /OE entry (32 bytes).
    pub oe_entry: Vec<u8>,
    /// The /UE entry (32 bytes).
    pub ue_entry: Vec<u8>,
    /// The /Perms entry (16 bytes).
    pub perms_entry: Vec<u8>,
}

/// Derives fresh key material for writing an encrypted document.
pub fn derive_keys(
    user_password: &str,
    owner_password: &str,
    permissions: i32,
    encrypt_metadata: bool,
) -> Result<R6Keys, EncryptionError> {
    let mut rng = rand::thread_rng();

    let mut user_validation_salt = [0u8; 8];
    let mut user_key_salt = [0u8; 8];
    let mut owner_validation_salt = [0u8; 8];
    let mut owner_key_salt = [0u8; 8];
    rng.fill(&mut user_validation_salt);
    rng.fill(&mut user_key_salt);
    rng.fill(&mut owner_validation_salt);
    rng.fill(&mut owner_key_salt);

    let mut file_key = [0u8; 32];
    rng.fill(&mut file_key);

    let user_pwd = truncate_password(user_password);
    let owner_pwd = truncate_password(owner_password);

    // /U = hash || validation salt || key salt; /UE wraps the file key
    let user_hash = hash_2a(&user_pwd, &user_validation_salt, None)?;
    let mut u_entry = Vec::with_capacity(48);
    u_entry.extend_from_slice(&user_hash);
    u_entry.extend_from_slice(&user_validation_salt);
    u_entry.extend_from_slice(&user_key_salt);

    let user_key = hash_2a(&user_pwd, &user_key_salt, None)?;
    let ue_entry = aes::cbc256_no_padding(&user_key, &[0u8; 16], &file_key, true)?;

    // /O hashes over the full /U value; /OE wraps the file key likewise
    let owner_hash = hash_2a(&owner_pwd, &owner_validation_salt, Some(&u_entry))?;
    let mut o_entry = Vec::with_capacity(48);
    o_entry.extend_from_slice(&owner_hash);
    o_entry.extend_from_slice(&owner_validation_salt);
    o_entry.extend_from_slice(&owner_key_salt);

    let owner_key = hash_2a(&owner_pwd, &owner_key_salt, Some(&u_entry))?;
    let oe_entry = aes::cbc256_no_padding(&owner_key, &[0u8; 16], &file_key, true)?;

    let perms_entry = compute_perms(&file_key, permissions, encrypt_metadata)?;

    Ok(R6Keys {
        file_key: file_key.to_vec(),
        o_entry,
        u_entry,
        oe_entry,
        ue_entry,
        perms_entry,
    })
}

/// Validates a user password against /U and unwraps the file key from /UE.
pub fn verify_user_password(
    password: &str,
    u_entry: &[u8],
    ue_entry: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if u_entry.len() < 48 {
        return Err(EncryptionError::InvalidDictionary(
            "U entry shorter than 48 bytes".to_string(),
        ));
    }
    if ue_entry.len() != 32 {
        return Err(EncryptionError::InvalidDictionary(
            "UE entry is not 32 bytes".to_string(),
        ));
    }
    let pwd = truncate_password(password);
    let validation_salt = &u_entry[32..40];
    let hash = hash_2a(&pwd, validation_salt, None)?;
    if hash != u_entry[..32] {
        return Err(EncryptionError::AuthenticationFailed);
    }
    let key_salt = &u_entry[40..48];
    let wrap_key = hash_2a(&pwd, key_salt, None)?;
    aes::cbc256_no_padding(&wrap_key, &[0u8; 16], ue_entry, false)
}

/// Validates an owner password against /O and unwraps the file key from /OE.
pub fn verify_owner_password(
    password: &str,
    u_entry: &[u8],
    o_entry: &[u8],
    oe_entry: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if o_entry.len() < 48 || u_entry.len() < 48 {
        return Err(EncryptionError::InvalidDictionary(
            "O or U entry shorter than 48 bytes".to_string(),
        ));
    }
    if oe_entry.len() != 32 {
        return Err(EncryptionError::InvalidDictionary(
            "OE entry is not 32 bytes".to_string(),
        ));
    }
    let pwd = truncate_password(password);
    let validation_salt = &o_entry[32..40];
    let hash = hash_2a(&pwd, validation_salt, Some(&u_entry[..48]))?;
    if hash != o_entry[..32] {
        return Err(EncryptionError::AuthenticationFailed);
    }
    let key_salt = &o_entry[40..48];
    let wrap_key = hash_2a(&pwd, key_salt, Some(&u_entry[..48]))?;
    aes::cbc256_no_padding(&wrap_key, &[0u8; 16], oe_entry, false)
}

/// Algorithm 2.A: the iterated password hash.
///
/// Round structure: build 64 repetitions of password || block || u, encrypt
/// with AES-128-CBC keyed from the current block, pick SHA-256/384/512 by the
/// first sixteen bytes mod 3, stop after round 64 once the last byte of the
/// encrypted data is small enough.
fn hash_2a(
    password: &[u8],
    salt: &[u8],
    user_entry: Option<&[u8]>,
) -> Result<[u8; 32], EncryptionError> {
    use ::aes::cipher::block_padding::NoPadding;
    use ::aes::cipher::{BlockEncryptMut, KeyIvInit};
    type Aes128CbcEnc = cbc::Encryptor<::aes::Aes128>;

    let u = user_entry.unwrap_or(&[]);

    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(salt);
    hasher.update(u);
    let initial: [u8; 32] = hasher.finalize().into();

    let mut block = [0u8; 64];
    block[..32].copy_from_slice(&initial);
    let mut block_size = 32usize;

    let mut data = Vec::new();
    let mut round = 0usize;

    loop {
        let repeat_len = password.len() + block_size + u.len();
        let total_len = repeat_len * 64;

        data.clear();
        data.resize(total_len, 0);
        data[..password.len()].copy_from_slice(password);
        data[password.len()..password.len() + block_size].copy_from_slice(&block[..block_size]);
        data[password.len() + block_size..repeat_len].copy_from_slice(u);
        for j in 1..64 {
            data.copy_within(..repeat_len, j * repeat_len);
        }

        let aes_key: &[u8; 16] = block[..16].try_into().expect("block is 64 bytes");
        let aes_iv: &[u8; 16] = block[16..32].try_into().expect("block is 64 bytes");
        let encryptor = Aes128CbcEnc::new(aes_key.into(), aes_iv.into());
        let encrypted = encryptor
            .encrypt_padded_mut::<NoPadding>(&mut data[..total_len], total_len)
            .map_err(|e| EncryptionError::CipherFailed(format!("{:?}", e)))?;

        let remainder: usize = encrypted[..16].iter().map(|&b| b as usize).sum::<usize>() % 3;
        match remainder {
            0 => {
                let hash: [u8; 32] = Sha256::digest(&*encrypted).into();
                block[..32].copy_from_slice(&hash);
            }
            1 => {
                let hash: [u8; 48] = Sha384::digest(&*encrypted).into();
                block[..48].copy_from_slice(&hash);
            }
            _ => {
                let hash: [u8; 64] = Sha512::digest(&*encrypted).into();
                block.copy_from_slice(&hash);
            }
        }
        block_size = remainder * 16 + 32;

        round += 1;
        let last_byte = encrypted[total_len - 1] as usize;
        if round >= 64 && last_byte + 32 <= round {
            break;
        }
        // the exit condition terminates in practice; this is a backstop
        if round > 2048 {
            break;
        }
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&block[..32]);
    Ok(out)
}

/// Truncates a password to at most 127 UTF-8 bytes on a char boundary.
fn truncate_password(password: &str) -> Vec<u8> {
    let bytes = password.as_bytes();
    if bytes.len() <= 127 {
        return bytes.to_vec();
    }
    let mut len = 127;
    while len > 0 && !password.is_char_boundary(len) {
        len -= 1;
    }
    bytes[..len].to_vec()
}

/// Builds and encrypts the 16-byte /Perms block.
fn compute_perms(
    file_key: &[u8],
    permissions: i32,
    encrypt_metadata: bool,
) -> Result<Vec<u8>, EncryptionError> {
    let mut block = [0u8; 16];
    block[0..4].copy_from_slice(&permissions.to_le_bytes());
    block[4..8].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    block[8] = if encrypt_metadata { b'T' } else { b'F' };
    block[9] = b'a';
    block[10] = b'd';
    block[11] = b'b';
    rand::thread_rng().fill(&mut block[12..16]);
    Ok(aes::ecb256_block(file_key, &block, true)?.to_vec())
}

/// Decrypts /Perms and checks the embedded marker and permission bits.
pub fn verify_perms(
    file_key: &[u8],
    perms_entry: &[u8],
    permissions: i32,
) -> Result<bool, EncryptionError> {
    if perms_entry.len() != 16 {
        return Err(EncryptionError::InvalidDictionary(
            "Perms entry is not 16 bytes".to_string(),
        ));
    }
    let mut block = [0u8; 16];
    block.copy_from_slice(perms_entry);
    let plain = aes::ecb256_block(file_key, &block, false)?;
    let p = i32::from_le_bytes([plain[0], plain[1], plain[2], plain[3]]);
    Ok(&plain[9..12] == b"adb" && p == permissions)
}
