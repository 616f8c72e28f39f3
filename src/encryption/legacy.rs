//! Key schedule for the standard security handler, revisions 2 through 4.
//!
//! These are the numbered algorithms of the classic security handler: 3.2
//! derives the file key from the user password, 3.3 builds /O, 3.4 and 3.5
//! build /U, 3.6 and 3.7 check passwords, and 3.1 mixes the file key with an
//! object's id and generation to produce the per-object cipher key.

use super::rc4::Rc4;
use md5::{Digest, Md5};

/// The 32-byte padding constant every password is padded with.
pub const PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

// Appended to the MD5 input for AES per-object keys.
const AES_SALT: [u8; 4] = [0x73, 0x41, 0x6C, 0x54];

/// Truncates or pads a password to exactly 32 bytes.
fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let n = password.len().min(32);
    out[..n].copy_from_slice(&password[..n]);
    out[n..].copy_from_slice(&PAD[..32 - n]);
    out
}

fn md5(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Algorithm 3.1: per-object key.
///
/// File key, low three bytes of the object number, low two bytes of the
/// generation, the `sAlT` marker when the cipher is AES; MD5; first
/// `min(len + 5, 16)` bytes.
pub fn object_key(file_key: &[u8], number: u32, generation: u16, aes: bool) -> Vec<u8> {
    let mut input = file_key.to_vec();
    input.push((number & 0xFF) as u8);
    input.push(((number >> 8) & 0xFF) as u8);
    input.push(((number >> 16) & 0xFF) as u8);
    input.push((generation & 0xFF) as u8);
    input.push(((generation >> 8) & 0xFF) as u8);
    if aes {
        input.extend_from_slice(&AES_SALT);
    }
    let digest = md5(&[&input]);
    let key_len = (file_key.len() + 5).min(16);
    digest[..key_len].to_vec()
}

/// Algorithm 3.2: file encryption key from the user password.
#[allow(clippy::too_many_arguments)]
pub fn file_key(
    revision: u32,
    length_bytes: usize,
    user_password: &[u8],
    o_entry: &[u8],
    p: i64,
    file_id_first: &[u8],
    encrypt_metadata: bool,
) -> Vec<u8> {
    let padded = pad_password(user_password);
    let p_low = (p as u32).to_le_bytes();

    let mut hasher = Md5::new();
    hasher.update(padded);
    hasher.update(o_entry);
    hasher.update(p_low);
    hasher.update(file_id_first);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut digest: [u8; 16] = hasher.finalize().into();

    if revision >= 3 {
        for _ in 0..50 {
            digest = md5(&[&digest[..length_bytes]]);
        }
    }

    if revision == 2 {
        digest[..5].to_vec()
    } else {
        digest[..length_bytes].to_vec()
    }
}

/// Algorithm 3.3: the /O entry.
///
/// The owner password (or the user password when none is set) keys an RC4
/// cascade over the padded user password.
pub fn compute_o(
    revision: u32,
    length_bytes: usize,
    owner_password: &[u8],
    user_password: &[u8],
) -> Vec<u8> {
    let rc4_key = owner_rc4_key(revision, length_bytes, owner_password);
    let mut value = pad_password(user_password).to_vec();
    value = Rc4::apply(&rc4_key, &value);
    if revision >= 3 {
        for i in 1u8..=19 {
            let round_key: Vec<u8> = rc4_key.iter().map(|&b| b ^ i).collect();
            value = Rc4::apply(&round_key, &value);
        }
    }
    value
}

fn owner_rc4_key(revision: u32, length_bytes: usize, owner_password: &[u8]) -> Vec<u8> {
    let mut digest = md5(&[&pad_password(owner_password)]);
    if revision >= 3 {
        for _ in 0..50 {
            digest = md5(&[&digest]);
        }
    }
    if revision == 2 {
        digest[..5].to_vec()
    } else {
        digest[..length_bytes].to_vec()
    }
}

/// Algorithm 3.4: the /U entry for revision 2.
pub fn compute_u_r2(file_key: &[u8]) -> Vec<u8> {
    Rc4::apply(file_key, &PAD)
}

/// Algorithm 3.5: the /U entry for revision 3 and later.
///
/// MD5 of pad-plus-file-id, an RC4 cascade of 20 rounds, then padding to 32
/// bytes; only the first 16 bytes are significant on comparison.
pub fn compute_u_r3(file_key: &[u8], file_id_first: &[u8]) -> Vec<u8> {
    let mut value = md5(&[&PAD, file_id_first]).to_vec();
    value = Rc4::apply(file_key, &value);
    for i in 1u8..=19 {
        let round_key: Vec<u8> = file_key.iter().map(|&b| b ^ i).collect();
        value = Rc4::apply(&round_key, &value);
    }
    value.extend_from_slice(&PAD[..16]);
    value
}

/// Algorithm 3.6: checks a candidate user password against /U.
///
/// Returns the file key when the password matches.
#[allow(clippy::too_many_arguments)]
pub fn check_user_password(
    revision: u32,
    length_bytes: usize,
    password: &[u8],
    o_entry: &[u8],
    p: i64,
    file_id_first: &[u8],
    encrypt_metadata: bool,
    u_entry: &[u8],
) -> Option<Vec<u8>> {
    let key = file_key(
        revision,
        length_bytes,
        password,
        o_entry,
        p,
        file_id_first,
        encrypt_metadata,
    );
    let computed = if revision == 2 {
        compute_u_r2(&key)
    } else {
        compute_u_r3(&key, file_id_first)
    };
    let matches = if revision == 2 {
        computed == u_entry
    } else {
        computed.len() >= 16 && u_entry.len() >= 16 && computed[..16] == u_entry[..16]
    };
    matches.then_some(key)
}

/// Algorithm 3.7: checks a candidate owner password against /O and /U.
///
/// Unwinds the RC4 cascade of 3.3 to recover the user password, then defers
/// to the user check. Returns the file key when the password matches.
#[allow(clippy::too_many_arguments)]
pub fn check_owner_password(
    revision: u32,
    length_bytes: usize,
    password: &[u8],
    o_entry: &[u8],
    p: i64,
    file_id_first: &[u8],
    encrypt_metadata: bool,
    u_entry: &[u8],
) -> Option<Vec<u8>> {
    let rc4_key = owner_rc4_key(revision, length_bytes, password);
    let recovered_user = if revision == 2 {
        Rc4::apply(&rc4_key, o_entry)
    } else {
        let mut value = o_entry.to_vec();
        for i in (0u8..=19).rev() {
            let round_key: Vec<u8> = rc4_key.iter().map(|&b| b ^ i).collect();
            value = Rc4::apply(&round_key, &value);
        }
        value
    };
    check_user_password(
        revision,
        length_bytes,
        &recovered_user,
        o_entry,
        p,
        file_id_first,
        encrypt_metadata,
        u_entry,
    )
}
