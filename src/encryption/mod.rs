//! PDF encryption layer: the standard security handler.
//!
//! One file encryption key is derived per open or save; every string and
//! stream payload is then transformed under a per-object key mixed from the
//! file key and the owning object's id and generation (revisions up to 4) or
//! under the file key directly (revision 6). The encryption dictionary, the
//! document /ID, and xref streams are never encrypted.

mod aes;
mod legacy;
mod permissions;
mod r6;
mod rc4;

pub use permissions::{PermissionFlags, Permissions};
pub use rc4::Rc4;

use crate::error::EncryptionError;
use crate::object::{Object, PdfDictionary, PdfString};
use crate::types::ObjectId;
use zeroize::Zeroize;

/// The symmetric cipher applied to strings or streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherKind {
    /// No transformation (the Identity crypt filter).
    Identity,
    /// RC4 with the per-object key.
    Rc4,
    /// AES-CBC with a leading IV and PKCS#5 padding.
    Aes,
}

/// The algorithm choice when writing an encrypted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    /// RC4 with a 40-bit key (V=1, R=2).
    Rc4_40,
    /// RC4 with a 128-bit key (V=2, R=3).
    Rc4_128,
    /// AES-128 through the crypt-filter machinery (V=4, R=4).
    Aes128,
    /// AES-256 (V=5, R=6).
    Aes256,
}

impl EncryptionAlgorithm {
    fn key_length_bytes(&self) -> usize {
        match self {
            Self::Rc4_40 => 5,
            Self::Rc4_128 | Self::Aes128 => 16,
            Self::Aes256 => 32,
        }
    }

    fn version(&self) -> u32 {
        match self {
            Self::Rc4_40 => 1,
            Self::Rc4_128 => 2,
            Self::Aes128 => 4,
            Self::Aes256 => 5,
        }
    }

    fn revision(&self) -> u32 {
        match self {
            Self::Rc4_40 => 2,
            Self::Rc4_128 => 3,
            Self::Aes128 => 4,
            Self::Aes256 => 6,
        }
    }

    fn cipher(&self) -> CipherKind {
        match self {
            Self::Rc4_40 | Self::Rc4_128 => CipherKind::Rc4,
            Self::Aes128 | Self::Aes256 => CipherKind::Aes,
        }
    }
}

/// Configuration for writing an encrypted document.
#[derive(Debug, Clone)]
pub struct EncryptionConfig {
    pub algorithm: EncryptionAlgorithm,
    pub user_password: String,
    pub owner_password: String,
    pub permissions: Permissions,
    pub encrypt_metadata: bool,
}

impl EncryptionConfig {
    /// Starts a config for the given algorithm with empty passwords and all
    /// permissions denied.
    pub fn new(algorithm: EncryptionAlgorithm) -> Self {
        Self {
            algorithm,
            user_password: String::new(),
            owner_password: String::new(),
            permissions: Permissions::none(),
            encrypt_metadata: true,
        }
    }

    /// Sets the user password (required to open the document).
    pub fn user_password(mut self, password: impl Into<String>) -> Self {
        self.user_password = password.into();
        self
    }

    /// Sets the owner password (full access). Falls back to the user
    /// password when left empty.
    pub fn owner_password(mut self, password: impl Into<String>) -> Self {
        self.owner_password = password.into();
        self
    }

    /// Sets the document permissions.
    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

enum KeyMaterial {
    Legacy { o_entry: Vec<u8>, u_entry: Vec<u8> },
    R6(r6::R6Keys),
}

/// A ready-to-use security handler: file key derived, ciphers chosen.
pub struct SecurityHandler {
    file_key: Vec<u8>,
    version: u32,
    revision: u32,
    permissions: i32,
    encrypt_metadata: bool,
    string_cipher: CipherKind,
    stream_cipher: CipherKind,
    material: Option<KeyMaterial>,
}

impl Drop for SecurityHandler {
    fn drop(&mut self) {
        self.file_key.zeroize();
    }
}

impl SecurityHandler {
    /// Opens an existing document: authenticates the password against the
    /// encryption dictionary and derives the file key.
    ///
    /// The password is tried as the user password first, then as the owner
    /// password; failure of both is `AuthenticationFailed`.
    pub fn authenticate(
        encrypt_dict: &PdfDictionary,
        file_id_first: &[u8],
        password: &str,
    ) -> Result<Self, EncryptionError> {
        match encrypt_dict.get_name("Filter") {
            Some(name) if name.as_bytes() == b"Standard" => {}
            Some(name) => {
                return Err(EncryptionError::Unsupported(format!(
                    "security handler /{}",
                    String::from_utf8_lossy(name.as_bytes())
                )))
            }
            None => {
                return Err(EncryptionError::InvalidDictionary(
                    "missing /Filter".to_string(),
                ))
            }
        }

        let version = encrypt_dict.get_integer("V").unwrap_or(0) as u32;
        let revision = encrypt_dict.get_integer("R").unwrap_or(0) as u32;
        let p = encrypt_dict.get_integer("P").unwrap_or(-1);
        let encrypt_metadata = match encrypt_dict.get("EncryptMetadata") {
            Some(Object::Boolean(b)) => *b,
            _ => true,
        };
        let o_entry = string_entry(encrypt_dict, "O")?;
        let u_entry = string_entry(encrypt_dict, "U")?;

        match (version, revision) {
            (1 | 2, 2 | 3) | (4, 4) => {
                let length_bits = encrypt_dict.get_integer("Length").unwrap_or(40);
                if length_bits % 8 != 0 || !(40..=128).contains(&length_bits) {
                    return Err(EncryptionError::InvalidDictionary(format!(
                        "key length {} bits",
                        length_bits
                    )));
                }
                let length_bytes = (length_bits / 8) as usize;

                let file_key = legacy::check_user_password(
                    revision,
                    length_bytes,
                    password.as_bytes(),
                    &o_entry,
                    p,
                    file_id_first,
                    encrypt_metadata,
                    &u_entry,
                )
                .or_else(|| {
                    legacy::check_owner_password(
                        revision,
                        length_bytes,
                        password.as_bytes(),
                        &o_entry,
                        p,
                        file_id_first,
                        encrypt_metadata,
                        &u_entry,
                    )
                })
                .ok_or(EncryptionError::AuthenticationFailed)?;

                let (string_cipher, stream_cipher) = if version == 4 {
                    crypt_filter_ciphers(encrypt_dict)?
                } else {
                    (CipherKind::Rc4, CipherKind::Rc4)
                };

                Ok(Self {
                    file_key,
                    version,
                    revision,
                    permissions: p as i32,
                    encrypt_metadata,
                    string_cipher,
                    stream_cipher,
                    material: None,
                })
            }
            (5, 6) => {
                let ue_entry = string_entry(encrypt_dict, "UE")?;
                let file_key = r6::verify_user_password(password, &u_entry, &ue_entry).or_else(
                    |err| match err {
                        EncryptionError::AuthenticationFailed => {
                            let oe_entry = string_entry(encrypt_dict, "OE")?;
                            r6::verify_owner_password(password, &u_entry, &o_entry, &oe_entry)
                        }
                        other => Err(other),
                    },
                )?;

                let (string_cipher, stream_cipher) = crypt_filter_ciphers(encrypt_dict)?;
                Ok(Self {
                    file_key,
                    version,
                    revision,
                    permissions: p as i32,
                    encrypt_metadata,
                    string_cipher,
                    stream_cipher,
                    material: None,
                })
            }
            (v, r) => Err(EncryptionError::Unsupported(format!("V={} R={}", v, r))),
        }
    }

    /// Prepares a handler for writing a new encrypted document.
    ///
    /// Legacy algorithms need the first half of the document /ID to derive
    /// the file key, so the /ID must be fixed before objects are written.
    pub fn for_writing(
        config: &EncryptionConfig,
        file_id_first: &[u8],
    ) -> Result<Self, EncryptionError> {
        if file_id_first.is_empty() {
            return Err(EncryptionError::MissingFileId);
        }
        let owner_password = if config.owner_password.is_empty() {
            config.user_password.as_str()
        } else {
            config.owner_password.as_str()
        };
        let p = config.permissions.p_value();
        let cipher = config.algorithm.cipher();

        match config.algorithm {
            EncryptionAlgorithm::Aes256 => {
                let keys = r6::derive_keys(
                    &config.user_password,
                    owner_password,
                    p,
                    config.encrypt_metadata,
                )?;
                Ok(Self {
                    file_key: keys.file_key.clone(),
                    version: 5,
                    revision: 6,
                    permissions: p,
                    encrypt_metadata: config.encrypt_metadata,
                    string_cipher: cipher,
                    stream_cipher: cipher,
                    material: Some(KeyMaterial::R6(keys)),
                })
            }
            _ => {
                let revision = config.algorithm.revision();
                let length_bytes = config.algorithm.key_length_bytes();
                let o_entry = legacy::compute_o(
                    revision,
                    length_bytes,
                    owner_password.as_bytes(),
                    config.user_password.as_bytes(),
                );
                let file_key = legacy::file_key(
                    revision,
                    length_bytes,
                    config.user_password.as_bytes(),
                    &o_entry,
                    p as i64,
                    file_id_first,
                    config.encrypt_metadata,
                );
                let u_entry = if revision == 2 {
                    legacy::compute_u_r2(&file_key)
                } else {
                    legacy::compute_u_r3(&file_key, file_id_first)
                };
                Ok(Self {
                    file_key,
                    version: config.algorithm.version(),
                    revision,
                    permissions: p,
                    encrypt_metadata: config.encrypt_metadata,
                    string_cipher: cipher,
                    stream_cipher: cipher,
                    material: Some(KeyMaterial::Legacy { o_entry, u_entry }),
                })
            }
        }
    }

    /// The per-object key for the given owner object.
    fn object_key(&self, id: ObjectId, cipher: CipherKind) -> Vec<u8> {
        if self.revision >= 5 {
            self.file_key.clone()
        } else {
            legacy::object_key(
                &self.file_key,
                id.number,
                id.generation,
                cipher == CipherKind::Aes,
            )
        }
    }

    fn transform(
        &self,
        data: &[u8],
        id: ObjectId,
        cipher: CipherKind,
        encrypting: bool,
    ) -> Result<Vec<u8>, EncryptionError> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        match cipher {
            CipherKind::Identity => Ok(data.to_vec()),
            CipherKind::Rc4 => Ok(Rc4::apply(&self.object_key(id, cipher), data)),
            CipherKind::Aes => {
                let key = self.object_key(id, cipher);
                if encrypting {
                    aes::encrypt(&key, data)
                } else {
                    aes::decrypt(&key, data)
                }
            }
        }
    }

    /// Decrypts a string found inside the indirect object `id`.
    pub fn decrypt_string(&self, data: &[u8], id: ObjectId) -> Result<Vec<u8>, EncryptionError> {
        self.transform(data, id, self.string_cipher, false)
    }

    /// Encrypts a string being written inside the indirect object `id`.
    pub fn encrypt_string(&self, data: &[u8], id: ObjectId) -> Result<Vec<u8>, EncryptionError> {
        self.transform(data, id, self.string_cipher, true)
    }

    /// Decrypts a stream payload owned by the indirect object `id`.
    pub fn decrypt_stream(&self, data: &[u8], id: ObjectId) -> Result<Vec<u8>, EncryptionError> {
        self.transform(data, id, self.stream_cipher, false)
    }

    /// Encrypts a stream payload owned by the indirect object `id`.
    pub fn encrypt_stream(&self, data: &[u8], id: ObjectId) -> Result<Vec<u8>, EncryptionError> {
        self.transform(data, id, self.stream_cipher, true)
    }

    /// The raw /P value.
    pub fn permissions(&self) -> i32 {
        self.permissions
    }

    /// Builds the encryption dictionary for the trailer's /Encrypt entry.
    ///
    /// Only meaningful on a handler built with [`Self::for_writing`].
    pub fn encryption_dictionary(&self) -> Result<PdfDictionary, EncryptionError> {
        let material = self.material.as_ref().ok_or_else(|| {
            EncryptionError::InvalidDictionary(
                "handler was opened for reading, not writing".to_string(),
            )
        })?;

        let mut dict = PdfDictionary::new();
        dict.set("Filter", Object::Name("Standard".into()));
        dict.set("V", Object::Integer(self.version as i64));
        dict.set("R", Object::Integer(self.revision as i64));
        dict.set("P", Object::Integer(self.permissions as i64));

        match material {
            KeyMaterial::Legacy { o_entry, u_entry } => {
                dict.set("Length", Object::Integer(self.file_key.len() as i64 * 8));
                dict.set("O", Object::String(PdfString::Hex(o_entry.clone())));
                dict.set("U", Object::String(PdfString::Hex(u_entry.clone())));
                if self.version == 4 {
                    dict.set("CF", crypt_filter_dictionary("AESV2", 16));
                    dict.set("StmF", Object::Name("StdCF".into()));
                    dict.set("StrF", Object::Name("StdCF".into()));
                }
            }
            KeyMaterial::R6(keys) => {
                dict.set("Length", Object::Integer(256));
                dict.set("O", Object::String(PdfString::Hex(keys.o_entry.clone())));
                dict.set("U", Object::String(PdfString::Hex(keys.u_entry.clone())));
                dict.set("OE", Object::String(PdfString::Hex(keys.oe_entry.clone())));
                dict.set("UE", Object::String(PdfString::Hex(keys.ue_entry.clone())));
                dict.set(
                    "Perms",
                    Object::String(PdfString::Hex(keys.perms_entry.clone())),
                );
                dict.set("CF", crypt_filter_dictionary("AESV3", 32));
                dict.set("StmF", Object::Name("StdCF".into()));
                dict.set("StrF", Object::Name("StdCF".into()));
            }
        }

        if !self.encrypt_metadata {
            dict.set("EncryptMetadata", Object::Boolean(false));
        }
        Ok(dict)
    }
}

fn crypt_filter_dictionary(cfm: &str, length: i64) -> PdfDictionary {
    let mut std_cf = PdfDictionary::new();
    std_cf.set("CFM", Object::Name(cfm.into()));
    std_cf.set("Length", Object::Integer(length));
    std_cf.set("AuthEvent", Object::Name("DocOpen".into()));
    let mut cf = PdfDictionary::new();
    cf.set("StdCF", Object::Dictionary(std_cf));
    cf
}

/// Resolves /StmF and /StrF through the /CF map into concrete ciphers.
fn crypt_filter_ciphers(
    encrypt_dict: &PdfDictionary,
) -> Result<(CipherKind, CipherKind), EncryptionError> {
    let cipher_for = |entry: &str| -> Result<CipherKind, EncryptionError> {
        let filter_name = match encrypt_dict.get_name(entry) {
            Some(name) => name.as_bytes().to_vec(),
            None => b"Identity".to_vec(),
        };
        if filter_name == b"Identity" {
            return Ok(CipherKind::Identity);
        }
        let cf = match encrypt_dict.get("CF") {
            Some(Object::Dictionary(d)) => d,
            _ => {
                return Err(EncryptionError::InvalidDictionary(
                    "crypt filter named but /CF missing".to_string(),
                ))
            }
        };
        let filter_dict = match cf.get(&filter_name) {
            Some(Object::Dictionary(d)) => d,
            _ => {
                return Err(EncryptionError::Unsupported(format!(
                    "crypt filter /{}",
                    String::from_utf8_lossy(&filter_name)
                )))
            }
        };
        match filter_dict.get_name("CFM").map(|n| n.as_bytes()) {
            Some(b"V2") => Ok(CipherKind::Rc4),
            Some(b"AESV2") | Some(b"AESV3") => Ok(CipherKind::Aes),
            Some(b"None") | None => Ok(CipherKind::Identity),
            Some(other) => Err(EncryptionError::Unsupported(format!(
                "crypt filter method /{}",
                String::from_utf8_lossy(other)
            ))),
        }
    };
    Ok((cipher_for("StrF")?, cipher_for("StmF")?))
}

fn string_entry(dict: &PdfDictionary, key: &str) -> Result<Vec<u8>, EncryptionError> {
    match dict.get(key) {
        Some(Object::String(s)) => Ok(s.as_bytes().to_vec()),
        _ => Err(EncryptionError::InvalidDictionary(format!(
            "missing or non-string /{}",
            key
        ))),
    }
}

/// Generates a random 16-byte document id half.
pub fn generate_file_id() -> Vec<u8> {
    use rand::Rng;
    let mut id = vec![0u8; 16];
    rand::thread_rng().fill(&mut id[..]);
    id
}
