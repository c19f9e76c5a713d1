//! Authenticated password encryption.
//!
//! Every call derives a fresh key with Argon2id from the passphrase and a random
//! salt, then seals the plaintext with ChaCha20-Poly1305 under a random nonce.
//! The result is a single base64 token wrapping a small JSON envelope that
//! carries the salt, nonce and KDF cost, so blobs stay decryptable if the
//! default cost changes later.
//!
//! The catalogue is encrypted with [`BUILTIN_PASSPHRASE`], which is compiled
//! into the binary. That keeps passwords out of plain sight in the catalogue
//! file but offers no protection against anyone who has the binary.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Passphrase used for every catalogue password.
pub const BUILTIN_PASSPHRASE: &str = "credlock::catalogue::v1";

const ENVELOPE_VERSION: u8 = 1;
const KDF_NAME: &str = "argon2id";
const SALT_LEN: usize = 16;
const MIN_SALT_LEN: usize = 8;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

// Upper bounds accepted from an envelope; anything larger is treated as tampering.
const MAX_M_COST: u32 = 256 * 1024;
const MAX_T_COST: u32 = 16;
const MAX_P_COST: u32 = 8;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub m_cost: u32,
    /// Number of passes
    pub t_cost: u32,
    /// Parallelism
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

impl KdfParams {
    fn check_bounds(&self) -> Result<()> {
        if self.m_cost > MAX_M_COST || self.t_cost > MAX_T_COST || self.p_cost > MAX_P_COST {
            return Err(Error::Decrypt(format!(
                "key derivation cost out of range (m={}, t={}, p={})",
                self.m_cost, self.t_cost, self.p_cost
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    v: u8,
    kdf: String,
    m: u32,
    t: u32,
    p: u32,
    salt: String,
    nonce: String,
    ct: String,
}

/// Encrypts and decrypts catalogue passwords with one passphrase.
#[derive(Clone)]
pub struct CredentialCipher {
    passphrase: String,
    params: KdfParams,
}

impl Default for CredentialCipher {
    fn default() -> Self {
        Self::new(BUILTIN_PASSPHRASE)
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("passphrase", &"<redacted>")
            .field("params", &self.params)
            .finish()
    }
}

impl CredentialCipher {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
            params: KdfParams::default(),
        }
    }

    /// Cost used for new envelopes. Decryption always uses the envelope's own cost.
    pub fn with_params(mut self, params: KdfParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> KdfParams {
        self.params
    }

    /// Seal `plaintext` into a text-safe token. Two calls with the same input
    /// produce different tokens.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let mut key = derive_key(&self.passphrase, &salt, self.params).map_err(Error::Encrypt)?;
        let cipher = ChaCha20Poly1305::new(&key);
        key.as_mut_slice().zeroize();

        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| Error::Encrypt(format!("{e}")))?;

        let envelope = Envelope {
            v: ENVELOPE_VERSION,
            kdf: KDF_NAME.to_string(),
            m: self.params.m_cost,
            t: self.params.t_cost,
            p: self.params.p_cost,
            salt: STANDARD_NO_PAD.encode(salt),
            nonce: STANDARD_NO_PAD.encode(nonce),
            ct: STANDARD_NO_PAD.encode(ciphertext),
        };
        let json = serde_json::to_vec(&envelope).map_err(|e| Error::Encrypt(format!("{e}")))?;
        Ok(STANDARD_NO_PAD.encode(json))
    }

    /// Open a token produced by [`CredentialCipher::encrypt`].
    pub fn decrypt(&self, blob: &str) -> Result<String> {
        let json = STANDARD_NO_PAD
            .decode(blob.trim().as_bytes())
            .map_err(|e| Error::Decrypt(format!("envelope is not base64: {e}")))?;
        let envelope: Envelope = serde_json::from_slice(&json)
            .map_err(|e| Error::Decrypt(format!("malformed envelope: {e}")))?;

        if envelope.v != ENVELOPE_VERSION {
            return Err(Error::Decrypt(format!(
                "unsupported envelope version {}",
                envelope.v
            )));
        }
        if envelope.kdf != KDF_NAME {
            return Err(Error::Decrypt(format!(
                "unsupported key derivation '{}'",
                envelope.kdf
            )));
        }
        let params = KdfParams {
            m_cost: envelope.m,
            t_cost: envelope.t,
            p_cost: envelope.p,
        };
        params.check_bounds()?;

        let salt = decode_field("salt", &envelope.salt)?;
        let nonce = decode_field("nonce", &envelope.nonce)?;
        let ciphertext = decode_field("ciphertext", &envelope.ct)?;
        if salt.len() < MIN_SALT_LEN {
            return Err(Error::Decrypt("salt too short".to_string()));
        }
        if nonce.len() != NONCE_LEN {
            return Err(Error::Decrypt("nonce length mismatch".to_string()));
        }

        let mut key = derive_key(&self.passphrase, &salt, params).map_err(Error::Decrypt)?;
        let cipher = ChaCha20Poly1305::new(&key);
        key.as_mut_slice().zeroize();

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|_| Error::Decrypt("wrong passphrase or tampered ciphertext".to_string()))?;
        String::from_utf8(plaintext).map_err(|e| Error::Decrypt(format!("plaintext is not UTF-8: {e}")))
    }
}

impl Drop for CredentialCipher {
    fn drop(&mut self) {
        self.passphrase.zeroize();
    }
}

/// Encrypt with an explicit passphrase and the default cost.
pub fn encrypt(passphrase: &str, plaintext: &str) -> Result<String> {
    CredentialCipher::new(passphrase).encrypt(plaintext)
}

/// Decrypt with an explicit passphrase.
pub fn decrypt(passphrase: &str, blob: &str) -> Result<String> {
    CredentialCipher::new(passphrase).decrypt(blob)
}

fn decode_field(field: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD_NO_PAD
        .decode(value.as_bytes())
        .map_err(|e| Error::Decrypt(format!("{field} is not base64: {e}")))
}

fn derive_key(passphrase: &str, salt: &[u8], params: KdfParams) -> Result<Key, String> {
    let argon_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(KEY_LEN))
        .map_err(|e| format!("invalid key derivation parameters: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut output = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut output)
        .map_err(|e| format!("key derivation failed: {e}"))?;

    let mut key = Key::default();
    key.copy_from_slice(&output);
    output.zeroize();
    Ok(key)
}

#[cfg(test)]
pub(crate) fn test_cipher() -> CredentialCipher {
    CredentialCipher::default().with_params(KdfParams {
        m_cost: 64,
        t_cost: 1,
        p_cost: 1,
    })
}
