//! Password encryption for the credential catalogue.

pub mod cipher;

pub use cipher::{decrypt, encrypt, CredentialCipher, KdfParams, BUILTIN_PASSPHRASE};
