//! Password records gating MOK requests.
//!
//! Two formats exist in the wild and both must keep verifying:
//!
//! * *Legacy*: a bare SHA-256 over `challenge || utf16_le(password)`, 32
//!   bytes, no salt. Already-staged records hash the full UTF-16 code units
//!   (high bytes included), so that preimage is preserved verbatim.
//! * *Crypt*: a fixed-size salted record whose method byte selects the hash
//!   function and digest length.
//!
//! The stored length is the only discriminator between the two, so the
//! decode lives here and every verify site sees a typed [`PasswordRecord`]
//! instead of re-deriving the branch.

use digest::Digest;
use sha2::{Sha256, Sha512};
use zeroize::Zeroizing;

use crate::bcrypt;
use crate::error::Error;

/// Serialized size of a legacy record.
pub const LEGACY_AUTH_SIZE: usize = 32;
/// Salt field size; also exactly what bcrypt wants.
pub const SALT_SIZE: usize = bcrypt::SALT_LEN;
/// The hash field holds the largest method (SHA-512).
pub const MAX_HASH_SIZE: usize = 64;
/// Serialized size of a crypt record:
/// `method u8 | iter_count u32 | salt | hash`.
pub const PASSWORD_CRYPT_SIZE: usize = 1 + 4 + SALT_SIZE + MAX_HASH_SIZE;

/// Iteration ceiling for the digest methods; records beyond it are treated
/// as malformed rather than spent minutes on.
const MAX_ITER_COUNT: u32 = 10_000_000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CryptMethod {
    Sha256 = 1,
    Sha512 = 2,
    /// bcrypt; `iter_count` carries the cost exponent.
    Blowfish = 3,
}

impl CryptMethod {
    pub fn from_id(id: u8) -> Option<CryptMethod> {
        match id {
            1 => Some(CryptMethod::Sha256),
            2 => Some(CryptMethod::Sha512),
            3 => Some(CryptMethod::Blowfish),
            _ => None,
        }
    }

    /// Comparisons cover exactly this many bytes of the hash field.
    pub fn hash_len(self) -> usize {
        match self {
            CryptMethod::Sha256 => 32,
            CryptMethod::Sha512 => 64,
            CryptMethod::Blowfish => bcrypt::HASH_LEN,
        }
    }
}

/// The salted, fixed-size record format written by the staging tool.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PasswordCrypt {
    pub method: CryptMethod,
    pub iter_count: u32,
    pub salt: [u8; SALT_SIZE],
    hash: [u8; MAX_HASH_SIZE],
}

impl PasswordCrypt {
    pub fn decode(bytes: &[u8]) -> Result<PasswordCrypt, Error> {
        if bytes.len() != PASSWORD_CRYPT_SIZE {
            return Err(Error::Parse);
        }
        let method = CryptMethod::from_id(bytes[0]).ok_or(Error::Parse)?;
        let iter_count = u32::from_le_bytes(bytes[1..5].try_into().unwrap());
        match method {
            CryptMethod::Blowfish => {
                if !(bcrypt::MIN_COST..=bcrypt::MAX_COST).contains(&iter_count) {
                    return Err(Error::Parse);
                }
            }
            _ => {
                if iter_count > MAX_ITER_COUNT {
                    return Err(Error::Parse);
                }
            }
        }
        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&bytes[5..5 + SALT_SIZE]);
        let mut hash = [0u8; MAX_HASH_SIZE];
        hash.copy_from_slice(&bytes[5 + SALT_SIZE..]);
        Ok(PasswordCrypt { method, iter_count, salt, hash })
    }

    pub fn encode(&self) -> [u8; PASSWORD_CRYPT_SIZE] {
        let mut out = [0u8; PASSWORD_CRYPT_SIZE];
        out[0] = self.method as u8;
        out[1..5].copy_from_slice(&self.iter_count.to_le_bytes());
        out[5..5 + SALT_SIZE].copy_from_slice(&self.salt);
        out[5 + SALT_SIZE..].copy_from_slice(&self.hash);
        out
    }

    /// Build a record from a plaintext password. This is the staging tool's
    /// job in production; here it seeds hosted state and tests.
    pub fn create(
        method: CryptMethod,
        iter_count: u32,
        salt: [u8; SALT_SIZE],
        password: &[u8],
    ) -> Result<PasswordCrypt, Error> {
        let mut record =
            PasswordCrypt { method, iter_count, salt, hash: [0u8; MAX_HASH_SIZE] };
        let derived = record.derive(password)?;
        record.hash[..derived.len()].copy_from_slice(&derived);
        Ok(record)
    }

    /// The stored verifier, trimmed to the method's digest length.
    pub fn hash(&self) -> &[u8] {
        &self.hash[..self.method.hash_len()]
    }

    /// Derive the candidate hash for an entered password: the salted digest
    /// squeezed `iter_count` further times, or bcrypt for the Blowfish
    /// method.
    pub fn derive(&self, password: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        match self.method {
            CryptMethod::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(self.salt);
                hasher.update(password);
                let mut digest = hasher.finalize();
                for _ in 0..self.iter_count {
                    digest = Sha256::digest(digest);
                }
                Ok(Zeroizing::new(digest.to_vec()))
            }
            CryptMethod::Sha512 => {
                let mut hasher = Sha512::new();
                hasher.update(self.salt);
                hasher.update(password);
                let mut digest = hasher.finalize();
                for _ in 0..self.iter_count {
                    digest = Sha512::digest(digest);
                }
                Ok(Zeroizing::new(digest.to_vec()))
            }
            CryptMethod::Blowfish => {
                let mut out = [0u8; bcrypt::HASH_LEN];
                bcrypt::bcrypt(self.iter_count, &self.salt, password, &mut out);
                Ok(Zeroizing::new(out.to_vec()))
            }
        }
    }
}

/// A decoded password record, discriminated by stored size.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PasswordRecord {
    Legacy([u8; LEGACY_AUTH_SIZE]),
    Crypt(PasswordCrypt),
}

impl PasswordRecord {
    /// Whether a variable of this size can hold a record at all. Callers
    /// gate on this before treating a variable as an auth record.
    pub fn well_sized(len: usize) -> bool {
        len == LEGACY_AUTH_SIZE || len == PASSWORD_CRYPT_SIZE
    }

    pub fn decode(bytes: &[u8]) -> Result<PasswordRecord, Error> {
        match bytes.len() {
            LEGACY_AUTH_SIZE => {
                let mut hash = [0u8; LEGACY_AUTH_SIZE];
                hash.copy_from_slice(bytes);
                Ok(PasswordRecord::Legacy(hash))
            }
            PASSWORD_CRYPT_SIZE => Ok(PasswordRecord::Crypt(PasswordCrypt::decode(bytes)?)),
            _ => Err(Error::Parse),
        }
    }
}

/// The legacy preimage: challenge bytes first, then every UTF-16 code unit
/// of the password, little-endian, high bytes included.
pub fn legacy_hash(challenge: &[u8], password: &[u16]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(challenge);
    for unit in password {
        hasher.update(unit.to_le_bytes());
    }
    hasher.finalize().into()
}

/// An all-zero `MokPW` payload requests clearing the stored password.
pub fn is_all_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0)
}
