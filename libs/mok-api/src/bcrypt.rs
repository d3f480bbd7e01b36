// Derived from the rust-bcrypt crate's core, minus its base64 framing: the
// password-crypt record stores the salt and digest as raw bytes.

use blowfish::Blowfish;

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;
/// bcrypt's EksBlowfish construction wants exactly this much salt.
pub const SALT_LEN: usize = 16;
/// 23 bytes of the traditional digest plus the byte everyone else truncates.
pub const HASH_LEN: usize = 24;

fn setup(cost: u32, salt: &[u8], key: &[u8]) -> Blowfish {
    assert!(cost <= MAX_COST);
    let mut state = Blowfish::bc_init_state();

    state.salted_expand_key(salt, key);
    for _ in 0..1u32 << cost {
        state.bc_expand_key(key);
        state.bc_expand_key(salt);
    }

    state
}

/// Hash `password` into `output`. The password is truncated at 72 bytes
/// (bcrypt limitation) and otherwise processed with a trailing NUL, matching
/// what the staging tool computes.
pub fn bcrypt(cost: u32, salt: &[u8; SALT_LEN], password: &[u8], output: &mut [u8; HASH_LEN]) {
    let key_len = if password.len() > 72 {
        log::warn!("password of length {} truncated to 72 bytes", password.len());
        72
    } else {
        password.len() + 1
    };
    let mut key: [u8; 73] = [0; 73];
    for (&src, dst) in password.iter().zip(key.iter_mut()) {
        *dst = src;
    }
    key[72] = 0;

    let state = setup(cost, salt, &key[..key_len]);

    // scrub the key copy; volatile writes so the optimizer can't elide them
    let key_ptr = key.as_mut_ptr();
    for i in 0..key.len() {
        unsafe {
            key_ptr.add(i).write_volatile(0);
        }
    }
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::SeqCst);

    // OrpheanBeholderScryDoubt
    #[allow(clippy::unreadable_literal)]
    let mut ctext = [0x4f727068, 0x65616e42, 0x65686f6c, 0x64657253, 0x63727944, 0x6f756274];
    for i in 0..3 {
        let i: usize = i * 2;
        for _ in 0..64 {
            let [l, r] = state.bc_encrypt([ctext[i], ctext[i + 1]]);
            ctext[i] = l;
            ctext[i + 1] = r;
        }

        output[i * 4..][..4].copy_from_slice(&ctext[i].to_be_bytes());
        output[(i + 1) * 4..][..4].copy_from_slice(&ctext[i + 1].to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_and_salt_sensitive() {
        let salt_a = [7u8; SALT_LEN];
        let salt_b = [8u8; SALT_LEN];
        let mut out_a = [0u8; HASH_LEN];
        let mut out_a2 = [0u8; HASH_LEN];
        let mut out_b = [0u8; HASH_LEN];
        bcrypt(MIN_COST, &salt_a, b"swordfish", &mut out_a);
        bcrypt(MIN_COST, &salt_a, b"swordfish", &mut out_a2);
        bcrypt(MIN_COST, &salt_b, b"swordfish", &mut out_b);
        assert_eq!(out_a, out_a2);
        assert_ne!(out_a, out_b);
    }

    #[test]
    fn test_cost_changes_digest() {
        let salt = [1u8; SALT_LEN];
        let mut lo = [0u8; HASH_LEN];
        let mut hi = [0u8; HASH_LEN];
        bcrypt(4, &salt, b"pw", &mut lo);
        bcrypt(5, &salt, b"pw", &mut hi);
        assert_ne!(lo, hi);
    }
}
