//! Password capture and verification.
//!
//! Every verification call owns its retry budget: three attempts total, and
//! the third mismatch is `AccessDenied`. The caller never sees how many
//! tries were spent.

use mok_api::passwd::legacy_hash;
use mok_api::{Error, MokSbRecord, PasswordRecord};
use rand_core::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::console::Console;

pub const PASSWORD_MIN: usize = 1;
pub const PASSWORD_MAX: usize = 256;
const MAX_ATTEMPTS: u32 = 3;

/// Verify an entered password against a decoded record.
///
/// `challenge` is only meaningful for legacy records: it must be the exact
/// bytes the staging tool hashed in front of the password (the raw staged
/// payload for enroll/delete, empty for the standalone MOK password).
/// Crypt records ignore it; their preimage is salt then password.
pub fn verify(
    console: &mut dyn Console,
    record: &PasswordRecord,
    challenge: &[u8],
    prompt: Option<&str>,
) -> Result<(), Error> {
    let mut fail_count = 0;
    while fail_count < MAX_ATTEMPTS {
        console.prompt(prompt.unwrap_or("Password: "));
        let entered = console.read_line_hidden(PASSWORD_MAX);
        if entered.len() < PASSWORD_MIN || entered.len() > PASSWORD_MAX {
            console.line("Invalid password length");
            fail_count += 1;
            continue;
        }

        let matched = match record {
            PasswordRecord::Crypt(crypt) => {
                // the staging tool hashes the low byte of each UTF-16 unit
                let pw_bytes: Zeroizing<Vec<u8>> =
                    Zeroizing::new(entered.iter().map(|&u| u as u8).collect());
                match crypt.derive(&pw_bytes) {
                    Ok(candidate) => bool::from(candidate.ct_eq(crypt.hash())),
                    Err(_) => {
                        console.line("Unable to generate password hash");
                        fail_count += 1;
                        continue;
                    }
                }
            }
            PasswordRecord::Legacy(stored) => {
                let candidate = Zeroizing::new(legacy_hash(challenge, &entered));
                bool::from(candidate.ct_eq(&stored[..]))
            }
        };

        if matched {
            return Ok(());
        }
        console.line("Password doesn't match");
        fail_count += 1;
    }
    Err(Error::AccessDenied)
}

/// The Secure-Boot toggle challenge: the staged record carries the cleartext
/// password, and the operator proves presence by supplying three randomly
/// chosen characters of it. Positions are distinct whenever the password is
/// long enough to allow it; a failed round re-samples.
pub fn verify_positions(
    console: &mut dyn Console,
    rng: &mut dyn RngCore,
    record: &MokSbRecord,
) -> Result<(), Error> {
    let units = record.password_units();
    let mut fail_count = 0;
    while fail_count < MAX_ATTEMPTS {
        let positions = pick_positions(rng, units.len() as u32);
        let mut all_match = true;
        for &pos in positions.iter() {
            console.prompt(&format!("Enter password character {}: ", pos + 1));
            let entered = console.read_char_hidden();
            let matched = entered.map_or(false, |c| {
                let mut buf = [0u16; 2];
                let encoded = c.encode_utf16(&mut buf);
                encoded.len() == 1 && encoded[0] == units[pos as usize]
            });
            if !matched {
                all_match = false;
            }
        }
        if all_match {
            return Ok(());
        }
        console.line("Invalid character");
        fail_count += 1;
    }
    Err(Error::AccessDenied)
}

fn pick_positions(rng: &mut dyn RngCore, len: u32) -> [u32; 3] {
    let mut positions = [0u32; 3];
    for i in 0..positions.len() {
        let mut p = rng.next_u32() % len;
        if len as usize >= positions.len() {
            while positions[..i].contains(&p) {
                p = rng.next_u32() % len;
            }
        }
        positions[i] = p;
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ScriptedConsole, ScriptedRng};
    use mok_api::passwd::{CryptMethod, PasswordCrypt};

    fn legacy_record(challenge: &[u8], password: &str) -> PasswordRecord {
        let units: Vec<u16> = password.encode_utf16().collect();
        PasswordRecord::Legacy(legacy_hash(challenge, &units))
    }

    #[test]
    fn test_legacy_verify_first_try() {
        let record = legacy_record(b"staged-payload", "swordfish");
        let mut console = ScriptedConsole::new().with_lines(&["swordfish"]);
        assert!(verify(&mut console, &record, b"staged-payload", None).is_ok());
    }

    #[test]
    fn test_crypt_verify_recovers_after_two_misses() {
        let record = PasswordCrypt::create(CryptMethod::Sha256, 10, [1u8; 16], b"hunter2").unwrap();
        let record = PasswordRecord::Crypt(record);
        let mut console = ScriptedConsole::new().with_lines(&["nope", "still no", "hunter2"]);
        assert!(verify(&mut console, &record, &[], None).is_ok());
    }

    #[test]
    fn test_rejects_after_exactly_three_mismatches() {
        let record = legacy_record(&[], "right");
        let mut console = ScriptedConsole::new().with_lines(&["wrong", "wrong", "wrong", "right"]);
        assert_eq!(
            verify(&mut console, &record, &[], None),
            Err(Error::AccessDenied)
        );
        // the fourth (correct) line was never consumed
        assert_eq!(console.lines.len(), 1);
    }

    #[test]
    fn test_empty_line_counts_as_failure() {
        let record = legacy_record(&[], "pw");
        let mut console = ScriptedConsole::new().with_lines(&["", "", ""]);
        assert_eq!(
            verify(&mut console, &record, &[], None),
            Err(Error::AccessDenied)
        );
    }

    #[test]
    fn test_wrong_challenge_fails_legacy_verify() {
        let record = legacy_record(b"the-real-payload", "swordfish");
        let mut console =
            ScriptedConsole::new().with_lines(&["swordfish", "swordfish", "swordfish"]);
        assert_eq!(
            verify(&mut console, &record, b"another-payload", None),
            Err(Error::AccessDenied)
        );
    }

    fn sb_record(password: &str) -> MokSbRecord {
        let mut units = [0u16; 16];
        for (dst, src) in units.iter_mut().zip(password.encode_utf16()) {
            *dst = src;
        }
        MokSbRecord { state: 0, pw_len: password.len() as u32, password: units }
    }

    #[test]
    fn test_positions_challenge_accepts_matching_characters() {
        let record = sb_record("abcdefgh");
        let mut rng = ScriptedRng::new(&[2, 5, 0]);
        let mut console = ScriptedConsole::new().with_chars(&['c', 'f', 'a']);
        assert!(verify_positions(&mut console, &mut rng, &record).is_ok());
        assert!(console
            .prompts
            .iter()
            .any(|p| p.contains("character 3")));
    }

    #[test]
    fn test_positions_challenge_denies_after_three_rounds() {
        let record = sb_record("abcdefgh");
        let mut rng = ScriptedRng::new(&[2, 5, 0]);
        let mut console = ScriptedConsole::new()
            .with_chars(&['x', 'f', 'a', 'x', 'f', 'a', 'x', 'f', 'a']);
        assert_eq!(
            verify_positions(&mut console, &mut rng, &record),
            Err(Error::AccessDenied)
        );
    }

    #[test]
    fn test_positions_are_distinct() {
        // a repeating rng must still yield three distinct positions
        let mut rng = ScriptedRng::new(&[4, 4, 4, 1, 1, 7]);
        let positions = pick_positions(&mut rng, 8);
        assert_eq!(positions, [4, 1, 7]);
    }
}
