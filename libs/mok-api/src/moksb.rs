use crate::error::Error;

/// Longest password the toggle record can carry.
pub const SB_PASSWORD_LEN: usize = 16;
/// Packed size of the staged record:
/// `state u32 | pw_len u32 | password [u16; 16]`.
pub const MOK_SB_VAR_SIZE: usize = 4 + 4 + 2 * SB_PASSWORD_LEN;

/// The staged Secure Boot toggle request. The password travels in clear:
/// the variable is boot-services-only and the challenge only ever reveals
/// three characters of it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MokSbRecord {
    pub state: u32,
    pub pw_len: u32,
    pub password: [u16; SB_PASSWORD_LEN],
}

impl MokSbRecord {
    /// Strict decode: the variable must be exactly [`MOK_SB_VAR_SIZE`] and
    /// declare a usable password length, otherwise the request is garbage.
    pub fn decode(bytes: &[u8]) -> Result<MokSbRecord, Error> {
        if bytes.len() != MOK_SB_VAR_SIZE {
            return Err(Error::Parse);
        }
        let state = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let pw_len = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if pw_len == 0 || pw_len as usize > SB_PASSWORD_LEN {
            return Err(Error::Parse);
        }
        let mut password = [0u16; SB_PASSWORD_LEN];
        for (unit, raw) in password.iter_mut().zip(bytes[8..].chunks_exact(2)) {
            *unit = u16::from_le_bytes(raw.try_into().unwrap());
        }
        Ok(MokSbRecord { state, pw_len, password })
    }

    pub fn encode(&self) -> [u8; MOK_SB_VAR_SIZE] {
        let mut out = [0u8; MOK_SB_VAR_SIZE];
        out[0..4].copy_from_slice(&self.state.to_le_bytes());
        out[4..8].copy_from_slice(&self.pw_len.to_le_bytes());
        for (raw, unit) in out[8..].chunks_exact_mut(2).zip(self.password.iter()) {
            raw.copy_from_slice(&unit.to_le_bytes());
        }
        out
    }

    /// `state == 0` means Secure Boot is currently enforced and the request
    /// is to disable it.
    pub fn requests_disable(&self) -> bool {
        self.state == 0
    }

    /// The live portion of the password field.
    pub fn password_units(&self) -> &[u16] {
        &self.password[..self.pw_len as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(state: u32, pw: &str) -> MokSbRecord {
        let mut password = [0u16; SB_PASSWORD_LEN];
        for (dst, src) in password.iter_mut().zip(pw.encode_utf16()) {
            *dst = src;
        }
        MokSbRecord { state, pw_len: pw.len() as u32, password }
    }

    #[test]
    fn test_round_trip() {
        let record = sample(0, "abcdefgh");
        let decoded = MokSbRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded, record);
        assert!(decoded.requests_disable());
        assert_eq!(decoded.password_units().len(), 8);
    }

    #[test]
    fn test_rejects_wrong_size_and_bad_length() {
        assert_eq!(MokSbRecord::decode(&[0u8; 39]), Err(Error::Parse));
        assert_eq!(MokSbRecord::decode(&[0u8; 41]), Err(Error::Parse));

        // pw_len == 0 would make the positional challenge degenerate
        let zero_len = sample(1, "x");
        let mut bytes = zero_len.encode();
        bytes[4..8].copy_from_slice(&0u32.to_le_bytes());
        assert_eq!(MokSbRecord::decode(&bytes), Err(Error::Parse));

        let mut oversized = sample(1, "x").encode();
        oversized[4..8].copy_from_slice(&17u32.to_le_bytes());
        assert_eq!(MokSbRecord::decode(&oversized), Err(Error::Parse));
    }
}
