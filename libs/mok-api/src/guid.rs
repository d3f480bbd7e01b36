use std::fmt;

/// A firmware GUID in its on-wire byte encoding: the first three fields are
/// little-endian, the trailing eight bytes are taken verbatim.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    pub const fn from_fields(d1: u32, d2: u16, d3: u16, d4: [u8; 8]) -> Self {
        let a = d1.to_le_bytes();
        let b = d2.to_le_bytes();
        let c = d3.to_le_bytes();
        Guid([
            a[0], a[1], a[2], a[3], b[0], b[1], c[0], c[1], d4[0], d4[1], d4[2], d4[3], d4[4],
            d4[5], d4[6], d4[7],
        ])
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Guid> {
        let raw: [u8; 16] = bytes.try_into().ok()?;
        Some(Guid(raw))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            u16::from_le_bytes([b[4], b[5]]),
            u16::from_le_bytes([b[6], b[7]]),
            b[8],
            b[9],
            b[10],
            b[11],
            b[12],
            b[13],
            b[14],
            b[15],
        )
    }
}

/// Namespace for every MOK variable, and the owner stamped on entries we
/// encode. Matches the shim-lock protocol GUID.
pub const SHIM_LOCK_GUID: Guid = Guid::from_fields(
    0x605d_ab50,
    0xe046,
    0x4300,
    [0xab, 0xb6, 0x3d, 0xd8, 0x10, 0xdd, 0x8b, 0x23],
);

/// Signature list type for DER X.509 certificates.
pub const EFI_CERT_X509_GUID: Guid = Guid::from_fields(
    0xa5c0_59a1,
    0x94e4,
    0x4aa7,
    [0x87, 0xb5, 0xab, 0x15, 0x5c, 0x2b, 0xf0, 0x72],
);

/// Signature list type for raw SHA-256 image hashes.
pub const EFI_CERT_SHA256_GUID: Guid = Guid::from_fields(
    0xc1c4_1626,
    0x504c,
    0x4092,
    [0xac, 0xa9, 0x41, 0xf9, 0x36, 0x93, 0x43, 0x28],
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_registry_form() {
        assert_eq!(
            SHIM_LOCK_GUID.to_string(),
            "605dab50-e046-4300-abb6-3dd810dd8b23"
        );
        assert_eq!(
            EFI_CERT_SHA256_GUID.to_string(),
            "c1c41626-504c-4092-aca9-41f936934328"
        );
    }

    #[test]
    fn test_wire_layout_is_mixed_endian() {
        // first field little-endian, trailing bytes verbatim
        assert_eq!(SHIM_LOCK_GUID.0[0], 0x50);
        assert_eq!(SHIM_LOCK_GUID.0[3], 0x60);
        assert_eq!(SHIM_LOCK_GUID.0[8], 0xab);
        assert_eq!(SHIM_LOCK_GUID.0[15], 0x23);
    }
}
