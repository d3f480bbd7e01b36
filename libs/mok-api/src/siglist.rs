//! The signature-list container: a little-endian, packed stream of typed
//! signature lists, each holding one or more `(owner_guid, data)` entries of
//! a single type. This is the format shared with the shim, the OS staging
//! tool, and the firmware's own signature databases.

use crate::guid::{Guid, EFI_CERT_SHA256_GUID, EFI_CERT_X509_GUID, SHIM_LOCK_GUID};

/// `type_guid[16] | list_size u32 | header_size u32 | sig_size u32`
pub const SIG_LIST_HEADER_LEN: usize = 28;
/// Every signature starts with its owner GUID.
pub const SIG_OWNER_LEN: usize = 16;
/// A SHA-256 list must declare exactly owner + digest.
pub const SHA256_SIG_SIZE: usize = SIG_OWNER_LEN + 32;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SigKind {
    X509Cert,
    Sha256Hash,
}

impl SigKind {
    pub fn type_guid(self) -> Guid {
        match self {
            SigKind::X509Cert => EFI_CERT_X509_GUID,
            SigKind::Sha256Hash => EFI_CERT_SHA256_GUID,
        }
    }
}

/// One recognized signature, owning its bytes. Hash entries carry exactly 32
/// bytes; cert entries carry an opaque DER blob.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SigEntry {
    pub kind: SigKind,
    pub data: Vec<u8>,
}

impl SigEntry {
    pub fn cert(der: &[u8]) -> SigEntry {
        SigEntry { kind: SigKind::X509Cert, data: der.to_vec() }
    }

    pub fn sha256(hash: [u8; 32]) -> SigEntry {
        SigEntry { kind: SigKind::Sha256Hash, data: hash.to_vec() }
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> usize {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize
}

/// Walk the recognized signatures in stream order. Lists with an unknown
/// type GUID, a bad SHA-256 `sig_size`, or inconsistent geometry are skipped
/// without aborting; a truncated tail ends the walk.
fn walk(stream: &[u8], mut visit: impl FnMut(SigKind, &[u8])) {
    let mut rest = stream;
    while rest.len() >= SIG_LIST_HEADER_LEN {
        let list_size = read_u32(rest, 16);
        if list_size < SIG_LIST_HEADER_LEN || list_size > rest.len() {
            // a declared size we can't honor means the remainder is garbage
            break;
        }
        let header_size = read_u32(rest, 20);
        let sig_size = read_u32(rest, 24);
        let list = &rest[..list_size];
        rest = &rest[list_size..];

        let kind = match Guid::from_bytes(&list[..16]) {
            Some(guid) if guid == EFI_CERT_X509_GUID => SigKind::X509Cert,
            Some(guid) if guid == EFI_CERT_SHA256_GUID => SigKind::Sha256Hash,
            _ => {
                log::warn!("skipping signature list: not a key or hash type");
                continue;
            }
        };
        if kind == SigKind::Sha256Hash && sig_size != SHA256_SIG_SIZE {
            log::warn!("skipping sha256 list with sig_size {}", sig_size);
            continue;
        }
        if sig_size <= SIG_OWNER_LEN {
            log::warn!("skipping signature list with sig_size {}", sig_size);
            continue;
        }
        let sigs_at = match SIG_LIST_HEADER_LEN.checked_add(header_size) {
            Some(at) if at <= list.len() => at,
            _ => {
                log::warn!("skipping signature list with oversized header");
                continue;
            }
        };
        let sigs = &list[sigs_at..];
        if sigs.is_empty() || sigs.len() % sig_size != 0 {
            log::warn!("skipping signature list with inconsistent geometry");
            continue;
        }
        for sig in sigs.chunks_exact(sig_size) {
            visit(kind, &sig[SIG_OWNER_LEN..]);
        }
    }
}

/// Flatten a stream into its recognized entries, in stream order.
/// Duplicates are permitted; unrecognized lists are dropped silently so the
/// caller sees exactly what it can act on.
pub fn parse(stream: &[u8]) -> Vec<SigEntry> {
    let mut entries = Vec::new();
    walk(stream, |kind, data| entries.push(SigEntry { kind, data: data.to_vec() }));
    entries
}

/// Recognized-entry count, without copying any payloads.
pub fn count(stream: &[u8]) -> u32 {
    let mut n = 0u32;
    walk(stream, |_, _| n += 1);
    n
}

/// Encode entries as one signature list per entry, one signature per list,
/// owner stamped with the shim GUID. The inverse of [`parse`] modulo list
/// splitting; zero entries encode to zero bytes.
pub fn encode(entries: &[SigEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        entries
            .iter()
            .map(|e| SIG_LIST_HEADER_LEN + SIG_OWNER_LEN + e.data.len())
            .sum(),
    );
    for entry in entries {
        let sig_size = (SIG_OWNER_LEN + entry.data.len()) as u32;
        let list_size = SIG_LIST_HEADER_LEN as u32 + sig_size;
        out.extend_from_slice(entry.kind.type_guid().as_bytes());
        out.extend_from_slice(&list_size.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&sig_size.to_le_bytes());
        out.extend_from_slice(SHIM_LOCK_GUID.as_bytes());
        out.extend_from_slice(&entry.data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // hand-build a list with `n` signatures of `sig_size` under `type_guid`
    fn build_list(type_guid: Guid, sig_size: usize, payloads: &[&[u8]]) -> Vec<u8> {
        let list_size = SIG_LIST_HEADER_LEN + payloads.len() * sig_size;
        let mut out = Vec::new();
        out.extend_from_slice(type_guid.as_bytes());
        out.extend_from_slice(&(list_size as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(sig_size as u32).to_le_bytes());
        for p in payloads {
            out.extend_from_slice(SHIM_LOCK_GUID.as_bytes());
            out.extend_from_slice(p);
            assert_eq!(p.len() + SIG_OWNER_LEN, sig_size);
        }
        out
    }

    #[test]
    fn test_parse_flattens_multi_signature_list() {
        let h1 = [0x11u8; 32];
        let h2 = [0x22u8; 32];
        let stream = build_list(EFI_CERT_SHA256_GUID, SHA256_SIG_SIZE, &[&h1[..], &h2[..]]);
        let entries = parse(&stream);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], SigEntry::sha256(h1));
        assert_eq!(entries[1], SigEntry::sha256(h2));
        assert_eq!(count(&stream), 2);
    }

    #[test]
    fn test_unknown_type_guid_is_skipped() {
        let bogus = Guid::from_fields(0xdead_beef, 0, 0, [0; 8]);
        let mut stream = build_list(bogus, 48, &[&[0x33u8; 32][..]]);
        stream.extend_from_slice(&build_list(EFI_CERT_SHA256_GUID, 48, &[&[0x44u8; 32][..]]));
        let entries = parse(&stream);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].data, vec![0x44u8; 32]);
    }

    #[test]
    fn test_sha256_list_with_wrong_sig_size_is_skipped() {
        let mut stream = build_list(EFI_CERT_SHA256_GUID, 52, &[&[0x55u8; 36][..]]);
        stream.extend_from_slice(&build_list(EFI_CERT_X509_GUID, 120, &[&[0x66u8; 104][..]]));
        let entries = parse(&stream);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, SigKind::X509Cert);
    }

    #[test]
    fn test_truncated_tail_is_ignored() {
        let mut stream = build_list(EFI_CERT_SHA256_GUID, 48, &[&[0x77u8; 32][..]]);
        // a partial header, then a list whose declared size overruns
        stream.extend_from_slice(&[0u8; 10]);
        assert_eq!(count(&stream), 1);

        let mut overrun = build_list(EFI_CERT_SHA256_GUID, 48, &[&[0x88u8; 32][..]]);
        overrun.truncate(overrun.len() - 4);
        assert_eq!(count(&overrun), 0);
    }

    #[test]
    fn test_count_matches_parse_on_junk() {
        let streams: [&[u8]; 4] = [&[], &[0xff; 27], &[0xff; 28], &[0x00; 200]];
        for s in streams {
            assert_eq!(count(s) as usize, parse(s).len());
        }
    }

    #[test]
    fn test_encode_parse_round_trip() {
        let entries = vec![
            SigEntry::cert(&[0xde, 0xad, 0xbe, 0xef, 0x01]),
            SigEntry::sha256([0xab; 32]),
            SigEntry::sha256([0xcd; 32]),
        ];
        let stream = encode(&entries);
        assert_eq!(parse(&stream), entries);
        assert_eq!(count(&stream), 3);
    }

    #[test]
    fn test_encode_geometry() {
        let der = [0x30u8; 70];
        let stream = encode(&[SigEntry::cert(&der)]);
        assert_eq!(stream.len(), SIG_LIST_HEADER_LEN + SIG_OWNER_LEN + der.len());
        // list_size covers header + one signature, no off-by-one
        assert_eq!(read_u32(&stream, 16), stream.len());
        assert_eq!(read_u32(&stream, 20), 0);
        assert_eq!(read_u32(&stream, 24), SIG_OWNER_LEN + der.len());
        assert_eq!(&stream[28..44], SHIM_LOCK_GUID.as_bytes());
    }

    #[test]
    fn test_encode_empty_is_empty() {
        assert!(encode(&[]).is_empty());
    }

    #[test]
    fn test_reencode_splits_multi_signature_list() {
        let h1 = [0x0au8; 32];
        let h2 = [0x0bu8; 32];
        let merged = build_list(EFI_CERT_SHA256_GUID, SHA256_SIG_SIZE, &[&h1[..], &h2[..]]);
        let split = encode(&parse(&merged));
        // same entries, one list each
        assert_eq!(parse(&split), parse(&merged));
        assert_eq!(split.len(), 2 * (SIG_LIST_HEADER_LEN + SHA256_SIG_SIZE));
    }
}
