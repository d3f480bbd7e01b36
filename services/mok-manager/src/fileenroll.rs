//! Enrolling a key or image hash straight from the boot partition.

use mok_api::{siglist, Error, SigEntry, VarStore};
use x509_parser::prelude::parse_x509_certificate;

use crate::actions::{self, ActionResult};
use crate::console::Console;

/// The file-picker seam: a directory browser rooted at the EFI system
/// partition plus a whole-file reader.
pub trait FilePicker {
    /// Present the browser under the given advisory headline; `None` when
    /// the operator backs out without choosing.
    fn pick(&mut self, console: &mut dyn Console, headline: &[&str]) -> Option<String>;

    fn read(&mut self, name: &str) -> Result<Vec<u8>, Error>;
}

/// The shim-lock protocol seam: the boot-stage service that computes
/// authenticode-style PE image digests the same way the runtime verifier
/// will.
pub trait ShimLock {
    fn pe_sha256(&self, image: &[u8]) -> Result<[u8; 32], Error>;
}

const KEY_HEADLINE: [&str; 5] = [
    "Select Key",
    "",
    "The selected key will be enrolled into the MOK database",
    "This means any binaries signed with it will be run without prompting",
    "Remember to make sure it is a genuine key before enrolling it",
];

const HASH_HEADLINE: [&str; 5] = [
    "Select Binary",
    "",
    "The selected binary will have its hash enrolled",
    "This means it will subsequently boot with no prompting",
    "Remember to make sure it is a genuine binary before enrolling its hash",
];

fn pick_and_read(
    console: &mut dyn Console,
    picker: &mut dyn FilePicker,
    headline: &[&str],
) -> Option<Vec<u8>> {
    let name = picker.pick(console, headline)?;
    match picker.read(&name) {
        Ok(data) if !data.is_empty() => Some(data),
        Ok(_) => {
            console.notify("Unable to read file");
            None
        }
        Err(e) => {
            log::warn!("read of {} failed: {}", name, e);
            console.notify("Unable to open file");
            None
        }
    }
}

/// Wrap a blob as a one-entry signature list and run it through the enroll
/// review. Operator presence stands in for authentication on this path.
pub fn enroll_blob(
    store: &mut dyn VarStore,
    console: &mut dyn Console,
    data: &[u8],
    as_hash: bool,
    shim: &dyn ShimLock,
) -> Result<ActionResult, Error> {
    let entry = if as_hash {
        let digest = match shim.pe_sha256(data) {
            Ok(digest) => digest,
            Err(e) => {
                console.notify("Hash failed (did you select a valid EFI binary?)");
                return Err(e);
            }
        };
        log::info!("image digest {}", hex::encode(digest));
        SigEntry::sha256(digest)
    } else {
        if parse_x509_certificate(data).is_err() {
            console.notify("Invalid X509 certificate");
            return Err(Error::Crypto);
        }
        SigEntry::cert(data)
    };
    let stream = siglist::encode(&[entry]);
    actions::enroll(store, console, &stream, false)
}

pub fn enroll_key_from_disk(
    store: &mut dyn VarStore,
    console: &mut dyn Console,
    picker: &mut dyn FilePicker,
) -> Result<ActionResult, Error> {
    let Some(data) = pick_and_read(console, picker, &KEY_HEADLINE) else {
        return Ok(ActionResult::Stay);
    };
    enroll_blob(store, console, &data, false, &NoShim)
}

pub fn enroll_hash_from_disk(
    store: &mut dyn VarStore,
    console: &mut dyn Console,
    picker: &mut dyn FilePicker,
    shim: &dyn ShimLock,
) -> Result<ActionResult, Error> {
    let Some(data) = pick_and_read(console, picker, &HASH_HEADLINE) else {
        return Ok(ActionResult::Stay);
    };
    enroll_blob(store, console, &data, true, shim)
}

/// Key enrollment never hashes; stands in where a `ShimLock` is demanded
/// but unreachable.
struct NoShim;

impl ShimLock for NoShim {
    fn pe_sha256(&self, _image: &[u8]) -> Result<[u8; 32], Error> {
        Err(Error::Crypto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ScriptedConsole, ScriptedPicker, TestShim};
    use mok_api::{vars, MemoryVarStore, SigKind, VarStore};
    use digest::Digest;
    use sha2::Sha256;

    const ACME_CA_DER: &[u8] = include_bytes!("../testdata/acme-ca.der");

    #[test]
    fn test_enroll_key_from_disk_appends_cert_list() {
        let mut store = MemoryVarStore::new();
        let mut picker = ScriptedPicker::new(&[("cert.der", ACME_CA_DER)]);
        // browse Continue, then confirm enrollment
        let mut console = ScriptedConsole::new()
            .with_selections(&[Some(1)])
            .with_answers(&[true]);

        let result = enroll_key_from_disk(&mut store, &mut console, &mut picker).unwrap();
        // from-disk enrollment keeps the session going
        assert_eq!(result, ActionResult::Stay);

        let committed = store.get(vars::MOK_LIST).unwrap().unwrap().data;
        let entries = siglist::parse(&committed);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, SigKind::X509Cert);
        assert_eq!(entries[0].data, ACME_CA_DER);
    }

    #[test]
    fn test_enroll_key_rejects_non_certificate() {
        let mut store = MemoryVarStore::new();
        let mut picker = ScriptedPicker::new(&[("junk.bin", &[0xff, 0xee, 0xdd][..])]);
        let mut console = ScriptedConsole::new();
        assert_eq!(
            enroll_key_from_disk(&mut store, &mut console, &mut picker),
            Err(Error::Crypto)
        );
        assert!(store.get(vars::MOK_LIST).unwrap().is_none());
        assert_eq!(console.notices, vec!["Invalid X509 certificate"]);
    }

    #[test]
    fn test_enroll_hash_from_disk_appends_image_digest() {
        let image: &[u8] = b"MZ\x90\x00fake image bytes";
        let mut store = MemoryVarStore::new();
        let mut picker = ScriptedPicker::new(&[("grubx64.efi", image)]);
        let mut console = ScriptedConsole::new()
            .with_selections(&[Some(1)])
            .with_answers(&[true]);

        enroll_hash_from_disk(&mut store, &mut console, &mut picker, &TestShim).unwrap();

        let committed = store.get(vars::MOK_LIST).unwrap().unwrap().data;
        let entries = siglist::parse(&committed);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, SigKind::Sha256Hash);
        let expected: [u8; 32] = Sha256::digest(image).into();
        assert_eq!(entries[0].data, expected.to_vec());
    }

    #[test]
    fn test_picker_cancel_is_silent() {
        let mut store = MemoryVarStore::new();
        let mut picker = ScriptedPicker::cancelled();
        let mut console = ScriptedConsole::new();
        assert_eq!(
            enroll_key_from_disk(&mut store, &mut console, &mut picker),
            Ok(ActionResult::Stay)
        );
        assert!(console.notices.is_empty());
    }
}
