//! Human-readable rendering of staged MOK entries.

use mok_api::{siglist, Error, SigEntry, SigKind};
use x509_parser::prelude::parse_x509_certificate;
use x509_parser::time::ASN1Time;

use crate::console::Console;

const HEX_BYTES_PER_LINE: usize = 10;

/// Extract the displayable fields of a DER certificate, one line each.
/// Empty fields are dropped rather than rendered blank.
pub fn describe_cert(der: &[u8]) -> Result<Vec<String>, Error> {
    let (_, cert) = parse_x509_certificate(der).map_err(|e| {
        log::warn!("certificate parse failed: {:?}", e);
        Error::Crypto
    })?;

    let mut lines = Vec::new();
    let serial = cert.raw_serial_as_string();
    if !serial.is_empty() {
        lines.push(format!("Serial Number: {}", serial));
    }
    let issuer = cert.issuer().to_string();
    if !issuer.is_empty() {
        lines.push(format!("Issuer: {}", issuer));
    }
    let subject = cert.subject().to_string();
    if !subject.is_empty() {
        lines.push(format!("Subject: {}", subject));
    }
    lines.push(format!(
        "Validity from: {}",
        render_time(&cert.validity().not_before)
    ));
    lines.push(format!(
        "Validity till: {}",
        render_time(&cert.validity().not_after)
    ));
    Ok(lines)
}

/// `Mon dd HH:MM:SS yyyy[ GMT]`. Two-digit UTCTime years arrive from the
/// parser already mapped per RFC 5280 (under 50 means 20xx, else 19xx).
fn render_time(time: &ASN1Time) -> String {
    let dt = time.to_datetime();
    let month = dt.month().to_string();
    format!(
        "{} {:2} {:02}:{:02}:{:02} {}{}",
        &month[..3],
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.year(),
        if dt.offset().is_utc() { " GMT" } else { "" }
    )
}

/// `SHA256 hash:` plus the digest in hex, ten bytes to a line.
pub fn hash_lines(hash: &[u8]) -> Vec<String> {
    let mut lines = vec!["SHA256 hash:".to_string()];
    for chunk in hash.chunks(HEX_BYTES_PER_LINE) {
        let rendered: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        lines.push(format!("   {}", rendered.join(" ")));
    }
    lines
}

/// Render one entry in an alert box; an unparseable certificate degrades to
/// a notification instead of aborting the review.
pub fn show_entry(console: &mut dyn Console, entry: &SigEntry) {
    match entry.kind {
        SigKind::Sha256Hash => console.alert(&hash_lines(&entry.data)),
        SigKind::X509Cert => match describe_cert(&entry.data) {
            Ok(lines) => console.alert(&lines),
            Err(_) => console.notify("Not a valid X509 certificate"),
        },
    }
}

/// The pre-confirmation key browser: `View key N` per recognized entry plus
/// `Continue`. Runs until the operator moves on.
pub fn browse(console: &mut dyn Console, stream: &[u8], title: &str) {
    let entries = siglist::parse(stream);
    if entries.is_empty() {
        console.notify("No MOK keys found");
        return;
    }
    let mut items: Vec<String> = (0..entries.len()).map(|i| format!("View key {}", i)).collect();
    items.push("Continue".to_string());
    loop {
        match console.select(title, &items) {
            Some(choice) if choice < entries.len() => show_entry(console, &entries[choice]),
            _ => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedConsole;

    const ACME_CA_DER: &[u8] = include_bytes!("../testdata/acme-ca.der");

    #[test]
    fn test_describe_cert_fields() {
        let lines = describe_cert(ACME_CA_DER).unwrap();
        assert!(lines[0].starts_with("Serial Number: "));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("Issuer: ") && l.contains("Acme Boot Systems")));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("Subject: ") && l.contains("Acme Secure Boot Signing CA")));
        let from = lines.iter().find(|l| l.starts_with("Validity from: ")).unwrap();
        assert!(from.contains("2026") && from.ends_with(" GMT"));
        let till = lines.iter().find(|l| l.starts_with("Validity till: ")).unwrap();
        assert!(till.contains("2036"));
    }

    #[test]
    fn test_describe_cert_rejects_garbage() {
        assert_eq!(describe_cert(&[0xde, 0xad, 0xbe, 0xef]), Err(Error::Crypto));
    }

    #[test]
    fn test_hash_rendering_is_ten_bytes_per_line() {
        let mut digest = [0u8; 32];
        for (i, b) in digest.iter_mut().enumerate() {
            *b = i as u8;
        }
        let lines = hash_lines(&digest);
        assert_eq!(lines.len(), 5); // title + 10 + 10 + 10 + 2
        assert_eq!(lines[0], "SHA256 hash:");
        assert_eq!(
            lines[1],
            "   00 01 02 03 04 05 06 07 08 09"
        );
        assert_eq!(lines[4], "   1e 1f");
    }

    #[test]
    fn test_show_entry_notifies_on_bad_cert() {
        let mut console = ScriptedConsole::new();
        show_entry(&mut console, &SigEntry::cert(&[1, 2, 3]));
        assert_eq!(console.notices, vec!["Not a valid X509 certificate"]);
    }

    #[test]
    fn test_browse_views_then_continues() {
        let stream = siglist::encode(&[SigEntry::sha256([0xaa; 32])]);
        // view entry 0, then pick Continue
        let mut console = ScriptedConsole::new().with_selections(&[Some(0), Some(1)]);
        browse(&mut console, &stream, "[Enroll MOK]");
        assert_eq!(console.alerts.len(), 1);
        assert_eq!(console.alerts[0][0], "SHA256 hash:");
    }

    #[test]
    fn test_browse_on_empty_stream_notifies() {
        let mut console = ScriptedConsole::new();
        browse(&mut console, &[], "[Delete MOK]");
        assert_eq!(console.notices, vec!["No MOK keys found"]);
    }
}
