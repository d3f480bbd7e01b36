//! The authenticated transactions. Each one follows the same ordering
//! contract: authenticate first, land the durable write, and only then
//! delete the staging variables. A failure before the durable write leaves
//! the staged request in place, so the operation stays retryable across
//! boots; once staging is gone the durable change is already committed.

use mok_api::{passwd, siglist, vars, Error, MokSbRecord, PasswordRecord, VarAttrs, VarStore};
use rand_core::RngCore;
use subtle::ConstantTimeEq;

use crate::auth;
use crate::certview;
use crate::console::Console;

/// What the menu does after an action returns.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActionResult {
    /// Back to the menu; nothing durable changed that needs a reboot.
    Stay,
    /// A durable change was committed; the session must warm-reset.
    Reset,
}

fn read_auth_record(
    store: &dyn VarStore,
    console: &mut dyn Console,
    name: &str,
) -> Result<PasswordRecord, Error> {
    let record = store
        .get(name)?
        .and_then(|var| PasswordRecord::decode(&var.data).ok());
    match record {
        Some(record) => Ok(record),
        None => {
            console.notify(&format!("Failed to get {}", name));
            Err(Error::Parse)
        }
    }
}

/// Legacy records hash the staged payload in front of the password; crypt
/// records carry their own salt and ignore it.
fn verify_staged(
    console: &mut dyn Console,
    record: &PasswordRecord,
    staged: &[u8],
    prompt: Option<&str>,
) -> Result<(), Error> {
    let challenge: &[u8] = match record {
        PasswordRecord::Legacy(_) => staged,
        PasswordRecord::Crypt(_) => &[],
    };
    auth::verify(console, record, challenge, prompt)
}

/// Enroll the staged signature-list stream into `MokList`.
///
/// With `authenticate` the stream is `MokNew` gated by `MokAuth`; without it
/// (the from-disk path) operator presence stands in for the password and the
/// staging variables are not touched.
pub fn enroll(
    store: &mut dyn VarStore,
    console: &mut dyn Console,
    mok_new: &[u8],
    authenticate: bool,
) -> Result<ActionResult, Error> {
    certview::browse(console, mok_new, "[Enroll MOK]");
    if !console.yes_no("Enroll the key(s)?") {
        return Err(Error::UserAbort);
    }

    if authenticate {
        let record = read_auth_record(store, console, vars::MOK_AUTH)?;
        if verify_staged(console, &record, mok_new, None).is_err() {
            console.notify("Failed to enroll keys");
            return Err(Error::AccessDenied);
        }
    }

    // append, not set: enrolling must never clobber prior MOK entries
    if let Err(e) = store.append(
        vars::MOK_LIST,
        VarAttrs::NV_BS | VarAttrs::APPEND_WRITE,
        mok_new,
    ) {
        console.notify("Failed to enroll keys");
        return Err(e);
    }

    if authenticate {
        store.delete(vars::MOK_NEW)?;
        store.delete(vars::MOK_AUTH)?;
        log::info!("enrolled {} staged bytes into MokList", mok_new.len());
        Ok(ActionResult::Reset)
    } else {
        log::info!("enrolled {} bytes from disk into MokList", mok_new.len());
        Ok(ActionResult::Stay)
    }
}

/// Erase the whole MOK list. Gated on `MokAuth` with an empty challenge.
pub fn reset_mok(store: &mut dyn VarStore, console: &mut dyn Console) -> Result<ActionResult, Error> {
    console.clear();
    if !console.yes_no("Erase all stored keys?") {
        return Err(Error::UserAbort);
    }
    let record = read_auth_record(store, console, vars::MOK_AUTH)?;
    if verify_staged(console, &record, &[], None).is_err() {
        console.notify("Failed to erase keys");
        return Err(Error::AccessDenied);
    }
    if let Err(e) = store.set(vars::MOK_LIST, VarAttrs::NV_BS, &[]) {
        console.notify("Failed to erase keys");
        return Err(e);
    }
    store.delete(vars::MOK_NEW)?;
    store.delete(vars::MOK_AUTH)?;
    log::info!("MokList erased");
    Ok(ActionResult::Reset)
}

/// Remove the staged entries from `MokList`.
pub fn delete(
    store: &mut dyn VarStore,
    console: &mut dyn Console,
    mok_del: &[u8],
) -> Result<ActionResult, Error> {
    certview::browse(console, mok_del, "[Delete MOK]");
    if !console.yes_no("Delete the key(s)?") {
        return Err(Error::UserAbort);
    }
    let record = read_auth_record(store, console, vars::MOK_DEL_AUTH)?;
    if verify_staged(console, &record, mok_del, None).is_err() {
        console.notify("Failed to delete keys");
        return Err(Error::AccessDenied);
    }

    let committed = store.get(vars::MOK_LIST)?;
    if let Some(var) = &committed {
        // the variable is boot-services-only by contract; runtime access
        // means something else rewrote it
        if var.attrs.contains(VarAttrs::RUNTIME_ACCESS) {
            console.alert(&[
                "MokList is compromised!".to_string(),
                "Erase all keys in MokList!".to_string(),
            ]);
            if store.delete(vars::MOK_LIST).is_err() {
                console.notify("Failed to erase MokList");
            }
            return Err(Error::Tamper);
        }
    }

    if let Some(var) = committed {
        let mut kept = siglist::parse(&var.data);
        for requested in siglist::parse(mok_del) {
            for entry in kept.iter_mut() {
                if !entry.data.is_empty()
                    && entry.data.len() == requested.data.len()
                    && bool::from(entry.data.ct_eq(&requested.data))
                {
                    // null the match; survivors keep their original order
                    entry.data.clear();
                }
            }
        }
        let survivors: Vec<_> = kept.into_iter().filter(|e| !e.data.is_empty()).collect();
        if let Err(e) = store.set(vars::MOK_LIST, VarAttrs::NV_BS, &siglist::encode(&survivors)) {
            console.notify("Failed to delete keys");
            return Err(e);
        }
        log::info!("MokList rewritten with {} surviving entries", survivors.len());
    }

    store.delete(vars::MOK_DEL)?;
    store.delete(vars::MOK_DEL_AUTH)?;
    Ok(ActionResult::Reset)
}

/// Apply the staged Secure Boot toggle.
pub fn change_sb(
    store: &mut dyn VarStore,
    console: &mut dyn Console,
    rng: &mut dyn RngCore,
    mok_sb: &[u8],
) -> Result<ActionResult, Error> {
    let record = match MokSbRecord::decode(mok_sb) {
        Ok(record) => record,
        Err(e) => {
            console.notify("Invalid MokSB variable contents");
            return Err(e);
        }
    };

    console.clear();
    if auth::verify_positions(console, rng, &record).is_err() {
        console.notify("Password limit reached");
        return Err(Error::AccessDenied);
    }

    let proceed = if record.requests_disable() {
        console.yes_no("Disable Secure Boot")
    } else {
        console.yes_no("Enable Secure Boot")
    };
    if !proceed {
        // a declined toggle is a completed request: drop it, change nothing
        store.delete(vars::MOK_SB)?;
        return Ok(ActionResult::Stay);
    }

    if record.requests_disable() {
        if let Err(e) = store.set(vars::MOK_SB_STATE, VarAttrs::NV_BS, &[1]) {
            console.notify("Failed to set Secure Boot state");
            return Err(e);
        }
        log::info!("Secure Boot disabled by owner");
    } else {
        store.delete(vars::MOK_SB_STATE)?;
        log::info!("Secure Boot override removed");
    }
    store.delete(vars::MOK_SB)?;
    Ok(ActionResult::Reset)
}

/// Set or clear the MOK password from the staged `MokPW` record.
pub fn set_pw(
    store: &mut dyn VarStore,
    console: &mut dyn Console,
    mok_pw: &[u8],
) -> Result<ActionResult, Error> {
    if !PasswordRecord::well_sized(mok_pw.len()) {
        console.notify("Invalid MokPW variable contents");
        return Err(Error::Parse);
    }
    console.clear();

    if passwd::is_all_zero(mok_pw) {
        if !console.yes_no("Clear MOK password?") {
            return Err(Error::UserAbort);
        }
        store.delete(vars::MOK_PW_STORE)?;
        store.delete(vars::MOK_PW)?;
        log::info!("MOK password cleared");
        return Ok(ActionResult::Stay);
    }

    let record = match PasswordRecord::decode(mok_pw) {
        Ok(record) => record,
        Err(e) => {
            console.notify("Invalid MokPW variable contents");
            return Err(e);
        }
    };
    // prove the operator knows the password being set before it becomes the gate
    if verify_staged(console, &record, &[], Some("Confirm MOK passphrase: ")).is_err() {
        console.notify("Password limit reached");
        return Err(Error::AccessDenied);
    }
    if !console.yes_no("Set MOK password?") {
        return Err(Error::UserAbort);
    }
    if let Err(e) = store.set(vars::MOK_PW_STORE, VarAttrs::NV_BS, mok_pw) {
        console.notify("Failed to set MOK password");
        return Err(e);
    }
    store.delete(vars::MOK_PW)?;
    log::info!("MOK password updated");
    Ok(ActionResult::Reset)
}
