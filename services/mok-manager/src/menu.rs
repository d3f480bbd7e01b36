//! The session state machine: password gate, dynamic menu, dispatch, reset.

use mok_api::{vars, Error, PasswordRecord, VarAttrs, VarStore};
use rand_core::RngCore;

use crate::actions::{self, ActionResult};
use crate::auth;
use crate::console::Console;
use crate::fileenroll::{self, FilePicker, ShimLock};
use crate::requests::PendingRequests;

/// Reset control. `warm_reset` should not return; when it does anyway (a
/// firmware that refuses, or the hosted double), the session winds down with
/// the action's result instead of looping.
pub trait Platform {
    fn warm_reset(&mut self);
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum MenuItem {
    ContinueBoot,
    ResetMok,
    EnrollMok,
    DeleteMok,
    ChangeSb,
    SetPw,
    KeyEnroll,
    HashEnroll,
}

/// One operator session over the firmware seams.
pub struct Session<'a> {
    pub store: &'a mut dyn VarStore,
    pub console: &'a mut dyn Console,
    pub rng: &'a mut dyn RngCore,
    pub picker: &'a mut dyn FilePicker,
    pub shim: &'a dyn ShimLock,
    pub platform: &'a mut dyn Platform,
}

impl<'a> Session<'a> {
    /// Load the staged requests, run the menu, and sweep the staging and
    /// auth variables on the way out no matter how the menu ended.
    pub fn run(&mut self) -> Result<(), Error> {
        let requests = PendingRequests::load(self.store);
        let result = self.menu_loop(&requests);
        requests.cleanup(self.store, self.console);
        result
    }

    fn menu_loop(&mut self, requests: &PendingRequests) -> Result<(), Error> {
        self.password_gate()?;

        let (labels, items) = build_menu(requests);
        loop {
            let choice = match self.console.select("Perform MOK management", &labels) {
                Some(choice) => choice,
                None => return Ok(()),
            };
            let item = items[choice];
            if item == MenuItem::ContinueBoot {
                return Ok(());
            }
            match self.dispatch(item, requests) {
                Ok(ActionResult::Reset) => {
                    self.console.notify("The system must now be rebooted");
                    self.platform.warm_reset();
                    log::warn!("reset request returned, ending session");
                    return Ok(());
                }
                Ok(ActionResult::Stay) => {}
                Err(Error::UserAbort) => {} // declined; nothing changed
                Err(e) => {
                    // the action already told the operator; keep the menu up
                    log::warn!("{:?} failed: {}", item, e);
                }
            }
        }
    }

    fn dispatch(&mut self, item: MenuItem, requests: &PendingRequests) -> Result<ActionResult, Error> {
        match item {
            MenuItem::ContinueBoot => Ok(ActionResult::Stay),
            MenuItem::ResetMok => actions::reset_mok(self.store, self.console),
            MenuItem::EnrollMok => actions::enroll(
                self.store,
                self.console,
                requests.mok_new.as_deref().unwrap_or(&[]),
                true,
            ),
            MenuItem::DeleteMok => actions::delete(
                self.store,
                self.console,
                requests.mok_del.as_deref().unwrap_or(&[]),
            ),
            MenuItem::ChangeSb => actions::change_sb(
                self.store,
                self.console,
                self.rng,
                requests.mok_sb.as_deref().unwrap_or(&[]),
            ),
            MenuItem::SetPw => actions::set_pw(
                self.store,
                self.console,
                requests.mok_pw.as_deref().unwrap_or(&[]),
            ),
            MenuItem::KeyEnroll => {
                fileenroll::enroll_key_from_disk(self.store, self.console, self.picker)
            }
            MenuItem::HashEnroll => {
                fileenroll::enroll_hash_from_disk(self.store, self.console, self.picker, self.shim)
            }
        }
    }

    /// Gate the whole menu on `MokPWStore` when one is usable. A missing,
    /// malformed, or runtime-accessible record does not gate: anything able
    /// to plant one of those could as easily have planted a password it
    /// knows, so failing closed buys nothing.
    fn password_gate(&mut self) -> Result<(), Error> {
        let var = match self.store.get(vars::MOK_PW_STORE) {
            Ok(Some(var)) => var,
            _ => return Ok(()),
        };
        if !PasswordRecord::well_sized(var.data.len())
            || var.attrs.contains(VarAttrs::RUNTIME_ACCESS)
        {
            return Ok(());
        }
        let record = match PasswordRecord::decode(&var.data) {
            Ok(record) => record,
            Err(_) => return Ok(()),
        };
        self.console.clear();
        match auth::verify(self.console, &record, &[], Some("Enter MOK password: ")) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.console.notify("Password limit reached");
                Err(e)
            }
        }
    }
}

/// Build the menu for this session's requests, preserving the layout the
/// staging tools document: mandatory entries bracket the conditional ones.
fn build_menu(requests: &PendingRequests) -> (Vec<String>, Vec<MenuItem>) {
    let mut labels = vec!["Continue boot".to_string()];
    let mut items = vec![MenuItem::ContinueBoot];

    if requests.mok_new.is_some() {
        labels.push("Enroll MOK".to_string());
        items.push(MenuItem::EnrollMok);
    } else if requests.enroll_auth {
        labels.push("Reset MOK".to_string());
        items.push(MenuItem::ResetMok);
    }
    if requests.mok_del.is_some() || requests.delete_auth {
        labels.push("Delete MOK".to_string());
        items.push(MenuItem::DeleteMok);
    }
    if requests.mok_sb.is_some() {
        labels.push("Change Secure Boot state".to_string());
        items.push(MenuItem::ChangeSb);
    }
    if requests.mok_pw.is_some() {
        labels.push("Set MOK password".to_string());
        items.push(MenuItem::SetPw);
    }
    labels.push("Enroll key from disk".to_string());
    items.push(MenuItem::KeyEnroll);
    labels.push("Enroll hash from disk".to_string());
    items.push(MenuItem::HashEnroll);

    (labels, items)
}

/// Map a session result onto the firmware status words the loader expects.
pub fn status_code(result: &Result<(), Error>) -> i32 {
    match result {
        Ok(()) => 0,                                       // SUCCESS
        Err(Error::AccessDenied) | Err(Error::Tamper) => 15, // ACCESS_DENIED
        Err(Error::OutOfResources) => 9,                   // OUT_OF_RESOURCES
        Err(_) => 21,                                      // ABORTED
    }
}
