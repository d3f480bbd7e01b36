//! Discovery and cleanup of the staged operator requests.

use mok_api::{vars, PasswordRecord, VarStore};

use crate::console::Console;

/// A one-shot snapshot of what the shim staged for this session. The
/// payloads are owned here: the variables themselves are deleted by the
/// committing transaction (or the session-exit sweep), never out from under
/// an action that is still looking at them.
pub struct PendingRequests {
    pub mok_new: Option<Vec<u8>>,
    pub mok_del: Option<Vec<u8>>,
    pub mok_sb: Option<Vec<u8>>,
    pub mok_pw: Option<Vec<u8>>,
    /// `MokAuth` exists and is sized like a password record.
    pub enroll_auth: bool,
    /// `MokDelAuth` exists and is sized like a password record.
    pub delete_auth: bool,
}

impl PendingRequests {
    pub fn load(store: &dyn VarStore) -> PendingRequests {
        let payload = |name: &str| match store.get(name) {
            Ok(Some(var)) if !var.data.is_empty() => {
                log::info!("pending {} ({} bytes)", name, var.data.len());
                Some(var.data)
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!("failed to read {}: {}", name, e);
                None
            }
        };
        let auth_present = |name: &str| match store.get(name) {
            Ok(Some(var)) => PasswordRecord::well_sized(var.data.len()),
            _ => false,
        };

        PendingRequests {
            mok_new: payload(vars::MOK_NEW),
            mok_del: payload(vars::MOK_DEL),
            mok_sb: payload(vars::MOK_SB),
            mok_pw: payload(vars::MOK_PW),
            enroll_auth: auth_present(vars::MOK_AUTH),
            delete_auth: auth_present(vars::MOK_DEL_AUTH),
        }
    }

    /// End-of-session sweep: every staging variable that was present gets
    /// deleted (telling the operator when that does not stick), and the auth
    /// variables go unconditionally. Committed transactions will usually
    /// have emptied these already.
    pub fn cleanup(&self, store: &mut dyn VarStore, console: &mut dyn Console) {
        let staged = [
            (vars::MOK_NEW, self.mok_new.is_some()),
            (vars::MOK_DEL, self.mok_del.is_some()),
            (vars::MOK_SB, self.mok_sb.is_some()),
            (vars::MOK_PW, self.mok_pw.is_some()),
        ];
        for (name, present) in staged {
            if present && store.delete(name).is_err() {
                console.notify(&format!("Failed to delete {}", name));
            }
        }
        for name in vars::AUTH_VARS {
            if let Err(e) = store.delete(name) {
                log::warn!("failed to delete {}: {}", name, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedConsole;
    use mok_api::passwd::LEGACY_AUTH_SIZE;
    use mok_api::{MemoryVarStore, VarAttrs};

    #[test]
    fn test_load_snapshot() {
        let store = MemoryVarStore::new()
            .with_var(vars::MOK_NEW, VarAttrs::NV_BS, &[1, 2, 3])
            .with_var(vars::MOK_AUTH, VarAttrs::NV_BS, &[0u8; LEGACY_AUTH_SIZE])
            .with_var(vars::MOK_DEL_AUTH, VarAttrs::NV_BS, &[0u8; 7]);
        let requests = PendingRequests::load(&store);
        assert_eq!(requests.mok_new.as_deref(), Some(&[1u8, 2, 3][..]));
        assert!(requests.mok_del.is_none());
        assert!(requests.enroll_auth);
        // present but not record-sized does not count
        assert!(!requests.delete_auth);
    }

    #[test]
    fn test_cleanup_sweeps_staging_and_auth() {
        let mut store = MemoryVarStore::new()
            .with_var(vars::MOK_NEW, VarAttrs::NV_BS, &[1])
            .with_var(vars::MOK_PW, VarAttrs::NV_BS, &[2])
            .with_var(vars::MOK_AUTH, VarAttrs::NV_BS, &[0u8; LEGACY_AUTH_SIZE])
            .with_var(vars::MOK_LIST, VarAttrs::NV_BS, &[9]);
        let requests = PendingRequests::load(&store);
        let mut console = ScriptedConsole::new();
        requests.cleanup(&mut store, &mut console);
        for name in vars::STAGING_VARS.iter().chain(vars::AUTH_VARS.iter()) {
            assert!(store.get(name).unwrap().is_none(), "{} should be gone", name);
        }
        // durable state is not the sweep's business
        assert!(store.get(vars::MOK_LIST).unwrap().is_some());
        assert!(console.notices.is_empty());
    }
}
