//! The variable table. All names live under [`crate::SHIM_LOCK_GUID`].
//!
//! Staging variables are created by the OS-side tool, consumed here, and
//! deleted by the committing transaction; `MokList`, `MokSBState` and
//! `MokPWStore` are the durable policy.

/// Committed MOK entries, append-only.
pub const MOK_LIST: &str = "MokList";
/// Runtime-visible mirror maintained by the shim stage; read-only here.
pub const MOK_LIST_RT: &str = "MokListRT";
/// Pending enroll request: an encoded signature-list stream.
pub const MOK_NEW: &str = "MokNew";
/// Password record gating `MokNew`.
pub const MOK_AUTH: &str = "MokAuth";
/// Pending delete request.
pub const MOK_DEL: &str = "MokDel";
/// Password record gating `MokDel`.
pub const MOK_DEL_AUTH: &str = "MokDelAuth";
/// Pending Secure Boot toggle (a [`crate::MokSbRecord`]).
pub const MOK_SB: &str = "MokSB";
/// Present with contents `[1]` when the owner has disabled Secure Boot.
pub const MOK_SB_STATE: &str = "MokSBState";
/// Pending password change; all-zero payload means "clear".
pub const MOK_PW: &str = "MokPW";
/// The active MOK password record.
pub const MOK_PW_STORE: &str = "MokPWStore";

/// The four staging variables, in the order the session cleans them up.
pub const STAGING_VARS: [&str; 4] = [MOK_NEW, MOK_DEL, MOK_SB, MOK_PW];

/// Auth variables deleted unconditionally at session exit.
pub const AUTH_VARS: [&str; 2] = [MOK_AUTH, MOK_DEL_AUTH];
