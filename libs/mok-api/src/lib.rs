//! Shared vocabulary for Machine Owner Key (MOK) management.
//!
//! Everything in this crate is an agreement between the OS-side staging tool
//! (which writes the request variables) and the pre-boot manager (which
//! consumes them): variable names and attributes, the signature-list wire
//! format, and the password-record formats used to authenticate requests.

pub mod bcrypt;
pub mod error;
pub mod guid;
pub mod moksb;
pub mod passwd;
pub mod siglist;
pub mod vars;
pub mod varstore;

pub use error::Error;
pub use guid::{Guid, EFI_CERT_SHA256_GUID, EFI_CERT_X509_GUID, SHIM_LOCK_GUID};
pub use moksb::MokSbRecord;
pub use passwd::{PasswordCrypt, PasswordRecord};
pub use siglist::{SigEntry, SigKind};
pub use varstore::{MemoryVarStore, VarAttrs, VarStore, Variable};
