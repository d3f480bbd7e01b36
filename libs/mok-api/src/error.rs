use std::fmt;

/// Error vocabulary shared by the staging-tool side and the manager.
///
/// Each action in the manager is a transaction: anything that fails before
/// the durable write surfaces as one of these and leaves the staged request
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A firmware variable read/write/delete failed.
    Storage(String),
    /// Hash or certificate construction failed.
    Crypto,
    /// A signature list or password record was malformed or wrong-sized.
    Parse,
    /// Password verification exhausted its retries.
    AccessDenied,
    /// Allocation failure.
    OutOfResources,
    /// The operator declined a confirmation.
    UserAbort,
    /// A boot-services-only variable was observed with runtime access.
    Tamper,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Storage(cause) => write!(f, "variable storage error: {}", cause),
            Error::Crypto => write!(f, "crypto operation failed"),
            Error::Parse => write!(f, "malformed or wrong-sized data"),
            Error::AccessDenied => write!(f, "password limit reached"),
            Error::OutOfResources => write!(f, "out of resources"),
            Error::UserAbort => write!(f, "declined by operator"),
            Error::Tamper => write!(f, "boot-services variable is runtime accessible"),
        }
    }
}
