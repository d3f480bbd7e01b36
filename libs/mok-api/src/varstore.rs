use std::collections::BTreeMap;

use crate::error::Error;

/// Firmware variable attribute bits. Only the four we traffic in; the
/// firmware defines more.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VarAttrs(pub u32);

#[allow(dead_code)]
impl VarAttrs {
    pub const NON_VOLATILE: VarAttrs = VarAttrs(0x0000_0001);
    pub const BOOTSERVICE_ACCESS: VarAttrs = VarAttrs(0x0000_0002);
    pub const RUNTIME_ACCESS: VarAttrs = VarAttrs(0x0000_0004);
    pub const APPEND_WRITE: VarAttrs = VarAttrs(0x0000_0040);

    /// The attribute set every durable MOK variable is written with.
    pub const NV_BS: VarAttrs = VarAttrs(0x0000_0003);

    pub fn contains(self, other: VarAttrs) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl core::ops::BitOr for VarAttrs {
    type Output = VarAttrs;
    fn bitor(self, rhs: VarAttrs) -> VarAttrs {
        VarAttrs(self.0 | rhs.0)
    }
}

/// A variable's full contents as read back from the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub attrs: VarAttrs,
    pub data: Vec<u8>,
}

/// The firmware variable service, threaded through the component tree as a
/// handle so tests can substitute a double. Operations are synchronous and
/// either succeed fully or leave the prior state intact.
pub trait VarStore {
    /// Read the full contents of a variable, or `None` when it does not
    /// exist.
    fn get(&self, name: &str) -> Result<Option<Variable>, Error>;

    /// Overwrite a variable. Writing zero bytes deletes it, per SetVariable
    /// semantics.
    fn set(&mut self, name: &str, attrs: VarAttrs, data: &[u8]) -> Result<(), Error>;

    /// Append-merge onto a signature-list-typed variable; the variable is
    /// created when absent.
    fn append(&mut self, name: &str, attrs: VarAttrs, data: &[u8]) -> Result<(), Error>;

    /// Remove a variable. Deleting a variable that does not exist is not an
    /// error.
    fn delete(&mut self, name: &str) -> Result<(), Error>;
}

/// In-memory variable store with the same observable semantics as the
/// firmware service. Backs the hosted binary and every scenario test.
pub struct MemoryVarStore {
    vars: BTreeMap<String, Variable>,
}

impl MemoryVarStore {
    pub fn new() -> Self {
        MemoryVarStore { vars: BTreeMap::new() }
    }

    /// Builder-style seeding, used to stage requests in tests and in the
    /// hosted state loader.
    pub fn with_var(mut self, name: &str, attrs: VarAttrs, data: &[u8]) -> Self {
        self.insert(name, attrs, data);
        self
    }

    pub fn insert(&mut self, name: &str, attrs: VarAttrs, data: &[u8]) {
        self.vars.insert(name.to_string(), Variable { attrs, data: data.to_vec() });
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(|k| k.as_str())
    }
}

impl Default for MemoryVarStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VarStore for MemoryVarStore {
    fn get(&self, name: &str) -> Result<Option<Variable>, Error> {
        Ok(self.vars.get(name).cloned())
    }

    fn set(&mut self, name: &str, attrs: VarAttrs, data: &[u8]) -> Result<(), Error> {
        if data.is_empty() {
            log::trace!("set {} with 0 bytes, deleting", name);
            self.vars.remove(name);
        } else {
            log::trace!("set {} ({} bytes)", name, data.len());
            self.vars.insert(name.to_string(), Variable { attrs, data: data.to_vec() });
        }
        Ok(())
    }

    fn append(&mut self, name: &str, attrs: VarAttrs, data: &[u8]) -> Result<(), Error> {
        log::trace!("append {} ({} bytes)", name, data.len());
        match self.vars.get_mut(name) {
            Some(var) => var.data.extend_from_slice(data),
            None => {
                self.vars.insert(name.to_string(), Variable { attrs, data: data.to_vec() });
            }
        }
        Ok(())
    }

    fn delete(&mut self, name: &str) -> Result<(), Error> {
        log::trace!("delete {}", name);
        self.vars.remove(name);
        Ok(())
    }
}
