//! Administrator capability

use lineage_core::{Address, RegistryError, Result};

/// Single administrator identity
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessControl {
    admin: Address,
}

impl AccessControl {
    pub fn new(admin: Address) -> Self {
        Self { admin }
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Guard placed at the top of every privileged operation
    pub fn ensure_admin(&self, caller: &Address) -> Result<()> {
        if *caller != self.admin {
            tracing::debug!(%caller, "rejected privileged call");
            return Err(RegistryError::Unauthorized);
        }
        Ok(())
    }

    /// Hand the capability to `new_admin`, returning the previous holder
    pub fn transfer(&mut self, caller: &Address, new_admin: Address) -> Result<Address> {
        self.ensure_admin(caller)?;
        let previous = std::mem::replace(&mut self.admin, new_admin);
        Ok(previous)
    }
}
