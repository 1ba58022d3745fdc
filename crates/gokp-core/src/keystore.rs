//! OS secret store access.
//!
//! gokp only ever stores one secret, the meta-vault password, under
//! `(SERVICE, USER)`.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

pub const SERVICE: &str = "gokp";
pub const USER: &str = "local";

/// A key-value secret store keyed by service and user.
pub trait SecretStore {
    fn get(&self, service: &str, user: &str) -> Result<String>;
    fn set(&self, service: &str, user: &str, secret: &str) -> Result<()>;
    fn delete(&self, service: &str, user: &str) -> Result<()>;
}

fn not_found(service: &str, user: &str) -> Error {
    Error::SecretNotFound {
        service: service.to_string(),
        user: user.to_string(),
    }
}

/// The platform keychain (Secret Service, macOS Keychain, Windows Credential Manager).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsKeyring;

impl OsKeyring {
    fn entry(service: &str, user: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(service, user)
            .map_err(|e| Error::Keystore(format!("failed to access keyring: {e}")))
    }
}

impl SecretStore for OsKeyring {
    fn get(&self, service: &str, user: &str) -> Result<String> {
        match Self::entry(service, user)?.get_password() {
            Ok(secret) => Ok(secret),
            Err(keyring::Error::NoEntry) => Err(not_found(service, user)),
            Err(e) => Err(Error::Keystore(e.to_string())),
        }
    }

    fn set(&self, service: &str, user: &str, secret: &str) -> Result<()> {
        Self::entry(service, user)?
            .set_password(secret)
            .map_err(|e| Error::Keystore(e.to_string()))?;
        tracing::debug!("Stored secret for {}/{}", service, user);
        Ok(())
    }

    fn delete(&self, service: &str, user: &str) -> Result<()> {
        match Self::entry(service, user)?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Err(not_found(service, user)),
            Err(e) => Err(Error::Keystore(e.to_string())),
        }
    }
}

/// Process-local store, used where no OS keychain should be touched.
#[derive(Debug, Default)]
pub struct MemoryKeystore {
    secrets: Mutex<HashMap<(String, String), String>>,
}

impl MemoryKeystore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(service: &str, user: &str) -> (String, String) {
        (service.to_string(), user.to_string())
    }
}

impl SecretStore for MemoryKeystore {
    fn get(&self, service: &str, user: &str) -> Result<String> {
        let secrets = self.secrets.lock().unwrap_or_else(PoisonError::into_inner);
        secrets
            .get(&Self::key(service, user))
            .cloned()
            .ok_or_else(|| not_found(service, user))
    }

    fn set(&self, service: &str, user: &str, secret: &str) -> Result<()> {
        let mut secrets = self.secrets.lock().unwrap_or_else(PoisonError::into_inner);
        secrets.insert(Self::key(service, user), secret.to_string());
        Ok(())
    }

    fn delete(&self, service: &str, user: &str) -> Result<()> {
        let mut secrets = self.secrets.lock().unwrap_or_else(PoisonError::into_inner);
        secrets
            .remove(&Self::key(service, user))
            .map(|_| ())
            .ok_or_else(|| not_found(service, user))
    }
}
