//! Credential persistence behind a pluggable store.
//!
//! Production code uses the OS credential vault via [`KeyringStore`]; tests
//! inject [`MemoryStore`] so no secrets ever touch a real keychain.

use std::collections::HashMap;
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};

use crate::error::Result;

/// Service name under which entries are registered with the OS vault.
pub const KEYRING_SERVICE: &str = "mdmforge";

/// Key/value storage for credentials and tokens.
///
/// Keys are scoped by the caller: credential keys embed the server URL,
/// the active-token key is global.
pub trait SecretStore: Send + Sync {
    fn put(&self, key: &str, value: &SecretString) -> Result<()>;

    /// Fetch a secret. Absence is not an error.
    fn get(&self, key: &str) -> Result<Option<SecretString>>;

    /// Remove a secret. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Secret store backed by the OS credential vault.
#[derive(Debug, Default)]
pub struct KeyringStore;

impl KeyringStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(key: &str) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(KEYRING_SERVICE, key)?)
    }
}

impl SecretStore for KeyringStore {
    fn put(&self, key: &str, value: &SecretString) -> Result<()> {
        Self::entry(key)?.set_password(value.expose_secret())?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<SecretString>> {
        match Self::entry(key)?.get_password() {
            Ok(value) => Ok(Some(SecretString::new(value.into()))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory secret store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Number of stored entries. Test assertion helper.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl SecretStore for MemoryStore {
    fn put(&self, key: &str, value: &SecretString) -> Result<()> {
        self.lock()
            .insert(key.to_string(), value.expose_secret().to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<SecretString>> {
        Ok(self
            .lock()
            .get(key)
            .map(|value| SecretString::new(value.clone().into())))
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        store
            .put("mdmforge.username", &SecretString::new("admin".into()))
            .unwrap();

        let value = store.get("mdmforge.username").unwrap().unwrap();
        assert_eq!(value.expose_secret(), "admin");

        store.delete("mdmforge.username").unwrap();
        assert!(store.get("mdmforge.username").unwrap().is_none());
    }

    #[test]
    fn test_absent_key_is_not_an_error() {
        let store = MemoryStore::new();
        assert!(store.get("missing").unwrap().is_none());
        store.delete("missing").unwrap();
    }
}
