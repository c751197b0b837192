//! Forced-offline flag persistence.
//!
//! The flag lives in session-scoped key-value storage so a reload keeps the
//! application offline. Presence of the key means "forced"; the stored value
//! is irrelevant.

use crux_kv::error::KeyValueError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::capabilities::Capabilities;
use crate::event::Event;

pub const MAX_KEY_LENGTH: usize = 512;
pub const FORCED_OFFLINE_KEY: &str = "offline_forced";
const FORCED_VALUE: &[u8] = b"1";

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistenceError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<KeyValueError> for PersistenceError {
    fn from(e: KeyValueError) -> Self {
        PersistenceError::Storage(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    /// Cleared when the browsing session ends.
    Session,
}

impl KeyNamespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            KeyNamespace::Session => "session",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey {
    namespace: KeyNamespace,
    key: String,
}

impl StorageKey {
    pub fn new(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, PersistenceError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { namespace, key })
    }

    pub fn forced_offline() -> Result<Self, PersistenceError> {
        Self::new(KeyNamespace::Session, FORCED_OFFLINE_KEY)
    }

    pub fn raw(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.key)
    }

    fn validate_key(key: &str) -> Result<(), PersistenceError> {
        let invalid = |reason: &str| PersistenceError::InvalidKey {
            key: key.chars().take(50).collect(),
            reason: reason.to_string(),
        };

        if key.trim().is_empty() {
            return Err(invalid("key cannot be empty"));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(invalid("key is too long"));
        }
        if key.contains(':') {
            return Err(invalid("key cannot contain the namespace separator"));
        }
        if key.chars().any(char::is_control) {
            return Err(invalid("key contains control characters"));
        }
        Ok(())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace.prefix(), self.key)
    }
}

/// Interpret a read of the flag key.
pub fn decode(result: Result<Option<Vec<u8>>, KeyValueError>) -> Result<bool, PersistenceError> {
    Ok(result?.is_some())
}

/// Read the flag; answers with [`Event::ForcedFlagRestored`]. When no read
/// could be issued the caller must settle startup itself.
pub(crate) fn restore(caps: &Capabilities) -> Result<(), PersistenceError> {
    let key = StorageKey::forced_offline()?;
    debug!(%key, "restoring forced-offline flag");
    caps.key_value
        .get(key.raw(), |result| Event::ForcedFlagRestored(decode(result)));
    Ok(())
}

/// Write (`true`) or remove (`false`) the flag; answers with
/// [`Event::ForcedFlagStored`].
pub(crate) fn store(caps: &Capabilities, forced: bool) {
    let key = match StorageKey::forced_offline() {
        Ok(key) => key,
        Err(e) => {
            warn!(error = %e, forced, "cannot persist forced-offline flag");
            return;
        }
    };

    debug!(%key, forced, "persisting forced-offline flag");
    if forced {
        caps.key_value.set(key.raw(), FORCED_VALUE.to_vec(), |result| {
            Event::ForcedFlagStored(result.map(|_| ()).map_err(PersistenceError::from))
        });
    } else {
        caps.key_value.delete(key.raw(), |result| {
            Event::ForcedFlagStored(result.map(|_| ()).map_err(PersistenceError::from))
        });
    }
}
