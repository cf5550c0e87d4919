// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rocket-jwt-extended project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Write-once configuration holder
//!
//! A [`ConfigStore`] stages writes until [`ConfigStore::freeze`] validates
//! the configuration and publishes it as an `Arc<JwtConfig>`. After the freeze
//! readers never lock, and every write fails with a configuration conflict.

use std::sync::{Arc, Mutex, OnceLock};

use log::debug;

use super::JwtConfig;
use crate::error::JwtError;

/// Staged, then frozen, JWT configuration
#[derive(Debug)]
pub struct ConfigStore {
    staged: Mutex<JwtConfig>,
    frozen: OnceLock<Arc<JwtConfig>>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(JwtConfig::default())
    }
}

impl ConfigStore {
    /// Create a store staging `config`
    pub fn new(config: JwtConfig) -> Self {
        Self {
            staged: Mutex::new(config),
            frozen: OnceLock::new(),
        }
    }

    /// Modify the staged configuration
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationConflict`] once the store is frozen.
    pub fn update<F>(&self, f: F) -> Result<(), JwtError>
    where
        F: FnOnce(&mut JwtConfig),
    {
        let mut staged = self
            .staged
            .lock()
            .map_err(|_| JwtError::conflict("configuration lock poisoned"))?;
        // Checked under the lock so a concurrent freeze cannot be overtaken
        if self.frozen.get().is_some() {
            return Err(JwtError::conflict(
                "can not change the configuration after the manager is initialized",
            ));
        }
        f(&mut staged);
        Ok(())
    }

    /// Validate and freeze the configuration
    ///
    /// Freezing twice returns the same `Arc`.
    pub fn freeze(&self) -> Result<Arc<JwtConfig>, JwtError> {
        let staged = self
            .staged
            .lock()
            .map_err(|_| JwtError::conflict("configuration lock poisoned"))?;
        if let Some(frozen) = self.frozen.get() {
            return Ok(Arc::clone(frozen));
        }
        staged.check_consistency()?;
        debug!("Freezing JWT configuration ({:?})", staged.algorithm);
        let frozen = self.frozen.get_or_init(|| Arc::new(staged.clone()));
        Ok(Arc::clone(frozen))
    }

    /// The frozen configuration, if [`ConfigStore::freeze`] succeeded
    pub fn get(&self) -> Option<Arc<JwtConfig>> {
        self.frozen.get().cloned()
    }

    /// Returns true once the configuration is frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_fail_after_freeze() {
        let store = ConfigStore::default();
        assert!(store.get().is_none());

        store
            .update(|config| config.secret_key = Some("secret".to_string()))
            .unwrap();
        let frozen = store.freeze().unwrap();
        assert_eq!(frozen.secret(), Some("secret"));
        assert!(store.is_frozen());

        let err = store
            .update(|config| config.algorithm = jsonwebtoken::Algorithm::HS512)
            .unwrap_err();
        assert!(matches!(err, JwtError::ConfigurationConflict(_)));
        assert_eq!(store.get().unwrap().algorithm, jsonwebtoken::Algorithm::HS256);
    }

    #[test]
    fn test_freeze_rejects_inconsistent_config() {
        let store = ConfigStore::default();
        assert!(store.freeze().is_err());
        assert!(!store.is_frozen());

        // Still writable after a failed freeze
        store
            .update(|config| config.secret_key = Some("secret".to_string()))
            .unwrap();
        assert!(store.freeze().is_ok());
    }

    #[test]
    fn test_freeze_is_idempotent() {
        let store = ConfigStore::new(JwtConfig::sample());
        let first = store.freeze().unwrap();
        let second = store.freeze().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
