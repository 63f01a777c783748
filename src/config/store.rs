//! Persistent state store
//!
//! One JSON file holds every chain's endpoint pool and the stored API keys.
//! The in-memory state behind the lock is the source of truth; the file is a
//! best-effort mirror flushed after each mutation. Legacy files that mapped a
//! chain id to a single URL string are normalized to one-element lists on
//! load.

use crate::crypto::{self, Cipher};
use crate::error::{ConfigError, CryptoError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// In-memory state: pools keyed by chain id, API keys by provider name
#[derive(Debug, Clone, Default)]
pub struct StoredState {
    pub pools: BTreeMap<u64, Vec<String>>,
    pub api_keys: BTreeMap<String, String>,
}

/// On-disk layout. Pool values accept both the current list form and the
/// legacy single-string form.
#[derive(Serialize, Deserialize, Default)]
struct DiskState {
    #[serde(default)]
    rpcs: BTreeMap<String, DiskPool>,
    #[serde(default)]
    api_keys: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encryption: Option<EncryptionMeta>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DiskPool {
    Many(Vec<String>),
    One(String),
}

#[derive(Serialize, Deserialize, Clone)]
struct EncryptionMeta {
    enabled: bool,
    salt: String,
}

/// File-backed store for endpoint pools and API keys
pub struct Store {
    path: PathBuf,
    cipher: Option<Cipher>,
    salt_b64: Option<String>,
    state: RwLock<StoredState>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("encrypted", &self.cipher.is_some())
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open the store, loading existing state if the file is present.
    ///
    /// With a password, API key values are decrypted on load and encrypted
    /// on save; the salt recorded in the file (or freshly generated) keeps
    /// the derived key stable across runs.
    pub fn open(path: impl Into<PathBuf>, password: Option<&str>) -> Result<Self> {
        let path = path.into();
        let disk = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::InvalidFile(format!("{}: {}", path.display(), e)))?;
            serde_json::from_str::<DiskState>(&content)
                .map_err(|e| ConfigError::InvalidFile(format!("{}: {}", path.display(), e)))?
        } else {
            DiskState::default()
        };

        let (cipher, salt_b64) = match password {
            Some(pw) => {
                let salt_b64 = disk
                    .encryption
                    .as_ref()
                    .filter(|m| m.enabled)
                    .map(|m| m.salt.clone())
                    .unwrap_or_else(|| BASE64.encode(crypto::generate_salt()));
                let salt = BASE64
                    .decode(&salt_b64)
                    .map_err(|e| CryptoError::InvalidKey(format!("bad salt: {}", e)))?;
                (Some(Cipher::from_password(pw, &salt)), Some(salt_b64))
            }
            None => (None, None),
        };

        let mut state = StoredState::default();
        for (key, pool) in disk.rpcs {
            let chain_id: u64 = match key.parse() {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!("skipping pool with unparseable chain id {:?}", key);
                    continue;
                }
            };
            let urls = match pool {
                DiskPool::Many(urls) => urls,
                DiskPool::One(url) => vec![url],
            };
            state.pools.insert(chain_id, urls);
        }

        let encrypted_on_disk = disk.encryption.as_ref().is_some_and(|m| m.enabled);
        for (provider, value) in disk.api_keys {
            let value = match (&cipher, encrypted_on_disk) {
                (Some(cipher), true) => cipher.decrypt(&value)?,
                _ => value,
            };
            state.api_keys.insert(provider, value);
        }

        Ok(Self {
            path,
            cipher,
            salt_b64,
            state: RwLock::new(state),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a closure against the state under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&StoredState) -> R) -> R {
        f(&self.state.read().expect("store lock poisoned"))
    }

    /// Run a closure against the state under the write lock
    pub fn mutate<R>(&self, f: impl FnOnce(&mut StoredState) -> R) -> R {
        f(&mut self.state.write().expect("store lock poisoned"))
    }

    /// Write the current state to disk.
    ///
    /// Callers treat persistence as best effort: log the error, keep going.
    pub fn flush(&self) -> Result<()> {
        let state = self.state.read().expect("store lock poisoned").clone();

        let mut disk = DiskState::default();
        for (chain_id, urls) in state.pools {
            disk.rpcs.insert(chain_id.to_string(), DiskPool::Many(urls));
        }
        for (provider, value) in state.api_keys {
            let value = match &self.cipher {
                Some(cipher) => cipher.encrypt(&value)?,
                None => value,
            };
            disk.api_keys.insert(provider, value);
        }
        if let (Some(_), Some(salt)) = (&self.cipher, &self.salt_b64) {
            disk.encryption = Some(EncryptionMeta {
                enabled: true,
                salt: salt.clone(),
            });
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&disk)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    // ==================== API keys ====================

    /// Stored API key for a provider (name is lower-cased)
    pub fn api_key(&self, provider: &str) -> Option<String> {
        let provider = provider.to_lowercase();
        self.read(|s| s.api_keys.get(&provider).cloned())
    }

    /// Store an API key; flushes best-effort
    pub fn set_api_key(&self, provider: &str, key: &str) {
        let provider = provider.to_lowercase();
        self.mutate(|s| s.api_keys.insert(provider, key.to_string()));
        if let Err(e) = self.flush() {
            tracing::warn!("failed to persist state: {}", e);
        }
    }

    /// Remove an API key; true if it existed
    pub fn remove_api_key(&self, provider: &str) -> bool {
        let provider = provider.to_lowercase();
        let removed = self.mutate(|s| s.api_keys.remove(&provider).is_some());
        if removed {
            if let Err(e) = self.flush() {
                tracing::warn!("failed to persist state: {}", e);
            }
        }
        removed
    }

    /// Snapshot of stored provider names and keys
    pub fn api_keys(&self) -> BTreeMap<String, String> {
        self.read(|s| s.api_keys.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("state.json"), None).unwrap();
        assert!(store.read(|s| s.pools.is_empty()));
        assert!(store.read(|s| s.api_keys.is_empty()));
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = Store::open(&path, None).unwrap();
        store.mutate(|s| {
            s.pools
                .insert(1, vec!["http://rpc1.com".to_string(), "http://rpc2.com".to_string()]);
        });
        store.set_api_key("Etherscan", "key123");
        store.flush().unwrap();

        let reloaded = Store::open(&path, None).unwrap();
        assert_eq!(
            reloaded.read(|s| s.pools.get(&1).cloned()),
            Some(vec!["http://rpc1.com".to_string(), "http://rpc2.com".to_string()])
        );
        // Provider names are lower-cased
        assert_eq!(reloaded.api_key("etherscan"), Some("key123".to_string()));
    }

    #[test]
    fn test_legacy_single_string_pool() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"rpcs": {"1": "http://old-single-rpc.com"}, "api_keys": {}}"#,
        )
        .unwrap();

        let store = Store::open(&path, None).unwrap();
        assert_eq!(
            store.read(|s| s.pools.get(&1).cloned()),
            Some(vec!["http://old-single-rpc.com".to_string()])
        );
    }

    #[test]
    fn test_unparseable_chain_id_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"rpcs": {"nonsense": ["http://a.com"], "137": ["http://b.com"]}}"#,
        )
        .unwrap();

        let store = Store::open(&path, None).unwrap();
        assert_eq!(store.read(|s| s.pools.len()), 1);
        assert!(store.read(|s| s.pools.contains_key(&137)));
    }

    #[test]
    fn test_encrypted_api_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = Store::open(&path, Some("hunter2")).unwrap();
        store.set_api_key("etherscan", "plain_key_value_1");
        store.flush().unwrap();

        // Value on disk is not plaintext
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("plain_key_value_1"));
        assert!(raw.contains("\"enabled\": true"));

        // Reload with the same password recovers it
        let reloaded = Store::open(&path, Some("hunter2")).unwrap();
        assert_eq!(
            reloaded.api_key("etherscan"),
            Some("plain_key_value_1".to_string())
        );

        // Wrong password fails loudly
        assert!(Store::open(&path, Some("wrong")).is_err());
    }

    #[test]
    fn test_corrupt_salt_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"rpcs": {}, "api_keys": {}, "encryption": {"enabled": true, "salt": "!!!not-base64!!!"}}"#,
        )
        .unwrap();

        let err = Store::open(&path, Some("pw")).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Crypto(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_remove_api_key() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("state.json"), None).unwrap();
        store.set_api_key("etherscan", "k");
        assert!(store.remove_api_key("etherscan"));
        assert!(!store.remove_api_key("etherscan"));
    }
}
