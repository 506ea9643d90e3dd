//! Persistent storage for the bearer token.
//!
//! Exactly one named slot exists. Backends: a JSON session file in the cache
//! directory, or the OS keychain.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, TokenStorage, APP_NAME};

/// Name of the single token slot.
pub const TOKEN_SLOT: &str = "jwtToken";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

pub trait TokenStore: Send + Sync {
    /// Read the stored token, if any.
    fn load(&self) -> Result<Option<String>>;

    /// Store `token`, replacing any previous one.
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the stored token. Returns true if one was present.
    fn clear(&self) -> Result<bool>;
}

/// Open the backend selected in the configuration.
pub fn open_token_store(config: &Config) -> Result<Arc<dyn TokenStore>> {
    match config.token_storage {
        TokenStorage::File => {
            let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
            debug!(?cache_dir, "Using file token store");
            Ok(Arc::new(FileTokenStore::new(cache_dir)))
        }
        TokenStorage::Keyring => {
            debug!("Using keyring token store");
            Ok(Arc::new(KeyringTokenStore::new()?))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    #[serde(rename = "jwtToken")]
    token: String,
}

pub struct FileTokenStore {
    cache_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionFile =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(data.token))
    }

    fn save(&self, token: &str) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&SessionFile {
            token: token.to_string(),
        })?;
        std::fs::write(path, contents).context("Failed to write session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

pub struct KeyringTokenStore {
    entry: Entry,
}

impl KeyringTokenStore {
    pub fn new() -> Result<Self> {
        let entry = Entry::new(APP_NAME, TOKEN_SLOT).context("Failed to create keyring entry")?;
        Ok(Self { entry })
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<String>> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read token from keychain"),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        self.entry
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn clear(&self) -> Result<bool> {
        match self.entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
