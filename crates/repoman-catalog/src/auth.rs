use anyhow::{Context, bail};
use keyring::Entry;
use repoman_core::config::AppConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

const SERVICE: &str = "repoman";
const ACCOUNT: &str = "api_key";

/// Secure storage for the catalog API key.
pub trait CredentialStore {
    fn get_token(&self) -> anyhow::Result<Option<String>>;
    fn set_token(&self, token: &str) -> anyhow::Result<()>;
}

/// Platform keyring entry `repoman`/`api_key`.
pub struct KeyringStore;

impl KeyringStore {
    fn entry(&self) -> anyhow::Result<Entry> {
        Entry::new(SERVICE, ACCOUNT).context("open keyring entry")
    }
}

impl CredentialStore for KeyringStore {
    fn get_token(&self) -> anyhow::Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err).context("read API key from keyring"),
        }
    }

    fn set_token(&self, token: &str) -> anyhow::Result<()> {
        self.entry()?
            .set_password(token)
            .context("write API key to keyring")
    }
}

/// Where `save_api_key` put things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub keyring_used: bool,
    pub file_written: bool,
    pub config_path: PathBuf,
}

/// Keyring first, then the config file.
pub fn resolve_api_key(store: &dyn CredentialStore, config: &AppConfig) -> anyhow::Result<String> {
    match store.get_token() {
        Ok(Some(token)) if !token.is_empty() => return Ok(token),
        Ok(_) => {}
        Err(err) => debug!(error = %err, "keyring unavailable, falling back to config file"),
    }
    match config.api_key.as_deref() {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => bail!("not authenticated; run 'repoman auth' first"),
    }
}

/// Stores `api_key` in the keyring when possible and in the config file
/// otherwise. A key left in the file by an earlier fallback is removed once
/// the keyring accepts it.
pub fn save_api_key(
    store: &dyn CredentialStore,
    config: &mut AppConfig,
    config_path: &Path,
    api_key: &str,
    base_url: Option<&str>,
) -> anyhow::Result<SaveOutcome> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("API key cannot be empty");
    }

    let keyring_used = match store.set_token(api_key) {
        Ok(()) => true,
        Err(err) => {
            debug!(error = %err, "keyring rejected API key");
            false
        }
    };
    let had_file_key = config.api_key.is_some();
    config.api_key = (!keyring_used).then(|| api_key.to_string());
    if let Some(url) = base_url.map(str::trim).filter(|url| !url.is_empty()) {
        config.base_url = Some(url.to_string());
    }

    let file_written =
        config.api_key.is_some() || config.base_url.is_some() || had_file_key || config_path.exists();
    if file_written {
        config.save(config_path)?;
    }
    Ok(SaveOutcome {
        keyring_used,
        file_written,
        config_path: config_path.to_path_buf(),
    })
}
