//! Account registry: who to sync, and the one flag sync writes back.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use panelsync_core::gb_to_bytes;

use crate::error::RegistryError;

const WARNING_FIELD: &str = "warning_sent";

/// One registered user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub id: String,
    pub display_name: String,
    pub language: String,
    /// Subscription token; users without one are not synced.
    pub subscription: Option<String>,
    /// Per-user quota in GB, if set.
    pub quota_gb: Option<f64>,
    pub warning_sent: bool,
}

impl UserAccount {
    /// Accounting quota in bytes, falling back to the policy default.
    pub fn quota_bytes(&self, default_gb: f64) -> u64 {
        gb_to_bytes(self.quota_gb.unwrap_or(default_gb))
    }
}

/// Source of user accounts.
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    /// Load every account. Called once per pass.
    async fn load(&self) -> Result<Vec<UserAccount>, RegistryError>;

    /// Persist the warning flag for one user.
    async fn set_warning_sent(&self, user_id: &str, warning_sent: bool)
    -> Result<(), RegistryError>;
}

#[async_trait]
impl<R: AccountRegistry + ?Sized> AccountRegistry for Arc<R> {
    #[inline]
    async fn load(&self) -> Result<Vec<UserAccount>, RegistryError> {
        (**self).load().await
    }

    #[inline]
    async fn set_warning_sent(
        &self,
        user_id: &str,
        warning_sent: bool,
    ) -> Result<(), RegistryError> {
        (**self).set_warning_sent(user_id, warning_sent).await
    }
}

// ============================================================================
// YAML file
// ============================================================================

#[derive(Deserialize)]
struct UserEntry {
    #[serde(default)]
    name: String,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    subscription: Option<String>,
    #[serde(default)]
    quota: Option<f64>,
    #[serde(default)]
    warning_sent: bool,
}

fn default_language() -> String {
    "en".to_string()
}

/// Registry backed by a `users.yaml` file keyed by user id.
///
/// The file is re-read on every [`load`](AccountRegistry::load). Write-back
/// touches only `warning_sent` and keeps every other field as found.
#[derive(Debug)]
pub struct YamlRegistry {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl YamlRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Mapping, RegistryError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Mapping::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_yaml::from_str::<Value>(&data)? {
            Value::Mapping(map) => Ok(map),
            Value::Null => Ok(Mapping::new()),
            _ => Err(RegistryError::Yaml(<serde_yaml::Error as serde::de::Error>::custom(
                "registry root must be a mapping",
            ))),
        }
    }

    async fn write_document(&self, doc: &Mapping) -> Result<(), RegistryError> {
        let data = serde_yaml::to_string(doc)?;
        let name = self
            .path
            .file_name()
            .map_or_else(|| "users.yaml".into(), |n| n.to_string_lossy().into_owned());
        let tmp = self.path.with_file_name(format!(".{name}.tmp"));
        tokio::fs::write(&tmp, data.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// User ids are numeric in most files; accept both forms.
fn key_to_id(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn find_entry_mut<'a>(doc: &'a mut Mapping, user_id: &str) -> Option<&'a mut Value> {
    doc.iter_mut()
        .find(|(k, _)| key_to_id(k).as_deref() == Some(user_id))
        .map(|(_, v)| v)
}

#[async_trait]
impl AccountRegistry for YamlRegistry {
    async fn load(&self) -> Result<Vec<UserAccount>, RegistryError> {
        let doc = self.read_document().await?;
        let mut accounts = Vec::with_capacity(doc.len());
        for (key, value) in doc {
            let Some(id) = key_to_id(&key) else {
                warn!(key = ?key, "skipping registry entry with non-scalar key");
                continue;
            };
            match serde_yaml::from_value::<UserEntry>(value) {
                Ok(entry) => accounts.push(UserAccount {
                    id,
                    display_name: entry.name,
                    language: entry.language,
                    subscription: entry.subscription.filter(|s| !s.trim().is_empty()),
                    quota_gb: entry.quota,
                    warning_sent: entry.warning_sent,
                }),
                Err(e) => warn!(user = %id, error = %e, "skipping malformed registry entry"),
            }
        }
        debug!(path = %self.path.display(), users = accounts.len(), "registry loaded");
        Ok(accounts)
    }

    async fn set_warning_sent(
        &self,
        user_id: &str,
        warning_sent: bool,
    ) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read_document().await?;
        let entry = find_entry_mut(&mut doc, user_id)
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| RegistryError::UnknownUser(user_id.to_string()))?;
        entry.insert(Value::from(WARNING_FIELD), Value::Bool(warning_sent));
        self.write_document(&doc).await?;
        debug!(user = %user_id, warning_sent, "warning flag saved");
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory registry for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    accounts: Mutex<Vec<UserAccount>>,
    writes: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new(accounts: Vec<UserAccount>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            writes: AtomicUsize::new(0),
        }
    }

    /// Current state of one account.
    pub fn get(&self, user_id: &str) -> Option<UserAccount> {
        self.accounts.lock().iter().find(|a| a.id == user_id).cloned()
    }

    /// Number of flag writes performed.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountRegistry for MemoryRegistry {
    async fn load(&self) -> Result<Vec<UserAccount>, RegistryError> {
        Ok(self.accounts.lock().clone())
    }

    async fn set_warning_sent(
        &self,
        user_id: &str,
        warning_sent: bool,
    ) -> Result<(), RegistryError> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == user_id)
            .ok_or_else(|| RegistryError::UnknownUser(user_id.to_string()))?;
        account.warning_sent = warning_sent;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
