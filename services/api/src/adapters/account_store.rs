//! services/api/src/adapters/account_store.rs
//!
//! This module contains the account store adapter, the concrete implementation of
//! the `AccountStore` port. Accounts live in a pretty-printed JSON file keyed by
//! username, which is rewritten in full after every change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use translation_workflow_core::domain::{Role, UserAccount};
use translation_workflow_core::ports::{AccountStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An account store that implements the `AccountStore` port on top of a JSON file.
pub struct JsonAccountStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl JsonAccountStore {
    /// Opens the store, creating an empty `{}` file when none exists.
    pub async fn open(path: impl Into<PathBuf>) -> PortResult<Self> {
        let path = path.into();
        if !tokio::fs::try_exists(&path).await.map_err(io_error)? {
            info!("Creating empty user database at {}", path.display());
            write_records(&path, &BTreeMap::new()).await?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    async fn load(&self) -> PortResult<BTreeMap<String, AccountRecord>> {
        read_records(&self.path).await
    }
}

//=========================================================================================
// "Impure" File Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize)]
struct AccountRecord {
    password_hash: String,
    role: Role,
}
impl AccountRecord {
    fn to_domain(self, username: String) -> UserAccount {
        UserAccount {
            username,
            password_hash: self.password_hash,
            role: self.role,
        }
    }
}

fn io_error(e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("User database I/O failed: {}", e))
}

async fn read_records(path: &Path) -> PortResult<BTreeMap<String, AccountRecord>> {
    let raw = tokio::fs::read_to_string(path).await.map_err(io_error)?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&raw)
        .map_err(|e| PortError::Unexpected(format!("User database is corrupt: {}", e)))
}

async fn write_records(path: &Path, records: &BTreeMap<String, AccountRecord>) -> PortResult<()> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    tokio::fs::write(path, json).await.map_err(io_error)
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for JsonAccountStore {
    async fn get_account(&self, username: &str) -> PortResult<UserAccount> {
        let mut records = self.load().await?;
        records
            .remove(username)
            .map(|record| record.to_domain(username.to_string()))
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }

    async fn list_accounts(&self) -> PortResult<Vec<UserAccount>> {
        let records = self.load().await?;
        Ok(records
            .into_iter()
            .map(|(username, record)| record.to_domain(username))
            .collect())
    }

    async fn create_account(&self, account: UserAccount) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.contains_key(&account.username) {
            return Err(PortError::Conflict(format!(
                "User {} already exists",
                account.username
            )));
        }
        records.insert(
            account.username,
            AccountRecord {
                password_hash: account.password_hash,
                role: account.role,
            },
        );
        write_records(&self.path, &records).await
    }

    async fn delete_account(&self, username: &str) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.remove(username).is_none() {
            return Err(PortError::NotFound(format!("User {} not found", username)));
        }
        write_records(&self.path, &records).await
    }
}
