//! File-backed tenant database registry.
//!
//! A small JSON file `{databases: [...], updatedAt: ...}` listing the tenant
//! databases to scan. The aggregator re-reads it at the start of every pass;
//! writes go through a temp file + rename so readers never see a partial
//! file. Writes happen only via explicit admin action (the `tenant` CLI).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantList {
    pub databases: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TenantRegistry {
    path: PathBuf,
}

impl TenantRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the registry. A missing file is an empty registry, not an error.
    pub fn load(&self) -> anyhow::Result<TenantList> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TenantList {
                databases: Vec::new(),
                updated_at: Utc::now(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the tenant list. Write-then-rename keeps the swap atomic.
    pub fn save(&self, databases: Vec<String>) -> anyhow::Result<()> {
        let list = TenantList {
            databases,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&list)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Add a tenant if not already present. Returns whether it was added.
    pub fn add(&self, name: &str) -> anyhow::Result<bool> {
        let mut list = self.load()?;
        if list.databases.iter().any(|db| db == name) {
            return Ok(false);
        }
        list.databases.push(name.to_string());
        self.save(list.databases)?;
        Ok(true)
    }

    /// Remove a tenant. Returns whether it was present.
    pub fn remove(&self, name: &str) -> anyhow::Result<bool> {
        let mut list = self.load()?;
        let before = list.databases.len();
        list.databases.retain(|db| db != name);
        if list.databases.len() == before {
            return Ok(false);
        }
        self.save(list.databases)?;
        Ok(true)
    }
}
