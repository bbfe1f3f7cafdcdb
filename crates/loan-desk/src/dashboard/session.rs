//! Session identity handed to the dashboard by the authentication collaborator.
//!
//! Core logic only ever receives a [`Session`] value. Reading the ambient key-value store
//! happens once, at the edge, through [`Session::from_store`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Storage key holding the JSON-encoded `{id, role, name}` record.
pub const SESSION_STORAGE_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Applicant,
}

impl Role {
    /// Only `ADMIN` grants administrator scope; every other non-empty role is an applicant.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "" => None,
            "ADMIN" => Some(Self::Admin),
            _ => Some(Self::Applicant),
        }
    }
}

/// Current actor. `id` and `role` are optional so an anonymous session can be represented
/// and rejected by the repository before any request is issued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub id: Option<String>,
    pub role: Option<Role>,
    pub name: Option<String>,
}

impl Session {
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            role: Some(Role::Admin),
            name: None,
        }
    }

    pub fn applicant(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            role: Some(Role::Applicant),
            name: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// Both identity and role are present.
    pub fn is_authenticated(&self) -> bool {
        self.id.is_some() && self.role.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("User")
    }

    /// Decode the stored JSON record. Malformed content is treated as "not logged in".
    pub fn from_json(raw: &str) -> Self {
        let Ok(Value::Object(record)) = serde_json::from_str::<Value>(raw) else {
            return Self::anonymous();
        };

        Self {
            id: record.get("id").and_then(identifier),
            role: record
                .get("role")
                .and_then(Value::as_str)
                .and_then(Role::parse),
            name: record
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    pub fn from_store(store: &dyn KeyValueStore) -> Self {
        store
            .get(SESSION_STORAGE_KEY)
            .map(|raw| Self::from_json(&raw))
            .unwrap_or_default()
    }
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) if !raw.trim().is_empty() => Some(raw.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Process-local string storage, shaped like browser local storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// JSON object file mapping keys to string values. A missing or unreadable file behaves
/// as an empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Map<String, Value> {
        match fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
        {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.read().remove(key)? {
            Value::String(raw) => Some(raw),
            // Tolerate a record stored inline instead of as an encoded string.
            other @ Value::Object(_) => Some(other.to_string()),
            _ => None,
        }
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.read();
        if entries.remove(key).is_none() {
            return Ok(());
        }
        let encoded = serde_json::to_string_pretty(&Value::Object(entries))?;
        fs::write(&self.path, encoded)
    }
}
