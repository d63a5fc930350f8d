use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

pub const KEY_TOKEN: &str = "token";
pub const KEY_USER_ID: &str = "userId";
pub const KEY_USER_INFO: &str = "userInfo";
pub const KEY_LOGGED_IN: &str = "isLoggedIn";

/// Persistent key-value storage behind the session. The real storage layer is
/// host-provided; the file-backed implementation below is the default.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// Stores the session map as one JSON file, rewritten on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: HashMap<String, Value>,
}

impl FileStore {
    pub fn open(path: &Path) -> Result<FileStore, StoreError> {
        let values = if path.exists() {
            serde_json::from_str(&fs::read_to_string(path)?)?
        } else {
            HashMap::new()
        };

        Ok(FileStore {
            path: path.to_path_buf(),
            values,
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.values)?)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_owned(), value);
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        self.persist()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginStatus {
    pub logged_in: bool,
    pub user_info: Option<Value>,
}

/// Login/session state rehydrated from storage.
pub struct Session<S: SessionStore> {
    store: S,
    pub token: Option<String>,
    pub user_id: Option<String>,
    pub user_info: Option<Value>,
    pub logged_in: bool,
}

impl<S: SessionStore> Session<S> {
    pub fn open(store: S) -> Session<S> {
        let mut session = Session {
            store,
            token: None,
            user_id: None,
            user_info: None,
            logged_in: false,
        };
        session.restore();
        session
    }

    /// Rehydrates from the store. Logged-in requires both a token and user
    /// info; anything less leaves the current state untouched.
    pub fn restore(&mut self) {
        let token = self.store.get(KEY_TOKEN).and_then(as_string);
        let user_info = self.store.get(KEY_USER_INFO);

        if let (Some(token), Some(user_info)) = (token, user_info) {
            self.token = Some(token);
            self.user_info = Some(user_info);
            self.logged_in = true;
        }
        self.user_id = self.store.get(KEY_USER_ID).and_then(as_string);
    }

    /// Restores a stored session if one exists. Otherwise mints a provisional
    /// token and reports `false`: the caller still has to complete an
    /// interactive authorization to attach user info.
    pub fn auto_login(&mut self) -> Result<bool, StoreError> {
        self.restore();
        if self.logged_in && self.user_info.is_some() {
            return Ok(true);
        }

        let token = format!("provisional_{}", Utc::now().timestamp_millis());
        self.store.set(KEY_TOKEN, Value::String(token.clone()))?;
        self.token = Some(token);
        Ok(false)
    }

    pub fn logout(&mut self) -> Result<(), StoreError> {
        self.logged_in = false;
        self.user_info = None;
        self.token = None;

        self.store.remove(KEY_TOKEN)?;
        self.store.remove(KEY_USER_INFO)?;
        Ok(())
    }

    pub fn status(&mut self) -> LoginStatus {
        self.restore();
        LoginStatus {
            logged_in: self.logged_in,
            user_info: self.user_info.clone(),
        }
    }

    pub fn user_info(&mut self) -> Option<Value> {
        self.restore();
        self.user_info.clone()
    }
}

fn as_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}
