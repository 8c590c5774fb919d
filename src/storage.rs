//! Durable session keys plus the in-memory token mirror.
//!
//! `SecureStorage` is the key-value seam; `SessionStore` knows which keys make
//! up a session and how booleans are encoded.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mutual_shared::{
    KEY_DATING_PREFERENCES_COMPLETE, KEY_ONBOARDING_COMPLETE, KEY_PROFILE_SETUP_COMPLETE,
    KEY_TOKEN, KEY_USER_ID, SESSION_KEYS,
};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::session::{Credentials, OnboardingFlags};

// =========================================================
// Key-value seam
// =========================================================

pub trait SecureStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn delete(&self, key: &str) -> ClientResult<()>;
}

impl<S: SecureStorage + ?Sized> SecureStorage for Rc<S> {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> ClientResult<()> {
        (**self).delete(key)
    }
}

/// Process-lifetime storage. Used in tests and by hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl SecureStorage for MemoryStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> ClientResult<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// JSON map on disk, rewritten on every mutation.
#[derive(Debug)]
pub struct FileStorage {
    file_path: PathBuf,
    cache: RefCell<HashMap<String, String>>,
}

impl FileStorage {
    pub fn open(file_path: impl AsRef<Path>) -> ClientResult<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        let cache = if file_path.exists() {
            let raw = fs::read_to_string(&file_path)
                .map_err(|e| ClientError::from(e).in_op_with("storage.open", file_path.display().to_string()))?;
            match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %file_path.display(), error = %e, "Session file is corrupt, starting empty");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            file_path,
            cache: RefCell::new(cache),
        })
    }

    fn write(&self, map: &HashMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(map)?;
        fs::write(&self.file_path, raw)
            .map_err(|e| ClientError::from(e).in_op_with("storage.flush", self.file_path.display().to_string()))
    }

    /// Writes the edited map to disk and only then makes it visible.
    fn commit(&self, edit: impl FnOnce(&mut HashMap<String, String>) -> bool) -> ClientResult<()> {
        let mut next = self.cache.borrow().clone();
        if !edit(&mut next) {
            return Ok(());
        }
        self.write(&next)?;
        *self.cache.borrow_mut() = next;
        Ok(())
    }
}

impl SecureStorage for FileStorage {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(self.cache.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        self.commit(|map| {
            map.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn delete(&self, key: &str) -> ClientResult<()> {
        self.commit(|map| map.remove(key).is_some())
    }
}

// =========================================================
// Session store
// =========================================================

fn encode_flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn decode_flag(value: Option<String>) -> bool {
    value.as_deref() == Some("1")
}

pub struct SessionStore {
    storage: Box<dyn SecureStorage>,
    cached_token: RefCell<Option<String>>,
    /// Set once the durable token has been consulted (or the cache was set explicitly).
    primed: Cell<bool>,
}

impl SessionStore {
    pub fn new(storage: impl SecureStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            cached_token: RefCell::new(None),
            primed: Cell::new(false),
        }
    }

    /// Updates the in-memory mirror only.
    pub fn set_cached_token(&self, value: Option<String>) {
        *self.cached_token.borrow_mut() = value;
        self.primed.set(true);
    }

    pub fn cached_token(&self) -> Option<String> {
        self.cached_token.borrow().clone()
    }

    /// Token for outgoing requests: the mirror, falling back to durable
    /// storage the first time the mirror is empty.
    pub fn token(&self) -> Option<String> {
        if let Some(token) = self.cached_token() {
            return Some(token);
        }
        if self.primed.replace(true) {
            return None;
        }
        match self.storage.get(KEY_TOKEN) {
            Ok(token) => {
                debug!(found = token.is_some(), "Primed token cache from storage");
                *self.cached_token.borrow_mut() = token.clone();
                token
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token");
                None
            }
        }
    }

    /// Both token and user id, or nothing.
    pub fn load_credentials(&self) -> ClientResult<Option<Credentials>> {
        let token = self.storage.get(KEY_TOKEN)?;
        let user_id = self.storage.get(KEY_USER_ID)?;
        Ok(match (token, user_id) {
            (Some(token), Some(user_id)) if !token.is_empty() && !user_id.is_empty() => {
                Some(Credentials { token, user_id })
            }
            _ => None,
        })
    }

    pub fn save_credentials(&self, credentials: &Credentials) -> ClientResult<()> {
        self.storage.set(KEY_TOKEN, &credentials.token)?;
        self.storage.set(KEY_USER_ID, &credentials.user_id)
    }

    pub fn load_flags(&self) -> OnboardingFlags {
        let read = |key: &str| match self.storage.get(key) {
            Ok(value) => decode_flag(value),
            Err(e) => {
                warn!(key, error = %e, "Failed to read cached onboarding flag");
                false
            }
        };
        OnboardingFlags {
            profile_setup_complete: read(KEY_PROFILE_SETUP_COMPLETE),
            dating_preferences_complete: read(KEY_DATING_PREFERENCES_COMPLETE),
            onboarding_complete: read(KEY_ONBOARDING_COMPLETE),
        }
    }

    pub fn save_flags(&self, flags: &OnboardingFlags) -> ClientResult<()> {
        self.storage.set(
            KEY_PROFILE_SETUP_COMPLETE,
            encode_flag(flags.profile_setup_complete),
        )?;
        self.storage.set(
            KEY_DATING_PREFERENCES_COMPLETE,
            encode_flag(flags.dating_preferences_complete),
        )?;
        self.storage
            .set(KEY_ONBOARDING_COMPLETE, encode_flag(flags.onboarding_complete))
    }

    /// Drops the mirror and every persisted session key. Keeps going past
    /// individual failures and reports the first one.
    pub fn clear(&self) -> ClientResult<()> {
        self.set_cached_token(None);
        let mut first_err = None;
        for key in SESSION_KEYS {
            if let Err(e) = self.storage.delete(key) {
                warn!(key, error = %e, "Failed to delete session key");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e.in_op("storage.clear")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials {
            token: "tok".into(),
            user_id: "u1".into(),
        }
    }

    #[test]
    fn absent_keys_read_as_false_and_none() {
        let store = SessionStore::new(MemoryStorage::new());
        assert_eq!(store.load_credentials().unwrap(), None);
        assert_eq!(store.load_flags(), OnboardingFlags::default());
    }

    #[test]
    fn half_credentials_are_ignored() {
        let storage = Rc::new(MemoryStorage::new());
        storage.set(KEY_TOKEN, "tok").unwrap();
        let store = SessionStore::new(storage.clone());
        assert_eq!(store.load_credentials().unwrap(), None);
    }

    #[test]
    fn flags_are_string_encoded() {
        let storage = Rc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        store
            .save_flags(&OnboardingFlags {
                profile_setup_complete: true,
                dating_preferences_complete: false,
                onboarding_complete: false,
            })
            .unwrap();
        assert_eq!(storage.get(KEY_PROFILE_SETUP_COMPLETE).unwrap().as_deref(), Some("1"));
        assert_eq!(storage.get(KEY_DATING_PREFERENCES_COMPLETE).unwrap().as_deref(), Some("0"));
        assert!(store.load_flags().profile_setup_complete);
    }

    #[test]
    fn token_reads_storage_only_once() {
        let storage = Rc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());

        // first lookup primes from storage (nothing there)
        assert_eq!(store.token(), None);
        storage.set(KEY_TOKEN, "late").unwrap();
        // no second storage read
        assert_eq!(store.token(), None);

        store.set_cached_token(Some("fresh".into()));
        assert_eq!(store.token().as_deref(), Some("fresh"));
        // the mirror never writes through
        assert_eq!(storage.get(KEY_TOKEN).unwrap().as_deref(), Some("late"));
    }

    #[test]
    fn token_falls_back_to_storage_when_cache_empty() {
        let storage = Rc::new(MemoryStorage::new());
        storage.set(KEY_TOKEN, "persisted").unwrap();
        let store = SessionStore::new(storage);
        assert_eq!(store.token().as_deref(), Some("persisted"));
        assert_eq!(store.cached_token().as_deref(), Some("persisted"));
    }

    #[test]
    fn clear_removes_everything() {
        let storage = Rc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        store.save_credentials(&creds()).unwrap();
        store.save_flags(&OnboardingFlags::default()).unwrap();
        store.set_cached_token(Some("tok".into()));

        store.clear().unwrap();
        assert!(storage.is_empty());
        assert_eq!(store.token(), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        {
            let store = SessionStore::new(FileStorage::open(&path).unwrap());
            store.save_credentials(&creds()).unwrap();
        }

        let store = SessionStore::new(FileStorage::open(&path).unwrap());
        assert_eq!(store.load_credentials().unwrap(), Some(creds()));
        store.clear().unwrap();

        let store = SessionStore::new(FileStorage::open(&path).unwrap());
        assert_eq!(store.load_credentials().unwrap(), None);
    }

    #[test]
    fn failed_write_leaves_values_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.set(KEY_TOKEN, "old").unwrap();

        // a directory in place of the file makes every write fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(storage.set(KEY_TOKEN, "new").is_err());
        assert!(storage.set(KEY_USER_ID, "u1").is_err());
        assert!(storage.delete(KEY_TOKEN).is_err());
        assert_eq!(storage.get(KEY_TOKEN).unwrap().as_deref(), Some("old"));
        assert_eq!(storage.get(KEY_USER_ID).unwrap(), None);
    }

    #[test]
    fn corrupt_session_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get(KEY_TOKEN).unwrap(), None);
    }
}
