//! File-backed record store for users and API keys

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::persistence;
use crate::domain::{
    validate_credential, validate_username, ApiKey, RecordSet, StoreError, User,
};
use crate::infrastructure::api_key::{constant_time_eq, new_record_id};
use crate::infrastructure::user::{Argon2Hasher, PasswordHasher};

/// Everything guarded by the store lock
#[derive(Debug, Default)]
pub(super) struct StoreState {
    pub(super) path: Option<PathBuf>,
    pub(super) records: RecordSet,
    /// Admitted, not yet completed requests per API key id
    pub(super) in_flight: HashMap<String, u32>,
}

impl StoreState {
    pub(super) fn key_index_by_credential(&self, credential: &str) -> Option<usize> {
        self.records
            .api_keys
            .iter()
            .position(|k| constant_time_eq(k.key(), credential))
    }

    pub(super) fn key_index_by_id(&self, id: &str) -> Option<usize> {
        self.records.api_keys.iter().position(|k| k.id() == id)
    }
}

/// Verified against when no real hash applies, so a failed login costs the
/// same whether or not the username exists
const DUMMY_PASSWORD: &str = "keygate-unknown-user";

/// Durable source of truth for users and API keys
///
/// A single reader/writer lock guards the record set and the in-flight
/// counters together. Lookups take the read lock, every mutation takes the
/// write lock. Disk I/O in [`RecordStore::load`] and [`RecordStore::save`]
/// happens with no lock held.
#[derive(Debug)]
pub struct RecordStore {
    pub(super) state: RwLock<StoreState>,
    /// Serializes writers so the newest snapshot is always the last renamed
    save_lock: Mutex<()>,
    hasher: Arc<dyn PasswordHasher>,
    dummy_hash: OnceLock<String>,
}

impl RecordStore {
    /// Create an empty store backed by `path`
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            state: RwLock::new(StoreState {
                path: path.map(normalize_path),
                ..StoreState::default()
            }),
            save_lock: Mutex::new(()),
            hasher: Arc::new(Argon2Hasher::new()),
            dummy_hash: OnceLock::new(),
        }
    }

    /// Create a store with no backing file; `load` and `save` will fail
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Use a custom password hasher
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self.dummy_hash = OnceLock::new();
        self
    }

    pub fn set_path(&self, path: impl Into<PathBuf>) {
        let path = normalize_path(path.into());
        self.state.write().path = (!path.as_os_str().is_empty()).then_some(path);
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.state.read().path.clone()
    }

    /// Hash a password with the injected hasher
    ///
    /// Argon2 is slow; call this off the async workers.
    pub fn hash_password(&self, password: &str) -> Result<String, StoreError> {
        self.hasher.hash(password)
    }

    // Persistence

    /// Replace in-memory records with the backing file's content
    ///
    /// A missing file is a first run and yields an empty version-1 record set.
    /// In-flight counters are process-local and survive a reload.
    pub fn load(&self) -> Result<(), StoreError> {
        let path = self.require_path()?;

        let records = match persistence::read_if_exists(&path)? {
            Some(raw) => RecordSet::from_json(&raw).map_err(|e| {
                StoreError::decode(format!("{}: {}", path.display(), e))
            })?,
            None => {
                info!(path = %path.display(), "No record file found, starting empty");
                RecordSet::empty()
            }
        };

        info!(
            path = %path.display(),
            version = records.version,
            users = records.users.len(),
            api_keys = records.api_keys.len(),
            "Record set loaded"
        );

        self.state.write().records = records;
        Ok(())
    }

    /// Write a point-in-time copy of the records to the backing file
    ///
    /// A failure leaves the in-memory state as is; the caller decides whether
    /// the preceding mutation counts as durable.
    pub fn save(&self) -> Result<(), StoreError> {
        let _writer = self.save_lock.lock();

        let (path, mut records) = {
            let state = self.state.read();
            let path = state.path.clone().ok_or_else(missing_path)?;
            (path, state.records.clone())
        };

        records.updated_at = Utc::now();

        let payload = records
            .to_json_pretty()
            .map_err(|e| StoreError::encode(e.to_string()))?;

        persistence::write_atomic(&path, &payload)?;

        debug!(
            path = %path.display(),
            version = records.version,
            "Record set saved"
        );

        Ok(())
    }

    /// Deep copy of the current record set
    pub fn snapshot(&self) -> RecordSet {
        self.state.read().records.clone()
    }

    /// Number of users and API keys
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.read();
        (state.records.users.len(), state.records.api_keys.len())
    }

    // Users

    /// Create or fully replace a user
    ///
    /// An empty id creates a new record with a store-assigned id and creation
    /// time. A non-empty id replaces the matching record; when no record
    /// matches, the user is appended as given rather than rejected.
    pub fn upsert_user(&self, mut user: User) -> Result<User, StoreError> {
        let username = user.username().trim().to_string();
        validate_username(&username)?;
        user.set_username(username);

        let mut state = self.state.write();

        let collision = state.records.users.iter().any(|existing| {
            (user.is_new() || existing.id() != user.id())
                && same_username(existing.username(), user.username())
        });

        if collision {
            return Err(StoreError::DuplicateUsername);
        }

        if user.is_new() {
            user.assign_identity(new_record_id("usr"), Utc::now());
            state.records.users.push(user.clone());
            info!(user_id = %user.id(), username = %user.username(), "User created");
            return Ok(user);
        }

        match state.records.users.iter_mut().find(|u| u.id() == user.id()) {
            Some(slot) => *slot = user.clone(),
            None => {
                warn!(user_id = %user.id(), "Upsert for unknown user id, appending");
                state.records.users.push(user.clone());
            }
        }

        info!(user_id = %user.id(), "User updated");
        Ok(user)
    }

    /// Patch an existing user in place
    ///
    /// `patch` runs under the write lock against the current record, so
    /// concurrent updates never overwrite each other's fields. The username
    /// is re-validated and must stay unique.
    pub fn update_user<F>(&self, id: &str, patch: F) -> Result<User, StoreError>
    where
        F: FnOnce(&mut User),
    {
        let id = id.trim();
        let mut state = self.state.write();

        let index = state
            .records
            .users
            .iter()
            .position(|u| u.id() == id)
            .ok_or(StoreError::UserNotFound)?;

        let mut user = state.records.users[index].clone();
        patch(&mut user);

        let username = user.username().trim().to_string();
        validate_username(&username)?;
        user.set_username(username);

        let collision = state
            .records
            .users
            .iter()
            .any(|existing| existing.id() != id && same_username(existing.username(), user.username()));

        if collision {
            return Err(StoreError::DuplicateUsername);
        }

        state.records.users[index] = user.clone();
        info!(user_id = %id, "User updated");
        Ok(user)
    }

    pub fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(StoreError::UserNotFound);
        }

        let mut state = self.state.write();
        let before = state.records.users.len();
        state.records.users.retain(|u| u.id() != id);

        if state.records.users.len() == before {
            return Err(StoreError::UserNotFound);
        }

        info!(user_id = %id, "User deleted");
        Ok(())
    }

    pub fn find_user_by_id(&self, id: &str) -> Option<User> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }

        let state = self.state.read();
        state.records.users.iter().find(|u| u.id() == id).cloned()
    }

    /// Case-insensitive username lookup
    pub fn find_user_by_username(&self, username: &str) -> Option<User> {
        let username = username.trim();
        if username.is_empty() {
            return None;
        }

        let state = self.state.read();
        state
            .records
            .users
            .iter()
            .find(|u| same_username(u.username(), username))
            .cloned()
    }

    pub fn list_users(&self) -> Vec<User> {
        self.state.read().records.users.clone()
    }

    /// Verify a username/password pair
    ///
    /// Unknown, disabled and wrong-password all yield `InvalidCredentials`.
    pub fn authenticate_user(&self, username: &str, password: &str) -> Result<User, StoreError> {
        let user = self
            .find_user_by_username(username)
            .filter(|u| !u.is_disabled() && !u.password_hash().is_empty());

        let Some(user) = user else {
            self.hasher.verify(password, self.dummy_hash());
            return Err(StoreError::InvalidCredentials);
        };

        // Hash verification is slow; no lock is held here
        if !self.hasher.verify(password, user.password_hash()) {
            debug!(user_id = %user.id(), "Password verification failed");
            return Err(StoreError::InvalidCredentials);
        }

        Ok(user)
    }

    // API keys

    /// Create or fully replace an API key
    ///
    /// Credential uniqueness is checked on every upsert, not only on create.
    /// Id handling follows [`RecordStore::upsert_user`].
    pub fn upsert_api_key(&self, mut key: ApiKey) -> Result<ApiKey, StoreError> {
        validate_credential(key.key())?;

        let mut state = self.state.write();

        let collision = state
            .records
            .api_keys
            .iter()
            .any(|existing| (key.is_new() || existing.id() != key.id()) && existing.key() == key.key());

        if collision {
            return Err(StoreError::DuplicateApiKey);
        }

        if key.is_new() {
            key.assign_identity(new_record_id("key"), Utc::now());
            state.records.api_keys.push(key.clone());
            info!(key_id = %key.id(), label = %key.label(), "API key created");
            return Ok(key);
        }

        match state.records.api_keys.iter_mut().find(|k| k.id() == key.id()) {
            Some(slot) => *slot = key.clone(),
            None => {
                warn!(key_id = %key.id(), "Upsert for unknown API key id, appending");
                state.records.api_keys.push(key.clone());
            }
        }

        info!(key_id = %key.id(), "API key updated");
        Ok(key)
    }

    /// Patch an existing API key in place
    ///
    /// `patch` runs under the write lock against the current record, so a
    /// usage increment landing between an admin's read and write is kept.
    /// The credential is re-validated and must stay unique.
    pub fn update_api_key<F>(&self, id: &str, patch: F) -> Result<ApiKey, StoreError>
    where
        F: FnOnce(&mut ApiKey),
    {
        let id = id.trim();
        let mut state = self.state.write();
        let index = state.key_index_by_id(id).ok_or(StoreError::KeyNotFound)?;

        let mut key = state.records.api_keys[index].clone();
        patch(&mut key);
        validate_credential(key.key())?;

        let collision = state
            .records
            .api_keys
            .iter()
            .any(|existing| existing.id() != id && existing.key() == key.key());

        if collision {
            return Err(StoreError::DuplicateApiKey);
        }

        state.records.api_keys[index] = key.clone();
        info!(key_id = %id, "API key updated");
        Ok(key)
    }

    /// Remove a key and any in-flight accounting for it
    pub fn delete_api_key(&self, id: &str) -> Result<(), StoreError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(StoreError::KeyNotFound);
        }

        let mut state = self.state.write();
        let before = state.records.api_keys.len();
        state.records.api_keys.retain(|k| k.id() != id);

        if state.records.api_keys.len() == before {
            return Err(StoreError::KeyNotFound);
        }

        state.in_flight.remove(id);
        info!(key_id = %id, "API key deleted");
        Ok(())
    }

    /// Lookup by exact credential string
    pub fn find_api_key(&self, credential: &str) -> Option<ApiKey> {
        let credential = credential.trim();
        if credential.is_empty() {
            return None;
        }

        let state = self.state.read();
        state
            .key_index_by_credential(credential)
            .map(|i| state.records.api_keys[i].clone())
    }

    pub fn find_api_key_by_id(&self, id: &str) -> Option<ApiKey> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }

        let state = self.state.read();
        state.records.api_keys.iter().find(|k| k.id() == id).cloned()
    }

    pub fn list_api_keys(&self) -> Vec<ApiKey> {
        self.state.read().records.api_keys.clone()
    }

    /// All keys owned by `user_id`; empty for a blank id
    pub fn list_api_keys_by_user(&self, user_id: &str) -> Vec<ApiKey> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Vec::new();
        }

        let state = self.state.read();
        state
            .records
            .api_keys
            .iter()
            .filter(|k| k.user_id() == user_id)
            .cloned()
            .collect()
    }

    /// Administrative reset of a key's lifetime usage counter
    pub fn reset_usage(&self, id: &str) -> Result<ApiKey, StoreError> {
        let mut state = self.state.write();
        let key = state
            .records
            .api_keys
            .iter_mut()
            .find(|k| k.id() == id)
            .ok_or(StoreError::KeyNotFound)?;

        let previous = key.used_count();
        key.reset_usage();

        info!(key_id = %id, previous, "API key usage reset");
        Ok(key.clone())
    }

    fn require_path(&self) -> Result<PathBuf, StoreError> {
        self.path().ok_or_else(missing_path)
    }

    /// Hash of [`DUMMY_PASSWORD`] at the injected hasher's cost, made on first use
    fn dummy_hash(&self) -> &str {
        self.dummy_hash
            .get_or_init(|| self.hasher.hash(DUMMY_PASSWORD).unwrap_or_default())
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn missing_path() -> StoreError {
    StoreError::configuration("no backing file configured for the record store")
}

fn normalize_path(path: PathBuf) -> PathBuf {
    let trimmed = path.to_string_lossy().trim().to_string();
    Path::new(&trimmed).to_path_buf()
}

fn same_username(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::domain::UserRole;

    fn store_with_file() -> (tempfile::TempDir, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(Some(dir.path().join("records.json")));
        (dir, store)
    }

    fn create_user(store: &RecordStore, username: &str, password: &str) -> User {
        let hash = store.hash_password(password).unwrap();
        store
            .upsert_user(User::new(username, hash, UserRole::User))
            .unwrap()
    }

    #[test]
    fn test_load_without_file_is_empty_version_one() {
        let (_dir, store) = store_with_file();

        store.load().unwrap();
        store.load().unwrap();

        let records = store.snapshot();
        assert_eq!(records.version, 1);
        assert!(records.users.is_empty());
        assert!(records.api_keys.is_empty());
    }

    #[test]
    fn test_load_and_save_require_path() {
        let store = RecordStore::in_memory();

        assert!(matches!(store.load(), Err(StoreError::Configuration { .. })));
        assert!(matches!(store.save(), Err(StoreError::Configuration { .. })));
    }

    #[test]
    fn test_set_path() {
        let store = RecordStore::in_memory();
        store.set_path("  /tmp/records.json ");
        assert_eq!(store.path(), Some(PathBuf::from("/tmp/records.json")));

        store.set_path("");
        assert_eq!(store.path(), None);
    }

    #[test]
    fn test_load_malformed_file() {
        let (dir, store) = store_with_file();
        std::fs::write(dir.path().join("records.json"), b"{ broken").unwrap();

        assert!(matches!(store.load(), Err(StoreError::Decode { .. })));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (dir, store) = store_with_file();
        store.load().unwrap();
        let before = store.snapshot().updated_at;

        let user = store
            .upsert_user(User::new("alice", "hash", UserRole::Owner))
            .unwrap();
        store
            .upsert_api_key(
                ApiKey::new("kg-one", "first")
                    .with_user_id(user.id())
                    .with_total_limit(10)
                    .with_used_count(4)
                    .with_concurrency_limit(2),
            )
            .unwrap();
        store.save().unwrap();

        let fresh = RecordStore::new(Some(dir.path().join("records.json")));
        fresh.load().unwrap();
        let loaded = fresh.snapshot();
        let original = store.snapshot();

        assert_eq!(loaded.version, original.version);
        assert_eq!(loaded.users, original.users);
        assert_eq!(loaded.api_keys, original.api_keys);
        assert!(loaded.updated_at >= before);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = RecordStore::in_memory();
        store.upsert_api_key(ApiKey::new("kg-one", "first")).unwrap();

        let snapshot = store.snapshot();
        store.upsert_api_key(ApiKey::new("kg-two", "second")).unwrap();

        assert_eq!(snapshot.api_keys.len(), 1);
        assert_eq!(store.snapshot().api_keys.len(), 2);
    }

    #[test]
    fn test_upsert_user_assigns_identity() {
        let store = RecordStore::in_memory();
        let user = store
            .upsert_user(User::new("  alice  ", "hash", UserRole::User))
            .unwrap();

        assert!(user.id().starts_with("usr_"));
        assert_eq!(user.username(), "alice");
        assert_eq!(store.find_user_by_id(user.id()), Some(user));
    }

    #[test]
    fn test_upsert_user_requires_username() {
        let store = RecordStore::in_memory();
        let result = store.upsert_user(User::new("  ", "hash", UserRole::User));

        assert!(matches!(result, Err(StoreError::Validation { .. })));
        assert!(store.list_users().is_empty());
    }

    #[test]
    fn test_duplicate_username_case_insensitive() {
        let store = RecordStore::in_memory();
        store
            .upsert_user(User::new("Alice", "hash", UserRole::User))
            .unwrap();

        let result = store.upsert_user(User::new("alice", "hash", UserRole::User));
        assert!(matches!(result, Err(StoreError::DuplicateUsername)));
        assert_eq!(store.list_users().len(), 1);
    }

    #[test]
    fn test_update_user_keeps_own_username() {
        let store = RecordStore::in_memory();
        let mut user = store
            .upsert_user(User::new("alice", "hash", UserRole::User))
            .unwrap();

        user.set_role(UserRole::Owner);
        user.set_username("ALICE");
        let updated = store.upsert_user(user.clone()).unwrap();

        assert_eq!(updated.role(), UserRole::Owner);
        assert_eq!(store.list_users().len(), 1);
        assert_eq!(store.find_user_by_username("alice").unwrap().username(), "ALICE");
    }

    #[test]
    fn test_upsert_unknown_user_id_appends() {
        let store = RecordStore::in_memory();
        let user = store
            .upsert_user(User::new("ghost", "hash", UserRole::User).with_id("usr_missing"))
            .unwrap();

        assert_eq!(user.id(), "usr_missing");
        assert_eq!(store.list_users().len(), 1);
    }

    #[test]
    fn test_delete_user() {
        let store = RecordStore::in_memory();
        let user = store
            .upsert_user(User::new("alice", "hash", UserRole::User))
            .unwrap();

        store.delete_user(user.id()).unwrap();
        assert!(store.find_user_by_id(user.id()).is_none());
        assert!(matches!(store.delete_user(user.id()), Err(StoreError::UserNotFound)));
        assert!(matches!(store.delete_user(""), Err(StoreError::UserNotFound)));
    }

    #[test]
    fn test_authenticate_user() {
        let store = RecordStore::in_memory();
        let user = create_user(&store, "alice", "correct horse");

        let authed = store.authenticate_user("ALICE", "correct horse").unwrap();
        assert_eq!(authed.id(), user.id());

        assert!(matches!(
            store.authenticate_user("alice", "wrong"),
            Err(StoreError::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate_user("nobody", "correct horse"),
            Err(StoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_authenticate_disabled_user() {
        let store = RecordStore::in_memory();
        let mut user = create_user(&store, "alice", "correct horse");
        user.set_disabled(true);
        store.upsert_user(user).unwrap();

        assert!(matches!(
            store.authenticate_user("alice", "correct horse"),
            Err(StoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_authenticate_user_pending_hash() {
        let store = RecordStore::in_memory();
        store
            .upsert_user(User::new("pending", "", UserRole::User))
            .unwrap();

        assert!(matches!(
            store.authenticate_user("pending", ""),
            Err(StoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_upsert_api_key_assigns_identity() {
        let store = RecordStore::in_memory();
        let key = store.upsert_api_key(ApiKey::new("kg-one", "first")).unwrap();

        assert!(key.id().starts_with("key_"));
        assert_eq!(store.find_api_key("kg-one"), Some(key.clone()));
        assert_eq!(store.find_api_key_by_id(key.id()), Some(key));
    }

    #[test]
    fn test_upsert_api_key_rejects_bad_credential() {
        let store = RecordStore::in_memory();

        assert!(matches!(
            store.upsert_api_key(ApiKey::new("", "empty")),
            Err(StoreError::Validation { .. })
        ));
        assert!(matches!(
            store.upsert_api_key(ApiKey::new("kg one", "spaced")),
            Err(StoreError::Validation { .. })
        ));
        assert!(store.list_api_keys().is_empty());
    }

    #[test]
    fn test_duplicate_credential_rejected_without_mutation() {
        let store = RecordStore::in_memory();
        store.upsert_api_key(ApiKey::new("kg-same", "first")).unwrap();
        let before = store.snapshot();

        let result = store.upsert_api_key(ApiKey::new("kg-same", "second"));

        assert!(matches!(result, Err(StoreError::DuplicateApiKey)));
        assert_eq!(store.snapshot().api_keys, before.api_keys);
    }

    #[test]
    fn test_duplicate_credential_checked_on_update() {
        let store = RecordStore::in_memory();
        store.upsert_api_key(ApiKey::new("kg-one", "first")).unwrap();
        let mut second = store.upsert_api_key(ApiKey::new("kg-two", "second")).unwrap();

        second.set_key("kg-one");
        assert!(matches!(
            store.upsert_api_key(second),
            Err(StoreError::DuplicateApiKey)
        ));
        assert!(store.find_api_key("kg-two").is_some());
    }

    #[test]
    fn test_update_api_key_in_place() {
        let store = RecordStore::in_memory();
        let mut key = store.upsert_api_key(ApiKey::new("kg-one", "first")).unwrap();

        key.set_label("renamed");
        key.set_total_limit(5);
        store.upsert_api_key(key.clone()).unwrap();

        let keys = store.list_api_keys();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].label(), "renamed");
        assert_eq!(keys[0].total_limit(), 5);
    }

    #[test]
    fn test_lookups_signal_absence() {
        let store = RecordStore::in_memory();

        assert!(store.find_api_key("kg-missing").is_none());
        assert!(store.find_api_key("  ").is_none());
        assert!(store.find_api_key_by_id("key_missing").is_none());
        assert!(store.find_user_by_username("").is_none());
        assert!(store.list_api_keys_by_user("").is_empty());
    }

    #[test]
    fn test_list_api_keys_by_user() {
        let store = RecordStore::in_memory();
        store
            .upsert_api_key(ApiKey::new("kg-a1", "").with_user_id("usr_a"))
            .unwrap();
        store
            .upsert_api_key(ApiKey::new("kg-a2", "").with_user_id("usr_a"))
            .unwrap();
        store
            .upsert_api_key(ApiKey::new("kg-b1", "").with_user_id("usr_b"))
            .unwrap();
        store.upsert_api_key(ApiKey::new("kg-none", "")).unwrap();

        let keys = store.list_api_keys_by_user("usr_a");
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.user_id() == "usr_a"));
    }

    #[test]
    fn test_delete_api_key() {
        let store = RecordStore::in_memory();
        let key = store.upsert_api_key(ApiKey::new("kg-one", "")).unwrap();

        store.delete_api_key(key.id()).unwrap();
        assert!(store.find_api_key("kg-one").is_none());
        assert!(matches!(
            store.delete_api_key(key.id()),
            Err(StoreError::KeyNotFound)
        ));
    }

    #[test]
    fn test_reset_usage() {
        let store = RecordStore::in_memory();
        let key = store
            .upsert_api_key(ApiKey::new("kg-one", "").with_used_count(9))
            .unwrap();

        let reset = store.reset_usage(key.id()).unwrap();
        assert_eq!(reset.used_count(), 0);
        assert!(matches!(
            store.reset_usage("key_missing"),
            Err(StoreError::KeyNotFound)
        ));
    }
    #[test]
    fn test_patch_keeps_usage_recorded_after_read() {
        let store = RecordStore::in_memory();
        let key = store
            .upsert_api_key(ApiKey::new("kg-quota", "before").with_total_limit(1))
            .unwrap();

        // An owner reads the key, then a request completes before the write
        let stale = store.find_api_key_by_id(key.id()).unwrap();
        store.begin_request("kg-quota").unwrap();
        store.end_request("kg-quota", true).unwrap();
        assert_eq!(stale.used_count(), 0);

        let updated = store
            .update_api_key(key.id(), |k| k.set_label("after"))
            .unwrap();

        assert_eq!(updated.label(), "after");
        assert_eq!(updated.used_count(), 1);
        assert!(matches!(
            store.begin_request("kg-quota"),
            Err(StoreError::QuotaExceeded)
        ));
    }

    #[test]
    fn test_patch_api_key_checks_credential() {
        let store = RecordStore::in_memory();
        store.upsert_api_key(ApiKey::new("kg-one", "first")).unwrap();
        let second = store.upsert_api_key(ApiKey::new("kg-two", "second")).unwrap();

        assert!(matches!(
            store.update_api_key(second.id(), |k| k.set_key("kg-one")),
            Err(StoreError::DuplicateApiKey)
        ));
        assert!(matches!(
            store.update_api_key(second.id(), |k| k.set_key("kg two")),
            Err(StoreError::Validation { .. })
        ));
        assert_eq!(store.find_api_key_by_id(second.id()).unwrap().key(), "kg-two");

        // Keeping its own credential is not a collision
        let relabeled = store
            .update_api_key(second.id(), |k| k.set_key("kg-two"))
            .unwrap();
        assert_eq!(relabeled.key(), "kg-two");

        assert!(matches!(
            store.update_api_key("key_missing", |k| k.set_label("x")),
            Err(StoreError::KeyNotFound)
        ));
    }

    #[test]
    fn test_patch_user() {
        let store = RecordStore::in_memory();
        store
            .upsert_user(User::new("alice", "hash", UserRole::User))
            .unwrap();
        let bob = store
            .upsert_user(User::new("bob", "hash", UserRole::User))
            .unwrap();

        let updated = store
            .update_user(bob.id(), |u| {
                u.set_username("  Bobby ");
                u.set_role(UserRole::Owner);
            })
            .unwrap();
        assert_eq!(updated.username(), "Bobby");
        assert_eq!(updated.role(), UserRole::Owner);
        assert_eq!(updated.created_at(), bob.created_at());

        assert!(matches!(
            store.update_user(bob.id(), |u| u.set_username("ALICE")),
            Err(StoreError::DuplicateUsername)
        ));
        assert!(matches!(
            store.update_user(bob.id(), |u| u.set_username(" ")),
            Err(StoreError::Validation { .. })
        ));
        assert_eq!(store.find_user_by_id(bob.id()).unwrap().username(), "Bobby");

        assert!(matches!(
            store.update_user("usr_missing", |u| u.set_disabled(true)),
            Err(StoreError::UserNotFound)
        ));
    }

    #[test]
    fn test_counts() {
        let store = RecordStore::in_memory();
        assert_eq!(store.counts(), (0, 0));

        store
            .upsert_user(User::new("alice", "hash", UserRole::User))
            .unwrap();
        store.upsert_api_key(ApiKey::new("kg-one", "")).unwrap();
        store.upsert_api_key(ApiKey::new("kg-two", "")).unwrap();

        assert_eq!(store.counts(), (1, 2));
    }

    /// Plain-text hasher that counts verifications
    #[derive(Debug, Default)]
    struct CountingHasher {
        verifications: AtomicUsize,
    }

    impl PasswordHasher for CountingHasher {
        fn hash(&self, password: &str) -> Result<String, StoreError> {
            Ok(format!("plain${}", password))
        }

        fn verify(&self, password: &str, hash: &str) -> bool {
            self.verifications.fetch_add(1, Ordering::SeqCst);
            hash.strip_prefix("plain$") == Some(password)
        }
    }

    #[test]
    fn test_every_failed_login_runs_a_verification() {
        let hasher = Arc::new(CountingHasher::default());
        let store = RecordStore::in_memory().with_hasher(Arc::clone(&hasher) as Arc<dyn PasswordHasher>);

        let mut disabled = create_user(&store, "dora", "secret");
        disabled.set_disabled(true);
        store.upsert_user(disabled).unwrap();
        store
            .upsert_user(User::new("pending", "", UserRole::User))
            .unwrap();
        create_user(&store, "alice", "secret");

        let attempts = [("nobody", "secret"), ("dora", "secret"), ("pending", ""), ("alice", "wrong")];
        for (username, password) in attempts {
            assert!(matches!(
                store.authenticate_user(username, password),
                Err(StoreError::InvalidCredentials)
            ));
        }
        assert_eq!(hasher.verifications.load(Ordering::SeqCst), attempts.len());

        assert!(store.authenticate_user("alice", "secret").is_ok());
    }

    #[test]
    fn test_dummy_password_never_authenticates() {
        let store = RecordStore::in_memory().with_hasher(Arc::new(CountingHasher::default()));

        assert!(matches!(
            store.authenticate_user("nobody", DUMMY_PASSWORD),
            Err(StoreError::InvalidCredentials)
        ));
    }
}
