//! Persistence for the chat session identifier.
//!
//! The only state that outlives a chat view is the session identifier.  It is
//! kept behind the [`SessionStore`] capability so the chat session can be
//! driven by an in-memory store in tests and a file-backed store in the
//! binaries.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;

use crate::error::{Error, Result};
use crate::observability::SESSION_CREATED;
use crate::types::SessionId;

/// Key under which the session identifier is persisted.
pub const SESSION_KEY: &str = "session_id";

/// Environment variable overriding the state file location.
pub const STATE_FILE_ENV: &str = "NEXUS_CHAT_STATE";

/// A single-slot store for the session identifier.
pub trait SessionStore: Send + Sync {
    /// Read the stored identifier, if any.
    fn get(&self) -> Result<Option<String>>;

    /// Persist an identifier, replacing any previous value.
    fn put(&self, session_id: &str) -> Result<()>;
}

/// Return the stored session identifier, creating and persisting one first if
/// the store is empty.
///
/// Calls after the first return the same identifier for as long as the store
/// keeps its contents.  An empty stored string counts as absent.
///
/// A store whose contents cannot be interpreted ([`Error::Storage`]) also
/// counts as absent, so a corrupt state file yields a fresh session instead of
/// failing every turn.
pub fn ensure_session(store: &dyn SessionStore) -> Result<SessionId> {
    let existing = match store.get() {
        Ok(existing) => existing,
        Err(err @ Error::Storage { .. }) => {
            tracing::warn!(error = %err, "session store unreadable; starting a new session");
            None
        }
        Err(err) => return Err(err),
    };
    if let Some(existing) = existing.filter(|s| !s.is_empty()) {
        return Ok(SessionId::from(existing));
    }
    rotate_session(store)
}

/// Generate a fresh identifier and persist it unconditionally.
pub fn rotate_session(store: &dyn SessionStore) -> Result<SessionId> {
    let session_id = SessionId::generate();
    store.put(session_id.as_str())?;
    SESSION_CREATED.click();
    tracing::info!(session_id = %session_id, "created chat session");
    Ok(session_id)
}

///////////////////////////////////////////// Memory ////////////////////////////////////////////

/// Session store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    value: Mutex<Option<String>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds an identifier.
    pub fn with_value(session_id: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(session_id.into())),
        }
    }

    /// Removes the stored identifier, as if the user cleared their storage.
    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.value.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.lock().clone())
    }

    fn put(&self, session_id: &str) -> Result<()> {
        *self.lock() = Some(session_id.to_string());
        Ok(())
    }
}

////////////////////////////////////////////// File /////////////////////////////////////////////

/// Session store backed by a small JSON document on disk.
///
/// The document is a flat string map; this store owns the [`SESSION_KEY`]
/// entry and preserves any other keys it finds.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Creates a store at the given path.  The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the default location.
    ///
    /// `NEXUS_CHAT_STATE` wins when set; otherwise the file lives in the
    /// platform data directory.
    pub fn at_default_location() -> Result<Self> {
        Ok(Self::new(default_state_path()?))
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(Error::io(
                    format!("failed to read {}", self.path.display()),
                    err,
                ));
            }
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|err| {
            Error::storage(format!(
                "state file {} is not a string map: {err}",
                self.path.display()
            ))
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| {
                Error::io(format!("failed to create {}", parent.display()), err)
            })?;
        }
        let body = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .map_err(|err| Error::io(format!("failed to write {}", tmp.display()), err))?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            Error::io(format!("failed to replace {}", self.path.display()), err)
        })
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(SESSION_KEY))
    }

    fn put(&self, session_id: &str) -> Result<()> {
        // Other keys survive only if the document parses; a corrupt one is
        // replaced outright.
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(err @ Error::Storage { .. }) => {
                tracing::warn!(error = %err, "replacing unreadable state file");
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };
        map.insert(SESSION_KEY.to_string(), session_id.to_string());
        self.write_map(&map)?;
        tracing::debug!(path = %self.path.display(), "persisted session id");
        Ok(())
    }
}

/// Resolve the default state file path.
pub fn default_state_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(STATE_FILE_ENV)
        && !path.is_empty()
    {
        return Ok(PathBuf::from(path));
    }
    let dirs = ProjectDirs::from("ai", "novanexus", "nexus-chat")
        .ok_or_else(|| Error::storage("could not determine data directory"))?;
    Ok(dirs.data_dir().join("state.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_session_is_idempotent() {
        let store = MemorySessionStore::new();
        let first = ensure_session(&store).unwrap();
        for _ in 0..5 {
            assert_eq!(ensure_session(&store).unwrap(), first);
        }
        assert_eq!(store.get().unwrap().as_deref(), Some(first.as_str()));
    }

    #[test]
    fn ensure_session_reuses_existing_value() {
        let store = MemorySessionStore::with_value("already-here");
        assert_eq!(ensure_session(&store).unwrap().as_str(), "already-here");
    }

    #[test]
    fn cleared_store_gets_a_new_session() {
        let store = MemorySessionStore::new();
        let first = ensure_session(&store).unwrap();
        store.clear();
        let second = ensure_session(&store).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn empty_value_counts_as_absent() {
        let store = MemorySessionStore::with_value("");
        let id = ensure_session(&store).unwrap();
        assert!(!id.as_str().is_empty());
    }

    #[test]
    fn rotate_replaces_value() {
        let store = MemorySessionStore::with_value("old");
        let id = rotate_session(&store).unwrap();
        assert_ne!(id.as_str(), "old");
        assert_eq!(store.get().unwrap().as_deref(), Some(id.as_str()));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("state.json"));
        assert_eq!(store.get().unwrap(), None);

        let id = ensure_session(&store).unwrap();
        let reopened = FileSessionStore::new(store.path());
        assert_eq!(ensure_session(&reopened).unwrap(), id);
    }

    #[test]
    fn file_store_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = FileSessionStore::new(&path);
        store.put("abc").unwrap();

        let map: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(map.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(map.get(SESSION_KEY).map(String::as_str), Some("abc"));
    }

    #[test]
    fn file_store_recovers_from_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        for garbage in ["[1, 2, 3]", r#"{"session_id": 7}"#, r#"{"session_id": "ab"#] {
            fs::write(&path, garbage).unwrap();
            let store = FileSessionStore::new(&path);
            assert!(matches!(store.get(), Err(Error::Storage { .. })), "{garbage}");

            let id = ensure_session(&store).unwrap();
            assert_eq!(store.get().unwrap().as_deref(), Some(id.as_str()));
            assert_eq!(ensure_session(&store).unwrap(), id);
        }
    }

    #[test]
    fn rotate_overwrites_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"session_id": 7, "theme": "dark"}"#).unwrap();
        let store = FileSessionStore::new(&path);

        let id = rotate_session(&store).unwrap();
        let map: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(SESSION_KEY).map(String::as_str), Some(id.as_str()));
    }

    #[test]
    fn io_errors_still_propagate() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as a string.
        let store = FileSessionStore::new(dir.path());
        assert!(matches!(ensure_session(&store), Err(Error::Io { .. })));
    }
}
