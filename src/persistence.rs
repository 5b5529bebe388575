// 💾 Persistence Fallback - local key-value mirror of the record store
//
// One key per collection, JSON text values. save() is best-effort: any
// failure is logged and swallowed because the in-memory copy survives.
//
// Key layout:
//   contributions → [Contribution]
//   mentors       → [Mentor]
//   villages      → ["Chandrapur", ...]           (ordered names)
//   localities    → {"Chandrapur": ["Main Market", ...]}
//   users         → {"Firoj": {password, role, name, village}}

use crate::entities::{Contribution, Mentor, Role, User, Village};
use crate::error::{FundError, Result};
use crate::store::RecordStore;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const KEY_CONTRIBUTIONS: &str = "contributions";
pub const KEY_MENTORS: &str = "mentors";
pub const KEY_VILLAGES: &str = "villages";
pub const KEY_LOCALITIES: &str = "localities";
pub const KEY_USERS: &str = "users";

pub const ALL_KEYS: [&str; 5] = [KEY_CONTRIBUTIONS, KEY_MENTORS, KEY_VILLAGES, KEY_LOCALITIES, KEY_USERS];

// ============================================================================
// KEY-VALUE STORE
// ============================================================================

/// Flat string → string store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed store, WAL journal for crash recovery
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
}

impl SqliteKeyValueStore {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteKeyValueStore {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| FundError::Config("cache connection poisoned".to_string()))?;
        f(&*conn)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    let journal_mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(journal_mode = %journal_mode, "Local cache database ready");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_cache (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    Ok(())
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row("SELECT value FROM kv_cache WHERE key = ?1", params![key], |row| row.get(0))
                .optional()?)
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_cache (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
                params![key, value],
            )?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv_cache WHERE key = ?1", params![key])?;
            Ok(())
        })
    }
}

/// Process-local store for tests and throwaway sessions. Clones share entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| FundError::Config("memory cache poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

// ============================================================================
// PERSISTED SHAPES
// ============================================================================

/// Value side of the `users` map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UserEntry {
    password: String,
    role: Role,
    name: String,
    #[serde(default)]
    village: Option<String>,
}

/// `users` object in insertion order
fn users_to_map(users: &[User]) -> serde_json::Result<Map<String, Value>> {
    users
        .iter()
        .map(|u| {
            let entry = UserEntry {
                password: u.password.clone(),
                role: u.role,
                name: u.name.clone(),
                village: u.village.clone(),
            };
            Ok((u.username.clone(), serde_json::to_value(entry)?))
        })
        .collect()
}

fn users_from_map(map: Map<String, Value>) -> serde_json::Result<Vec<User>> {
    map.into_iter()
        .map(|(username, value)| {
            let entry: UserEntry = serde_json::from_value(value)?;
            Ok(User {
                username,
                password: entry.password,
                role: entry.role,
                name: entry.name,
                village: entry.village,
            })
        })
        .collect()
}

/// Collections read back from the cache; None = key absent or unreadable
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LoadedCollections {
    pub contributions: Option<Vec<Contribution>>,
    pub mentors: Option<Vec<Mentor>>,
    pub village_names: Option<Vec<String>>,
    pub localities: Option<BTreeMap<String, Vec<String>>>,
    pub users: Option<Vec<User>>,
}

impl LoadedCollections {
    pub fn is_empty(&self) -> bool {
        self.contributions.is_none()
            && self.mentors.is_none()
            && self.village_names.is_none()
            && self.localities.is_none()
            && self.users.is_none()
    }

    /// Overlay onto `store`: present collections replace, absent ones are
    /// left alone, users are merged over what is already there.
    pub fn apply_to(self, store: &mut RecordStore) {
        if let Some(contributions) = self.contributions {
            store.contributions.replace_all(contributions);
        }
        if let Some(mentors) = self.mentors {
            store.mentors.replace_all(mentors);
        }
        if self.village_names.is_some() || self.localities.is_some() {
            let villages = merge_villages(store.villages.as_slice(), self.village_names, self.localities);
            store.villages.replace_all(villages);
        }
        if let Some(users) = self.users {
            store.users.overlay(users);
        }
    }
}

/// Rebuild villages from the names list and the localities map.
/// Missing halves fall back to what `current` already holds.
fn merge_villages(
    current: &[Village],
    names: Option<Vec<String>>,
    localities: Option<BTreeMap<String, Vec<String>>>,
) -> Vec<Village> {
    let names = names.unwrap_or_else(|| current.iter().map(|v| v.name.clone()).collect());

    names
        .iter()
        .map(|name| {
            let list = localities
                .as_ref()
                .and_then(|map| map.get(name).cloned())
                .or_else(|| current.iter().find(|v| &v.name == name).map(|v| v.localities.clone()))
                .unwrap_or_default();
            Village::new(name, list)
        })
        .collect()
}

// ============================================================================
// PERSISTENCE FALLBACK
// ============================================================================

pub struct PersistenceFallback<K> {
    kv: K,
}

impl<K: KeyValueStore> PersistenceFallback<K> {
    pub fn new(kv: K) -> Self {
        PersistenceFallback { kv }
    }

    /// Write every collection under its own key. Returns how many keys were
    /// written; failures are logged, never returned.
    pub fn save(&self, store: &RecordStore) -> usize {
        let localities: BTreeMap<String, Vec<String>> = store
            .villages
            .iter()
            .map(|v| (v.name.clone(), v.localities.clone()))
            .collect();
        let village_names: Vec<&str> = store.villages.iter().map(|v| v.name.as_str()).collect();

        let results = [
            (KEY_CONTRIBUTIONS, serde_json::to_string(store.contributions.as_slice())),
            (KEY_MENTORS, serde_json::to_string(store.mentors.as_slice())),
            (KEY_VILLAGES, serde_json::to_string(&village_names)),
            (KEY_LOCALITIES, serde_json::to_string(&localities)),
            (KEY_USERS, users_to_map(store.users.as_slice()).and_then(|users| serde_json::to_string(&users))),
        ];

        let mut written = 0;
        for (key, encoded) in results {
            let outcome = encoded
                .map_err(FundError::from)
                .and_then(|json| self.kv.set(key, &json));
            match outcome {
                Ok(()) => written += 1,
                Err(e) => warn!(key, error = %e, "Failed to save collection to local cache"),
            }
        }

        debug!(written, "Saved record store to local cache");
        written
    }

    /// Read each key that is present. Unreadable values are logged and
    /// reported as absent.
    pub fn load(&self) -> LoadedCollections {
        LoadedCollections {
            contributions: self.read(KEY_CONTRIBUTIONS),
            mentors: self.read(KEY_MENTORS),
            village_names: self.read(KEY_VILLAGES),
            localities: self.read(KEY_LOCALITIES),
            users: self.read_users(),
        }
    }

    fn read_users(&self) -> Option<Vec<User>> {
        match users_from_map(self.read::<Map<String, Value>>(KEY_USERS)?) {
            Ok(users) => Some(users),
            Err(e) => {
                warn!(key = KEY_USERS, error = %e, "Ignoring unreadable local cache entry");
                None
            }
        }
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "Failed to read local cache");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Ignoring unreadable local cache entry");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ContributionDraft, PaymentType};
    use chrono::NaiveDate;

    /// Rejects every write, as a full quota would
    struct FullStore;

    impl KeyValueStore for FullStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(FundError::Config("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    fn populated_store() -> RecordStore {
        let mut store = RecordStore::seeded();
        store.upsert(
            ContributionDraft {
                donor_name: "Test".to_string(),
                donor_contact: "123".to_string(),
                village: "Chandrapur".to_string(),
                locality: "Main Market".to_string(),
                amount: 1000,
                payment_type: Some(PaymentType::Cash),
                date: NaiveDate::from_ymd_opt(2024, 2, 1),
            }
            .into_contribution(1_706_745_600_000)
            .unwrap(),
        );
        store.upsert(Village::from_locality_list("Rampur", "North Lane"));
        store
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let fallback = PersistenceFallback::new(MemoryKeyValueStore::new());
        let store = populated_store();

        assert_eq!(fallback.save(&store), 5);

        let mut restored = RecordStore::new();
        fallback.load().apply_to(&mut restored);

        assert_eq!(restored.contributions, store.contributions);
        assert_eq!(restored.mentors, store.mentors);
        assert_eq!(restored.villages, store.villages);
        assert_eq!(restored.users, store.users);
    }

    #[test]
    fn test_users_keep_insertion_order() {
        let fallback = PersistenceFallback::new(MemoryKeyValueStore::new());
        let mut store = RecordStore::new();
        store.upsert(User::new("Zed", "pw", Role::Mentor, "Zed", None));
        store.upsert(User::new("Amy", "pw", Role::VillageManager, "Amy", Some("Chatra")));
        fallback.save(&store);

        let mut restored = RecordStore::new();
        fallback.load().apply_to(&mut restored);

        let names: Vec<&str> = restored.users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Amy"]);
        assert_eq!(restored.users, store.users);
    }

    #[test]
    fn test_empty_cache_leaves_store_untouched() {
        let fallback = PersistenceFallback::new(MemoryKeyValueStore::new());
        let loaded = fallback.load();
        assert!(loaded.is_empty());

        let mut store = RecordStore::seeded();
        let before = store.clone();
        loaded.apply_to(&mut store);
        assert_eq!(store, before);
    }

    #[test]
    fn test_users_overlay_onto_defaults() {
        let kv = MemoryKeyValueStore::new();
        kv.set(
            KEY_USERS,
            r#"{"User1":{"password":"changed","role":"core_team","name":"User 1"},
                "Neha":{"password":"pw","role":"mentor","name":"Neha","village":null}}"#,
        )
        .unwrap();
        let fallback = PersistenceFallback::new(kv);

        let mut store = RecordStore::seeded();
        fallback.load().apply_to(&mut store);

        assert_eq!(store.users.len(), 10);
        assert_eq!(store.find_user("User1").unwrap().password, "changed");
        assert!(store.find_user("Firoj").is_some());
        assert_eq!(store.find_user("Neha").unwrap().role, Role::Mentor);
    }

    #[test]
    fn test_corrupt_entry_is_treated_as_absent() {
        let kv = MemoryKeyValueStore::new();
        kv.set(KEY_CONTRIBUTIONS, "{not json").unwrap();
        kv.set(KEY_MENTORS, "[]").unwrap();
        let fallback = PersistenceFallback::new(kv);

        let loaded = fallback.load();
        assert!(loaded.contributions.is_none());
        assert_eq!(loaded.mentors, Some(Vec::new()));
    }

    #[test]
    fn test_original_cache_format_is_readable() {
        let kv = MemoryKeyValueStore::new();
        kv.set(
            KEY_CONTRIBUTIONS,
            r#"[{"id":1706745600000,"donorName":"Test","donorContact":"","village":"Chandrapur",
                 "locality":"Main Market","amount":1000,"paymentType":"Cash","date":"2024-02-01"}]"#,
        )
        .unwrap();
        kv.set(KEY_VILLAGES, r#"["Chandrapur","Chatra"]"#).unwrap();
        kv.set(KEY_LOCALITIES, r#"{"Chandrapur":["Main Market"]}"#).unwrap();
        let fallback = PersistenceFallback::new(kv);

        let mut store = RecordStore::seeded();
        fallback.load().apply_to(&mut store);

        assert_eq!(store.contributions.len(), 1);
        assert_eq!(store.contributions.as_slice()[0].amount, 1000);
        let villages: Vec<&Village> = store.villages.iter().collect();
        assert_eq!(villages.len(), 2);
        assert_eq!(villages[0].localities, vec!["Main Market"]);
        // Localities missing from the map keep the seeded list
        assert_eq!(villages[1].localities.len(), 3);
    }

    #[test]
    fn test_save_failures_are_swallowed() {
        let fallback = PersistenceFallback::new(FullStore);
        assert_eq!(fallback.save(&RecordStore::seeded()), 0);
    }

    #[test]
    fn test_sqlite_store_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let fallback = PersistenceFallback::new(SqliteKeyValueStore::open(&path).unwrap());
            fallback.save(&populated_store());
        }

        let fallback = PersistenceFallback::new(SqliteKeyValueStore::open(&path).unwrap());
        let mut store = RecordStore::new();
        fallback.load().apply_to(&mut store);

        assert_eq!(store.contributions, populated_store().contributions);
    }

    #[test]
    fn test_sqlite_set_overwrites_and_remove() {
        let kv = SqliteKeyValueStore::open_in_memory().unwrap();

        kv.set("users", "{}").unwrap();
        kv.set("users", "{\"a\":1}").unwrap();
        assert_eq!(kv.get("users").unwrap().as_deref(), Some("{\"a\":1}"));

        kv.remove("users").unwrap();
        assert_eq!(kv.get("users").unwrap(), None);
    }
}
