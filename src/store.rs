// 🗂️ Record Store - authoritative in-process copy of every collection
//
// Mutations are synchronous and never persist on their own; the session
// decides when to mirror to the remote sheet and the local cache.
// Key uniqueness is trusted to callers (ids are generated from timestamps).

use crate::entities::{Contribution, Mentor, Record, User, Village};
use crate::error::{FundError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ============================================================================
// COLLECTION
// ============================================================================

/// Insertion-ordered collection keyed by `Record::key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection { items: Vec::new() }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(items: Vec<T>) -> Self {
        Collection { items }
    }

    /// Append if the key is new, otherwise replace in place.
    /// Returns true when the record was inserted.
    pub fn upsert(&mut self, record: T) -> bool {
        let key = record.key();
        match self.items.iter_mut().find(|existing| existing.key() == key) {
            Some(slot) => {
                *slot = record;
                false
            }
            None => {
                self.items.push(record);
                true
            }
        }
    }

    /// Remove by key; no-op when absent. Returns the removed record.
    pub fn remove(&mut self, key: &T::Key) -> Option<T> {
        let index = self.items.iter().position(|r| &r.key() == key)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.items.iter().find(|r| &r.key() == key)
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.get(key).is_some()
    }

    /// Lazy, restartable (Clone) sequence of matches in insertion order
    pub fn query<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a T> + Clone + 'a
    where
        T: 'a,
        P: Fn(&T) -> bool + Clone + 'a,
    {
        self.items.iter().filter(move |r| predicate(*r))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Wholesale replacement, used by remote refresh
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Upsert every record of `other`, keeping existing order for known keys
    pub fn overlay(&mut self, other: Vec<T>) {
        for record in other {
            self.upsert(record);
        }
    }
}

// ============================================================================
// RECORD STORE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStore {
    pub contributions: Collection<Contribution>,
    pub mentors: Collection<Mentor>,
    pub villages: Collection<Village>,
    pub users: Collection<User>,
}

/// Maps an entity type to its collection inside the store
pub trait Stored: Record + Sized {
    fn collection(store: &RecordStore) -> &Collection<Self>;
    fn collection_mut(store: &mut RecordStore) -> &mut Collection<Self>;
}

macro_rules! stored_in {
    ($ty:ty, $field:ident) => {
        impl Stored for $ty {
            fn collection(store: &RecordStore) -> &Collection<Self> {
                &store.$field
            }

            fn collection_mut(store: &mut RecordStore) -> &mut Collection<Self> {
                &mut store.$field
            }
        }
    };
}

stored_in!(Contribution, contributions);
stored_in!(Mentor, mentors);
stored_in!(Village, villages);
stored_in!(User, users);

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample contributions and mentors, default villages and accounts
    pub fn seeded() -> Self {
        RecordStore {
            contributions: Collection::new(Contribution::samples()),
            mentors: Collection::new(Mentor::samples()),
            villages: Collection::new(Village::defaults()),
            users: Collection::new(User::defaults()),
        }
    }

    pub fn collection<T: Stored>(&self) -> &Collection<T> {
        T::collection(self)
    }

    pub fn collection_mut<T: Stored>(&mut self) -> &mut Collection<T> {
        T::collection_mut(self)
    }

    pub fn upsert<T: Stored>(&mut self, record: T) -> bool {
        self.collection_mut::<T>().upsert(record)
    }

    pub fn remove<T: Stored>(&mut self, key: &T::Key) -> Option<T> {
        self.collection_mut::<T>().remove(key)
    }

    pub fn get<T: Stored>(&self, key: &T::Key) -> Option<&T> {
        self.collection::<T>().get(key)
    }

    pub fn query<'a, T, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a T> + Clone + 'a
    where
        T: Stored + 'a,
        P: Fn(&T) -> bool + Clone + 'a,
    {
        self.collection::<T>().query(predicate)
    }

    pub fn next_contribution_id(&self) -> Result<i64> {
        next_timestamp_id(self.contributions.iter().map(|c| c.id))
    }

    pub fn next_mentor_id(&self) -> Result<i64> {
        next_timestamp_id(self.mentors.iter().map(|m| m.id))
    }

    /// Case-sensitive lookup
    pub fn find_user(&self, username: &str) -> Option<&User> {
        self.users.get(&username.to_string())
    }
}

/// Millisecond timestamp, bumped past any existing id
fn next_timestamp_id(existing: impl Iterator<Item = i64>) -> Result<i64> {
    let now = Utc::now().timestamp_millis();
    match existing.max() {
        Some(max) if max >= now => max
            .checked_add(1)
            .ok_or_else(|| FundError::Validation(vec![format!("no id available after {}", max)])),
        _ => Ok(now),
    }
}
