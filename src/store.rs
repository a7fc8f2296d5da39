//! Data-store contract and an in-memory implementation.
//!
//! The scheduling core only ever talks to storage through [`TimetableStore`]:
//! five bulk catalog reads, a bulk slot read, and single-record slot
//! create/delete.

use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::data::{Batch, Classroom, Qualification, Slot, SlotId, StoredSlot, Subject, User};
use crate::error::{StoreError, StoreResult};

/// Storage operations consumed by the timetable pipeline.
///
/// Implementations must be `Send + Sync` so one store can back concurrent
/// requests.
pub trait TimetableStore: Send + Sync {
    fn users(&self) -> StoreResult<Vec<User>>;
    fn classrooms(&self) -> StoreResult<Vec<Classroom>>;
    fn subjects(&self) -> StoreResult<Vec<Subject>>;
    fn batches(&self) -> StoreResult<Vec<Batch>>;
    fn qualifications(&self) -> StoreResult<Vec<Qualification>>;

    /// Currently persisted slots, possibly empty.
    fn slots(&self) -> StoreResult<Vec<StoredSlot>>;
    /// Persist one slot and return its new record id.
    fn create_slot(&self, slot: &Slot) -> StoreResult<SlotId>;
    fn delete_slot(&self, id: &str) -> StoreResult<()>;
}

/// Catalog records used to populate a store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub classrooms: Vec<Classroom>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub faculty_subject_map: Vec<Qualification>,
}

impl SeedData {
    pub fn from_json(content: &str) -> StoreResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| StoreError::Query(format!("invalid seed data: {}", e)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            StoreError::Connection(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }
}

/// In-memory store.
///
/// Cheap to clone; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

#[derive(Default)]
struct MemoryData {
    catalog: SeedData,
    slots: Vec<StoredSlot>,
    next_slot_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: SeedData) -> Self {
        Self {
            data: Arc::new(RwLock::new(MemoryData {
                catalog: seed,
                ..Default::default()
            })),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryData) -> T) -> StoreResult<T> {
        let data = self
            .data
            .read()
            .map_err(|_| StoreError::Connection("store lock poisoned".to_string()))?;
        Ok(f(&data))
    }

    fn write<T>(&self, f: impl FnOnce(&mut MemoryData) -> T) -> StoreResult<T> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StoreError::Connection("store lock poisoned".to_string()))?;
        Ok(f(&mut data))
    }
}

impl TimetableStore for MemoryStore {
    fn users(&self) -> StoreResult<Vec<User>> {
        self.read(|d| d.catalog.users.clone())
    }

    fn classrooms(&self) -> StoreResult<Vec<Classroom>> {
        self.read(|d| d.catalog.classrooms.clone())
    }

    fn subjects(&self) -> StoreResult<Vec<Subject>> {
        self.read(|d| d.catalog.subjects.clone())
    }

    fn batches(&self) -> StoreResult<Vec<Batch>> {
        self.read(|d| d.catalog.batches.clone())
    }

    fn qualifications(&self) -> StoreResult<Vec<Qualification>> {
        self.read(|d| d.catalog.faculty_subject_map.clone())
    }

    fn slots(&self) -> StoreResult<Vec<StoredSlot>> {
        self.read(|d| d.slots.clone())
    }

    fn create_slot(&self, slot: &Slot) -> StoreResult<SlotId> {
        self.write(|d| {
            d.next_slot_id += 1;
            let id = format!("slot_{}", d.next_slot_id);
            d.slots.push(StoredSlot {
                id: id.clone(),
                slot: slot.clone(),
            });
            id
        })
    }

    fn delete_slot(&self, id: &str) -> StoreResult<()> {
        self.write(|d| {
            let before = d.slots.len();
            d.slots.retain(|s| s.id != id);
            d.slots.len() < before
        })?
        .then_some(())
        .ok_or_else(|| StoreError::NotFound(format!("slot {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = include_str!("../data/seed.json");

    fn slot() -> Slot {
        Slot {
            day: "Monday".into(),
            time: "09:00-10:00".into(),
            classroom_id: "C1".into(),
            subject_id: "S1".into(),
            faculty_id: "T1".into(),
            batch_id: "B1".into(),
        }
    }

    #[test]
    fn test_seed_file_parses() {
        let seed = SeedData::from_json(SEED).unwrap();
        assert_eq!(seed.classrooms.len(), 4);
        assert_eq!(seed.batches.len(), 4);
        assert_eq!(seed.subjects.len(), 5);
        assert_eq!(seed.faculty_subject_map.len(), 10);
        assert_eq!(seed.users.iter().filter(|u| u.is_faculty()).count(), 10);
    }

    #[test]
    fn test_invalid_seed() {
        assert!(matches!(
            SeedData::from_json("{\"classrooms\": 3}"),
            Err(StoreError::Query(_))
        ));
    }

    #[test]
    fn test_create_and_delete_slots() {
        let store = MemoryStore::new();
        let a = store.create_slot(&slot()).unwrap();
        let b = store.create_slot(&slot()).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.slots().unwrap().len(), 2);

        store.delete_slot(&a).unwrap();
        let remaining = store.slots().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b);
    }

    #[test]
    fn test_delete_unknown_slot() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.delete_slot("slot_404"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_clones_share_data() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.create_slot(&slot()).unwrap();
        assert_eq!(other.slots().unwrap().len(), 1);
    }
}
