//! Store-backed entry points: regenerate, validate, and read snapshots.
//!
//! Every call loads its own catalog, so concurrent calls share nothing but
//! the store.

use log::{info, warn};
use rand::Rng;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::SchedulerSettings;
use crate::data::Slot;
use crate::error::TimetableError;
use crate::generator;
use crate::projector::Projector;
use crate::store::TimetableStore;
use crate::validator::{self, ValidationReport};

/// Result of a regeneration run.
#[derive(Debug, Clone, Serialize)]
pub struct RegenerationSummary {
    pub generated: usize,
    pub deleted: usize,
    pub saved: usize,
    pub report: ValidationReport,
}

/// Generate a new schedule, validate it, and replace the persisted one.
///
/// The clear-then-write sequence is not atomic. Individual delete or write
/// failures are logged and reflected in the counts; nothing is rolled back.
pub fn regenerate<R: Rng + ?Sized>(
    store: &dyn TimetableStore,
    settings: &SchedulerSettings,
    rng: &mut R,
) -> Result<RegenerationSummary, TimetableError> {
    let catalog = Catalog::load(store)?;
    let slots = generator::generate(&catalog, settings, rng);
    let report = validator::validate(&slots, &catalog, settings);

    let previous = store.slots()?;
    let mut deleted = 0;
    for stored in &previous {
        match store.delete_slot(&stored.id) {
            Ok(()) => deleted += 1,
            Err(e) => warn!("Failed to delete slot {}: {}", stored.id, e),
        }
    }

    let mut saved = 0;
    for slot in &slots {
        match store.create_slot(slot) {
            Ok(_) => saved += 1,
            Err(e) => warn!("Failed to save slot {}: {}", slot, e),
        }
    }
    info!(
        "Regenerated timetable: {} generated, {} of {} old slots deleted, {} saved.",
        slots.len(),
        deleted,
        previous.len(),
        saved
    );
    if !report.is_ok() {
        info!("The new timetable has constraint issues; see the validation report.");
    }

    Ok(RegenerationSummary {
        generated: slots.len(),
        deleted,
        saved,
        report,
    })
}

/// Validate whatever slot set is currently persisted.
pub fn validate_persisted(
    store: &dyn TimetableStore,
    settings: &SchedulerSettings,
) -> Result<ValidationReport, TimetableError> {
    let catalog = Catalog::load(store)?;
    let slots = persisted_slots(store)?;
    Ok(validator::validate(&slots, &catalog, settings))
}

fn persisted_slots(store: &dyn TimetableStore) -> Result<Vec<Slot>, TimetableError> {
    Ok(store.slots()?.into_iter().map(|s| s.slot).collect())
}

/// Catalog, slots and report for one read request.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub catalog: Catalog,
    pub slots: Vec<Slot>,
    pub report: ValidationReport,
    /// False when the slots were generated for this request only.
    pub persisted: bool,
}

impl Snapshot {
    /// Use the persisted schedule if there is one, otherwise generate an
    /// ephemeral schedule that is not written back.
    pub fn load<R: Rng + ?Sized>(
        store: &dyn TimetableStore,
        settings: &SchedulerSettings,
        rng: &mut R,
    ) -> Result<Self, TimetableError> {
        let catalog = Catalog::load(store)?;
        let mut slots = persisted_slots(store)?;
        let persisted = !slots.is_empty();
        if !persisted {
            info!("No persisted timetable; generating an ephemeral one.");
            slots = generator::generate(&catalog, settings, rng);
        }
        let report = validator::validate(&slots, &catalog, settings);
        Ok(Self {
            catalog,
            slots,
            report,
            persisted,
        })
    }

    pub fn projector<'a>(&'a self, settings: &'a SchedulerSettings) -> Projector<'a> {
        Projector {
            slots: &self.slots,
            catalog: &self.catalog,
            report: &self.report,
            calendar: &settings.calendar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Batch, Classroom, Qualification, SlotId, StoredSlot, Subject, User};
    use crate::error::{StoreError, StoreResult};
    use crate::generator::checks::assert_hard_invariants;
    use crate::store::{MemoryStore, SeedData};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn seeded_store() -> MemoryStore {
        MemoryStore::with_seed(SeedData::from_json(include_str!("../data/seed.json")).unwrap())
    }

    #[test]
    fn test_regenerate_persists_every_slot() {
        let store = seeded_store();
        let settings = SchedulerSettings::default();
        let mut rng = SmallRng::seed_from_u64(1);

        let first = regenerate(&store, &settings, &mut rng).unwrap();
        assert_eq!(first.deleted, 0);
        assert_eq!(first.saved, first.generated);
        assert_eq!(store.slots().unwrap().len(), first.generated);

        let second = regenerate(&store, &settings, &mut rng).unwrap();
        assert_eq!(second.deleted, first.generated);
        assert_eq!(second.saved, second.generated);
        assert_eq!(store.slots().unwrap().len(), second.generated);

        let catalog = Catalog::load(&store).unwrap();
        let slots = persisted_slots(&store).unwrap();
        assert_hard_invariants(&slots, &catalog);
    }

    #[test]
    fn test_validate_persisted_matches_regeneration_report() {
        let store = seeded_store();
        let settings = SchedulerSettings::default();
        let mut rng = SmallRng::seed_from_u64(2);
        let summary = regenerate(&store, &settings, &mut rng).unwrap();
        let report = validate_persisted(&store, &settings).unwrap();
        assert_eq!(report, summary.report);
    }

    #[test]
    fn test_snapshot_prefers_persisted_slots() {
        let store = seeded_store();
        let settings = SchedulerSettings::default();
        let mut rng = SmallRng::seed_from_u64(3);

        let ephemeral = Snapshot::load(&store, &settings, &mut rng).unwrap();
        assert!(!ephemeral.persisted);
        assert!(store.slots().unwrap().is_empty());

        regenerate(&store, &settings, &mut rng).unwrap();
        let snapshot = Snapshot::load(&store, &settings, &mut rng).unwrap();
        assert!(snapshot.persisted);
        let mut expected = persisted_slots(&store).unwrap();
        expected.sort();
        let mut actual = snapshot.slots.clone();
        actual.sort();
        assert_eq!(actual, expected);

        let view = snapshot.projector(&settings).batch("B1").unwrap();
        assert_eq!(view.id, "B1");
    }

    /// Wraps a memory store and fails selected operations.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_reads: bool,
        fail_every_other_write: bool,
        fail_deletes: bool,
        writes: AtomicUsize,
    }

    impl TimetableStore for FlakyStore {
        fn users(&self) -> StoreResult<Vec<User>> {
            if self.fail_reads {
                return Err(StoreError::Connection("database is locked".into()));
            }
            self.inner.users()
        }
        fn classrooms(&self) -> StoreResult<Vec<Classroom>> {
            self.inner.classrooms()
        }
        fn subjects(&self) -> StoreResult<Vec<Subject>> {
            self.inner.subjects()
        }
        fn batches(&self) -> StoreResult<Vec<Batch>> {
            self.inner.batches()
        }
        fn qualifications(&self) -> StoreResult<Vec<Qualification>> {
            self.inner.qualifications()
        }
        fn slots(&self) -> StoreResult<Vec<StoredSlot>> {
            self.inner.slots()
        }
        fn create_slot(&self, slot: &Slot) -> StoreResult<SlotId> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_every_other_write && n % 2 == 1 {
                return Err(StoreError::Write("disk full".into()));
            }
            self.inner.create_slot(slot)
        }
        fn delete_slot(&self, id: &str) -> StoreResult<()> {
            if self.fail_deletes {
                return Err(StoreError::Write("read only".into()));
            }
            self.inner.delete_slot(id)
        }
    }

    #[test]
    fn test_fetch_failure_aborts_without_writes() {
        let store = FlakyStore {
            inner: seeded_store(),
            fail_reads: true,
            ..Default::default()
        };
        let mut rng = SmallRng::seed_from_u64(4);
        let err = regenerate(&store, &SchedulerSettings::default(), &mut rng).unwrap_err();
        assert!(matches!(err, TimetableError::Fetch(_)));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
        assert!(validate_persisted(&store, &SchedulerSettings::default()).is_err());
    }

    #[test]
    fn test_partial_write_failures_are_counted() {
        let store = FlakyStore {
            inner: seeded_store(),
            fail_every_other_write: true,
            ..Default::default()
        };
        let mut rng = SmallRng::seed_from_u64(5);
        let summary = regenerate(&store, &SchedulerSettings::default(), &mut rng).unwrap();
        assert!(summary.generated > 1);
        assert_eq!(summary.saved, summary.generated.div_ceil(2));
        assert_eq!(store.inner.slots().unwrap().len(), summary.saved);
    }

    #[test]
    fn test_delete_failures_are_counted() {
        let store = FlakyStore {
            inner: seeded_store(),
            ..Default::default()
        };
        let settings = SchedulerSettings::default();
        let mut rng = SmallRng::seed_from_u64(6);
        let first = regenerate(&store, &settings, &mut rng).unwrap();

        let store = FlakyStore {
            inner: store.inner.clone(),
            fail_deletes: true,
            ..Default::default()
        };
        let second = regenerate(&store, &settings, &mut rng).unwrap();
        assert_eq!(second.deleted, 0);
        assert_eq!(
            store.inner.slots().unwrap().len(),
            first.generated + second.saved
        );
    }
}
