//! Read-side projection of slots into per-entity weekly grids.

use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::config::Calendar;
use crate::data::{BatchId, ClassroomId, FacultyId, RoomKind, Slot};
use crate::error::{EntityKind, TimetableError};
use crate::validator::{BatchReport, ClassroomReport, FacultyReport, ValidationReport};

/// A slot joined against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub subject_id: String,
    pub subject_name: String,
    pub batch_id: String,
    pub batch_name: String,
    pub faculty_id: String,
    pub faculty_name: String,
    pub classroom_id: String,
    pub classroom_name: String,
    pub room_kind: RoomKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub time: String,
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySchedule {
    pub day: String,
    pub periods: Vec<Period>,
}

/// Weekly grid and validation report for one batch, faculty member or room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityTimetable<R> {
    pub id: String,
    pub name: String,
    pub grid: Vec<DaySchedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<R>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FullTimetable {
    pub batches: BTreeMap<BatchId, EntityTimetable<BatchReport>>,
    pub faculty: BTreeMap<FacultyId, EntityTimetable<FacultyReport>>,
    pub classrooms: BTreeMap<ClassroomId, EntityTimetable<ClassroomReport>>,
}

/// Everything a projection reads from.
pub struct Projector<'a> {
    pub slots: &'a [Slot],
    pub catalog: &'a Catalog,
    pub report: &'a ValidationReport,
    pub calendar: &'a Calendar,
}

impl<'a> Projector<'a> {
    pub fn batch(&self, id: &str) -> Result<EntityTimetable<BatchReport>, TimetableError> {
        let batch = self
            .catalog
            .batches
            .get(id)
            .ok_or_else(|| TimetableError::not_found(EntityKind::Batch, id))?;
        Ok(EntityTimetable {
            id: batch.id.clone(),
            name: batch.name.clone(),
            grid: self.grid(|s| s.batch_id == id),
            report: self.report.batches.get(id).cloned(),
        })
    }

    pub fn faculty(&self, id: &str) -> Result<EntityTimetable<FacultyReport>, TimetableError> {
        let faculty = self
            .catalog
            .faculty
            .get(id)
            .ok_or_else(|| TimetableError::not_found(EntityKind::Faculty, id))?;
        Ok(EntityTimetable {
            id: faculty.id.clone(),
            name: faculty.name.clone(),
            grid: self.grid(|s| s.faculty_id == id),
            report: self.report.faculty.get(id).cloned(),
        })
    }

    pub fn classroom(&self, id: &str) -> Result<EntityTimetable<ClassroomReport>, TimetableError> {
        let room = self
            .catalog
            .classrooms
            .get(id)
            .ok_or_else(|| TimetableError::not_found(EntityKind::Classroom, id))?;
        Ok(EntityTimetable {
            id: room.id.clone(),
            name: room.name.clone(),
            grid: self.grid(|s| s.classroom_id == id),
            report: self.report.classrooms.get(id).cloned(),
        })
    }

    /// Grids for every entity in the catalog.
    pub fn all(&self) -> Result<FullTimetable, TimetableError> {
        let mut full = FullTimetable::default();
        for id in self.catalog.batches.keys() {
            full.batches.insert(id.clone(), self.batch(id)?);
        }
        for id in self.catalog.faculty.keys() {
            full.faculty.insert(id.clone(), self.faculty(id)?);
        }
        for id in self.catalog.classrooms.keys() {
            full.classrooms.insert(id.clone(), self.classroom(id)?);
        }
        Ok(full)
    }

    fn grid(&self, belongs: impl Fn(&Slot) -> bool) -> Vec<DaySchedule> {
        let mut grid: Vec<DaySchedule> = self
            .calendar
            .days
            .iter()
            .map(|day| DaySchedule {
                day: day.clone(),
                periods: self
                    .calendar
                    .times
                    .iter()
                    .map(|time| Period {
                        time: time.clone(),
                        sessions: Vec::new(),
                    })
                    .collect(),
            })
            .collect();

        let mut slots: Vec<&Slot> = self.slots.iter().filter(|s| belongs(*s)).collect();
        slots.sort();
        for slot in slots {
            let (Some(d), Some(t)) = (
                self.calendar.day_index(&slot.day),
                self.calendar.time_index(&slot.time),
            ) else {
                warn!("Slot outside the calendar left off the grid: {}", slot);
                continue;
            };
            if let Some(session) = self.session(slot) {
                grid[d].periods[t].sessions.push(session);
            }
        }
        grid
    }

    fn session(&self, slot: &Slot) -> Option<Session> {
        let subject = self.catalog.subjects.get(&slot.subject_id)?;
        let batch = self.catalog.batches.get(&slot.batch_id)?;
        let faculty = self.catalog.faculty.get(&slot.faculty_id)?;
        let room = self.catalog.classrooms.get(&slot.classroom_id)?;
        Some(Session {
            subject_id: subject.id.clone(),
            subject_name: subject.name.clone(),
            batch_id: batch.id.clone(),
            batch_name: batch.name.clone(),
            faculty_id: faculty.id.clone(),
            faculty_name: faculty.name.clone(),
            classroom_id: room.id.clone(),
            classroom_name: room.name.clone(),
            room_kind: room.kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::*;
    use crate::config::SchedulerSettings;
    use crate::validator::{Status, validate};

    fn slot(day: &str, time: &str) -> Slot {
        Slot {
            day: day.into(),
            time: time.into(),
            classroom_id: "C1".into(),
            subject_id: "S1".into(),
            faculty_id: "T1".into(),
            batch_id: "B1".into(),
        }
    }

    fn fixture() -> (Catalog, Vec<Slot>, SchedulerSettings) {
        let catalog = single_subject(8, vec![classroom("C1", RoomKind::Lecture)]);
        let slots = vec![
            slot("Monday", "09:00-10:00"),
            slot("Tuesday", "11:00-12:00"),
            slot("Friday", "15:00-16:00"),
            slot("Saturday", "09:00-10:00"),
        ];
        (catalog, slots, SchedulerSettings::default())
    }

    #[test]
    fn test_batch_grid_is_enriched() {
        let (catalog, slots, settings) = fixture();
        let report = validate(&slots, &catalog, &settings);
        let projector = Projector {
            slots: &slots,
            catalog: &catalog,
            report: &report,
            calendar: &settings.calendar,
        };
        let view = projector.batch("B1").unwrap();
        assert_eq!(view.name, "Batch B1");
        assert_eq!(view.grid.len(), 5);
        assert!(view.grid.iter().all(|d| d.periods.len() == 7));

        let monday = &view.grid[0].periods[0].sessions;
        assert_eq!(monday.len(), 1);
        assert_eq!(monday[0].subject_name, "Thermodynamics");
        assert_eq!(monday[0].faculty_name, "Faculty T1");
        assert_eq!(monday[0].classroom_name, "Room C1");
        assert_eq!(monday[0].room_kind, RoomKind::Lecture);
        assert_eq!(view.grid[1].periods[2].sessions.len(), 1);
        assert_eq!(view.grid[4].periods[6].sessions.len(), 1);

        // Saturday is off the calendar but still counts toward the quota
        let placed: usize = view
            .grid
            .iter()
            .flat_map(|d| &d.periods)
            .map(|p| p.sessions.len())
            .sum();
        assert_eq!(placed, 3);
        assert_eq!(view.report.unwrap().findings.status, Status::Ok);
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let (catalog, slots, settings) = fixture();
        let report = validate(&slots, &catalog, &settings);
        let projector = Projector {
            slots: &slots,
            catalog: &catalog,
            report: &report,
            calendar: &settings.calendar,
        };
        assert!(matches!(
            projector.batch("B404"),
            Err(TimetableError::NotFound {
                kind: EntityKind::Batch,
                ..
            })
        ));
        assert!(projector.faculty("T404").is_err());
        assert!(projector.classroom("C404").is_err());
    }

    #[test]
    fn test_all_entities() {
        let (catalog, slots, settings) = fixture();
        let report = validate(&slots, &catalog, &settings);
        let projector = Projector {
            slots: &slots,
            catalog: &catalog,
            report: &report,
            calendar: &settings.calendar,
        };
        let full = projector.all().unwrap();
        assert_eq!(full.batches.len(), 1);
        assert_eq!(full.faculty.len(), 1);
        assert_eq!(full.classrooms.len(), 1);
        assert_eq!(
            full.faculty["T1"].grid[0].periods[0].sessions[0].batch_name,
            "Batch B1"
        );
        assert_eq!(full.classrooms["C1"].report.as_ref().unwrap().usage, 4);
    }
}
