//! Post-hoc validation of a slot set against the catalog.
//!
//! Quota shortfalls, surpluses and overloads are reported as data (errors
//! plus remediation suggestions per entity) rather than as Rust errors. The
//! validator also audits the hard invariants, since persisted slots may have
//! been written by something other than the generator.

use itertools::Itertools;
use log::warn;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::catalog::Catalog;
use crate::config::SchedulerSettings;
use crate::data::{BatchId, ClassroomId, FacultyId, RoomKind, Slot, SubjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Error,
}

/// Errors and suggestions collected for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Findings {
    pub status: Status,
    pub errors: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Default for Findings {
    fn default() -> Self {
        Self {
            status: Status::Ok,
            errors: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

impl Findings {
    fn error(&mut self, message: String) {
        self.status = Status::Error;
        self.errors.push(message);
    }

    fn suggest(&mut self, suggestion: String) {
        self.suggestions.push(suggestion);
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubjectHours {
    pub scheduled: u32,
    pub required: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    #[serde(flatten)]
    pub findings: Findings,
    pub subjects: BTreeMap<SubjectId, SubjectHours>,
    pub total_required: u32,
    pub weekly_capacity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubjectLoad {
    pub assigned: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacultyReport {
    #[serde(flatten)]
    pub findings: Findings,
    pub assigned_hours: u32,
    pub hour_ceiling: u32,
    pub subjects: BTreeMap<SubjectId, SubjectLoad>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassroomReport {
    #[serde(flatten)]
    pub findings: Findings,
    pub kind: RoomKind,
    pub usage: u32,
    pub weekly_capacity: u32,
}

/// Per-entity validation results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub batches: BTreeMap<BatchId, BatchReport>,
    pub faculty: BTreeMap<FacultyId, FacultyReport>,
    pub classrooms: BTreeMap<ClassroomId, ClassroomReport>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.batches.values().all(|r| r.findings.is_ok())
            && self.faculty.values().all(|r| r.findings.is_ok())
            && self.classrooms.values().all(|r| r.findings.is_ok())
    }
}

/// Hour tallies over the slots whose references all resolve.
#[derive(Default)]
struct Tally<'a> {
    batch_subject: HashMap<(&'a str, &'a str), u32>,
    faculty_subject: HashMap<(&'a str, &'a str), u32>,
    faculty_total: HashMap<&'a str, u32>,
    room_usage: HashMap<&'a str, u32>,
}

impl<'a> Tally<'a> {
    fn count(slots: &[&'a Slot]) -> Self {
        let mut tally = Self::default();
        for &slot in slots {
            let subject_id = slot.subject_id.as_str();
            *tally
                .batch_subject
                .entry((slot.batch_id.as_str(), subject_id))
                .or_insert(0) += 1;
            *tally
                .faculty_subject
                .entry((slot.faculty_id.as_str(), subject_id))
                .or_insert(0) += 1;
            *tally.faculty_total.entry(slot.faculty_id.as_str()).or_insert(0) += 1;
            *tally.room_usage.entry(slot.classroom_id.as_str()).or_insert(0) += 1;
        }
        tally
    }

    fn taught(&self, faculty_id: &str, subject_id: &str) -> u32 {
        self.faculty_subject
            .get(&(faculty_id, subject_id))
            .copied()
            .unwrap_or(0)
    }
}

/// Validate `slots` against the catalog. Pure: the same inputs always give
/// the same report.
pub fn validate(slots: &[Slot], catalog: &Catalog, settings: &SchedulerSettings) -> ValidationReport {
    let slots: Vec<&Slot> = slots
        .iter()
        .filter(|s| {
            let known = catalog.batches.contains_key(&s.batch_id)
                && catalog.faculty.contains_key(&s.faculty_id)
                && catalog.classrooms.contains_key(&s.classroom_id)
                && catalog.subjects.contains_key(&s.subject_id);
            if !known {
                warn!("Ignoring slot with unknown references: {}", s);
            }
            known
        })
        .collect();
    let tally = Tally::count(&slots);
    let capacity = settings.calendar.cell_count();

    let mut report = ValidationReport {
        batches: check_batches(&slots, &tally, catalog, capacity),
        faculty: check_faculty(&slots, &tally, catalog, settings.faculty_hour_ceiling),
        classrooms: check_classrooms(&slots, &tally, catalog, capacity),
    };
    audit_double_bookings(&slots, &mut report);
    report
}

fn check_batches(
    slots: &[&Slot],
    tally: &Tally,
    catalog: &Catalog,
    capacity: u32,
) -> BTreeMap<BatchId, BatchReport> {
    let mut reports = BTreeMap::new();
    for batch in catalog.sorted_batches() {
        let mut findings = Findings::default();
        let mut subjects = BTreeMap::new();
        let curriculum = catalog.curriculum(batch);

        for subject in &curriculum {
            let scheduled = tally
                .batch_subject
                .get(&(batch.id.as_str(), subject.id.as_str()))
                .copied()
                .unwrap_or(0);
            let required = subject.weekly_hours;
            subjects.insert(subject.id.clone(), SubjectHours { scheduled, required });

            match scheduled.cmp(&required) {
                Ordering::Equal => {}
                Ordering::Less => {
                    let deficit = required - scheduled;
                    findings.error(format!(
                        "{} ({}): {} of {} weekly hours scheduled, deficit of {}",
                        subject.name, subject.id, scheduled, required, deficit
                    ));

                    let remaining: u32 = catalog
                        .qualified_for(&subject.id)
                        .iter()
                        .map(|q| {
                            q.max_hours_per_week
                                .saturating_sub(tally.taught(&q.faculty_id, &subject.id))
                        })
                        .sum();
                    if remaining < deficit {
                        findings.suggest(format!(
                            "Add faculty qualified for {} or raise their weekly quotas: remaining capacity is {} hours for a deficit of {}",
                            subject.name, remaining, deficit
                        ));
                    } else {
                        findings.suggest(format!(
                            "Reassign slack from qualified faculty: {} hours of {} capacity remain unused",
                            remaining, subject.name
                        ));
                    }

                    let kind = subject.required_room_kind();
                    if catalog.classrooms_of_kind(kind).is_empty() {
                        findings.suggest(format!(
                            "Add {} classrooms: none exist for {}",
                            kind, subject.name
                        ));
                    }
                    findings.suggest(format!(
                        "Extend the available time slots so {} can fit {} more hours",
                        subject.name, deficit
                    ));
                }
                Ordering::Greater => {
                    let excess = scheduled - required;
                    findings.error(format!(
                        "{} ({}): {} of {} weekly hours scheduled, surplus of {}",
                        subject.name, subject.id, scheduled, required, excess
                    ));
                    findings.suggest(format!(
                        "Remove {} redundant {} slots or re-check its required weekly hours",
                        excess, subject.name
                    ));
                }
            }
        }

        // sessions of subjects outside this batch's curriculum
        let outside: BTreeMap<&str, u32> = slots
            .iter()
            .filter(|s| s.batch_id == batch.id)
            .filter(|s| !curriculum.iter().any(|c| c.id == s.subject_id))
            .map(|s| s.subject_id.as_str())
            .counts()
            .into_iter()
            .map(|(id, n)| (id, n as u32))
            .collect();
        for (subject_id, scheduled) in outside {
            subjects.insert(
                subject_id.to_string(),
                SubjectHours {
                    scheduled,
                    required: 0,
                },
            );
            findings.error(format!(
                "{}: {} weekly hours scheduled but not in the {} curriculum, surplus of {}",
                subject_id, scheduled, batch.department, scheduled
            ));
            findings.suggest(format!(
                "Remove the {} slots for {} or move the subject into {}",
                scheduled, subject_id, batch.department
            ));
        }

        let total_required: u32 = curriculum.iter().map(|s| s.weekly_hours).sum();
        if total_required > capacity {
            findings.error(format!(
                "Curriculum needs {} weekly hours but only {} cells exist",
                total_required, capacity
            ));
            findings.suggest("Reduce the weekly hours of some subjects".to_string());
            findings.suggest("Add days or time slots to the calendar".to_string());
            findings.suggest(
                "Split the batch and add parallel faculty and classrooms".to_string(),
            );
        }

        reports.insert(
            batch.id.clone(),
            BatchReport {
                findings,
                subjects,
                total_required,
                weekly_capacity: capacity,
            },
        );
    }
    reports
}

fn check_faculty(
    slots: &[&Slot],
    tally: &Tally,
    catalog: &Catalog,
    ceiling: u32,
) -> BTreeMap<FacultyId, FacultyReport> {
    let mut reports = BTreeMap::new();
    for faculty in catalog.faculty.values().sorted_by(|a, b| a.id.cmp(&b.id)) {
        let mut findings = Findings::default();
        let mut subjects = BTreeMap::new();
        let assigned_hours = tally.faculty_total.get(faculty.id.as_str()).copied().unwrap_or(0);

        if assigned_hours > ceiling {
            findings.error(format!(
                "{} is assigned {} hours, over the weekly ceiling of {}",
                faculty.name, assigned_hours, ceiling
            ));
            findings.suggest(format!(
                "Reassign {} hours from {} to other qualified faculty",
                assigned_hours - ceiling,
                faculty.name
            ));
            findings.suggest("Hire additional faculty".to_string());
            findings.suggest(format!("Raise the weekly ceiling for {}", faculty.name));
        }

        let held = catalog
            .qualifications
            .get(&faculty.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for q in held.iter().sorted_by(|a, b| a.subject_id.cmp(&b.subject_id)) {
            let assigned = tally.taught(&faculty.id, &q.subject_id);
            subjects.insert(
                q.subject_id.clone(),
                SubjectLoad {
                    assigned,
                    max: q.max_hours_per_week,
                },
            );
            if assigned > q.max_hours_per_week {
                let subject_name = &catalog.subjects[&q.subject_id].name;
                findings.error(format!(
                    "{} teaches {} hours of {}, over the quota of {}",
                    faculty.name, assigned, subject_name, q.max_hours_per_week
                ));
                findings.suggest(format!(
                    "Reassign {} hours of {} to other qualified faculty",
                    assigned - q.max_hours_per_week,
                    subject_name
                ));
                findings.suggest(format!("Hire faculty qualified for {}", subject_name));
                findings.suggest(format!(
                    "Raise the {} quota for {}",
                    subject_name, faculty.name
                ));
            }
        }

        // sessions taught without any qualification
        let unqualified = slots
            .iter()
            .filter(|s| s.faculty_id == faculty.id)
            .filter(|s| catalog.qualification(&faculty.id, &s.subject_id).is_none())
            .sorted();
        for slot in unqualified {
            let load = subjects
                .entry(slot.subject_id.clone())
                .or_insert(SubjectLoad { assigned: 0, max: 0 });
            load.assigned += 1;
            findings.error(format!(
                "{} is not qualified for {} ({} {})",
                faculty.name, slot.subject_id, slot.day, slot.time
            ));
            findings.suggest(format!(
                "Reassign the {} {} session to qualified faculty or add a qualification",
                slot.day, slot.time
            ));
        }

        reports.insert(
            faculty.id.clone(),
            FacultyReport {
                findings,
                assigned_hours,
                hour_ceiling: ceiling,
                subjects,
            },
        );
    }
    reports
}

fn check_classrooms(
    slots: &[&Slot],
    tally: &Tally,
    catalog: &Catalog,
    capacity: u32,
) -> BTreeMap<ClassroomId, ClassroomReport> {
    let mut reports = BTreeMap::new();
    for room in catalog.classrooms.values().sorted_by(|a, b| a.id.cmp(&b.id)) {
        let mut findings = Findings::default();
        let usage = tally.room_usage.get(room.id.as_str()).copied().unwrap_or(0);

        if usage > capacity {
            findings.error(format!(
                "{} is used {} times, over its weekly capacity of {}",
                room.name, usage, capacity
            ));
            findings.suggest(format!("Redistribute sessions away from {}", room.name));
            findings.suggest(format!("Add more {} classrooms", room.kind));
            findings.suggest("Extend the daily teaching hours".to_string());
        }

        let mismatched = slots
            .iter()
            .filter(|s| s.classroom_id == room.id)
            .filter(|s| catalog.subjects[&s.subject_id].required_room_kind() != room.kind)
            .sorted();
        for slot in mismatched {
            let subject = &catalog.subjects[&slot.subject_id];
            findings.error(format!(
                "{} needs a {} room but is in {} ({}) at {} {}",
                subject.name,
                subject.required_room_kind(),
                room.name,
                room.kind,
                slot.day,
                slot.time
            ));
            findings.suggest(format!(
                "Move the {} {} session of {} to a {} classroom",
                slot.day,
                slot.time,
                subject.name,
                subject.required_room_kind()
            ));
        }

        reports.insert(
            room.id.clone(),
            ClassroomReport {
                findings,
                kind: room.kind,
                usage,
                weekly_capacity: capacity,
            },
        );
    }
    reports
}

/// Cells where the keyed entity holds more than one session.
fn clashes<'a>(
    slots: &[&'a Slot],
    key: fn(&Slot) -> &str,
) -> BTreeMap<(&'a str, &'a str, &'a str), usize> {
    slots
        .iter()
        .map(|&s| (key(s), s.day.as_str(), s.time.as_str()))
        .counts()
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .collect()
}

fn audit_double_bookings(slots: &[&Slot], report: &mut ValidationReport) {
    for ((id, day, time), n) in clashes(slots, |s| s.batch_id.as_str()) {
        if let Some(r) = report.batches.get_mut(id) {
            r.findings
                .error(format!("Batch double-booked at {} {} ({} sessions)", day, time, n));
            r.findings
                .suggest(format!("Move {} sessions out of {} {}", n - 1, day, time));
        }
    }
    for ((id, day, time), n) in clashes(slots, |s| s.faculty_id.as_str()) {
        if let Some(r) = report.faculty.get_mut(id) {
            r.findings
                .error(format!("Faculty double-booked at {} {} ({} sessions)", day, time, n));
            r.findings.suggest(format!(
                "Reassign {} of the {} {} sessions to other faculty",
                n - 1,
                day,
                time
            ));
        }
    }
    for ((id, day, time), n) in clashes(slots, |s| s.classroom_id.as_str()) {
        if let Some(r) = report.classrooms.get_mut(id) {
            r.findings
                .error(format!("Classroom double-booked at {} {} ({} sessions)", day, time, n));
            r.findings.suggest(format!(
                "Move {} of the {} {} sessions to another room",
                n - 1,
                day,
                time
            ));
        }
    }
}
