use crate::catalog::Catalog;
use crate::config::SchedulerSettings;
use crate::data::{Classroom, Qualification, Slot, Subject};
use log::{debug, info, trace};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

// (day index, time index)
type Cell = (usize, usize);

/// One required weekly hour of a subject for a batch.
struct Task<'a> {
    batch_id: &'a str,
    subject: &'a Subject,
}

/// Builds a weekly slot set by randomized greedy placement.
///
/// Every emitted slot respects the hard invariants: no batch, faculty member
/// or classroom is used twice in one cell, the faculty member is qualified
/// for the subject, and the room kind matches. Faculty-subject hour caps are
/// also honoured. A session that finds no valid cell within the retry budget
/// is dropped; shortfalls show up in the validation report, not here.
pub fn generate<R: Rng + ?Sized>(
    catalog: &Catalog,
    settings: &SchedulerSettings,
    rng: &mut R,
) -> Vec<Slot> {
    let start_time = Instant::now();
    let calendar = &settings.calendar;

    // per-batch task lists, each shuffled independently
    let mut tasks: Vec<Task> = Vec::new();
    for batch in catalog.sorted_batches() {
        let mut batch_tasks: Vec<Task> = catalog
            .curriculum(batch)
            .into_iter()
            .flat_map(|subject| {
                (0..subject.weekly_hours).map(move |_| Task {
                    batch_id: &batch.id,
                    subject,
                })
            })
            .collect();
        batch_tasks.shuffle(rng);
        tasks.extend(batch_tasks);
    }
    info!(
        "Placing {} sessions for {} batches on a {}x{} calendar...",
        tasks.len(),
        catalog.batches.len(),
        calendar.days.len(),
        calendar.times.len()
    );

    // lookups
    let mut qualified: HashMap<&str, Vec<&Qualification>> = HashMap::new();
    let mut rooms: HashMap<&str, Vec<&Classroom>> = HashMap::new();
    for subject in catalog.subjects.values() {
        qualified.insert(subject.id.as_str(), catalog.qualified_for(&subject.id));
        rooms.insert(
            subject.id.as_str(),
            catalog.classrooms_of_kind(subject.required_room_kind()),
        );
    }

    let mut batch_busy: HashSet<(Cell, &str)> = HashSet::new();
    let mut faculty_busy: HashSet<(Cell, &str)> = HashSet::new();
    let mut room_busy: HashSet<(Cell, &str)> = HashSet::new();
    let mut faculty_subject_hours: HashMap<(&str, &str), u32> = HashMap::new();

    let mut slots = Vec::new();
    let mut dropped = 0usize;

    for task in &tasks {
        let subject: &Subject = task.subject;
        let subject_id = subject.id.as_str();
        let candidates = qualified.get(subject_id).map(Vec::as_slice).unwrap_or(&[]);
        let matching_rooms = rooms.get(subject_id).map(Vec::as_slice).unwrap_or(&[]);

        let mut placed = false;
        for attempt in 0..settings.retry_budget {
            let cell = (
                rng.random_range(0..calendar.days.len()),
                rng.random_range(0..calendar.times.len()),
            );
            if batch_busy.contains(&(cell, task.batch_id)) {
                continue;
            }

            let free_faculty: Vec<&Qualification> = candidates
                .iter()
                .filter(|q| !faculty_busy.contains(&(cell, q.faculty_id.as_str())))
                .filter(|q| {
                    let taught = faculty_subject_hours
                        .get(&(q.faculty_id.as_str(), subject_id))
                        .copied()
                        .unwrap_or(0);
                    taught < q.max_hours_per_week
                })
                .copied()
                .collect();
            let Some(&qualification) = free_faculty.choose(rng) else {
                trace!(
                    "Attempt {} for {}/{}: no free faculty at {:?}.",
                    attempt, task.batch_id, subject_id, cell
                );
                continue;
            };

            let free_rooms: Vec<&Classroom> = matching_rooms
                .iter()
                .filter(|r| !room_busy.contains(&(cell, r.id.as_str())))
                .copied()
                .collect();
            let Some(&room) = free_rooms.choose(rng) else {
                trace!(
                    "Attempt {} for {}/{}: no free {} room at {:?}.",
                    attempt,
                    task.batch_id,
                    subject_id,
                    subject.required_room_kind(),
                    cell
                );
                continue;
            };

            let faculty_id = qualification.faculty_id.as_str();
            batch_busy.insert((cell, task.batch_id));
            faculty_busy.insert((cell, faculty_id));
            room_busy.insert((cell, room.id.as_str()));
            *faculty_subject_hours.entry((faculty_id, subject_id)).or_insert(0) += 1;

            slots.push(Slot {
                day: calendar.days[cell.0].clone(),
                time: calendar.times[cell.1].clone(),
                classroom_id: room.id.clone(),
                subject_id: subject_id.to_string(),
                faculty_id: faculty_id.to_string(),
                batch_id: task.batch_id.to_string(),
            });
            placed = true;
            break;
        }

        if !placed {
            dropped += 1;
            debug!(
                "Dropped a {} session for batch {} after {} attempts.",
                subject_id, task.batch_id, settings.retry_budget
            );
        }
    }

    info!(
        "Placed {} of {} sessions ({} dropped) in {:.2?}",
        slots.len(),
        tasks.len(),
        dropped,
        start_time.elapsed()
    );
    slots.sort();
    slots
}
