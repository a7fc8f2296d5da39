//! In-memory catalog of the static scheduling entities.
//!
//! Loaded fresh from the store at the start of every pipeline run and passed
//! by reference into the generator, validator and projector.

use itertools::Itertools;
use log::{info, warn};
use std::collections::HashMap;

use crate::data::{
    Batch, BatchId, Classroom, ClassroomId, FacultyId, Qualification, RoomKind, Subject,
    SubjectId, User,
};
use crate::error::TimetableError;
use crate::store::TimetableStore;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub faculty: HashMap<FacultyId, User>,
    pub classrooms: HashMap<ClassroomId, Classroom>,
    pub subjects: HashMap<SubjectId, Subject>,
    pub batches: HashMap<BatchId, Batch>,
    pub qualifications: HashMap<FacultyId, Vec<Qualification>>,
}

impl Catalog {
    /// Read every catalog table from the store.
    ///
    /// Any failed read aborts the load; no partial catalog is returned.
    pub fn load(store: &dyn TimetableStore) -> Result<Self, TimetableError> {
        let users = store.users()?;
        let classrooms = store.classrooms()?;
        let subjects = store.subjects()?;
        let batches = store.batches()?;
        let qualifications = store.qualifications()?;

        let catalog = Self::from_parts(users, classrooms, subjects, batches, qualifications);
        info!(
            "Loaded catalog: {} faculty, {} classrooms, {} subjects, {} batches.",
            catalog.faculty.len(),
            catalog.classrooms.len(),
            catalog.subjects.len(),
            catalog.batches.len()
        );
        Ok(catalog)
    }

    /// Index raw records by id. Non-faculty users and qualifications that
    /// point at unknown faculty or subjects are dropped.
    pub fn from_parts(
        users: Vec<User>,
        classrooms: Vec<Classroom>,
        subjects: Vec<Subject>,
        batches: Vec<Batch>,
        qualifications: Vec<Qualification>,
    ) -> Self {
        let faculty: HashMap<FacultyId, User> = users
            .into_iter()
            .filter(User::is_faculty)
            .map(|u| (u.id.clone(), u))
            .collect();
        let subjects: HashMap<SubjectId, Subject> =
            subjects.into_iter().map(|s| (s.id.clone(), s)).collect();

        let qualifications = qualifications
            .into_iter()
            .filter(|q| {
                let known = faculty.contains_key(&q.faculty_id)
                    && subjects.contains_key(&q.subject_id);
                if !known {
                    warn!(
                        "Skipping qualification {} -> {}: unknown faculty or subject.",
                        q.faculty_id, q.subject_id
                    );
                }
                known
            })
            .map(|q| (q.faculty_id.clone(), q))
            .into_group_map();

        Self {
            faculty,
            classrooms: classrooms.into_iter().map(|c| (c.id.clone(), c)).collect(),
            subjects,
            batches: batches.into_iter().map(|b| (b.id.clone(), b)).collect(),
            qualifications,
        }
    }

    /// Subjects owned by the batch's department, ordered by id.
    pub fn curriculum(&self, batch: &Batch) -> Vec<&Subject> {
        self.subjects
            .values()
            .filter(|s| s.department == batch.department)
            .sorted_by(|a, b| a.id.cmp(&b.id))
            .collect()
    }

    /// Qualifications for a subject across all faculty, ordered by faculty id.
    pub fn qualified_for(&self, subject_id: &str) -> Vec<&Qualification> {
        self.qualifications
            .values()
            .flatten()
            .filter(|q| q.subject_id == subject_id)
            .sorted_by(|a, b| a.faculty_id.cmp(&b.faculty_id))
            .collect()
    }

    pub fn qualification(&self, faculty_id: &str, subject_id: &str) -> Option<&Qualification> {
        self.qualifications
            .get(faculty_id)?
            .iter()
            .find(|q| q.subject_id == subject_id)
    }

    /// Classrooms of the given kind, ordered by id.
    pub fn classrooms_of_kind(&self, kind: RoomKind) -> Vec<&Classroom> {
        self.classrooms
            .values()
            .filter(|c| c.kind == kind)
            .sorted_by(|a, b| a.id.cmp(&b.id))
            .collect()
    }

    pub fn sorted_batches(&self) -> Vec<&Batch> {
        self.batches.values().sorted_by(|a, b| a.id.cmp(&b.id)).collect()
    }
}
