use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type FacultyId = String;
pub type ClassroomId = String;
pub type SubjectId = String;
pub type BatchId = String;
pub type SlotId = String;

/// Role tag a user must carry to be schedulable as faculty.
pub const FACULTY_ROLE: &str = "faculty";

/// Any user record held by the store; only `faculty` users are scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: FacultyId,
    pub name: String,
    pub role: String,
}

impl User {
    pub fn is_faculty(&self) -> bool {
        self.role == FACULTY_ROLE
    }
}

/// Kind of room a session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Lecture,
    Lab,
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKind::Lecture => write!(f, "lecture"),
            RoomKind::Lab => write!(f, "lab"),
        }
    }
}

/// Represents a physical classroom with a given capacity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Classroom {
    pub id: ClassroomId,
    pub name: String,
    pub capacity: u32,
    #[serde(rename = "type")]
    pub kind: RoomKind,
}

/// A subject taught to every batch of the owning department.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub credits: u32,
    pub weekly_hours: u32,
    pub department: String,
    /// Explicit room requirement. Inferred from the name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_kind: Option<RoomKind>,
}

impl Subject {
    /// The room kind this subject must be taught in.
    pub fn required_room_kind(&self) -> RoomKind {
        self.room_kind.unwrap_or_else(|| {
            if self.name.to_lowercase().contains("lab") {
                RoomKind::Lab
            } else {
                RoomKind::Lecture
            }
        })
    }
}

/// A cohort of students following one department's curriculum.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Batch {
    pub id: BatchId,
    pub name: String,
    pub size: u32,
    pub department: String,
}

/// Authorises a faculty member to teach a subject, up to a weekly hour cap.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Qualification {
    pub faculty_id: FacultyId,
    pub subject_id: SubjectId,
    pub max_hours_per_week: u32,
    #[serde(default)]
    pub avg_leaves_per_month: u32,
}

/// One scheduled session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Slot {
    pub day: String,
    pub time: String,
    pub classroom_id: ClassroomId,
    pub subject_id: SubjectId,
    pub faculty_id: FacultyId,
    pub batch_id: BatchId,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: subject {} for batch {} by {} in {}",
            self.day, self.time, self.subject_id, self.batch_id, self.faculty_id, self.classroom_id
        )
    }
}

/// A slot as persisted by the store, with its record id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredSlot {
    pub id: SlotId,
    #[serde(flatten)]
    pub slot: Slot,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(name: &str, room_kind: Option<RoomKind>) -> Subject {
        Subject {
            id: "S1".into(),
            name: name.into(),
            credits: 3,
            weekly_hours: 2,
            department: "Mechanical".into(),
            room_kind,
        }
    }

    #[test]
    fn test_room_kind_inferred_from_name() {
        assert_eq!(subject("Thermodynamics", None).required_room_kind(), RoomKind::Lecture);
        assert_eq!(subject("Fluids Lab", None).required_room_kind(), RoomKind::Lab);
        assert_eq!(subject("LABORATORY Practice", None).required_room_kind(), RoomKind::Lab);
    }

    #[test]
    fn test_explicit_room_kind_wins() {
        let s = subject("Workshop", Some(RoomKind::Lab));
        assert_eq!(s.required_room_kind(), RoomKind::Lab);
        let s = subject("Lab Safety Theory", Some(RoomKind::Lecture));
        assert_eq!(s.required_room_kind(), RoomKind::Lecture);
    }

    #[test]
    fn test_classroom_kind_uses_type_key() {
        let json = r#"{"id":"C3","name":"SPS3","capacity":50,"type":"lab"}"#;
        let room: Classroom = serde_json::from_str(json).unwrap();
        assert_eq!(room.kind, RoomKind::Lab);
    }

    #[test]
    fn test_stored_slot_is_flat() {
        let stored = StoredSlot {
            id: "slot_1".into(),
            slot: Slot {
                day: "Monday".into(),
                time: "09:00-10:00".into(),
                classroom_id: "C1".into(),
                subject_id: "S1".into(),
                faculty_id: "T1".into(),
                batch_id: "B1".into(),
            },
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["id"], "slot_1");
        assert_eq!(value["classroom_id"], "C1");
    }
}
