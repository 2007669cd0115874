//! Protocol-independent change records produced by one polling cycle.

use chrono::{DateTime, Utc, Weekday};

use crate::domain::{ScheduleId, SnapshotId};

/// Classification of one cell transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    /// Neither side present. The remote service should never send this.
    Unknown,
}

impl ChangeType {
    /// Pure function of which sides of a transition are present.
    pub fn derive(previous_present: bool, current_present: bool) -> Self {
        match (previous_present, current_present) {
            (false, true) => Self::Added,
            (true, false) => Self::Removed,
            (true, true) => Self::Modified,
            (false, false) => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Removed => "REMOVED",
            Self::Modified => "MODIFIED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Week parity of a recurring timetable slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WeekParity {
    Even,
    Odd,
    Weekly,
    Unknown,
}

/// Recurring slot of a timetable diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    pub day_of_week: Option<Weekday>,
    pub number_in_day: u32,
    pub week_parity: WeekParity,
}

/// Absolute time range of an event diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Which weeks of the term a recurring lesson applies to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Recurrence {
    pub weeks_include: Vec<u32>,
    pub weeks_exclude: Vec<u32>,
}

impl Recurrence {
    pub fn is_empty(&self) -> bool {
        self.weeks_include.is_empty() && self.weeks_exclude.is_empty()
    }
}

/// One side of a cell transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LessonSnapshot {
    pub discipline: String,
    pub lesson_type: Option<String>,
    pub groups: Vec<String>,
    pub teachers: Vec<String>,
    pub auditoriums: Vec<String>,
    pub recurrence: Option<Recurrence>,
}

/// Before/after pair for one cell of a diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub previous: Option<LessonSnapshot>,
    pub current: Option<LessonSnapshot>,
    pub change_type: ChangeType,
}

impl Transition {
    pub fn new(previous: Option<LessonSnapshot>, current: Option<LessonSnapshot>) -> Self {
        let change_type = ChangeType::derive(previous.is_some(), current.is_some());
        Self {
            previous,
            current,
            change_type,
        }
    }
}

/// Where a diff record sits in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffKey {
    Timetable(TimeSlot),
    Event(TimeRange),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffRecord {
    pub schedule_id: ScheduleId,
    pub title: String,
    pub snapshot_id: SnapshotId,
    pub key: DiffKey,
    pub transitions: Vec<Transition>,
}

impl DiffRecord {
    pub fn is_event(&self) -> bool {
        matches!(self.key, DiffKey::Event(_))
    }

    pub fn anomalies(&self) -> usize {
        self.transitions
            .iter()
            .filter(|t| t.change_type == ChangeType::Unknown)
            .count()
    }
}

/// Everything one schedule reported for a single snapshot.
///
/// Fan-out renders `records`; the acknowledgment step confirms `snapshot_id`.
/// Both read the same value so an ack always matches what was shown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleUpdate {
    pub schedule_id: ScheduleId,
    pub title: String,
    pub snapshot_id: SnapshotId,
    pub previous_time: Option<DateTime<Utc>>,
    pub current_time: Option<DateTime<Utc>>,
    pub records: Vec<DiffRecord>,
}
