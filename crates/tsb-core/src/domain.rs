use std::fmt;

/// Messenger chat id (numeric). Telegram and MAX both use 64-bit ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

/// Messenger message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

/// A stable reference to a delivered message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Version of the remote dataset (or of one schedule's diff).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId(pub i64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of schedule entity published by the remote service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScheduleType {
    Group,
    Teacher,
    Place,
}

impl ScheduleType {
    pub const ALL: [ScheduleType; 3] = [Self::Group, Self::Teacher, Self::Place];

    /// Numeric code used on the wire.
    pub fn code(self) -> i32 {
        match self {
            Self::Group => 1,
            Self::Teacher => 2,
            Self::Place => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Group),
            2 => Some(Self::Teacher),
            3 => Some(Self::Place),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Teacher => "teacher",
            Self::Place => "place",
        }
    }
}

/// Composite key of one remote schedule: `(type, numeric id)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleId {
    pub kind: ScheduleType,
    pub id: i64,
}

impl ScheduleId {
    pub fn new(kind: ScheduleType, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn group(id: i64) -> Self {
        Self::new(ScheduleType::Group, id)
    }

    pub fn teacher(id: i64) -> Self {
        Self::new(ScheduleType::Teacher, id)
    }

    pub fn place(id: i64) -> Self {
        Self::new(ScheduleType::Place, id)
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}
