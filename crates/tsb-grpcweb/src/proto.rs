//! Protobuf messages of `rtu.schedule.api.PersonalScheduleService`.
//!
//! Hand-written prost derives; only the fields the sync pipeline reads are
//! declared, unknown fields are skipped by the decoder.

use prost_types::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ScheduleType {
    Unspecified = 0,
    Group = 1,
    Teacher = 2,
    Place = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WeekParity {
    Unknown = 0,
    Even = 1,
    Odd = 2,
    Weekly = 3,
}

/// `google.type.DayOfWeek`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DayOfWeek {
    Unspecified = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum UpdateSubscribedSchedulesState {
    Unspecified = 0,
    Ok = 1,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ScheduleId {
    #[prost(enumeration = "ScheduleType", tag = "1")]
    pub schedule_type: i32,
    #[prost(int64, tag = "2")]
    pub schedule_id: i64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetSubscribedSchedulesRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubscribedSchedule {
    #[prost(message, optional, tag = "1")]
    pub schedule_id: Option<ScheduleId>,
    #[prost(string, tag = "2")]
    pub long_title: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSubscribedSchedulesResponse {
    #[prost(message, repeated, tag = "1")]
    pub schedules: Vec<SubscribedSchedule>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateSubscribedSchedulesRequest {
    #[prost(message, repeated, tag = "1")]
    pub schedule_id: Vec<ScheduleId>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct UpdateSubscribedSchedulesResponse {
    #[prost(enumeration = "UpdateSubscribedSchedulesState", tag = "1")]
    pub state: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetPersonalScheduleUpdatesRequest {
    #[prost(message, optional, tag = "1")]
    pub schedule_id: Option<ScheduleId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetPersonalScheduleUpdatesResponse {
    #[prost(oneof = "personal_schedule_updates::Outcome", tags = "1, 2")]
    pub outcome: Option<personal_schedule_updates::Outcome>,
}

pub mod personal_schedule_updates {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Outcome {
        #[prost(message, tag = "1")]
        Exists(super::ScheduleDiff),
        #[prost(message, tag = "2")]
        NotExists(super::NoUpdates),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct NoUpdates {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScheduleDiff {
    #[prost(int64, tag = "1")]
    pub snapshot_id: i64,
    #[prost(message, optional, tag = "2")]
    pub previous_time: Option<Timestamp>,
    #[prost(message, optional, tag = "3")]
    pub current_time: Option<Timestamp>,
    #[prost(message, repeated, tag = "4")]
    pub timetable_diff: Vec<TimetableDiff>,
    #[prost(message, repeated, tag = "5")]
    pub event_diff: Vec<EventDiff>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimetableDiff {
    #[prost(message, optional, tag = "1")]
    pub time_slot: Option<TimeSlot>,
    #[prost(message, repeated, tag = "2")]
    pub cells: Vec<CellDiff>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct TimeSlot {
    #[prost(enumeration = "DayOfWeek", tag = "1")]
    pub day_of_week: i32,
    #[prost(int32, tag = "2")]
    pub number_in_day: i32,
    #[prost(enumeration = "WeekParity", tag = "3")]
    pub week_parity: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CellDiff {
    #[prost(message, optional, tag = "1")]
    pub previous: Option<Lesson>,
    #[prost(message, optional, tag = "2")]
    pub current: Option<Lesson>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LessonType {
    #[prost(string, tag = "1")]
    pub value: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeDetails {
    #[prost(int32, repeated, tag = "1")]
    pub weeks_include: Vec<i32>,
    #[prost(int32, repeated, tag = "2")]
    pub weeks_exclude: Vec<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Lesson {
    #[prost(string, tag = "1")]
    pub discipline: String,
    #[prost(message, optional, tag = "2")]
    pub lesson_type: Option<LessonType>,
    #[prost(string, repeated, tag = "3")]
    pub groups: Vec<String>,
    #[prost(string, repeated, tag = "4")]
    pub teachers: Vec<String>,
    #[prost(string, repeated, tag = "5")]
    pub auditoriums: Vec<String>,
    #[prost(message, optional, tag = "8")]
    pub time_details: Option<TimeDetails>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventDiff {
    #[prost(message, optional, tag = "1")]
    pub time_slot: Option<EventTimeSlot>,
    #[prost(message, repeated, tag = "2")]
    pub diff: Vec<EventCellDiff>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventTimeSlot {
    #[prost(message, optional, tag = "1")]
    pub start: Option<Timestamp>,
    #[prost(message, optional, tag = "2")]
    pub end: Option<Timestamp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventCellDiff {
    #[prost(message, optional, tag = "1")]
    pub previous: Option<Event>,
    #[prost(message, optional, tag = "2")]
    pub current: Option<Event>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Event {
    #[prost(string, tag = "1")]
    pub discipline: String,
    #[prost(string, tag = "2")]
    pub lesson_type: String,
    #[prost(string, repeated, tag = "3")]
    pub groups: Vec<String>,
    #[prost(string, repeated, tag = "4")]
    pub teachers: Vec<String>,
    #[prost(string, repeated, tag = "5")]
    pub auditoriums: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AcceptScheduleUpdatesRequest {
    #[prost(message, optional, tag = "1")]
    pub schedule_id: Option<ScheduleId>,
    #[prost(int64, tag = "2")]
    pub snapshot_id: i64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AcceptScheduleUpdatesResponse {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetScheduleTitleRequest {
    #[prost(message, optional, tag = "1")]
    pub schedule_id: Option<ScheduleId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetScheduleTitleResponse {
    #[prost(string, tag = "1")]
    pub title: String,
}
