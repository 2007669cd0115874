//! Wire diffs → protocol-independent change records.

use chrono::{DateTime, Utc, Weekday};
use tsb_core::{
    diff::{
        DiffKey, DiffRecord, LessonSnapshot, Recurrence, ScheduleUpdate, TimeRange, TimeSlot,
        Transition, WeekParity,
    },
    domain::{ScheduleId, ScheduleType, SnapshotId},
    ports::SubscribedSchedule,
};

use crate::proto;

pub fn schedule_id_to_proto(id: &ScheduleId) -> proto::ScheduleId {
    proto::ScheduleId {
        schedule_type: id.kind.code(),
        schedule_id: id.id,
    }
}

/// `None` for an unspecified or unknown schedule type.
pub fn schedule_id_from_proto(id: &proto::ScheduleId) -> Option<ScheduleId> {
    ScheduleType::from_code(id.schedule_type).map(|kind| ScheduleId::new(kind, id.schedule_id))
}

/// Build the update for one schedule out of its wire diff.
pub fn normalize_diff(schedule: &SubscribedSchedule, diff: proto::ScheduleDiff) -> ScheduleUpdate {
    let snapshot_id = SnapshotId(diff.snapshot_id);
    let record = |key: DiffKey, transitions: Vec<Transition>| DiffRecord {
        schedule_id: schedule.schedule_id,
        title: schedule.title.clone(),
        snapshot_id,
        key,
        transitions,
    };

    let mut records = Vec::with_capacity(diff.timetable_diff.len() + diff.event_diff.len());
    for td in diff.timetable_diff {
        let slot = time_slot(td.time_slot.unwrap_or_default());
        let transitions = td
            .cells
            .into_iter()
            .map(|c| Transition::new(c.previous.map(lesson), c.current.map(lesson)))
            .collect();
        records.push(record(DiffKey::Timetable(slot), transitions));
    }
    for ed in diff.event_diff {
        let slot = ed.time_slot.unwrap_or_default();
        let range = TimeRange {
            start: slot.start.as_ref().and_then(timestamp),
            end: slot.end.as_ref().and_then(timestamp),
        };
        let transitions = ed
            .diff
            .into_iter()
            .map(|d| Transition::new(d.previous.map(event), d.current.map(event)))
            .collect();
        records.push(record(DiffKey::Event(range), transitions));
    }

    ScheduleUpdate {
        schedule_id: schedule.schedule_id,
        title: schedule.title.clone(),
        snapshot_id,
        previous_time: diff.previous_time.as_ref().and_then(timestamp),
        current_time: diff.current_time.as_ref().and_then(timestamp),
        records,
    }
}

fn time_slot(slot: proto::TimeSlot) -> TimeSlot {
    TimeSlot {
        day_of_week: weekday(slot.day_of_week),
        number_in_day: u32::try_from(slot.number_in_day).unwrap_or(0),
        week_parity: match proto::WeekParity::try_from(slot.week_parity) {
            Ok(proto::WeekParity::Even) => WeekParity::Even,
            Ok(proto::WeekParity::Odd) => WeekParity::Odd,
            Ok(proto::WeekParity::Weekly) => WeekParity::Weekly,
            Ok(proto::WeekParity::Unknown) | Err(_) => WeekParity::Unknown,
        },
    }
}

fn weekday(raw: i32) -> Option<Weekday> {
    match proto::DayOfWeek::try_from(raw).ok()? {
        proto::DayOfWeek::Monday => Some(Weekday::Mon),
        proto::DayOfWeek::Tuesday => Some(Weekday::Tue),
        proto::DayOfWeek::Wednesday => Some(Weekday::Wed),
        proto::DayOfWeek::Thursday => Some(Weekday::Thu),
        proto::DayOfWeek::Friday => Some(Weekday::Fri),
        proto::DayOfWeek::Saturday => Some(Weekday::Sat),
        proto::DayOfWeek::Sunday => Some(Weekday::Sun),
        proto::DayOfWeek::Unspecified => None,
    }
}

fn timestamp(ts: &prost_types::Timestamp) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts.seconds, u32::try_from(ts.nanos).unwrap_or(0))
}

fn lesson(l: proto::Lesson) -> LessonSnapshot {
    let recurrence = l
        .time_details
        .map(|td| Recurrence {
            weeks_include: weeks(td.weeks_include),
            weeks_exclude: weeks(td.weeks_exclude),
        })
        .filter(|r| !r.is_empty());

    LessonSnapshot {
        discipline: l.discipline,
        lesson_type: l.lesson_type.map(|t| t.value).filter(|v| !v.is_empty()),
        groups: l.groups,
        teachers: l.teachers,
        auditoriums: l.auditoriums,
        recurrence,
    }
}

fn event(e: proto::Event) -> LessonSnapshot {
    LessonSnapshot {
        discipline: e.discipline,
        lesson_type: Some(e.lesson_type).filter(|v| !v.is_empty()),
        groups: e.groups,
        teachers: e.teachers,
        auditoriums: e.auditoriums,
        recurrence: None,
    }
}

fn weeks(raw: Vec<i32>) -> Vec<u32> {
    raw.into_iter().filter_map(|w| u32::try_from(w).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsb_core::diff::ChangeType;

    fn schedule() -> SubscribedSchedule {
        SubscribedSchedule {
            schedule_id: ScheduleId::teacher(42),
            title: "Иванов И.И.".to_string(),
        }
    }

    fn wire_lesson(discipline: &str) -> proto::Lesson {
        proto::Lesson {
            discipline: discipline.to_string(),
            lesson_type: Some(proto::LessonType {
                value: "Практика".to_string(),
            }),
            groups: vec!["ИКБО-01-23".to_string()],
            teachers: vec!["Иванов И.И.".to_string()],
            auditoriums: vec!["А-101".to_string()],
            time_details: Some(proto::TimeDetails {
                weeks_include: vec![1, 3, 5],
                weeks_exclude: vec![],
            }),
        }
    }

    #[test]
    fn schedule_id_round_trips_through_wire_codes() {
        for id in [
            ScheduleId::group(1),
            ScheduleId::teacher(2),
            ScheduleId::place(3),
        ] {
            assert_eq!(schedule_id_from_proto(&schedule_id_to_proto(&id)), Some(id));
        }
        let unknown = proto::ScheduleId {
            schedule_type: 0,
            schedule_id: 7,
        };
        assert_eq!(schedule_id_from_proto(&unknown), None);
    }

    #[test]
    fn timetable_cells_become_transitions() {
        let diff = proto::ScheduleDiff {
            snapshot_id: 6,
            previous_time: None,
            current_time: Some(prost_types::Timestamp {
                seconds: 1_772_000_000,
                nanos: 0,
            }),
            timetable_diff: vec![proto::TimetableDiff {
                time_slot: Some(proto::TimeSlot {
                    day_of_week: proto::DayOfWeek::Tuesday as i32,
                    number_in_day: 2,
                    week_parity: proto::WeekParity::Odd as i32,
                }),
                cells: vec![
                    proto::CellDiff {
                        previous: Some(wire_lesson("Algebra")),
                        current: Some(wire_lesson("Calculus")),
                    },
                    proto::CellDiff {
                        previous: None,
                        current: Some(wire_lesson("Physics")),
                    },
                    proto::CellDiff {
                        previous: None,
                        current: None,
                    },
                ],
            }],
            event_diff: vec![],
        };

        let upd = normalize_diff(&schedule(), diff);
        assert_eq!(upd.snapshot_id, SnapshotId(6));
        assert!(upd.current_time.is_some());
        assert_eq!(upd.records.len(), 1);

        let rec = &upd.records[0];
        assert_eq!(rec.title, "Иванов И.И.");
        assert_eq!(
            rec.key,
            DiffKey::Timetable(TimeSlot {
                day_of_week: Some(Weekday::Tue),
                number_in_day: 2,
                week_parity: WeekParity::Odd,
            })
        );
        let kinds: Vec<_> = rec.transitions.iter().map(|t| t.change_type).collect();
        assert_eq!(
            kinds,
            vec![ChangeType::Modified, ChangeType::Added, ChangeType::Unknown]
        );
        assert_eq!(rec.anomalies(), 1);

        let cur = rec.transitions[0].current.as_ref().unwrap();
        assert_eq!(cur.discipline, "Calculus");
        assert_eq!(cur.lesson_type.as_deref(), Some("Практика"));
        assert_eq!(cur.recurrence.as_ref().unwrap().weeks_include, vec![1, 3, 5]);
    }

    #[test]
    fn event_diffs_keep_absolute_range() {
        let diff = proto::ScheduleDiff {
            snapshot_id: 9,
            event_diff: vec![proto::EventDiff {
                time_slot: Some(proto::EventTimeSlot {
                    start: Some(prost_types::Timestamp {
                        seconds: 1_773_300_000,
                        nanos: 0,
                    }),
                    end: Some(prost_types::Timestamp {
                        seconds: 1_773_305_400,
                        nanos: 0,
                    }),
                }),
                diff: vec![proto::EventCellDiff {
                    previous: Some(proto::Event {
                        discipline: "Экзамен".to_string(),
                        lesson_type: String::new(),
                        ..Default::default()
                    }),
                    current: None,
                }],
            }],
            ..Default::default()
        };

        let upd = normalize_diff(&schedule(), diff);
        let rec = &upd.records[0];
        assert!(rec.is_event());
        match rec.key {
            DiffKey::Event(range) => {
                let (start, end) = (range.start.unwrap(), range.end.unwrap());
                assert_eq!((end - start).num_minutes(), 90);
            }
            DiffKey::Timetable(_) => panic!("expected event key"),
        }
        let t = &rec.transitions[0];
        assert_eq!(t.change_type, ChangeType::Removed);
        assert_eq!(t.previous.as_ref().unwrap().lesson_type, None);
    }

    #[test]
    fn missing_slot_fields_degrade_to_unknown() {
        let diff = proto::ScheduleDiff {
            snapshot_id: 1,
            timetable_diff: vec![proto::TimetableDiff {
                time_slot: None,
                cells: vec![],
            }],
            ..Default::default()
        };
        let upd = normalize_diff(&schedule(), diff);
        assert_eq!(
            upd.records[0].key,
            DiffKey::Timetable(TimeSlot {
                day_of_week: None,
                number_in_day: 0,
                week_parity: WeekParity::Unknown,
            })
        );
    }
}
