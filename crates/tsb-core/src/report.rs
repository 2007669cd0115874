//! Deterministic HTML rendering of schedule change reports.

use chrono::{DateTime, FixedOffset, Utc, Weekday};

use crate::{
    diff::{
        ChangeType, DiffKey, DiffRecord, LessonSnapshot, ScheduleUpdate, TimeRange, TimeSlot,
        WeekParity,
    },
    domain::ScheduleType,
    formatting::escape_html,
};

const REPORT_HEADER: &str = "🔔 <b>Изменения в расписании</b>";

/// Render the report for one subscriber.
///
/// `updates` must already be filtered to the subscriber's schedules. Output
/// order depends only on the input: schedules by id, timetable records by
/// slot, then event records by start time.
pub fn render_report(updates: &[&ScheduleUpdate], tz: FixedOffset) -> String {
    let mut sorted: Vec<&ScheduleUpdate> = updates
        .iter()
        .copied()
        .filter(|u| !u.records.is_empty())
        .collect();
    sorted.sort_by_key(|u| u.schedule_id);

    let mut lines = vec![REPORT_HEADER.to_string()];
    for update in sorted {
        lines.push(String::new());
        lines.push(format!(
            "{} <b>{}</b>",
            schedule_emoji(update.schedule_id.kind),
            escape_html(&update.title)
        ));

        let mut timetable: Vec<(&TimeSlot, &DiffRecord)> = Vec::new();
        let mut events: Vec<(&TimeRange, &DiffRecord)> = Vec::new();
        for rec in &update.records {
            match &rec.key {
                DiffKey::Timetable(slot) => timetable.push((slot, rec)),
                DiffKey::Event(range) => events.push((range, rec)),
            }
        }
        timetable.sort_by_key(|(slot, _)| slot_sort_key(slot));
        events.sort_by_key(|(range, _)| (range.start, range.end));

        for (slot, rec) in timetable {
            lines.push(format!("<b>{}</b>", format_slot(slot)));
            render_transitions(&mut lines, rec);
        }
        for (range, rec) in events {
            lines.push(format!("<b>📅 {}</b>", format_range(range, tz)));
            render_transitions(&mut lines, rec);
        }
    }

    lines.join("\n")
}

fn render_transitions(lines: &mut Vec<String>, rec: &DiffRecord) {
    for t in &rec.transitions {
        lines.push(format!("<b>{}</b>", change_marker(t.change_type)));
        match (&t.previous, &t.current) {
            (_, Some(cur)) => {
                lines.extend(lesson_lines(cur));
                if let Some(prev) = &t.previous {
                    if let Some(was) = previous_summary(prev, cur) {
                        lines.push(was);
                    }
                }
            }
            (Some(prev), None) => lines.extend(lesson_lines(prev)),
            (None, None) => {}
        }
    }
}

pub fn change_marker(change: ChangeType) -> &'static str {
    match change {
        ChangeType::Added => "➕ Добавлено:",
        ChangeType::Removed => "➖ Убрано:",
        ChangeType::Modified => "✏️ Изменено:",
        ChangeType::Unknown => "❔ Неизвестное изменение",
    }
}

fn schedule_emoji(kind: ScheduleType) -> &'static str {
    match kind {
        ScheduleType::Group => "👥",
        ScheduleType::Teacher => "👨‍🏫",
        ScheduleType::Place => "🏫",
    }
}

fn lesson_lines(lesson: &LessonSnapshot) -> Vec<String> {
    let mut out = Vec::new();
    if !lesson.discipline.is_empty() {
        out.push(format!("📚 {}", discipline_with_type(lesson)));
    }
    if !lesson.groups.is_empty() {
        out.push(format!("👥 Группа: {}", join_escaped(&lesson.groups)));
    }
    if !lesson.teachers.is_empty() {
        out.push(format!("👨‍🏫 {}", join_escaped(&lesson.teachers)));
    }
    if !lesson.auditoriums.is_empty() {
        out.push(format!("🏫 {}", join_escaped(&lesson.auditoriums)));
    }
    if let Some(rec) = lesson.recurrence.as_ref().filter(|r| !r.is_empty()) {
        let mut weeks = String::new();
        if !rec.weeks_include.is_empty() {
            weeks.push_str(&format!("недели {}", join_numbers(&rec.weeks_include)));
        }
        if !rec.weeks_exclude.is_empty() {
            if !weeks.is_empty() {
                weeks.push_str("; ");
            }
            weeks.push_str(&format!("кроме {}", join_numbers(&rec.weeks_exclude)));
        }
        out.push(format!("🗓 {weeks}"));
    }
    out
}

fn previous_summary(prev: &LessonSnapshot, cur: &LessonSnapshot) -> Option<String> {
    if prev.discipline == cur.discipline && prev.lesson_type == cur.lesson_type {
        return None;
    }
    if prev.discipline.is_empty() {
        return None;
    }
    Some(format!("↩️ Было: {}", discipline_with_type(prev)))
}

fn discipline_with_type(lesson: &LessonSnapshot) -> String {
    match lesson.lesson_type.as_deref().filter(|t| !t.is_empty()) {
        Some(t) => format!("{} ({})", escape_html(&lesson.discipline), escape_html(t)),
        None => escape_html(&lesson.discipline),
    }
}

fn join_escaped(items: &[String]) -> String {
    items
        .iter()
        .map(|s| escape_html(s))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_numbers(items: &[u32]) -> String {
    items
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn slot_sort_key(slot: &TimeSlot) -> (u32, u32, WeekParity) {
    let day = slot
        .day_of_week
        .map(|d| d.number_from_monday())
        .unwrap_or(u32::MAX);
    (day, slot.number_in_day, slot.week_parity)
}

fn format_slot(slot: &TimeSlot) -> String {
    let pair = format!(
        "{} пара ({})",
        slot.number_in_day,
        week_parity_label(slot.week_parity)
    );
    match slot.day_of_week {
        Some(day) => format!("{}, {pair}", weekday_name(day)),
        None => pair,
    }
}

pub fn week_parity_label(parity: WeekParity) -> &'static str {
    match parity {
        WeekParity::Even => "чётная неделя",
        WeekParity::Odd => "нечётная неделя",
        WeekParity::Weekly => "еженедельно",
        WeekParity::Unknown => "неизвестно",
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Понедельник",
        Weekday::Tue => "Вторник",
        Weekday::Wed => "Среда",
        Weekday::Thu => "Четверг",
        Weekday::Fri => "Пятница",
        Weekday::Sat => "Суббота",
        Weekday::Sun => "Воскресенье",
    }
}

fn format_range(range: &TimeRange, tz: FixedOffset) -> String {
    let local = |t: DateTime<Utc>| t.with_timezone(&tz);
    match (range.start, range.end) {
        (Some(s), Some(e)) => {
            let (s, e) = (local(s), local(e));
            if s.date_naive() == e.date_naive() {
                format!("{}–{}", s.format("%d.%m.%Y %H:%M"), e.format("%H:%M"))
            } else {
                format!(
                    "{} – {}",
                    s.format("%d.%m.%Y %H:%M"),
                    e.format("%d.%m.%Y %H:%M")
                )
            }
        }
        (Some(s), None) => format!("с {}", local(s).format("%d.%m.%Y %H:%M")),
        (None, Some(e)) => format!("до {}", local(e).format("%d.%m.%Y %H:%M")),
        (None, None) => "время не указано".to_string(),
    }
}
