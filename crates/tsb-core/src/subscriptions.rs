//! Subscriber subscriptions and the legacy comma-joined id encoding.

use std::collections::HashSet;

use crate::domain::{ChatId, ScheduleId, ScheduleType};

/// Typed subscription set of one chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub chat_id: ChatId,
    pub schedules: HashSet<ScheduleId>,
}

impl Subscription {
    pub fn new(chat_id: ChatId, schedules: impl IntoIterator<Item = ScheduleId>) -> Self {
        Self {
            chat_id,
            schedules: schedules.into_iter().collect(),
        }
    }

    /// Build from the legacy row layout: three comma-joined id strings.
    pub fn from_legacy(
        chat_id: ChatId,
        group_ids: Option<&str>,
        teacher_ids: Option<&str>,
        place_ids: Option<&str>,
    ) -> Self {
        let mut schedules = HashSet::new();
        for (kind, raw) in [
            (ScheduleType::Group, group_ids),
            (ScheduleType::Teacher, teacher_ids),
            (ScheduleType::Place, place_ids),
        ] {
            schedules.extend(
                parse_legacy_ids(raw)
                    .into_iter()
                    .map(|id| ScheduleId::new(kind, id)),
            );
        }
        Self { chat_id, schedules }
    }

    pub fn contains(&self, id: &ScheduleId) -> bool {
        self.schedules.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

/// Parse `"12,abc,,7"` into `[12, 7]`.
///
/// Tokens that are not plain decimal digits are discarded.
pub fn parse_legacy_ids(raw: Option<&str>) -> Vec<i64> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids_and_drops_garbage() {
        assert_eq!(
            parse_legacy_ids(Some("12,abc,,7, 9 ,-3,4x")),
            vec![12, 7, 9]
        );
        assert!(parse_legacy_ids(Some("")).is_empty());
        assert!(parse_legacy_ids(None).is_empty());
    }

    #[test]
    fn legacy_row_becomes_typed_set() {
        let sub = Subscription::from_legacy(ChatId(5), Some("1,2"), Some("2"), None);
        assert_eq!(sub.schedules.len(), 3);
        assert!(sub.contains(&ScheduleId::group(2)));
        assert!(sub.contains(&ScheduleId::teacher(2)));
        assert!(!sub.contains(&ScheduleId::place(2)));
    }
}
