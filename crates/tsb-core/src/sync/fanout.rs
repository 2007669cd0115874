use std::sync::Arc;

use chrono::FixedOffset;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    diff::ScheduleUpdate,
    domain::ChatId,
    formatting::split_message,
    messaging::port::MessagingPort,
    report::render_report,
    subscriptions::Subscription,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub subscribers_matched: usize,
    pub messages_sent: usize,
    /// Subscribers whose delivery stopped early.
    pub failed_chats: Vec<ChatId>,
}

/// Delivers each subscriber the part of the cycle's diffs they subscribe to.
pub struct SubscriberFanout {
    messenger: Arc<dyn MessagingPort>,
    chunk_limit: usize,
    concurrency: usize,
    tz: FixedOffset,
}

impl SubscriberFanout {
    pub fn new(
        messenger: Arc<dyn MessagingPort>,
        chunk_limit: usize,
        concurrency: usize,
        tz: FixedOffset,
    ) -> Self {
        let chunk_limit = messenger.capabilities().chunk_limit(chunk_limit);
        Self {
            messenger,
            chunk_limit,
            concurrency: concurrency.max(1),
            tz,
        }
    }

    pub async fn deliver(
        &self,
        subscriptions: &[Subscription],
        updates: &[ScheduleUpdate],
    ) -> FanoutReport {
        let jobs: Vec<(ChatId, String)> = subscriptions
            .iter()
            .filter_map(|sub| {
                let relevant = relevant_updates(sub, updates);
                if relevant.is_empty() {
                    return None;
                }
                Some((sub.chat_id, render_report(&relevant, self.tz)))
            })
            .collect();

        let outcomes = stream::iter(jobs)
            .map(|(chat_id, text)| async move {
                let (sent, ok) = self.deliver_chunks(chat_id, &text).await;
                (chat_id, sent, ok)
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut report = FanoutReport {
            subscribers_matched: outcomes.len(),
            ..Default::default()
        };
        for (chat_id, sent, ok) in outcomes {
            report.messages_sent += sent;
            if !ok {
                report.failed_chats.push(chat_id);
            }
        }
        report.failed_chats.sort();

        info!(
            matched = report.subscribers_matched,
            sent = report.messages_sent,
            failed = report.failed_chats.len(),
            "fan-out finished"
        );
        report
    }

    /// Send chunks in order; the first failure abandons the rest.
    async fn deliver_chunks(&self, chat_id: ChatId, text: &str) -> (usize, bool) {
        let chunks = split_message(text, self.chunk_limit);
        let total = chunks.len();
        let mut sent = 0usize;

        for (i, chunk) in chunks.iter().enumerate() {
            if let Err(e) = self.messenger.send_html(chat_id, chunk).await {
                warn!(
                    chat_id = chat_id.0,
                    chunk = i + 1,
                    chunks = total,
                    error = %e,
                    "delivery failed, abandoning remaining chunks"
                );
                return (sent, false);
            }
            sent += 1;
        }

        debug!(chat_id = chat_id.0, chunks = total, "report delivered");
        (sent, true)
    }
}

/// Updates that concern `sub` and carry at least one record.
pub fn relevant_updates<'a>(
    sub: &Subscription,
    updates: &'a [ScheduleUpdate],
) -> Vec<&'a ScheduleUpdate> {
    updates
        .iter()
        .filter(|u| !u.records.is_empty() && sub.contains(&u.schedule_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diff::{DiffRecord, ScheduleUpdate},
        domain::ScheduleId,
        sync::testing::{lesson, update, FakeMessenger},
    };

    fn moscow() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn titled(mut u: ScheduleUpdate, title: &str) -> ScheduleUpdate {
        u.title = title.to_string();
        for rec in &mut u.records {
            rec.title = title.to_string();
        }
        u
    }

    #[test]
    fn filter_keeps_only_subscribed_nonempty_updates() {
        let sub = Subscription::new(ChatId(1), [ScheduleId::teacher(1), ScheduleId::group(2)]);
        let mut empty = update(ScheduleId::group(2), 3, None, Some(lesson("X")));
        empty.records.clear();
        let updates = vec![
            update(ScheduleId::teacher(1), 3, None, Some(lesson("X"))),
            empty,
            update(ScheduleId::place(9), 3, None, Some(lesson("Y"))),
        ];

        let ids: Vec<_> = relevant_updates(&sub, &updates)
            .into_iter()
            .map(|u| u.schedule_id)
            .collect();
        assert_eq!(ids, vec![ScheduleId::teacher(1)]);
    }

    #[tokio::test]
    async fn unmatched_subscriber_gets_nothing() {
        let messenger = Arc::new(FakeMessenger::default());
        let fanout = SubscriberFanout::new(messenger.clone(), 4000, 4, moscow());
        let subs = vec![
            Subscription::new(ChatId(1), [ScheduleId::teacher(1)]),
            Subscription::new(ChatId(2), [ScheduleId::group(5)]),
        ];
        let updates = vec![titled(
            update(ScheduleId::teacher(1), 6, None, Some(lesson("Calculus"))),
            "Иванов И.И.",
        )];

        let report = fanout.deliver(&subs, &updates).await;
        assert_eq!(report.subscribers_matched, 1);
        assert_eq!(messenger.sent_to(ChatId(1)).len(), 1);
        assert!(messenger.sent_to(ChatId(2)).is_empty());
        assert!(messenger.sent_to(ChatId(1))[0].contains("Иванов И.И."));
    }

    #[tokio::test]
    async fn long_report_is_chunked_in_order() {
        let messenger = Arc::new(FakeMessenger::default());
        let fanout = SubscriberFanout::new(messenger.clone(), 120, 1, moscow());
        let id = ScheduleId::group(1);
        let mut upd = titled(
            update(id, 2, None, Some(lesson("Предмет 0"))),
            "ИКБО-01-23",
        );
        let template: DiffRecord = upd.records[0].clone();
        for n in 1..10 {
            let mut rec = template.clone();
            if let crate::diff::DiffKey::Timetable(slot) = &mut rec.key {
                slot.number_in_day = n + 1;
            }
            rec.transitions[0].current = Some(lesson(&format!("Предмет {n}")));
            upd.records.push(rec);
        }
        let full = render_report(&[&upd], moscow());

        let report = fanout
            .deliver(&[Subscription::new(ChatId(7), [id])], &[upd])
            .await;
        let sent = messenger.sent_to(ChatId(7));
        assert!(sent.len() > 1);
        assert_eq!(report.messages_sent, sent.len());
        assert_eq!(sent.join("\n"), full);
        for chunk in &sent {
            assert!(chunk.chars().count() <= 120 || !chunk.contains('\n'));
        }
    }

    #[tokio::test]
    async fn failing_chat_does_not_affect_others() {
        let messenger = Arc::new(FakeMessenger::default());
        messenger.failing_chats.lock().unwrap().insert(ChatId(1));
        let fanout = SubscriberFanout::new(messenger.clone(), 4000, 4, moscow());
        let id = ScheduleId::teacher(1);
        let subs = vec![
            Subscription::new(ChatId(1), [id]),
            Subscription::new(ChatId(2), [id]),
        ];
        let updates = vec![update(id, 6, None, Some(lesson("Calculus")))];

        let report = fanout.deliver(&subs, &updates).await;
        assert_eq!(report.failed_chats, vec![ChatId(1)]);
        assert_eq!(report.messages_sent, 1);
        assert_eq!(messenger.sent_to(ChatId(2)).len(), 1);
    }

    #[tokio::test]
    async fn chunk_limit_is_capped_by_messenger() {
        let messenger = Arc::new(FakeMessenger {
            max_len: 50,
            ..Default::default()
        });
        let fanout = SubscriberFanout::new(messenger, 4000, 1, moscow());
        assert_eq!(fanout.chunk_limit, 50);
    }
}
