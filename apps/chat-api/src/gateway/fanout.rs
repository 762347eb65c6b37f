//! Message ingest: fans a newly created message out to the members of its
//! channel.
//!
//! The membership lookup and the enqueue loop run under the index lock, so
//! publishes to one channel reach every member's queue in the order they were
//! called, and a channel switch cannot land halfway through a fan-out.
//! Enqueueing never waits: a full or closed queue loses the message for that
//! connection only.

use std::sync::Arc;

use chat_common::Message;

use super::membership::MembershipIndex;
use super::registry::{ConnectionRegistry, Delivery};

/// What a single publish did. Never an error for the publisher.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// Members of the channel when the fan-out ran.
    pub recipients: usize,
    /// Queued successfully.
    pub delivered: usize,
    /// Lost to full, closed or already-deregistered connections.
    pub dropped: usize,
}

/// Entry point for "message created" events. Cloneable via `Arc` internals.
#[derive(Clone)]
pub struct MessageIngest {
    index: Arc<MembershipIndex>,
    registry: Arc<ConnectionRegistry>,
}

impl MessageIngest {
    pub fn new(index: Arc<MembershipIndex>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { index, registry }
    }

    /// Called by the write path once a message has been persisted.
    pub fn notify_message_created(&self, message: Message) -> PublishReport {
        self.publish(message)
    }

    /// Enqueue `message` on the outbound queue of every current member of
    /// `message.channel_id`.
    pub fn publish(&self, message: Message) -> PublishReport {
        let message = Arc::new(message);

        let report = self.index.with_members(&message.channel_id, |members| {
            let mut report = PublishReport {
                recipients: members.len(),
                ..PublishReport::default()
            };
            for connection_id in members {
                match self.registry.try_deliver(connection_id, Arc::clone(&message)) {
                    Delivery::Queued => report.delivered += 1,
                    reason => {
                        report.dropped += 1;
                        tracing::debug!(
                            connection_id = %connection_id,
                            message_id = message.id,
                            ?reason,
                            "message dropped for connection"
                        );
                    }
                }
            }
            report
        });

        tracing::debug!(
            channel_id = %message.channel_id,
            message_id = message.id,
            recipients = report.recipients,
            dropped = report.dropped,
            "message published"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use chat_common::{ChannelId, ConnectionId};
    use chrono::Utc;

    fn setup(capacity: usize) -> (Arc<MembershipIndex>, Arc<ConnectionRegistry>, MessageIngest) {
        let index = Arc::new(MembershipIndex::new());
        let registry = Arc::new(ConnectionRegistry::new(index.clone(), capacity));
        let ingest = MessageIngest::new(index.clone(), registry.clone());
        (index, registry, ingest)
    }

    fn message(id: i64, channel: &str) -> Message {
        Message {
            id,
            channel_id: ChannelId::from(channel),
            author_name: "ann".to_string(),
            content: format!("message {id}"),
            posted_date: Utc::now(),
        }
    }

    #[test]
    fn publish_reaches_members_only() {
        let (index, registry, ingest) = setup(8);
        let (x, mut x_rx) = registry.register();
        let (_y, mut y_rx) = registry.register();
        index.subscribe(&x, &ChannelId::from("general"));

        let report = ingest.publish(message(1, "general"));

        assert_eq!(report, PublishReport { recipients: 1, delivered: 1, dropped: 0 });
        let got = x_rx.try_recv().unwrap();
        assert_eq!(got.id, 1);
        assert_eq!(got.channel_id, ChannelId::from("general"));
        assert!(x_rx.try_recv().is_err());
        assert!(y_rx.try_recv().is_err());
    }

    #[test]
    fn publish_to_empty_channel_is_not_an_error() {
        let (_index, _registry, ingest) = setup(8);
        let report = ingest.notify_message_created(message(1, "nobody-here"));
        assert_eq!(report, PublishReport::default());
    }

    #[test]
    fn full_queue_only_affects_that_connection() {
        let (index, registry, ingest) = setup(1);
        let general = ChannelId::from("general");
        let (slow, _slow_rx) = registry.register();
        let (fast, mut fast_rx) = registry.register();
        index.subscribe(&slow, &general);
        index.subscribe(&fast, &general);

        ingest.publish(message(1, "general"));
        fast_rx.try_recv().unwrap();
        let report = ingest.publish(message(2, "general"));

        assert_eq!(report.recipients, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(fast_rx.try_recv().unwrap().id, 2);
    }

    #[test]
    fn closed_queue_is_dropped_silently() {
        let (index, registry, ingest) = setup(4);
        let (gone, gone_rx) = registry.register();
        index.subscribe(&gone, &ChannelId::from("general"));
        drop(gone_rx);

        let report = ingest.publish(message(1, "general"));
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn publishes_arrive_in_order_for_every_member() {
        let (index, registry, ingest) = setup(64);
        let general = ChannelId::from("general");
        let (x, mut x_rx) = registry.register();
        let (y, mut y_rx) = registry.register();
        index.subscribe(&x, &general);
        index.subscribe(&y, &general);

        for id in 1..=20 {
            ingest.publish(message(id, "general"));
        }

        for rx in [&mut x_rx, &mut y_rx] {
            let ids: Vec<i64> = std::iter::from_fn(|| rx.try_recv().ok()).map(|m| m.id).collect();
            assert_eq!(ids, (1..=20).collect::<Vec<_>>());
        }
    }

    #[test]
    fn switched_connection_misses_later_publishes_to_old_channel() {
        let (index, registry, ingest) = setup(8);
        let (x, mut x_rx) = registry.register();
        index.subscribe(&x, &ChannelId::from("general"));
        index.subscribe(&x, &ChannelId::from("random"));

        assert_eq!(ingest.publish(message(1, "general")).recipients, 0);
        assert!(x_rx.try_recv().is_err());

        ingest.publish(message(2, "random"));
        assert_eq!(x_rx.try_recv().unwrap().id, 2);
    }

    #[test]
    fn deregistered_connection_is_never_referenced() {
        let (index, registry, ingest) = setup(8);
        let (x, _x_rx) = registry.register();
        index.subscribe(&x, &ChannelId::from("general"));
        registry.deregister(&x);

        let report = ingest.publish(message(1, "general"));
        assert_eq!(report.recipients, 0);
        assert!(!index.members_of(&ChannelId::from("general")).contains(&x));
    }

    #[test]
    fn concurrent_publishes_keep_per_channel_order() {
        let (index, registry, ingest) = setup(4096);
        let general = ChannelId::from("general");
        let receivers: Vec<_> = (0..4)
            .map(|_| {
                let (id, rx) = registry.register();
                index.subscribe(&id, &general);
                rx
            })
            .collect();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ingest = ingest.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        ingest.publish(message(t * 1000 + i, "general"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Every member observes the exact same sequence.
        let sequences: Vec<Vec<i64>> = receivers
            .into_iter()
            .map(|mut rx| std::iter::from_fn(|| rx.try_recv().ok()).map(|m| m.id).collect())
            .collect();
        assert_eq!(sequences[0].len(), 400);
        for seq in &sequences[1..] {
            assert_eq!(seq, &sequences[0]);
        }
    }

    /// A switch record: published by whoever moved `conn` right after the move,
    /// so it lands in `conn`'s queue at the point the switch took effect.
    fn switch_marker(id: i64, channel: &str, conn: &ConnectionId) -> Message {
        Message {
            author_name: "switch".to_string(),
            content: conn.as_str().to_string(),
            ..message(id, channel)
        }
    }

    #[test]
    fn switches_during_publishes_never_duplicate_or_misroute() {
        const CHANNELS: [&str; 2] = ["general", "random"];
        const PUBLISHES: i64 = 2_000;
        const SWITCHES: usize = 600;
        const MARKER_BASE: i64 = 1_000_000;

        let (index, registry, ingest) = setup(8192);
        let mut conns = Vec::new();
        for i in 0..4 {
            let (id, rx) = registry.register();
            let channel = CHANNELS[i % 2];
            index.subscribe(&id, &ChannelId::from(channel));
            ingest.publish(switch_marker(MARKER_BASE + i as i64, channel, &id));
            conns.push((id, rx));
        }
        let ids: Vec<ConnectionId> = conns.iter().map(|(id, _)| id.clone()).collect();

        let publisher = {
            let ingest = ingest.clone();
            std::thread::spawn(move || {
                let mut recipients = 0;
                let mut dropped = 0;
                for id in 1..=PUBLISHES {
                    let report = ingest.publish(message(id, CHANNELS[id as usize % 2]));
                    recipients += report.recipients;
                    dropped += report.dropped;
                }
                (recipients, dropped)
            })
        };

        let switcher = {
            let index = index.clone();
            let ingest = ingest.clone();
            let ids = ids.clone();
            std::thread::spawn(move || {
                for round in 0..SWITCHES {
                    let conn = &ids[round % ids.len()];
                    let channel = CHANNELS[(round / ids.len() + round) % 2];
                    index.subscribe(conn, &ChannelId::from(channel));
                    let marker_id = MARKER_BASE + (ids.len() + round) as i64;
                    ingest.publish(switch_marker(marker_id, channel, conn));
                }
            })
        };

        let (recipients, dropped) = publisher.join().unwrap();
        switcher.join().unwrap();
        assert_eq!(dropped, 0);

        let mut published_received = 0;
        for (conn, mut rx) in conns {
            let queue: Vec<Arc<Message>> = std::iter::from_fn(|| rx.try_recv().ok()).collect();

            let mut seen = HashSet::new();
            for m in &queue {
                assert!(seen.insert(m.id), "{conn} received message {} twice", m.id);
            }

            let published: Vec<i64> = queue.iter().map(|m| m.id).filter(|&id| id < MARKER_BASE).collect();
            assert!(published.windows(2).all(|w| w[0] < w[1]), "{conn} saw publishes out of order");
            published_received += published.len();

            // Between two of its own switch records a connection is in the
            // channel of the earlier one, or already in the channel of the
            // later one.
            let own: Vec<(usize, &ChannelId)> = queue
                .iter()
                .enumerate()
                .filter(|(_, m)| m.author_name == "switch" && m.content == conn.as_str())
                .map(|(pos, m)| (pos, &m.channel_id))
                .collect();
            assert_eq!(own.first().map(|(pos, _)| *pos), Some(0));

            for (pos, m) in queue.iter().enumerate() {
                let before = own.iter().rev().find(|(p, _)| *p <= pos).map(|(_, c)| *c);
                let after = own.iter().find(|(p, _)| *p > pos).map(|(_, c)| *c);
                assert!(
                    before == Some(&m.channel_id) || after == Some(&m.channel_id),
                    "{conn} received {} from {} while in {before:?} / {after:?}",
                    m.id,
                    m.channel_id
                );
            }

            // Still a member of exactly the channel of its last switch record.
            let last = own.last().map(|(_, c)| (*c).clone());
            assert_eq!(index.channel_of(&conn), last);
        }

        assert_eq!(published_received, recipients);
    }

    #[test]
    fn unknown_member_counts_as_dropped() {
        let (index, _registry, ingest) = setup(8);
        // Subscribed in the index but never registered.
        index.subscribe(&ConnectionId::generate(), &ChannelId::from("general"));
        let report = ingest.publish(message(1, "general"));
        assert_eq!(report, PublishReport { recipients: 1, delivered: 0, dropped: 1 });
    }
}
