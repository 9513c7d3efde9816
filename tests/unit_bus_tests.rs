//! # Message Bus Unit Tests / 消息总线单元测试
//!
//! Ordering across concurrent publishers, filtered subscriptions, closing and
//! completion waiting.
//!
//! 并发发布者之间的顺序、过滤订阅、关闭以及完成等待。

use std::time::Duration;

use front_runner::core::bus::{EventKind, MessageBus, MessageBusEvent, RunSummary};
use front_runner::core::models::FailureReason;

fn starting(id: impl Into<String>) -> MessageBusEvent {
    let id = id.into();
    MessageBusEvent::TestStarting {
        display_name: id.clone(),
        unique_id: id,
    }
}

fn finished() -> MessageBusEvent {
    MessageBusEvent::TestAssemblyFinished {
        assembly: "A".to_string(),
        summary: RunSummary::default(),
    }
}

fn ids(events: &[MessageBusEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| e.unique_id().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod ordering_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_all_subscribers_see_one_total_order() {
        let bus = MessageBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        let publishers: Vec<_> = (0..8)
            .map(|p| {
                let bus = bus.clone();
                tokio::spawn(async move {
                    for n in 0..50 {
                        assert!(bus.publish(starting(format!("p{p}-{n:02}"))));
                        if n % 10 == 0 {
                            tokio::task::yield_now().await;
                        }
                    }
                })
            })
            .collect();
        for publisher in publishers {
            publisher.await.unwrap();
        }
        bus.publish(finished());

        let first = ids(&first.collect_until(EventKind::TestAssemblyFinished).await);
        let second = ids(&second.collect_until(EventKind::TestAssemblyFinished).await);

        assert_eq!(first.len(), 400);
        assert_eq!(first, second);

        // Each publisher's own events keep their relative order.
        for p in 0..8 {
            let prefix = format!("p{p}-");
            let mine: Vec<&String> = first.iter().filter(|id| id.starts_with(&prefix)).collect();
            let mut sorted = mine.clone();
            sorted.sort();
            assert_eq!(mine, sorted);
        }
    }

    #[tokio::test]
    async fn test_subscription_only_sees_later_events() {
        let bus = MessageBus::new();
        bus.publish(starting("before"));
        let sub = bus.subscribe();
        bus.publish(starting("after"));
        bus.publish(finished());

        let events = sub.collect_until(EventKind::TestAssemblyFinished).await;
        assert_eq!(ids(&events), vec!["after"]);
    }

    #[tokio::test]
    async fn test_filtered_subscription() {
        let bus = MessageBus::new();
        let failures = bus.subscribe_filtered(|e| {
            matches!(e.kind(), EventKind::TestFailed | EventKind::TestAssemblyFinished)
        });

        bus.publish(starting("a"));
        bus.publish(MessageBusEvent::TestFailed {
            unique_id: "a".to_string(),
            reason: FailureReason::Assertion,
            messages: vec!["boom".to_string()],
            duration: Duration::ZERO,
        });
        bus.publish(MessageBusEvent::TestPassed {
            unique_id: "b".to_string(),
            duration: Duration::ZERO,
        });
        bus.publish(finished());

        let kinds: Vec<EventKind> = failures
            .collect_until(EventKind::TestAssemblyFinished)
            .await
            .iter()
            .map(MessageBusEvent::kind)
            .collect();
        assert_eq!(kinds, vec![EventKind::TestFailed, EventKind::TestAssemblyFinished]);
    }
}

#[cfg(test)]
mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_after_close_is_rejected() {
        let bus = MessageBus::new();
        let mut sub = bus.subscribe();
        bus.close();

        assert!(bus.is_closed());
        assert!(!bus.publish(starting("late")));
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_wait_for_finished_after_assembly_finished() {
        let bus = MessageBus::new();
        let waiter = {
            let bus = bus.clone();
            tokio::spawn(async move { bus.wait_for_finished().await })
        };
        bus.publish(starting("a"));
        bus.publish(finished());

        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter should be released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_finished_released_by_close() {
        let bus = MessageBus::new();
        bus.close();
        tokio::time::timeout(Duration::from_secs(5), bus.wait_for_finished())
            .await
            .expect("close releases waiters");
    }

    #[tokio::test]
    async fn test_subscription_as_stream() {
        use futures::StreamExt;

        let bus = MessageBus::new();
        let stream = bus.subscribe().into_stream();
        bus.publish(starting("a"));
        bus.publish(starting("b"));
        drop(bus);

        let seen: Vec<MessageBusEvent> = stream.collect().await;
        assert_eq!(ids(&seen), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_dropping_every_handle_ends_subscriptions() {
        let bus = MessageBus::new();
        let sub = bus.subscribe();
        bus.publish(starting("only"));
        drop(bus);

        let events = sub.collect_until(EventKind::TestAssemblyFinished).await;
        assert_eq!(ids(&events), vec!["only"]);
    }
}

#[cfg(test)]
mod summary_tests {
    use super::*;

    #[test]
    fn test_record_counts_terminal_events_only() {
        let mut summary = RunSummary::default();
        summary.record(&starting("a"));
        summary.record(&MessageBusEvent::TestPassed {
            unique_id: "a".to_string(),
            duration: Duration::ZERO,
        });
        summary.record(&MessageBusEvent::TestSkipped {
            unique_id: "b".to_string(),
            reason: "later".to_string(),
        });
        summary.record(&MessageBusEvent::TestNotRun {
            unique_id: "c".to_string(),
        });

        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.not_run, 1);
        assert_eq!(summary.failed, 0);

        let mut merged = RunSummary::default();
        merged.merge(&summary);
        merged.merge(&summary);
        assert_eq!(merged.total, 6);
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let json = serde_json::to_value(MessageBusEvent::TestNotRun {
            unique_id: "x".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "TestNotRun");
        assert_eq!(json["unique_id"], "x");
    }
}
