//! Tests for the three-lane priority queue.

use chronicler_core::{CallType, ContentKey, Priority, Request, RequestId};
use chronicler_error::QueueErrorKind;
use chronicler_orchestrator::{PriorityRequestQueue, QueueConfig};

fn request(id: u64, priority: Priority, prompt: &str, tick: u64, timeout: u64) -> Request {
    Request::new(
        RequestId::from(id),
        priority,
        prompt,
        CallType::NpcDialogue,
        tick,
        timeout,
        3,
    )
}

#[test]
fn identical_content_is_deduplicated() {
    let mut queue = PriorityRequestQueue::new(QueueConfig::default());
    queue
        .enqueue(request(1, Priority::Standard, "Greet the traveler", 0, 10))
        .unwrap();

    let err = queue
        .enqueue(request(2, Priority::Urgent, "Greet  the traveler ", 0, 10))
        .unwrap_err();
    assert_eq!(err.kind(), &QueueErrorKind::Duplicate { existing: 1 });
    assert_eq!(queue.len(), 1);
    assert_eq!(
        queue.pending_for(&ContentKey::new("Greet the traveler", CallType::NpcDialogue)),
        Some(RequestId::from(1))
    );
}

#[test]
fn full_lane_rejects() {
    let mut queue = PriorityRequestQueue::new(QueueConfig::default());
    for id in 0..3 {
        queue
            .enqueue(request(id, Priority::Standard, &format!("prompt {}", id), 0, 10))
            .unwrap();
    }

    let err = queue
        .enqueue(request(9, Priority::Standard, "one too many", 0, 10))
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        QueueErrorKind::LaneFull { capacity: 3, .. }
    ));
    // Other lanes still have room
    queue
        .enqueue(request(10, Priority::Urgent, "urgent", 0, 10))
        .unwrap();
}

#[test]
fn global_cap_applies_across_lanes() {
    let mut queue = PriorityRequestQueue::new(QueueConfig::default().with_global_capacity(4));
    for id in 0..4 {
        queue
            .enqueue(request(id, Priority::Background, &format!("ambient {}", id), 0, 10))
            .unwrap();
    }

    let err = queue
        .enqueue(request(5, Priority::Urgent, "urgent", 0, 10))
        .unwrap_err();
    assert_eq!(err.kind(), &QueueErrorKind::GlobalFull { capacity: 4 });
}

#[test]
fn urgent_is_served_before_background_regardless_of_arrival() {
    let mut queue = PriorityRequestQueue::new(QueueConfig::default());
    queue
        .enqueue(request(1, Priority::Background, "weather", 0, 30))
        .unwrap();
    queue
        .enqueue(request(2, Priority::Urgent, "decision", 0, 5))
        .unwrap();

    assert_eq!(*queue.dequeue(0).unwrap().id(), RequestId::from(2));
    assert_eq!(*queue.dequeue(0).unwrap().id(), RequestId::from(1));
    assert!(queue.dequeue(0).is_none());
}

#[test]
fn lanes_are_fifo() {
    let mut queue = PriorityRequestQueue::new(QueueConfig::default());
    for id in 1..=3 {
        queue
            .enqueue(request(id, Priority::Background, &format!("event {}", id), 0, 30))
            .unwrap();
    }

    let order: Vec<u64> = std::iter::from_fn(|| queue.dequeue(0))
        .map(|r| r.id().value())
        .collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[test]
fn expired_requests_are_never_dispatched() {
    let mut queue = PriorityRequestQueue::new(QueueConfig::default());
    queue
        .enqueue(request(1, Priority::Urgent, "decision", 0, 5))
        .unwrap();

    // Deadline tick itself is still valid
    let mut on_time = PriorityRequestQueue::new(QueueConfig::default());
    on_time
        .enqueue(request(1, Priority::Urgent, "decision", 0, 5))
        .unwrap();
    assert!(on_time.dequeue(5).is_some());

    assert!(queue.dequeue(6).is_none());
    let expired = queue.process_timeouts(6);
    assert_eq!(expired.len(), 1);
    assert!(queue.is_empty());

    // The key is free again
    queue
        .enqueue(request(2, Priority::Urgent, "decision", 6, 5))
        .unwrap();
}

#[test]
fn retries_wait_for_their_tick_and_keep_the_key() {
    let mut queue = PriorityRequestQueue::new(QueueConfig::default());
    queue
        .enqueue(request(1, Priority::Standard, "dialogue", 0, 15))
        .unwrap();

    let mut dispatched = queue.dequeue(0).unwrap();
    dispatched.begin_attempt();
    dispatched.schedule_retry(3);
    queue.requeue(dispatched);

    let err = queue
        .enqueue(request(2, Priority::Standard, "dialogue", 1, 15))
        .unwrap_err();
    assert!(matches!(err.kind(), QueueErrorKind::Duplicate { existing: 1 }));

    assert!(queue.dequeue(2).is_none());
    let retried = queue.dequeue(3).unwrap();
    assert_eq!(*retried.attempt_count(), 1);

    queue.release(&retried.content_key());
    assert!(queue.pending_for(&retried.content_key()).is_none());
}

#[test]
fn depths_report_each_lane() {
    let mut queue = PriorityRequestQueue::new(QueueConfig::default());
    queue.enqueue(request(1, Priority::Urgent, "a", 0, 5)).unwrap();
    queue.enqueue(request(2, Priority::Background, "b", 0, 30)).unwrap();
    queue.enqueue(request(3, Priority::Background, "c", 0, 30)).unwrap();

    let depths = queue.depths();
    assert_eq!((depths.urgent, depths.standard, depths.background), (1, 0, 2));
    assert_eq!(depths.total(), 3);
}
