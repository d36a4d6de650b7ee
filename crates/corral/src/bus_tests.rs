use super::*;
use crate::event::EventKind;
use bytes::Bytes;

fn destroyed_event(seq: u64) -> Event {
    Event::new(uuid::Uuid::nil(), seq, EventKind::SessionDestroyed)
}

fn data_event(seq: u64) -> Event {
    Event::new(uuid::Uuid::nil(), seq, EventKind::SessionData { bytes: Bytes::from_static(b"x") })
}

#[tokio::test]
async fn subscriber_receives_published_event() {
    let bus = EventBus::new();
    let sub = bus.subscribe();
    bus.publish(destroyed_event(0));
    let event = sub.recv().await;
    assert_eq!(event.seq, 0);
}

#[tokio::test]
async fn multiple_subscribers_each_get_a_copy() {
    let bus = EventBus::new();
    let a = bus.subscribe();
    let b = bus.subscribe();
    bus.publish(destroyed_event(1));
    assert_eq!(a.recv().await.seq, 1);
    assert_eq!(b.recv().await.seq, 1);
}

#[test]
fn transition_queue_drops_oldest_on_overflow() {
    let bus = EventBus::new();
    let sub = bus.subscribe_with_capacities(2, 8);
    for i in 0..5 {
        bus.publish(destroyed_event(i));
    }
    assert_eq!(sub.dropped(), 3);
    assert_eq!(sub.try_recv().unwrap().seq, 3);
    assert_eq!(sub.try_recv().unwrap().seq, 4);
    assert!(sub.try_recv().is_none());
}

#[test]
fn data_queue_has_independent_capacity_from_transition_queue() {
    let bus = EventBus::new();
    let sub = bus.subscribe_with_capacities(1, 8);
    for i in 0..8 {
        bus.publish(data_event(i));
    }
    assert_eq!(sub.dropped(), 0);
    for i in 0..8 {
        assert_eq!(sub.try_recv().unwrap().seq, i);
    }
}

#[test]
fn transition_events_are_preferred_over_data_events() {
    let bus = EventBus::new();
    let sub = bus.subscribe();
    bus.publish(data_event(0));
    bus.publish(destroyed_event(1));
    let first = sub.try_recv().unwrap();
    assert_eq!(first.seq, 1);
}

#[test]
fn dropping_subscription_removes_it_from_the_registry() {
    let bus = EventBus::new();
    let sub = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 1);
    drop(sub);
    assert_eq!(bus.subscriber_count(), 0);
}
