//! Event Bus Integration Tests
//!
//! Exercises [`EventBus`] with a gameplay-style event type of its own, the
//! way a game built on this crate would use it next to the physics events.
//!
//! # Test Categories
//!
//! 1. **Ordering** - priorities across several frames
//! 2. **Budget** - per-frame cap and expiry
//! 3. **Propagation** - supertopics and consumption
//! 4. **Producers** - listener follow-ups and other threads
//! 5. **Failures** - erroring and panicking listeners
//!
//! # Usage
//!
//! ```sh
//! cargo test --test event_bus_integration
//! ```

use std::sync::{Arc, Mutex};
use std::thread;

use aberredcollision::events::bus::{BusEvent, EventBus, GameEvent};

// =============================================================================
// Test Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Channel {
    All,
    Combat,
    Damage,
    Heal,
    Score,
}

#[derive(Debug, Clone, PartialEq)]
enum Gameplay {
    Damage { target: u32, amount: i32 },
    Heal { target: u32, amount: i32 },
    Score(u32),
}

impl BusEvent for Gameplay {
    type Topic = Channel;

    fn topic(&self) -> Channel {
        match self {
            Gameplay::Damage { .. } => Channel::Damage,
            Gameplay::Heal { .. } => Channel::Heal,
            Gameplay::Score(_) => Channel::Score,
        }
    }

    fn supertopics(&self) -> &'static [Channel] {
        match self {
            Gameplay::Damage { .. } | Gameplay::Heal { .. } => &[Channel::Combat, Channel::All],
            Gameplay::Score(_) => &[Channel::All],
        }
    }
}

type Log = Arc<Mutex<Vec<String>>>;

fn logging(bus: &mut EventBus<Gameplay>, topic: Channel, tag: &'static str) -> Log {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    bus.subscribe(topic, move |event| {
        sink.lock()
            .unwrap()
            .push(format!("{tag}:{:?}", event.payload()));
        Ok(())
    });
    log
}

fn score(points: u32) -> GameEvent<Gameplay> {
    GameEvent::new(Gameplay::Score(points))
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn priorities_order_each_frame_independently() {
    let mut bus: EventBus<Gameplay> = EventBus::new();
    let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.subscribe(Channel::Score, move |event: &mut GameEvent<Gameplay>| {
        if let Gameplay::Score(points) = event.payload() {
            sink.lock().unwrap().push(*points);
        }
        Ok(())
    });

    bus.publish(score(1).with_priority(1));
    bus.publish(score(5).with_priority(5));
    bus.publish(score(3).with_priority(3));
    assert_eq!(bus.process_events(), 3);
    assert_eq!(*seen.lock().unwrap(), vec![5, 3, 1]);

    seen.lock().unwrap().clear();
    bus.publish(score(10));
    bus.publish(score(11));
    bus.publish(score(12).with_priority(-1));
    bus.publish(score(13).with_priority(2));
    bus.process_events();
    assert_eq!(*seen.lock().unwrap(), vec![13, 10, 11, 12]);
}

// =============================================================================
// Budget
// =============================================================================

#[test]
fn backlog_drains_over_several_frames() {
    let mut bus: EventBus<Gameplay> = EventBus::new().with_max_events_per_frame(4);
    let log = logging(&mut bus, Channel::All, "all");
    for points in 0..10 {
        bus.publish(score(points));
    }

    assert_eq!(bus.process_events(), 4);
    assert_eq!(bus.process_events(), 4);
    assert_eq!(bus.process_events(), 2);
    assert_eq!(bus.process_events(), 0);
    assert_eq!(log.lock().unwrap().len(), 10);
    assert_eq!(log.lock().unwrap()[9], "all:Score(9)");
}

#[test]
fn stale_backlog_is_dropped() {
    let mut bus: EventBus<Gameplay> = EventBus::new()
        .with_max_events_per_frame(2)
        .with_event_timeout(1.0);
    let log = logging(&mut bus, Channel::Score, "score");
    for points in 0..5 {
        bus.publish(score(points));
    }
    bus.process_events();
    assert_eq!(bus.queued_len(), 3);

    bus.advance(0.5);
    bus.publish(score(99));
    bus.advance(0.75);
    // the three old events are now 1.25s old, the new one 0.75s
    assert_eq!(bus.process_events(), 1);
    assert_eq!(bus.counters().expired, 3);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["score:Score(0)", "score:Score(1)", "score:Score(99)"]
    );
}

#[test]
fn explicit_timestamps_are_respected() {
    let mut bus: EventBus<Gameplay> = EventBus::new().with_event_timeout(2.0);
    let log = logging(&mut bus, Channel::All, "all");
    bus.set_time(10.0);
    bus.publish(score(1).with_timestamp(7.0));
    bus.publish(score(2).with_timestamp(9.0));
    bus.process_events();
    assert_eq!(*log.lock().unwrap(), vec!["all:Score(2)"]);
}

// =============================================================================
// Propagation
// =============================================================================

#[test]
fn supertopic_listeners_see_children() {
    let mut bus: EventBus<Gameplay> = EventBus::new();
    let combat = logging(&mut bus, Channel::Combat, "combat");
    let all = logging(&mut bus, Channel::All, "all");
    let heal = logging(&mut bus, Channel::Heal, "heal");

    bus.publish(GameEvent::new(Gameplay::Damage {
        target: 1,
        amount: 4,
    }));
    bus.publish(GameEvent::new(Gameplay::Heal {
        target: 1,
        amount: 2,
    }));
    bus.publish(score(7));
    bus.process_events();

    assert_eq!(combat.lock().unwrap().len(), 2);
    assert_eq!(all.lock().unwrap().len(), 3);
    assert_eq!(
        *heal.lock().unwrap(),
        vec!["heal:Heal { target: 1, amount: 2 }"]
    );
}

#[test]
fn consumed_event_stops_at_the_exact_topic() {
    let mut bus: EventBus<Gameplay> = EventBus::new();
    bus.subscribe(Channel::Damage, |event: &mut GameEvent<Gameplay>| {
        if let Gameplay::Damage { amount, .. } = event.payload() {
            if *amount <= 0 {
                event.consume();
            }
        }
        Ok(())
    });
    let combat = logging(&mut bus, Channel::Combat, "combat");

    bus.publish(GameEvent::new(Gameplay::Damage {
        target: 2,
        amount: 0,
    }));
    bus.publish(GameEvent::new(Gameplay::Damage {
        target: 2,
        amount: 3,
    }));
    bus.process_events();

    assert_eq!(
        *combat.lock().unwrap(),
        vec!["combat:Damage { target: 2, amount: 3 }"]
    );
}

#[test]
fn unsubscribed_listener_is_not_called() {
    let mut bus: EventBus<Gameplay> = EventBus::new();
    let hits = Arc::new(Mutex::new(0));
    let counter = hits.clone();
    let id = bus.subscribe(Channel::Score, move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });
    bus.publish(score(1));
    bus.process_events();
    assert!(bus.unsubscribe(Channel::Score, id));
    assert!(!bus.has_listeners(Channel::Score));
    bus.publish(score(2));
    bus.process_events();
    assert_eq!(*hits.lock().unwrap(), 1);
}

// =============================================================================
// Producers
// =============================================================================

#[test]
fn listener_follow_up_arrives_next_frame() {
    let mut bus: EventBus<Gameplay> = EventBus::new();
    let sender = bus.sender();
    bus.subscribe(Channel::Damage, move |event: &mut GameEvent<Gameplay>| {
        if let Gameplay::Damage { amount, .. } = event.payload() {
            sender.send(score(*amount as u32))?;
        }
        Ok(())
    });
    let scores = logging(&mut bus, Channel::Score, "score");

    bus.publish(GameEvent::new(Gameplay::Damage {
        target: 3,
        amount: 25,
    }));
    bus.process_events();
    assert!(scores.lock().unwrap().is_empty());

    bus.process_events();
    assert_eq!(*scores.lock().unwrap(), vec!["score:Score(25)"]);
}

#[test]
fn events_from_worker_threads_are_merged() {
    let mut bus: EventBus<Gameplay> = EventBus::new().with_max_events_per_frame(1000);
    let log = logging(&mut bus, Channel::All, "all");

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let sender = bus.sender();
            thread::spawn(move || {
                for i in 0..25 {
                    sender.send(score(worker * 100 + i)).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(bus.process_events(), 100);
    assert_eq!(log.lock().unwrap().len(), 100);
    assert_eq!(bus.counters().published, 100);
}

#[test]
fn immediate_mode_skips_the_queue() {
    let mut bus: EventBus<Gameplay> = EventBus::new().with_immediate_mode(true);
    let log = logging(&mut bus, Channel::Score, "score");
    bus.publish(score(4));
    assert_eq!(bus.queued_len(), 0);
    assert_eq!(*log.lock().unwrap(), vec!["score:Score(4)"]);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn failing_listeners_do_not_block_others() {
    let mut bus: EventBus<Gameplay> = EventBus::new();
    bus.subscribe(Channel::Score, |_| Err("scoreboard offline".to_string()));
    bus.subscribe(Channel::Score, |_| panic!("listener bug"));
    let all = logging(&mut bus, Channel::All, "all");

    bus.publish(score(1));
    bus.publish(score(2));
    assert_eq!(bus.process_events(), 2);

    assert_eq!(all.lock().unwrap().len(), 2);
    assert_eq!(bus.counters().listener_failures, 4);
    assert_eq!(bus.counters().dispatched, 2);
}
