//! # Integration Test Flows
//!
//! Pipelines that span several publishers, signed rooms with echo
//! suppression, object-scoped subscribers and handlers that modify the
//! registry while an event is being delivered.

#[cfg(test)]
mod tests {
    use crate::{collect, diagnostics};
    use herald_bus::{Envelope, Observable, Publisher, SignedPublisher, SubscriberId};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// A chat participant that signs its own messages.
    struct Member {
        id: SubscriberId,
        inbox: Mutex<Vec<String>>,
    }

    impl Member {
        fn join(room: &SignedPublisher<String>) -> Arc<Self> {
            let member = Arc::new(Member {
                id: SubscriberId::issue(),
                inbox: Mutex::new(Vec::new()),
            });
            room.proxy()
                .unsigned()
                .subscribe_as(member.id, &member, |member: &Member, text: &String| {
                    member.inbox.lock().push(text.clone());
                });
            member
        }

        fn say(&self, room: &SignedPublisher<String>, text: &str) -> usize {
            room.publish(text.to_string(), Some(self.id))
        }

        fn inbox(&self) -> Vec<String> {
            self.inbox.lock().clone()
        }
    }

    // =============================================================================
    // SIGNED ROOMS
    // =============================================================================

    #[test]
    fn test_room_never_echoes_to_author() {
        let room = SignedPublisher::<String>::with_diagnostics("room", &diagnostics(false));
        let alice = Member::join(&room);
        let bob = Member::join(&room);
        let carol = Member::join(&room);

        assert_eq!(alice.say(&room, "hi"), 2);
        bob.say(&room, "hey");
        room.publish("announcement".to_string(), None);

        assert_eq!(alice.inbox(), vec!["hey", "announcement"]);
        assert_eq!(bob.inbox(), vec!["hi", "announcement"]);
        assert_eq!(carol.inbox(), vec!["hi", "hey", "announcement"]);
    }

    #[test]
    fn test_departed_member_is_removed_on_next_message() {
        let room = SignedPublisher::<String>::with_diagnostics("room", &diagnostics(false));
        let alice = Member::join(&room);
        let bob = Member::join(&room);
        assert_eq!(room.subscriber_count(), 2);

        drop(bob);
        assert_eq!(room.subscriber_count(), 2);

        // The stale registration still runs once, to remove itself.
        assert_eq!(alice.say(&room, "anyone?"), 1);
        assert_eq!(room.subscriber_count(), 1);

        assert_eq!(room.publish("system".to_string(), None), 1);
        assert_eq!(alice.inbox(), vec!["system"]);
    }

    #[test]
    fn test_redirect_into_room_keeps_suppression() {
        let context = diagnostics(false);
        let room = SignedPublisher::<String>::with_diagnostics("room", &context);
        let relay = Publisher::<Envelope<String>>::with_diagnostics("relay", &context);
        relay.proxy().redirect(room.as_publisher());
        let alice = Member::join(&room);
        let bob = Member::join(&room);

        relay.publish(Envelope::new("relayed".to_string(), Some(alice.id)));

        assert!(alice.inbox().is_empty());
        assert_eq!(bob.inbox(), vec!["relayed"]);
    }

    // =============================================================================
    // MULTI-PUBLISHER PIPELINES
    // =============================================================================

    #[test]
    fn test_redirect_chain() {
        let context = diagnostics(false);
        let raw = Publisher::<String>::with_diagnostics("raw", &context);
        let numbers = Publisher::<i32>::with_diagnostics("numbers", &context);
        let labels = Publisher::<String>::with_diagnostics("labels", &context);

        raw.proxy()
            .flat_map(|s: &String| s.trim().parse::<i32>().ok())
            .redirect(&numbers);
        numbers
            .proxy()
            .filter(|x| *x >= 0)
            .map(|x: &i32| format!("#{x}"))
            .redirect(&labels);
        let (from_numbers, _) = collect(&numbers.proxy());
        let (from_labels, _) = collect(&labels.proxy());

        for s in ["4", " -2", "x", "10 "] {
            raw.publish(s.to_string());
        }
        numbers.publish(7);

        assert_eq!(*from_numbers.lock(), vec![4, -2, 10, 7]);
        assert_eq!(*from_labels.lock(), vec!["#4", "#10", "#7"]);
    }

    #[test]
    fn test_merge_of_mapped_sources() {
        let context = diagnostics(false);
        let ints = Publisher::<i32>::with_diagnostics("ints", &context);
        let floats = Publisher::<f64>::with_diagnostics("floats", &context);
        let merged = ints
            .proxy()
            .map(|x: &i32| f64::from(*x))
            .merge(&floats.proxy());
        let (seen, id) = collect(&merged);

        ints.publish(1);
        floats.publish(2.5);
        ints.publish(3);
        merged.unsubscribe(id);
        floats.publish(4.0);

        assert_eq!(*seen.lock(), vec![1.0, 2.5, 3.0]);
    }

    #[test]
    fn test_observable_drives_pipeline() {
        let temperature = Observable::with_diagnostics("temperature", 20, &diagnostics(false));
        let alerts = Publisher::<String>::with_diagnostics("alerts", &diagnostics(false));
        temperature
            .proxy()
            .filter(|t| *t > 30)
            .map(|t: &i32| format!("too hot: {t}"))
            .redirect(&alerts);
        let (seen, _) = collect(&alerts.proxy());

        temperature.set(25);
        temperature.set(35);
        temperature.update(|t| t + 1);

        assert_eq!(*seen.lock(), vec!["too hot: 35", "too hot: 36"]);
    }

    // =============================================================================
    // REENTRANCY
    // =============================================================================

    #[test]
    fn test_subscribe_during_dispatch_applies_to_next_publish() {
        let context = diagnostics(false);
        let publisher = Arc::new(Publisher::<i32>::with_diagnostics("numbers", &context));
        let late_hits = Arc::new(AtomicUsize::new(0));
        let added = Arc::new(AtomicBool::new(false));

        let target = Arc::downgrade(&publisher);
        let hits = Arc::clone(&late_hits);
        publisher.proxy().listen(move |_| {
            if added.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(publisher) = target.upgrade() {
                let hits = Arc::clone(&hits);
                publisher.proxy().listen(move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        assert_eq!(publisher.publish(1), 1);
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.publish(2), 2);
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_publish_from_handler_into_other_publisher() {
        let context = diagnostics(false);
        let requests = Publisher::<u32>::with_diagnostics("requests", &context);
        let responses = Arc::new(Publisher::<u32>::with_diagnostics("responses", &context));
        let (seen, _) = collect(&responses.proxy());

        let out = Arc::clone(&responses);
        requests.proxy().listen(move |x| {
            out.publish(x * 2);
        });

        requests.publish(21);

        assert_eq!(*seen.lock(), vec![42]);
    }

    #[test]
    fn test_bound_subscription_scoped_to_block() {
        let publisher = Publisher::<i32>::with_diagnostics("numbers", &diagnostics(false));
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let sink = Arc::clone(&seen);
            let _guard = publisher
                .proxy()
                .interrupted(|_| {})
                .bind(move |x: &i32| sink.lock().push(*x));
            publisher.publish(1);
        }
        publisher.publish(2);

        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(publisher.subscriber_count(), 0);
    }
}
