//! # Diagnostic Trail End to End
//!
//! Publishers, the diagnostics context and the telemetry renderer wired
//! together.

#[cfg(test)]
mod tests {
    use crate::{collect, diagnostics};
    use herald_bus::{
        Diagnostics, ProvenanceEntry, ProvenancePayload, Publisher, PublishRecord,
        SignedPublisher, SubscriberId,
    };
    use herald_telemetry::{Channel, DiagnosticLogger, LineSink, TelemetryConfig};
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// A reading whose `Debug` rendering always fails.
    #[derive(Clone)]
    struct Reading(i32);

    impl fmt::Debug for Reading {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("reading {} cannot be rendered", self.0)
        }
    }

    fn trails(
        context: &Diagnostics,
    ) -> (
        Arc<Mutex<Vec<ProvenancePayload>>>,
        Arc<Mutex<Vec<PublishRecord>>>,
    ) {
        let (subscriptions, _) = collect(&context.subscription_trail());
        let (publications, _) = collect(&context.publish_trail());
        (subscriptions, publications)
    }

    /// Run a fixed pipeline scenario and return what the handlers saw.
    fn scenario(context: &Diagnostics, inputs: &[i32]) -> (Vec<i32>, Vec<String>) {
        let one = Publisher::<i32>::with_diagnostics("one", context);
        let two = Publisher::<String>::with_diagnostics("two", context);
        one.proxy()
            .filter(|x| *x != 0)
            .interrupted(|_| {})
            .map(|x: &i32| x.to_string())
            .redirect(&two);
        let (ints, _) = collect(&one.proxy().flat_map(|x: &i32| x.checked_mul(2)));
        let (strings, _) = collect(&two.proxy());

        for x in inputs {
            one.publish(*x);
        }
        let ints = ints.lock().clone();
        let strings = strings.lock().clone();
        (ints, strings)
    }

    #[test]
    fn test_subscription_trail_describes_redirect() {
        let context = diagnostics(true);
        let (subscriptions, _) = trails(&context);
        let one = Publisher::<i32>::with_diagnostics("one", &context);
        let two = Publisher::<i32>::with_diagnostics("two", &context);

        one.proxy().filter(|_| true).redirect(&two);

        let payloads = subscriptions.lock();
        assert_eq!(payloads.len(), 1);
        assert_eq!(
            payloads[0].entries(),
            &[
                ProvenanceEntry::PublisherLabel {
                    label: "Publisher<i32>:one".into()
                },
                ProvenanceEntry::Filtered,
                ProvenanceEntry::Redirected {
                    to: "Publisher<i32>:two".into()
                },
            ]
        );
    }

    #[test]
    fn test_unrenderable_event_reaches_every_listener_through_redirect() {
        let context = diagnostics(true);
        let (_, publications) = trails(&context);
        let sensor = Publisher::<Reading>::with_diagnostics("sensor", &context);
        let archive = Publisher::<Reading>::with_diagnostics("archive", &context);
        let heard = Arc::new(AtomicUsize::new(0));

        sensor.proxy().redirect(&archive);
        for proxy in [sensor.proxy(), sensor.proxy(), archive.proxy()] {
            let sink = Arc::clone(&heard);
            proxy.listen(move |_: &Reading| {
                sink.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(sensor.publish(Reading(3)), 3);
        assert_eq!(heard.load(Ordering::SeqCst), 3);
        assert!(publications.lock().is_empty());
    }

    #[test]
    fn test_publish_trail_records_suppression() {
        let context = diagnostics(true);
        let (_, publications) = trails(&context);
        let room = SignedPublisher::<&'static str>::with_diagnostics("room", &context);
        let author = SubscriberId::issue();
        room.subscribe(author, |_| {});
        let reader = SubscriberId::issue();
        room.subscribe(reader, |_| {});

        room.publish("hello", Some(author));

        let records = publications.lock();
        assert_eq!(records.len(), 1);
        assert!(records[0].publisher.starts_with("Publisher<"));
        assert!(records[0].publisher.ends_with(">:room"));
        let envelope = herald_bus::Envelope::new("hello", Some(author));
        assert_eq!(records[0].event, format!("{envelope:?}"));
        assert_eq!(records[0].handlers, vec![format!("handler:{reader}")]);
        assert_eq!(records[0].suppressed, Some(author));
    }

    #[test]
    fn test_disabled_context_records_nothing() {
        let context = diagnostics(false);
        let (subscriptions, publications) = trails(&context);

        let (ints, strings) = scenario(&context, &[1, 0, 2]);

        assert_eq!(ints, vec![2, 0, 4]);
        assert_eq!(strings, vec!["1", "2"]);
        assert!(subscriptions.lock().is_empty());
        assert!(publications.lock().is_empty());
    }

    #[test]
    fn test_logger_renders_live_pipeline() {
        let context = diagnostics(true);
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let line_sink: LineSink = Arc::new(move |channel: Channel, line: &str| {
            sink.lock().push((channel, line.to_string()));
        });
        let logger = DiagnosticLogger::with_sink(&context, &TelemetryConfig::default(), line_sink);
        assert!(logger.enable());

        let a = Publisher::<i32>::with_diagnostics("a", &context);
        let b = Publisher::<i32>::with_diagnostics("b", &context);
        a.proxy().merge(&b.proxy()).listen(|_| {});
        b.publish(1);
        drop(logger);
        a.publish(2);

        let lines = lines.lock();
        let rendered: Vec<&str> = lines.iter().map(|(_, line)| line.as_str()).collect();
        assert_eq!(
            &rendered[..4],
            &[
                "(S) Publisher<i32>:a",
                "(S) --> merged with",
                "(S)     Publisher<i32>:b",
                "(S) !-> listened with handler<i32>",
            ]
        );
        let publishes = lines
            .iter()
            .filter(|(channel, _)| *channel == Channel::Publications)
            .count();
        assert_eq!(publishes, 1);
    }

    #[test]
    fn test_json_logger_output_parses_back() {
        let context = diagnostics(true);
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let line_sink: LineSink = Arc::new(move |channel: Channel, line: &str| {
            if channel == Channel::Subscriptions {
                sink.lock().push(line.to_string());
            }
        });
        let config = TelemetryConfig {
            json_logs: true,
            ..TelemetryConfig::default()
        };
        let logger = DiagnosticLogger::with_sink(&context, &config, line_sink);
        assert!(logger.enable());

        let publisher = Publisher::<i32>::with_diagnostics("numbers", &context);
        let proxy = publisher.proxy().map(|x: &i32| i64::from(*x));
        proxy.listen(|_| {});

        let lines = lines.lock();
        assert_eq!(lines.len(), 1);
        let payload: ProvenancePayload = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(payload.entries()[..2], proxy.provenance().entries()[..]);
        assert_eq!(
            payload.entries()[2],
            ProvenanceEntry::Listened {
                of_type: "i64".into()
            }
        );
    }

    #[test]
    fn test_re_subscribe_warns() {
        let context = diagnostics(true);
        let (warnings, _) = collect(&context.general_warnings());
        let publisher = Publisher::<i32>::with_diagnostics("numbers", &context);
        let id = SubscriberId::issue();

        publisher.subscribe(id, |_| {});
        publisher.subscribe(id, |_| {});

        assert_eq!(publisher.subscriber_count(), 1);
        assert_eq!(warnings.lock().len(), 1);
        assert!(warnings.lock()[0].contains("Publisher<i32>:numbers"));
    }

    #[test]
    fn test_init_tracing_once() {
        let config = TelemetryConfig {
            console_output: false,
            ..TelemetryConfig::default()
        };
        // Only one global subscriber may be installed per process.
        let _ = herald_telemetry::init_tracing(&config);
        assert!(matches!(
            herald_telemetry::init_tracing(&config),
            Err(herald_telemetry::TelemetryError::TracerInit(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_delivery_identical_with_diagnostics(
            inputs in proptest::collection::vec(-1000i32..1000, 0..40)
        ) {
            let quiet = scenario(&diagnostics(false), &inputs);
            let traced = scenario(&diagnostics(true), &inputs);
            prop_assert_eq!(quiet, traced);
        }
    }
}
