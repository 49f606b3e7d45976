//! # Bus Properties on Session Buses
//!
//! The dispatch contract, checked on buses owned by a runtime session (with
//! the telemetry monitor and exception funnel already installed):
//!
//! 1. delivery follows subscription order
//! 2. a `false` stops delivery, monitors still see the event
//! 3. `subscribe_once` fires exactly once
//! 4. `unsubscribe` removes only the exact (callback, scope) pair
//! 5. publishing to an unknown topic succeeds
//! 6. the save scenario: scope identity in, exact removal out

#[cfg(test)]
mod tests {
    use cb_runtime::{RuntimeConfig, SessionRegistry};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_bus::{Callback, MonitorCallback, Scope};
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, name: &'static str, verdict: bool) -> Callback {
        let log = log.clone();
        Callback::new(move |_, args: &[Value]| {
            log.lock().push(format!("{name}:{}", Value::Array(args.to_vec())));
            verdict
        })
    }

    // =========================================================================
    // ORDERING AND VETO
    // =========================================================================

    #[tokio::test]
    async fn test_delivery_order_on_session_bus() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let bus = session.cms_to_app();
        let log: Log = Arc::default();

        bus.subscribe("channel:changed", recorder(&log, "f1", true), None);
        bus.subscribe("channel:changed", recorder(&log, "f2", true), None);
        bus.subscribe("channel:changed", recorder(&log, "f3", true), None);

        assert!(bus.publish("channel:changed", &[json!("x")]));
        assert_eq!(*log.lock(), vec![r#"f1:["x"]"#, r#"f2:["x"]"#, r#"f3:["x"]"#]);
    }

    #[tokio::test]
    async fn test_veto_short_circuits_but_monitors_run() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let bus = session.app_to_cms();
        let log: Log = Arc::default();
        let monitored: Arc<Mutex<Vec<(String, Vec<Value>)>>> = Arc::default();

        let sink = monitored.clone();
        bus.monitor(
            MonitorCallback::new(move |_, topic, args| {
                sink.lock().push((topic.to_string(), args.to_vec()));
            }),
            None,
        );
        bus.subscribe("document:save", recorder(&log, "f1", true), None);
        bus.subscribe("document:save", recorder(&log, "f2", false), None);
        bus.subscribe("document:save", recorder(&log, "f3", true), None);

        assert!(!bus.publish("document:save", &[json!(1)]));
        assert_eq!(*log.lock(), vec!["f1:[1]", "f2:[1]"]);
        assert_eq!(
            *monitored.lock(),
            vec![("document:save".to_string(), vec![json!(1)])]
        );
        assert_eq!(bus.events_vetoed(), 1);
    }

    // =========================================================================
    // ONCE, UNSUBSCRIBE, UNKNOWN TOPIC
    // =========================================================================

    #[tokio::test]
    async fn test_subscribe_once_fires_once() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let bus = session.cms_to_app();
        let log: Log = Arc::default();

        bus.subscribe_once("page:ready", recorder(&log, "once", true), None);
        bus.publish("page:ready", &[]);
        bus.publish("page:ready", &[]);
        assert_eq!(*log.lock(), vec!["once:[]"]);
        assert_eq!(bus.subscriber_count("page:ready"), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_precision_keeps_order() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let bus = session.cms_to_app();
        let log: Log = Arc::default();
        let scope_a = Scope::new("a");
        let scope_b = Scope::new("b");
        let shared = recorder(&log, "shared", true);

        bus.subscribe("t", recorder(&log, "first", true), None);
        bus.subscribe("t", shared.clone(), Some(scope_a.clone()));
        bus.subscribe("t", shared.clone(), Some(scope_b.clone()));
        bus.subscribe("t", recorder(&log, "last", true), None);

        assert!(bus.unsubscribe("t", &shared, Some(&scope_a)));
        assert!(!bus.unsubscribe("t", &shared, Some(&scope_a)));
        bus.publish("t", &[]);
        assert_eq!(*log.lock(), vec!["first:[]", "shared:[]", "last:[]"]);
        assert_eq!(bus.subscriber_count("t"), 3);
    }

    #[tokio::test]
    async fn test_publish_unknown_topic_is_noop() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        assert!(session.app_to_cms().publish("nonexistent-topic", &[]));
    }

    // =========================================================================
    // END-TO-END SAVE SCENARIO
    // =========================================================================

    #[tokio::test]
    async fn test_save_scenario_with_scope_identity() {
        struct Editor {
            name: &'static str,
        }

        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let bus = session.app_to_cms();

        let scope_a = Scope::new(Editor { name: "A" });
        let calls: Arc<Mutex<Vec<(bool, &'static str, Vec<Value>)>>> = Arc::default();
        let sink = calls.clone();
        let expected = scope_a.clone();
        let cb = Callback::new(move |scope: &Scope, args: &[Value]| {
            let name = scope.downcast_ref::<Editor>().map_or("?", |e| e.name);
            sink.lock().push((scope.ptr_eq(&expected), name, args.to_vec()));
        });

        bus.subscribe("save", cb.clone(), Some(scope_a.clone()));
        bus.publish("save", &[json!(42)]);
        assert_eq!(*calls.lock(), vec![(true, "A", vec![json!(42)])]);

        assert!(bus.unsubscribe("save", &cb, Some(&scope_a)));
        bus.publish("save", &[json!(43)]);
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_session_bus_has_no_listeners() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let log: Log = Arc::default();
        session
            .cms_to_app()
            .subscribe("t", recorder(&log, "f", true), None);

        registry.close(&session.id()).unwrap();
        assert!(session.cms_to_app().publish("t", &[]));
        assert!(log.lock().is_empty());
    }
}
