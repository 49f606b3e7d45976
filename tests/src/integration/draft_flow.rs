//! # Debounced Drafts
//!
//! Rapid edits to one document produce a single save carrying the last
//! value, delivered to the CMS on the session's `app_to_cms` bus under
//! `document:save-draft`.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use cb_01_frame_bridge::FrameHandle;
    use cb_04_draft_timer::{DraftSaver, DraftScheduler, SaveError};
    use cb_runtime::adapters::DRAFT_SAVE_TOPIC;
    use cb_runtime::{RuntimeConfig, SessionContext, SessionRegistry};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_bus::Callback;
    use std::sync::Arc;
    use std::time::Duration;

    type Saved = Arc<Mutex<Vec<Value>>>;

    fn listen(session: &SessionContext) -> Saved {
        let saved: Saved = Arc::default();
        let sink = saved.clone();
        session.app_to_cms().subscribe(
            DRAFT_SAVE_TOPIC,
            Callback::new(move |_, args: &[Value]| sink.lock().push(Value::Array(args.to_vec()))),
            None,
        );
        saved
    }

    // =========================================================================
    // SESSION DRAFTS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_edits_saves_last_value_once() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let saved = listen(&session);
        let drafts = session.drafts();

        for revision in 1..=5 {
            drafts
                .schedule("doc-1".to_string(), json!({"title": "t", "rev": revision}))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert!(saved.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(
            *saved.lock(),
            vec![json!(["doc-1", {"title": "t", "rev": 5}])]
        );
        assert_eq!(drafts.saves(), 1);
        assert!(!drafts.is_pending(&"doc-1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_documents_debounce_independently() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let saved = listen(&session);

        session.drafts().schedule("doc-1".to_string(), json!("a")).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        session.drafts().schedule("doc-2".to_string(), json!("b")).unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(*saved.lock(), vec![json!(["doc-1", "a"])]);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(
            *saved.lock(),
            vec![json!(["doc-1", "a"]), json!(["doc-2", "b"])]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_delay_is_used() {
        let mut config = RuntimeConfig::default();
        config.drafts.delay_ms = 50;
        let registry = SessionRegistry::new(config);
        let session = registry.open().unwrap();
        let saved = listen(&session);

        assert_eq!(session.drafts().delay(), Duration::from_millis(50));
        session.drafts().schedule("doc-1".to_string(), json!(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(saved.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vetoed_draft_counts_as_failure() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        session
            .app_to_cms()
            .subscribe(DRAFT_SAVE_TOPIC, Callback::new(|_, _| false), None);

        session.drafts().schedule("locked".to_string(), json!({})).unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(session.drafts().saves(), 0);
        assert_eq!(session.drafts().failures(), 1);

        session.drafts().schedule("locked".to_string(), json!({})).unwrap();
        assert!(matches!(
            session.drafts().flush(&"locked".to_string()).await,
            Err(SaveError::Rejected(_))
        ));
        assert_eq!(session.drafts().failures(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_then_close_leaves_nothing_behind() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let saved = listen(&session);

        session.drafts().schedule("doc-1".to_string(), json!("now")).unwrap();
        session.drafts().schedule("doc-2".to_string(), json!("never")).unwrap();
        assert_eq!(session.drafts().flush(&"doc-1".to_string()).await, Ok(true));
        assert_eq!(session.drafts().flush(&"doc-1".to_string()).await, Ok(false));

        registry.close(&session.id()).unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*saved.lock(), vec![json!(["doc-1", "now"])]);
        assert_eq!(session.drafts().pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_session_refuses_new_drafts() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let saved = listen(&session);
        registry.close(&session.id()).unwrap();

        assert_eq!(
            session.drafts().schedule("doc-1".to_string(), json!({"rev": 1})),
            Err(SaveError::ShutDown)
        );
        assert!(session.schedule_draft("doc-1", json!({"rev": 2})).is_err());
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(session.drafts().pending_count(), 0);
        assert_eq!(session.drafts().saves(), 0);
        assert!(saved.lock().is_empty());
    }

    // =========================================================================
    // CUSTOM SAVER OVER A FRAME BRIDGE
    // =========================================================================

    /// Saves by publishing from a preview frame to its host.
    struct FrameSaver {
        handle: FrameHandle,
    }

    #[async_trait]
    impl DraftSaver for FrameSaver {
        type Key = String;
        type Value = Value;

        async fn save(&self, key: &String, value: Value) -> Result<(), SaveError> {
            if self.handle.is_destroyed() {
                return Err(SaveError::Unavailable(format!("frame gone, draft '{key}' lost")));
            }
            self.handle
                .frame()
                .publish("draft", &[json!(key), value])
                .then_some(())
                .ok_or_else(|| SaveError::Rejected(key.clone()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_drafts_reach_host() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let handle = session.frames().register("editor").unwrap();
        let seen: Saved = Arc::default();
        let sink = seen.clone();
        handle.host().subscribe(
            "draft",
            Callback::new(move |_, args: &[Value]| sink.lock().push(Value::Array(args.to_vec()))),
            None,
        );

        let drafts = DraftScheduler::new(
            FrameSaver {
                handle: handle.clone(),
            },
            Duration::from_millis(200),
        );
        drafts.schedule("field:title".to_string(), json!("Hel")).unwrap();
        drafts.schedule("field:title".to_string(), json!("Hello")).unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(*seen.lock(), vec![json!(["field:title", "Hello"])]);

        session.frames().destroy_all();
        drafts.schedule("field:title".to_string(), json!("Hello!")).unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(drafts.failures(), 1);
        assert_eq!(seen.lock().len(), 1);
    }
}
