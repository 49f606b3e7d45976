//! # Sandboxed Extension Flow
//!
//! ```text
//! SessionContext ──extension()──► ExtensionHost ──connect──► handshake ◄── child frame
//!       ▲                              │                                    │
//!       └──── extension:<event> ◄──────┴──── emit / getFieldValue / ... ◄───┘
//! ```
//!
//! The child side runs `connect_to_parent` over the other end of an
//! in-memory postMessage channel.

#[cfg(test)]
mod tests {
    use cb_02_sandbox_rpc::{
        connect_to_parent, ChannelEnd, Connection, ExtensionConfig, FieldAccess, InMemoryChannel,
        JsonDocument, MethodMap, Origin, ParentOptions, SandboxPolicy, SandboxedFrame,
        UserIdentity, EMIT_METHOD, EXTENSION_TOPIC_PREFIX,
    };
    use cb_runtime::{RuntimeConfig, SessionContext, SessionRegistry};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_bus::Callback;
    use shared_types::{ConnectionError, ExtensionId};
    use std::sync::Arc;
    use std::time::Duration;

    const HOST: &str = "https://cms.example.com";
    const EXTENSION_ORIGIN: &str = "https://seo.example.com";

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn seo_extension() -> ExtensionConfig {
        ExtensionConfig {
            id: ExtensionId::new("seo"),
            display_name: "SEO Checker".to_string(),
            url: format!("{EXTENSION_ORIGIN}/index.html"),
            config: Some(r#"{"strict":true}"#.to_string()),
        }
    }

    fn editor() -> UserIdentity {
        UserIdentity {
            id: "admin".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Admin".to_string(),
            display_name: "Ada Admin".to_string(),
        }
    }

    /// Child frame exposing a recording `emit`.
    fn spawn_child(end: ChannelEnd) -> (Connection, Arc<Mutex<Vec<Value>>>) {
        let received: Arc<Mutex<Vec<Value>>> = Arc::default();
        let sink = received.clone();
        let methods = MethodMap::new().with(EMIT_METHOD, move |args: Vec<Value>| {
            let sink = sink.clone();
            async move {
                sink.lock().push(Value::Array(args));
                Ok(Value::Null)
            }
        });
        let child = connect_to_parent(
            ParentOptions::new(Origin::Exact(HOST.to_string())).with_methods(methods),
            Arc::new(end),
        );
        (child, received)
    }

    fn open_session() -> (SessionRegistry, Arc<SessionContext>) {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        (registry, session)
    }

    // =========================================================================
    // HANDSHAKE AND METHODS
    // =========================================================================

    #[tokio::test]
    async fn test_extension_reads_and_writes_document() {
        let (_registry, session) = open_session();
        let document = Arc::new(JsonDocument::new(json!({"seo": {"title": "Home"}})));
        let host = session
            .extension(
                seo_extension(),
                editor(),
                Some(document.clone() as Arc<dyn FieldAccess>),
            )
            .unwrap();

        let (host_end, child_end) = InMemoryChannel::pair(HOST, EXTENSION_ORIGIN);
        let (child, _) = spawn_child(child_end);
        let api = session
            .connect_extension(&host, Arc::new(host_end))
            .await
            .unwrap();
        assert!(api.has_method(EMIT_METHOD));
        assert!(host.is_connected());

        let parent = child.remote_api().await.unwrap();
        let properties = parent.call("getProperties", vec![]).await.unwrap();
        assert_eq!(properties["extension"]["displayName"], json!("SEO Checker"));
        assert_eq!(properties["extension"]["config"], json!(r#"{"strict":true}"#));
        assert_eq!(properties["user"]["displayName"], json!("Ada Admin"));
        assert_eq!(properties["locale"], json!("en"));

        assert_eq!(
            parent
                .call("getFieldValue", vec![json!("seo"), json!("title")])
                .await,
            Ok(json!("Home"))
        );
        parent
            .call(
                "setFieldValue",
                vec![json!("Landing"), json!("seo"), json!("title")],
            )
            .await
            .unwrap();
        assert_eq!(document.snapshot(), json!({"seo": {"title": "Landing"}}));

        assert!(matches!(
            parent.call("getFieldValue", vec![json!("missing")]).await,
            Err(ConnectionError::Remote { .. })
        ));
        assert_eq!(
            parent.call("navigateTop", vec![]).await,
            Err(ConnectionError::MethodNotFound("navigateTop".to_string()))
        );
    }

    #[tokio::test]
    async fn test_events_flow_both_ways() {
        let (_registry, session) = open_session();
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let sink = seen.clone();
        session.app_to_cms().subscribe(
            &format!("{EXTENSION_TOPIC_PREFIX}score"),
            Callback::new(move |_, args: &[Value]| sink.lock().extend(args.iter().cloned())),
            None,
        );

        let host = session.extension(seo_extension(), editor(), None).unwrap();
        let (host_end, child_end) = InMemoryChannel::pair(HOST, EXTENSION_ORIGIN);
        let (child, received) = spawn_child(child_end);
        host.connect(Arc::new(host_end)).await.unwrap();
        let parent = child.remote_api().await.unwrap();

        // extension ──► host bus
        assert_eq!(
            parent.call("emit", vec![json!("score"), json!(87)]).await,
            Ok(json!(true))
        );
        assert_eq!(*seen.lock(), vec![json!(87)]);

        // host ──► extension
        session.emit_to_extensions("document:saved", &json!({"id": "doc-1"}));
        session.emit_to_extensions("document:published", &json!({"id": "doc-1"}));
        host.service()
            .call(EMIT_METHOD, vec![json!("sync"), Value::Null])
            .await
            .unwrap();
        let delivered = tokio::time::timeout(Duration::from_secs(5), async {
            while received.lock().len() < 3 {
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(delivered.is_ok());

        let received = received.lock().clone();
        assert!(received.contains(&json!(["sync", null])));
        let notified: Vec<&Value> = received.iter().filter(|args| args[0] != "sync").collect();
        assert_eq!(
            notified,
            [
                &json!(["document:saved", {"id": "doc-1"}]),
                &json!(["document:published", {"id": "doc-1"}])
            ]
        );
    }

    #[tokio::test]
    async fn test_emit_without_connection_is_noop() {
        let (_registry, session) = open_session();
        let host = session.extension(seo_extension(), editor(), None).unwrap();
        host.emit("document:saved", json!({}));
        session.emit_to_extensions("document:saved", &json!({}));
        assert!(!host.is_connected());
        assert_eq!(
            host.service().call("anything", vec![]).await,
            Err(ConnectionError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_disconnect_rejects_later_calls() {
        let (_registry, session) = open_session();
        let host = session.extension(seo_extension(), editor(), None).unwrap();
        let (host_end, child_end) = InMemoryChannel::pair(HOST, EXTENSION_ORIGIN);
        let (_child, _) = spawn_child(child_end);
        let api = host.connect(Arc::new(host_end)).await.unwrap();

        host.disconnect();
        host.disconnect();
        assert!(!api.is_connected());
        assert_eq!(
            api.call(EMIT_METHOD, vec![]).await,
            Err(ConnectionError::Destroyed)
        );
    }

    #[tokio::test]
    async fn test_closing_session_disconnects_extensions() {
        let (registry, session) = open_session();
        let host = session.extension(seo_extension(), editor(), None).unwrap();
        let (host_end, child_end) = InMemoryChannel::pair(HOST, EXTENSION_ORIGIN);
        let (_child, _) = spawn_child(child_end);
        host.connect(Arc::new(host_end)).await.unwrap();

        registry.close(&session.id()).unwrap();
        assert!(!host.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout_is_reported() {
        let mut config = RuntimeConfig::default();
        config.rpc.connect_timeout_secs = 2;
        let registry = SessionRegistry::new(config);
        let session = registry.open().unwrap();
        let host = session.extension(seo_extension(), editor(), None).unwrap();

        // nobody answers on the other end
        let (host_end, _child_end) = InMemoryChannel::pair(HOST, EXTENSION_ORIGIN);
        let err = session
            .connect_extension(&host, Arc::new(host_end))
            .await
            .unwrap_err();
        assert_eq!(
            err.connection_error(),
            Some(&ConnectionError::Timeout { timeout_ms: 2000 })
        );
        assert!(err.to_string().contains("SEO Checker"));
        assert!(host.service().current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_from_foreign_origin_never_connects() {
        let (_registry, session) = open_session();
        let host = session.extension(seo_extension(), editor(), None).unwrap();
        let (host_end, child_end) = InMemoryChannel::pair(HOST, "https://evil.example.com");
        let (_child, _) = spawn_child(child_end);

        let connect = host.connect(Arc::new(host_end));
        let outcome = tokio::time::timeout(Duration::from_secs(60), connect).await;
        assert!(matches!(
            outcome,
            Ok(Err(ref err))
                if err.connection_error() == Some(&ConnectionError::Timeout { timeout_ms: 30_000 })
        ));
    }

    // =========================================================================
    // SANDBOX
    // =========================================================================

    #[test]
    fn test_frames_never_allow_top_navigation() {
        let policies = [
            SandboxPolicy::default(),
            SandboxPolicy::locked_down(),
            SandboxPolicy::parse("allow-scripts allow-same-origin allow-modals").unwrap(),
        ];
        for policy in policies {
            let frame = SandboxedFrame::with_sandbox("ext", "https://ext.example.com/", policy)
                .unwrap();
            let attribute = frame.sandbox_attribute();
            for token in attribute.split_whitespace() {
                assert_ne!(token, "allow-top-navigation");
                assert_ne!(token, "allow-top-navigation-by-user-activation");
            }
        }

        for forbidden in [
            "allow-top-navigation",
            "allow-scripts allow-top-navigation-by-user-activation",
            "ALLOW-TOP-NAVIGATION",
        ] {
            assert!(SandboxPolicy::parse(forbidden).is_err(), "{forbidden}");
        }
        assert!(SandboxPolicy::default()
            .allow("allow-top-navigation")
            .is_err());
    }

    #[tokio::test]
    async fn test_session_sandbox_comes_from_config() {
        let mut config = RuntimeConfig::default();
        config.rpc.sandbox = Some("allow-scripts".to_string());
        let registry = SessionRegistry::new(config);
        let session = registry.open().unwrap();
        let host = session.extension(seo_extension(), editor(), None).unwrap();
        assert_eq!(host.frame().unwrap().sandbox_attribute(), "allow-scripts");
    }
}
