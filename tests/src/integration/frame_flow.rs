//! # Same-Process Frame Flow
//!
//! Host registers a preview frame in its session, the frame side looks the
//! handle up and both directions carry events. The frame's document is then
//! scanned for HST comments and the summary travels frame ──► host.

#[cfg(test)]
mod tests {
    use cb_03_hst_comments::{DomTree, HstType, StructureWarning};
    use cb_runtime::container::PAGE_STRUCTURE_TOPIC;
    use cb_runtime::{RuntimeConfig, SessionRegistry};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_bus::Callback;
    use shared_types::{FrameId, LookupError};
    use std::sync::Arc;

    fn sink() -> (Arc<Mutex<Vec<Value>>>, Callback) {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let target = seen.clone();
        let callback = Callback::new(move |_, args: &[Value]| {
            target.lock().extend(args.iter().cloned());
        });
        (seen, callback)
    }

    #[tokio::test]
    async fn test_host_and_frame_exchange_events() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();

        let host_handle = session.frames().register("preview").unwrap();
        let frame_handle = session.frames().lookup(&FrameId::new("preview")).unwrap();
        assert!(host_handle.same_frame(&frame_handle));

        let (frame_seen, frame_cb) = sink();
        frame_handle.frame().subscribe("channel:changed", frame_cb, None);
        let (host_seen, host_cb) = sink();
        host_handle.host().subscribe("page:rendered", host_cb, None);

        assert!(host_handle.host().publish("channel:changed", &[json!("live")]));
        assert!(frame_handle.frame().publish("page:rendered", &[json!({"path": "/"})]));

        assert_eq!(*frame_seen.lock(), vec![json!("live")]);
        assert_eq!(*host_seen.lock(), vec![json!({"path": "/"})]);
    }

    #[tokio::test]
    async fn test_missing_frame_lookup_errors() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();

        let err = session
            .frames()
            .lookup(&FrameId::new("dialog"))
            .unwrap_err();
        assert_eq!(err, LookupError::FrameNotFound(FrameId::new("dialog")));
        assert!(err.to_string().contains("dialog"));

        session.frames().register("dialog").unwrap();
        assert_eq!(
            session.frames().register("dialog").unwrap_err(),
            LookupError::FrameAlreadyRegistered(FrameId::new("dialog"))
        );
    }

    #[tokio::test]
    async fn test_removed_frame_endpoints_go_quiet() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let handle = session.frames().register("preview").unwrap();
        let (seen, callback) = sink();
        handle.frame().subscribe("t", callback.clone(), None);

        session.frames().remove(&FrameId::new("preview")).unwrap();
        assert!(handle.is_destroyed());
        assert!(handle.host().publish("t", &[json!(1)]));
        handle.frame().subscribe("t", callback, None);
        handle.host().publish("t", &[json!(2)]);
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_page_scan_reaches_host() {
        let registry = SessionRegistry::new(RuntimeConfig::default());
        let session = registry.open().unwrap();
        let handle = session.frames().register("preview").unwrap();
        let (summaries, callback) = sink();
        handle.host().subscribe(PAGE_STRUCTURE_TOPIC, callback, None);

        let mut document = DomTree::new();
        let html = document.append_element(document.root(), "html");
        let body = document.append_element(html, "body");
        document.append_comment(body, r#"{"HST-Type":"PAGE-META-DATA","HST-Render-Variant":""}"#);
        document.append_comment(
            body,
            r#"{"HST-Type":"CONTAINER_COMPONENT","uuid":"main","label":"Main"}"#,
        );
        let item = document.append_element_with(body, "div", &[("class", "hst-container-item")]);
        document.append_comment(item, r#"{"HST-Type":"CONTAINER_ITEM_COMPONENT","uuid":"banner"}"#);
        document.append_comment(item, r#"{"HST-Type":"CONTAINER_ITEM_COMPONENT", oops}"#);
        document.append_comment(item, r#"{"HST-End":"true","uuid":"banner"}"#);
        document.append_comment(body, r#"{"HST-End":"true","uuid":"main"}"#);
        document.append_comment(body, r#"{"HST-End":"true","uuid":"ghost"}"#);
        document.append_comment(body, r#"{"HST-Type":"MANAGE_CONTENT_LINK","uuid":"l"}"#);

        let structure = session
            .scan_page(&FrameId::new("preview"), &document)
            .unwrap();

        let main = structure.container("main").unwrap();
        assert_eq!(main.comment.label(), Some("Main"));
        assert_eq!(main.items[0].comment.hst_type(), Some(&HstType::ContainerItem));
        assert_eq!(structure.page_meta.len(), 1);
        assert_eq!(structure.content_links.len(), 1);
        assert!(matches!(
            structure.warnings.as_slice(),
            [StructureWarning::OrphanEnd { .. }]
        ));

        let summary = &summaries.lock()[0];
        assert_eq!(summary["containers"], json!(1));
        assert_eq!(summary["items"], json!(1));
        assert_eq!(summary["contentLinks"], json!(1));
        assert_eq!(summary["warnings"].as_array().map(Vec::len), Some(1));
    }
}
