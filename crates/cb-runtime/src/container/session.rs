//! # Session Context
//!
//! Everything one Channel Manager session owns. Nothing here is global:
//! two sessions never share a bus, a frame or a timer.
//!
//! ```text
//! SessionContext
//! ├── app_to_cms: MessageBus      (app ──► CMS, extension events, drafts)
//! ├── cms_to_app: MessageBus      (CMS ──► app)
//! ├── frames: FrameRegistry       (same-process preview frames, dialogs)
//! ├── extensions: ExtensionId ──► ExtensionHost (created on demand)
//! └── drafts: DraftScheduler<BusDraftSaver>
//! ```

use super::config::{ConfigError, RuntimeConfig};
use crate::adapters::{BusDraftSaver, MeteredPublisher};
use crate::wiring;
use cb_01_frame_bridge::FrameRegistry;
use cb_02_sandbox_rpc::{
    ExtensionConfig, ExtensionError, ExtensionHost, FieldAccess, Messenger, RemoteApi,
    SandboxPolicy, UserIdentity,
};
use cb_03_hst_comments::{DomTree, PageStructure};
use cb_04_draft_timer::{DraftScheduler, TimerId};
use cb_telemetry::EXTENSION_CONNECTS;
use parking_lot::RwLock;
use serde_json::{json, Value};
use shared_bus::MessageBus;
use shared_types::{ConnectionError, ExtensionId, FrameId, LookupError, SessionId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Topic the frame side publishes a scanned page structure on.
pub const PAGE_STRUCTURE_TOPIC: &str = "page:structure";

pub struct SessionContext {
    id: SessionId,
    config: RuntimeConfig,
    sandbox: SandboxPolicy,
    app_to_cms: MessageBus,
    cms_to_app: MessageBus,
    frames: FrameRegistry,
    extensions: RwLock<HashMap<ExtensionId, Arc<ExtensionHost>>>,
    drafts: DraftScheduler<BusDraftSaver>,
    closed: AtomicBool,
}

impl SessionContext {
    /// Build a session with fresh buses, monitors installed.
    ///
    /// Must be called within a Tokio runtime; draft timers spawn onto it.
    ///
    /// # Errors
    ///
    /// `InvalidSandbox` when the configured sandbox attribute is rejected.
    pub fn new(id: SessionId, config: RuntimeConfig) -> Result<Self, ConfigError> {
        let sandbox = config.rpc.sandbox_policy()?;
        let app_to_cms = MessageBus::new(format!("app-to-cms:{id}"));
        let cms_to_app = MessageBus::new(format!("cms-to-app:{id}"));
        wiring::install(&app_to_cms);
        wiring::install(&cms_to_app);

        let drafts = DraftScheduler::new(
            BusDraftSaver::new(MeteredPublisher::new(app_to_cms.clone())),
            config.drafts.delay(),
        );

        debug!(session = %id, "Session context created");
        Ok(Self {
            id,
            config,
            sandbox,
            app_to_cms,
            cms_to_app,
            frames: FrameRegistry::new(),
            extensions: RwLock::new(HashMap::new()),
            drafts,
            closed: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn app_to_cms(&self) -> &MessageBus {
        &self.app_to_cms
    }

    pub fn cms_to_app(&self) -> &MessageBus {
        &self.cms_to_app
    }

    pub fn frames(&self) -> &FrameRegistry {
        &self.frames
    }

    /// The session's draft scheduler. It refuses new drafts once the
    /// session is closed.
    pub fn drafts(&self) -> &DraftScheduler<BusDraftSaver> {
        &self.drafts
    }

    /// Schedule a debounced save of `draft` for `document`.
    ///
    /// # Errors
    ///
    /// `SessionClosed` after [`close`](Self::close).
    pub fn schedule_draft(&self, document: &str, draft: Value) -> Result<TimerId, LookupError> {
        self.ensure_open()?;
        self.drafts
            .schedule(document.to_string(), draft)
            .map_err(|_| LookupError::SessionClosed(self.id))
    }

    /// The extension slot for `extension`, created on first use.
    ///
    /// Extension events are published on `app_to_cms`. `fields` is only
    /// used when the slot is created.
    ///
    /// # Errors
    ///
    /// `SessionClosed` after [`close`](Self::close).
    pub fn extension(
        &self,
        extension: ExtensionConfig,
        user: UserIdentity,
        fields: Option<Arc<dyn FieldAccess>>,
    ) -> Result<Arc<ExtensionHost>, LookupError> {
        self.ensure_open()?;
        if let Some(host) = self.extensions.read().get(&extension.id) {
            return Ok(host.clone());
        }

        let mut extensions = self.extensions.write();
        // close() drains under this lock after setting the flag
        self.ensure_open()?;
        let host = extensions
            .entry(extension.id.clone())
            .or_insert_with(|| {
                debug!(
                    session = %self.id,
                    extension = %extension.display_name,
                    "Extension slot created"
                );
                let events = Arc::new(MeteredPublisher::new(self.app_to_cms.clone()));
                let mut host = ExtensionHost::new(extension, user, self.config.host.environment())
                    .with_sandbox(self.sandbox.clone())
                    .with_timeout(self.config.rpc.connect_timeout())
                    .with_events(events);
                if let Some(fields) = fields {
                    host = host.with_fields(fields);
                }
                Arc::new(host)
            })
            .clone();
        Ok(host)
    }

    /// Run the handshake for `host` and record the outcome.
    ///
    /// A session closed before or during the handshake leaves `host`
    /// disconnected and fails with `Destroyed`.
    ///
    /// # Errors
    ///
    /// Whatever [`ExtensionHost::connect`] returns.
    pub async fn connect_extension(
        &self,
        host: &ExtensionHost,
        messenger: Arc<dyn Messenger>,
    ) -> Result<RemoteApi, ExtensionError> {
        let closed = || ExtensionError::Connection {
            extension: host.extension().display_name.clone(),
            source: ConnectionError::Destroyed,
        };
        if self.is_closed() {
            return Err(closed());
        }

        let mut outcome = host.connect(messenger).await;
        if outcome.is_ok() && self.is_closed() {
            host.disconnect();
            outcome = Err(closed());
        }
        let label = if outcome.is_ok() { "connected" } else { "failed" };
        EXTENSION_CONNECTS.with_label_values(&[label]).inc();
        outcome
    }

    /// # Errors
    ///
    /// `ExtensionNotFound` when no slot exists for `id`.
    pub fn find_extension(&self, id: &ExtensionId) -> Result<Arc<ExtensionHost>, LookupError> {
        self.extensions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| LookupError::ExtensionNotFound(id.clone()))
    }

    /// Disconnect and drop the slot for `id`.
    ///
    /// # Errors
    ///
    /// `ExtensionNotFound` when no slot exists for `id`.
    pub fn remove_extension(&self, id: &ExtensionId) -> Result<(), LookupError> {
        let host = self
            .extensions
            .write()
            .remove(id)
            .ok_or_else(|| LookupError::ExtensionNotFound(id.clone()))?;
        host.disconnect();
        Ok(())
    }

    /// Forward a host event to every extension slot. Unconnected slots
    /// ignore it.
    pub fn emit_to_extensions(&self, event: &str, payload: &Value) {
        let hosts: Vec<Arc<ExtensionHost>> = self.extensions.read().values().cloned().collect();
        for host in hosts {
            host.emit(event, payload.clone());
        }
    }

    #[must_use]
    pub fn extension_count(&self) -> usize {
        self.extensions.read().len()
    }

    /// Scan the document loaded in `frame` and publish a summary on its
    /// frame-to-host bus.
    ///
    /// # Errors
    ///
    /// `SessionClosed` after [`close`](Self::close), `FrameNotFound` when
    /// `frame` is not registered.
    pub fn scan_page(
        &self,
        frame: &FrameId,
        document: &DomTree,
    ) -> Result<PageStructure, LookupError> {
        self.ensure_open()?;
        let handle = self.frames.lookup(frame)?;
        let structure = PageStructure::scan(document, document.root());
        let summary = json!({
            "containers": structure.containers.len(),
            "items": structure.item_count(),
            "menuLinks": structure.menu_links.len(),
            "contentLinks": structure.content_links.len(),
            "warnings": structure.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        handle.frame().publish(PAGE_STRUCTURE_TOPIC, &[summary]);
        Ok(structure)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), LookupError> {
        if self.is_closed() {
            return Err(LookupError::SessionClosed(self.id));
        }
        Ok(())
    }

    /// Tear down timers, connections, frames and both buses. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let cancelled = self.drafts.shutdown();
        let hosts: Vec<Arc<ExtensionHost>> =
            self.extensions.write().drain().map(|(_, host)| host).collect();
        for host in &hosts {
            host.disconnect();
        }
        self.frames.destroy_all();
        self.app_to_cms.clear();
        self.cms_to_app.clear();
        info!(
            session = %self.id,
            drafts_cancelled = cancelled,
            extensions = hosts.len(),
            "Session closed"
        );
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("id", &self.id)
            .field("frames", &self.frames.len())
            .field("extensions", &self.extension_count())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
