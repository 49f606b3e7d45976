//! Draft saver that hands drafts to the CMS over the session bus.

use super::metered::MeteredPublisher;
use async_trait::async_trait;
use cb_04_draft_timer::{DraftSaver, SaveError};
use cb_telemetry::DRAFT_SAVES;
use serde_json::Value;
use shared_bus::EventPublisher;
use tracing::debug;

/// Topic carrying `[document_id, draft]` to the CMS.
pub const DRAFT_SAVE_TOPIC: &str = "document:save-draft";

/// Publishes each draft on [`DRAFT_SAVE_TOPIC`]. A subscriber that vetoes
/// the dispatch rejects the draft.
#[derive(Debug, Clone)]
pub struct BusDraftSaver {
    publisher: MeteredPublisher,
}

impl BusDraftSaver {
    pub fn new(publisher: MeteredPublisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl DraftSaver for BusDraftSaver {
    type Key = String;
    type Value = Value;

    async fn save(&self, key: &String, value: Value) -> Result<(), SaveError> {
        let delivered = self
            .publisher
            .publish(DRAFT_SAVE_TOPIC, &[Value::String(key.clone()), value]);
        if delivered {
            DRAFT_SAVES.with_label_values(&["saved"]).inc();
            debug!(document = %key, "Draft handed to CMS");
            Ok(())
        } else {
            DRAFT_SAVES.with_label_values(&["failed"]).inc();
            Err(SaveError::Rejected(format!("draft for '{key}' was vetoed")))
        }
    }
}
