//! # Extension Host
//!
//! Host-side service for one configured UI extension. It decides exactly
//! which methods the extension may call:
//!
//! | Method | Effect |
//! |--------|--------|
//! | `getProperties` | extension config, user, locale, time zone, CMS version and base URL |
//! | `getFieldValue(...path)` | read a document field via [`FieldAccess`] |
//! | `setFieldValue(value, ...path)` | write a document field via [`FieldAccess`] |
//! | `getValueList(path)` | read a value list via [`FieldAccess`] |
//! | `emit(event, payload)` | publish `extension:<event>` on the host bus |
//!
//! Nothing else (DOM, storage, navigation) is reachable from the frame.

use super::communication::CommunicationService;
use super::connection::RemoteApi;
use crate::domain::{MethodMap, OriginError, SandboxPolicy, SandboxedFrame};
use crate::ports::{FieldAccess, Messenger};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_bus::EventPublisher;
use shared_types::{ConnectionError, ExtensionId, RemoteError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Prefix of bus topics carrying events emitted by extensions.
pub const EXTENSION_TOPIC_PREFIX: &str = "extension:";

/// One configured extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionConfig {
    pub id: ExtensionId,
    pub display_name: String,
    pub url: String,
    /// Free-form configuration handed to the extension verbatim.
    #[serde(default)]
    pub config: Option<String>,
}

/// The signed-in CMS user, as shown to extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
}

/// Facts about the host installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostEnvironment {
    pub cms_version: String,
    pub cms_base_url: String,
    pub locale: String,
    pub time_zone: String,
}

#[derive(Debug, Error)]
pub enum ExtensionError {
    #[error("Extension '{extension}' has an unusable URL: {source}")]
    Origin {
        extension: String,
        #[source]
        source: OriginError,
    },

    #[error("Extension '{extension}' failed to connect: {source}")]
    Connection {
        extension: String,
        #[source]
        source: ConnectionError,
    },
}

impl ExtensionError {
    /// The underlying connection error, if the failure was a connection one.
    pub fn connection_error(&self) -> Option<&ConnectionError> {
        match self {
            Self::Connection { source, .. } => Some(source),
            Self::Origin { .. } => None,
        }
    }
}

/// Host side of one UI extension.
pub struct ExtensionHost {
    extension: ExtensionConfig,
    user: UserIdentity,
    environment: HostEnvironment,
    sandbox: SandboxPolicy,
    fields: Option<Arc<dyn FieldAccess>>,
    events: Option<Arc<dyn EventPublisher>>,
    service: CommunicationService,
}

impl ExtensionHost {
    pub fn new(
        extension: ExtensionConfig,
        user: UserIdentity,
        environment: HostEnvironment,
    ) -> Self {
        Self {
            extension,
            user,
            environment,
            sandbox: SandboxPolicy::default(),
            fields: None,
            events: None,
            service: CommunicationService::new(),
        }
    }

    /// Document access for document-field extensions.
    pub fn with_fields(mut self, fields: Arc<dyn FieldAccess>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Bus receiving `extension:<event>` publications.
    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_sandbox(mut self, sandbox: SandboxPolicy) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.service = CommunicationService::with_timeout(timeout);
        self
    }

    pub fn extension(&self) -> &ExtensionConfig {
        &self.extension
    }

    pub fn service(&self) -> &CommunicationService {
        &self.service
    }

    /// The payload answered to `getProperties`.
    pub fn properties(&self) -> Value {
        json!({
            "baseUrl": self.environment.cms_base_url,
            "extension": {
                "config": self.extension.config,
                "displayName": self.extension.display_name,
                "id": self.extension.id,
                "url": self.extension.url,
            },
            "locale": self.environment.locale,
            "timeZone": self.environment.time_zone,
            "user": self.user,
            "version": self.environment.cms_version,
        })
    }

    /// The sandboxed frame for this extension.
    pub fn frame(&self) -> Result<SandboxedFrame, OriginError> {
        SandboxedFrame::with_sandbox(
            self.extension.id.as_str(),
            &self.extension.url,
            self.sandbox.clone(),
        )
    }

    /// The methods exposed to the extension.
    pub fn method_map(&self) -> MethodMap {
        let properties = self.properties();
        let mut methods = MethodMap::new().with("getProperties", move |_| {
            let properties = properties.clone();
            async move { Ok(properties) }
        });

        if let Some(fields) = &self.fields {
            let reader = fields.clone();
            methods.register("getFieldValue", move |args: Vec<Value>| {
                let reader = reader.clone();
                async move {
                    let path = path_args(&args)?;
                    reader.get_field_value(&path).await
                }
            });

            let writer = fields.clone();
            methods.register("setFieldValue", move |args: Vec<Value>| {
                let writer = writer.clone();
                async move {
                    let mut args = args.into_iter();
                    let value = args
                        .next()
                        .ok_or_else(|| RemoteError::new("setFieldValue needs a value"))?;
                    let path = path_args(&args.collect::<Vec<_>>())?;
                    writer.set_field_value(value, &path).await?;
                    Ok(Value::Null)
                }
            });

            let lists = fields.clone();
            methods.register("getValueList", move |args: Vec<Value>| {
                let lists = lists.clone();
                async move {
                    let path = args
                        .first()
                        .and_then(Value::as_str)
                        .ok_or_else(|| RemoteError::new("getValueList needs a path"))?
                        .to_string();
                    lists.get_value_list(&path).await
                }
            });
        }

        if let Some(events) = &self.events {
            let events = events.clone();
            methods.register("emit", move |args: Vec<Value>| {
                let events = events.clone();
                async move {
                    let event = args
                        .first()
                        .and_then(Value::as_str)
                        .ok_or_else(|| RemoteError::new("emit needs an event name"))?;
                    let payload = args.get(1).cloned().unwrap_or(Value::Null);
                    let topic = format!("{EXTENSION_TOPIC_PREFIX}{event}");
                    Ok(Value::Bool(events.publish(&topic, &[payload])))
                }
            });
        }
        methods
    }

    /// Build the frame and run the handshake over `messenger`.
    ///
    /// # Errors
    ///
    /// A failed handshake is logged with the extension's display name and
    /// then returned.
    pub async fn connect(
        &self,
        messenger: Arc<dyn Messenger>,
    ) -> Result<RemoteApi, ExtensionError> {
        let frame = self.frame().map_err(|source| {
            error!(
                extension = %self.extension.display_name,
                error = %source,
                "Invalid extension URL"
            );
            ExtensionError::Origin {
                extension: self.extension.display_name.clone(),
                source,
            }
        })?;

        match self
            .service
            .connect(frame, None, self.method_map(), messenger)
            .await
        {
            Ok(api) => {
                info!(extension = %self.extension.display_name, "Extension connected");
                Ok(api)
            }
            Err(source) => {
                error!(
                    extension = %self.extension.display_name,
                    error = %source,
                    "Failed to connect with UI extension"
                );
                Err(ExtensionError::Connection {
                    extension: self.extension.display_name.clone(),
                    source,
                })
            }
        }
    }

    /// Forward a host event to the extension. No-op when not connected.
    pub fn emit(&self, event: &str, payload: Value) {
        self.service.emit(event, payload);
    }

    pub fn disconnect(&self) {
        self.service.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.service.is_connected()
    }
}

impl std::fmt::Debug for ExtensionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionHost")
            .field("extension", &self.extension)
            .field("user", &self.user)
            .field("environment", &self.environment)
            .field("sandbox", &self.sandbox)
            .field("fields", &self.fields.is_some())
            .field("events", &self.events.is_some())
            .field("service", &self.service)
            .finish()
    }
}

/// Path segments passed as trailing string arguments.
fn path_args(args: &[Value]) -> Result<Vec<String>, RemoteError> {
    if args.is_empty() {
        return Err(RemoteError::new("Field path is empty"));
    }
    args.iter()
        .map(|segment| {
            segment
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| RemoteError::new(format!("Invalid path segment {segment}")))
        })
        .collect()
}
