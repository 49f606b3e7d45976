//! Outbound port: the document fields an extension may read and write.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::RemoteError;

/// Field access granted to a UI extension.
///
/// This is the whole surface: there is no DOM or storage access behind it.
#[async_trait]
pub trait FieldAccess: Send + Sync {
    /// Value at `path` in the document being edited.
    async fn get_field_value(&self, path: &[String]) -> Result<Value, RemoteError>;

    /// Replace the value at `path`.
    async fn set_field_value(&self, value: Value, path: &[String]) -> Result<(), RemoteError>;

    /// Entries of the value list stored at `path`.
    async fn get_value_list(&self, path: &str) -> Result<Value, RemoteError> {
        Err(RemoteError::new(format!("Value list '{path}' is not available")))
    }
}
