//! JSON-backed implementation of [`FieldAccess`].

use crate::ports::FieldAccess;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use shared_types::RemoteError;
use std::collections::HashMap;

/// A document held as a JSON object, plus named value lists.
#[derive(Debug, Default)]
pub struct JsonDocument {
    fields: RwLock<Value>,
    value_lists: RwLock<HashMap<String, Value>>,
}

impl JsonDocument {
    pub fn new(fields: Value) -> Self {
        Self {
            fields: RwLock::new(fields),
            value_lists: RwLock::default(),
        }
    }

    pub fn with_value_list(self, path: impl Into<String>, entries: Value) -> Self {
        self.value_lists.write().insert(path.into(), entries);
        self
    }

    /// Current document contents.
    pub fn snapshot(&self) -> Value {
        self.fields.read().clone()
    }
}

fn missing(path: &[String]) -> RemoteError {
    RemoteError::new(format!("Field '{}' does not exist", path.join("/")))
}

#[async_trait]
impl FieldAccess for JsonDocument {
    async fn get_field_value(&self, path: &[String]) -> Result<Value, RemoteError> {
        let fields = self.fields.read();
        let mut current = &*fields;
        for segment in path {
            current = current.get(segment).ok_or_else(|| missing(path))?;
        }
        Ok(current.clone())
    }

    async fn set_field_value(&self, value: Value, path: &[String]) -> Result<(), RemoteError> {
        let Some((last, parents)) = path.split_last() else {
            return Err(RemoteError::new("Field path is empty"));
        };
        let mut fields = self.fields.write();
        if fields.is_null() {
            *fields = Value::Object(Map::new());
        }
        let mut current = &mut *fields;
        for segment in parents {
            let object = current.as_object_mut().ok_or_else(|| missing(path))?;
            current = object
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        let object = current.as_object_mut().ok_or_else(|| missing(path))?;
        object.insert(last.clone(), value);
        Ok(())
    }

    async fn get_value_list(&self, path: &str) -> Result<Value, RemoteError> {
        self.value_lists
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteError::new(format!("Value list '{path}' does not exist")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_get_nested() {
        let doc = JsonDocument::new(json!({"seo": {"title": "Home"}}));
        assert_eq!(doc.get_field_value(&path(&["seo", "title"])).await, Ok(json!("Home")));
        assert!(doc.get_field_value(&path(&["seo", "missing"])).await.is_err());
    }

    #[tokio::test]
    async fn test_set_creates_parents() {
        let doc = JsonDocument::default();
        doc.set_field_value(json!(3), &path(&["a", "b"])).await.unwrap();
        assert_eq!(doc.snapshot(), json!({"a": {"b": 3}}));
        assert!(doc.set_field_value(json!(1), &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_value_lists() {
        let doc = JsonDocument::default().with_value_list("/colors", json!(["red"]));
        assert_eq!(doc.get_value_list("/colors").await, Ok(json!(["red"])));
        assert!(doc.get_value_list("/sizes").await.is_err());
    }
}
