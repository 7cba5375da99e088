//! The `{success, message, ...}` envelope handed back to callers.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CatalogError, ErrorKind};

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    /// Operation-specific payload, flattened into the top-level object
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Response {
            success: true,
            message: message.into(),
            error: None,
            data: Map::new(),
        }
    }

    pub fn failure(err: &CatalogError) -> Self {
        Response {
            success: false,
            message: err.to_string(),
            error: Some(err.kind()),
            data: Map::new(),
        }
    }

    /// Attach one payload field
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        self.data.insert(key.to_string(), value);
        self
    }

    /// Process exit status: 0 ok, 1 rejected request, 2 storage unavailable
    pub fn exit_code(&self) -> i32 {
        match self.error {
            None => 0,
            Some(ErrorKind::StorageUnavailable) => 2,
            Some(_) => 1,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| {
            format!(r#"{{"success":{},"message":{:?}}}"#, self.success, self.message)
        })
    }
}
