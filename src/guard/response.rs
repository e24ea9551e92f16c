//! GraphQL response wire shape as seen after execution

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLErrorEntry {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
    /// `locations`, `path` and anything else the executor attached
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl GraphQLErrorEntry {
    pub fn with_code(message: impl Into<String>, code: &str) -> Self {
        let mut extensions = Map::new();
        extensions.insert("code".to_string(), Value::String(code.to_string()));
        Self {
            message: message.into(),
            extensions: Some(extensions),
            other: Map::new(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref()?.get("code")?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLErrorEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQLResponse {
    pub fn from_data(data: Value) -> Self {
        Self {
            data,
            ..Default::default()
        }
    }

    pub fn from_error(error: GraphQLErrorEntry) -> Self {
        Self {
            data: Value::Null,
            errors: vec![error],
            extensions: None,
        }
    }

    pub fn has_error_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code() == Some(code))
    }
}
