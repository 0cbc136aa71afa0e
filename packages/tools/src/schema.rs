use serde::{Deserialize, Serialize};
use serde_json::Map;

/// One named capability presented to the driving agent loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: ToolInputSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub type_name: String,
    pub properties: Map<String, serde_json::Value>,
    pub required: Vec<String>,
}

impl ToolInputSchema {
    pub fn object(properties: Map<String, serde_json::Value>, required: &[&str]) -> Self {
        Self {
            type_name: "object".to_string(),
            properties,
            required: required.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Build one schema property entry.
pub(crate) fn property(type_name: &str, description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": type_name,
        "description": description,
    })
}
