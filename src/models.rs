//! Data models and structures
//!
//! Request and response bodies of the public HTTP API.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub prompts: Option<PromptOverrides>,
}

/// Per-request replacements for the configured default prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptOverrides {
    #[serde(default)]
    pub vision: Option<String>,
    #[serde(default)]
    pub thinking: Option<String>,
}

impl PromptOverrides {
    pub fn vision(&self) -> Option<&str> {
        non_blank(self.vision.as_deref())
    }

    pub fn thinking(&self) -> Option<&str> {
        non_blank(self.thinking.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub result_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}
