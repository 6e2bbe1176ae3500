//! Request payloads for the hosted responses endpoint.

use serde::{Deserialize, Serialize};

/// Top-level request body: `{ model, input: [{ role, content }] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCallPayload {
    pub model: String,
    pub input: Vec<InputMessage>,
}

impl ModelCallPayload {
    /// Single user turn carrying `content` in order.
    pub fn user(model: impl Into<String>, content: Vec<ContentPart>) -> Self {
        Self {
            model: model.into(),
            input: vec![InputMessage {
                role: "user".to_string(),
                content,
            }],
        }
    }

    pub fn image_count(&self) -> usize {
        self.parts()
            .filter(|part| matches!(part, ContentPart::InputImage { .. }))
            .count()
    }

    /// Concatenated text parts, mostly useful for logs and assertions.
    pub fn text(&self) -> String {
        self.parts()
            .filter_map(|part| match part {
                ContentPart::InputText { text } => Some(text.as_str()),
                ContentPart::InputImage { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn parts(&self) -> impl Iterator<Item = &ContentPart> {
        self.input.iter().flat_map(|message| message.content.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// One content segment in a multipart user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    /// `image_url` is either a `data:` URI or a fetchable URL.
    InputImage { image_url: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::InputText { text: text.into() }
    }

    pub fn image(image_url: impl Into<String>) -> Self {
        ContentPart::InputImage {
            image_url: image_url.into(),
        }
    }
}
