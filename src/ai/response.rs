//! Text extraction from model responses.
//!
//! The endpoint answers in one of several JSON layouts depending on the
//! model family. [`ModelResponse::from_json`] classifies a body into the
//! layouts it recognises and [`ModelResponse::text`] flattens them.

use serde_json::Value;

/// A response layout that produced at least one non-blank text fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// Top-level `output_text` string.
    DirectText(String),
    /// Strings found at `output[].content[].text`.
    StructuredOutput(Vec<String>),
    /// Strings found at `choices[].message.content`.
    ChatChoices(Vec<String>),
}

impl ResponseShape {
    fn fragments(&self) -> Vec<&str> {
        match self {
            ResponseShape::DirectText(text) => vec![text.as_str()],
            ResponseShape::StructuredOutput(parts) | ResponseShape::ChatChoices(parts) => {
                parts.iter().map(String::as_str).collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelResponse {
    /// Recognised layouts, in extraction order.
    Recognized(Vec<ResponseShape>),
    /// None of the known layouts carried any text.
    Unrecognized,
}

impl ModelResponse {
    pub fn from_json(body: &Value) -> Self {
        let mut shapes = Vec::new();

        if let Some(text) = body.get("output_text").and_then(Value::as_str) {
            if has_text(text) {
                shapes.push(ResponseShape::DirectText(text.to_string()));
            }
        }

        let structured = structured_output(body);
        if !structured.is_empty() {
            shapes.push(ResponseShape::StructuredOutput(structured));
        }

        let choices = chat_choices(body);
        if !choices.is_empty() {
            shapes.push(ResponseShape::ChatChoices(choices));
        }

        if shapes.is_empty() {
            ModelResponse::Unrecognized
        } else {
            ModelResponse::Recognized(shapes)
        }
    }

    /// All fragments joined by a line break, trimmed. Empty when unrecognised.
    pub fn text(&self) -> String {
        match self {
            ModelResponse::Recognized(shapes) => shapes
                .iter()
                .flat_map(ResponseShape::fragments)
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string(),
            ModelResponse::Unrecognized => String::new(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, ModelResponse::Recognized(_))
    }
}

fn has_text(text: &str) -> bool {
    !text.trim().is_empty()
}

fn structured_output(body: &Value) -> Vec<String> {
    array_at(body, "output")
        .flat_map(|item| array_at(item, "content"))
        .filter_map(|content| content.get("text").and_then(Value::as_str))
        .filter(|text| has_text(text))
        .map(str::to_string)
        .collect()
}

fn chat_choices(body: &Value) -> Vec<String> {
    let mut fragments = Vec::new();
    for choice in array_at(body, "choices") {
        match choice.get("message").and_then(|message| message.get("content")) {
            Some(Value::String(text)) if has_text(text) => fragments.push(text.clone()),
            // Some providers return multipart content here as well.
            Some(Value::Array(parts)) => fragments.extend(
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .filter(|text| has_text(text))
                    .map(str::to_string),
            ),
            _ => {}
        }
    }
    fragments
}

fn array_at<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}
