use super::types::ModelCallPayload;
use super::ModelService;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A call observed by [`MockModelClient`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub api_key: String,
    pub payload: ModelCallPayload,
    /// How many earlier calls had already finished when this one started.
    pub completed_before: usize,
}

/// In-memory [`ModelService`] that records calls and replays canned bodies.
pub struct MockModelClient {
    responses: Arc<Mutex<Vec<Value>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    completed: Arc<Mutex<usize>>,
    fail_on_call: Option<(usize, u16)>,
    delay: Option<Duration>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            completed: Arc::new(Mutex::new(0)),
            fail_on_call: None,
            delay: None,
        }
    }

    /// Queue a body; queued bodies are replayed in order, cycling.
    pub fn with_response(self, response: Value) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    /// Shorthand for a body with a top-level `output_text`.
    pub fn with_text_response(self, text: &str) -> Self {
        self.with_response(serde_json::json!({ "output_text": text }))
    }

    /// Make the `call`-th call (1-based) fail with an upstream status.
    pub fn failing_on_call(mut self, call: usize, status: u16) -> Self {
        self.fail_on_call = Some((call, status));
        self
    }

    /// Hold every call open for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls addressed to `model`, in the order they were issued.
    pub fn calls_for_model(&self, model: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.payload.model == model)
            .collect()
    }
}

impl Default for MockModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelService for MockModelClient {
    async fn create_response(&self, api_key: &str, payload: &ModelCallPayload) -> Result<Value> {
        let call_number = {
            let completed_before = *self.completed.lock().unwrap();
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                api_key: api_key.to_string(),
                payload: payload.clone(),
                completed_before,
            });
            calls.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = match self.fail_on_call {
            Some((call, status)) if call == call_number => Err(Error::UpstreamStatus {
                status,
                body: "mock failure".to_string(),
            }),
            _ => {
                let responses = self.responses.lock().unwrap();
                if responses.is_empty() {
                    // Default mock response
                    Ok(serde_json::json!({
                        "output_text": format!("mock response {}", call_number)
                    }))
                } else {
                    Ok(responses[(call_number - 1) % responses.len()].clone())
                }
            }
        };

        *self.completed.lock().unwrap() += 1;
        result
    }
}
