//! Remote model integration
//!
//! Wraps the hosted multimodal responses API used by both the vision and the
//! reasoning stage. Calls return the raw JSON body; text is pulled out
//! separately by [`response::ModelResponse`].

pub mod client;
pub mod mock;
pub mod response;
pub mod types;

pub use client::ResponsesClient;
pub use mock::MockModelClient;
pub use response::{ModelResponse, ResponseShape};
pub use types::{ContentPart, InputMessage, ModelCallPayload};

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait ModelService: Send + Sync {
    /// Issue one call and return the parsed JSON body.
    async fn create_response(&self, api_key: &str, payload: &ModelCallPayload) -> Result<Value>;
}
