//! Two-stage screenshot analysis.
//!
//! The vision stage turns screenshots into text, either one call per image or
//! a single call carrying all of them. The reasoning stage then runs once over
//! the combined vision text. A failure at any point aborts the whole
//! analysis; no partial result is returned.

use crate::ai::{ContentPart, ModelCallPayload, ModelResponse, ModelService};
use crate::config::{AnalysisMode, Config, ImageBounds};
use crate::models::{AnalysisRequest, PromptOverrides};
use crate::{prompts, Error, Result};
use futures::future::try_join_all;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vision,
    Reasoning,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vision => f.write_str("vision"),
            Stage::Reasoning => f.write_str("reasoning"),
        }
    }
}

/// Everything the analyzer needs from [`Config`].
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub api_key: Option<String>,
    pub vision_model: Option<String>,
    pub thinking_model: Option<String>,
    pub vision_prompt: String,
    pub thinking_prompt: String,
    pub mode: AnalysisMode,
    pub image_bounds: ImageBounds,
    pub vision_concurrency: usize,
}

impl From<&Config> for AnalysisSettings {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            vision_model: config.vision_model.clone(),
            thinking_model: config.thinking_model.clone(),
            vision_prompt: config.vision_prompt.clone(),
            thinking_prompt: config.thinking_prompt.clone(),
            mode: config.mode,
            image_bounds: config.image_bounds,
            vision_concurrency: config.vision_concurrency,
        }
    }
}

/// Credentials and model ids resolved for one request.
struct Resolved<'a> {
    api_key: &'a str,
    vision_model: &'a str,
    thinking_model: &'a str,
}

pub struct Analyzer {
    models: Arc<dyn ModelService>,
    settings: AnalysisSettings,
}

impl Analyzer {
    pub fn new(models: Arc<dyn ModelService>, settings: AnalysisSettings) -> Self {
        Self { models, settings }
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Run both stages and return the reasoning output.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<String> {
        let images = self.validate(&request)?;
        let resolved = self.resolve()?;

        let overrides = request.prompts.as_ref();
        let vision_prompt = overrides
            .and_then(PromptOverrides::vision)
            .unwrap_or(self.settings.vision_prompt.as_str());
        let thinking_prompt = overrides
            .and_then(PromptOverrides::thinking)
            .unwrap_or(self.settings.thinking_prompt.as_str());

        info!(
            images = images.len(),
            mode = %self.settings.mode,
            vision_model = resolved.vision_model,
            thinking_model = resolved.thinking_model,
            "Starting analysis"
        );

        let summary = match self.settings.mode {
            AnalysisMode::Sequential => {
                self.describe_each(&resolved, vision_prompt, &images)
                    .await?
            }
            AnalysisMode::Batched => {
                self.describe_batch(&resolved, vision_prompt, &images)
                    .await?
            }
        };
        info!("Vision stage complete ({} chars)", summary.len());

        let payload = ModelCallPayload::user(
            resolved.thinking_model,
            vec![ContentPart::text(thinking_prompt), ContentPart::text(summary)],
        );
        let result = self
            .call_for_text(resolved.api_key, &payload, Stage::Reasoning)
            .await?;
        info!("Reasoning stage complete ({} chars)", result.len());

        Ok(result)
    }

    /// Check the request and return the trimmed image references to forward.
    fn validate<'r>(&self, request: &'r AnalysisRequest) -> Result<Vec<&'r str>> {
        self.settings.image_bounds.check(request.images.len())?;

        let mut images = Vec::with_capacity(request.images.len());
        for (i, image) in request.images.iter().enumerate() {
            let image = image.trim();
            if !is_supported_image_ref(image) {
                return Err(Error::Validation(format!(
                    "Image {} must be a data:image URI or an http(s) URL",
                    i + 1
                )));
            }
            images.push(image);
        }
        Ok(images)
    }

    fn resolve(&self) -> Result<Resolved<'_>> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("AI_API_KEY is not set".to_string()))?;
        let vision_model = self
            .settings
            .vision_model
            .as_deref()
            .ok_or_else(|| Error::Config("VISION_MODEL is not set".to_string()))?;
        let thinking_model = self.settings.thinking_model.as_deref().unwrap_or(vision_model);

        Ok(Resolved {
            api_key,
            vision_model,
            thinking_model,
        })
    }

    async fn describe_each(
        &self,
        resolved: &Resolved<'_>,
        vision_prompt: &str,
        images: &[&str],
    ) -> Result<String> {
        let total = images.len();
        let limit = self.settings.vision_concurrency.max(1);
        debug!("Describing {} images, up to {} at a time", total, limit);

        // Permits are handed out in poll order, so a limit of 1 runs the
        // calls strictly one after another in input order.
        let permits = Semaphore::new(limit);
        let mut tasks = Vec::with_capacity(total);
        for (i, &image) in images.iter().enumerate() {
            tasks.push(self.describe_one(
                &permits,
                resolved,
                vision_prompt,
                image,
                i + 1,
                total,
            ));
        }

        // Results come back in input order; the first failure drops the rest.
        let blocks = try_join_all(tasks).await?;
        Ok(blocks.join("\n\n"))
    }

    async fn describe_one(
        &self,
        permits: &Semaphore,
        resolved: &Resolved<'_>,
        vision_prompt: &str,
        image: &str,
        index: usize,
        total: usize,
    ) -> Result<String> {
        let _permit = permits
            .acquire()
            .await
            .map_err(|e| Error::Internal(format!("vision permit pool closed: {}", e)))?;

        let payload = ModelCallPayload::user(
            resolved.vision_model,
            vec![
                ContentPart::text(prompts::for_image(vision_prompt, index, total)),
                ContentPart::image(image),
            ],
        );
        let text = self
            .call_for_text(resolved.api_key, &payload, Stage::Vision)
            .await?;
        debug!("Image {}/{} described ({} chars)", index, total, text.len());
        Ok(prompts::image_block(index, &text))
    }

    async fn describe_batch(
        &self,
        resolved: &Resolved<'_>,
        vision_prompt: &str,
        images: &[&str],
    ) -> Result<String> {
        let mut content = Vec::with_capacity(images.len() + 1);
        content.push(ContentPart::text(prompts::for_batch(
            vision_prompt,
            images.len(),
        )));
        content.extend(images.iter().map(|&image| ContentPart::image(image)));

        let payload = ModelCallPayload::user(resolved.vision_model, content);
        self.call_for_text(resolved.api_key, &payload, Stage::Vision)
            .await
    }

    async fn call_for_text(
        &self,
        api_key: &str,
        payload: &ModelCallPayload,
        stage: Stage,
    ) -> Result<String> {
        let body = self.models.create_response(api_key, payload).await?;
        let response = ModelResponse::from_json(&body);
        if !response.is_recognized() {
            warn!("{} stage response carried no text: {}", stage, body);
            return Err(Error::UpstreamParse(format!(
                "{} stage response contained no text",
                stage
            )));
        }
        Ok(response.text())
    }
}

/// Scheme prefixes are matched case-insensitively.
fn is_supported_image_ref(image: &str) -> bool {
    ["data:image/", "https://", "http://"].iter().any(|prefix| {
        image
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}
