//! Process configuration
//!
//! Built once at startup from the environment (and an optional `.env` file),
//! then handed to the components that need it. Nothing reads the environment
//! after this point.

use crate::{prompts, Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_TIMEOUT_MS: u64 = 180_000;
pub const DEFAULT_MIN_IMAGES: usize = 2;
pub const DEFAULT_MAX_IMAGES: usize = 9;
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// How the vision stage is laid out over the submitted images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// One vision call per image, each with an index-annotated prompt.
    #[default]
    Sequential,
    /// One vision call carrying every image.
    Batched,
}

impl FromStr for AnalysisMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "per-image" | "per_image" => Ok(AnalysisMode::Sequential),
            "batched" | "batch" => Ok(AnalysisMode::Batched),
            other => Err(Error::Config(format!(
                "ANALYSIS_MODE must be 'sequential' or 'batched', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Sequential => f.write_str("sequential"),
            AnalysisMode::Batched => f.write_str("batched"),
        }
    }
}

/// Inclusive bound on the number of images accepted per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBounds {
    min: usize,
    max: usize,
}

impl ImageBounds {
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min == 0 {
            return Err(Error::Config("MIN_IMAGES must be at least 1".to_string()));
        }
        if min > max {
            return Err(Error::Config(format!(
                "MIN_IMAGES ({}) must not exceed MAX_IMAGES ({})",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn contains(&self, count: usize) -> bool {
        (self.min..=self.max).contains(&count)
    }

    pub fn check(&self, count: usize) -> Result<()> {
        if self.contains(count) {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "Expected between {} and {} images, got {}",
                self.min, self.max, count
            )))
        }
    }
}

impl Default for ImageBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_IMAGES,
            max: DEFAULT_MAX_IMAGES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub vision_model: Option<String>,
    pub thinking_model: Option<String>,
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub log_level: String,
    pub vision_prompt: String,
    pub thinking_prompt: String,
    pub mode: AnalysisMode,
    pub image_bounds: ImageBounds,
    pub vision_concurrency: usize,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let vision_model = get("VISION_MODEL");
        let thinking_model = get("THINKING_MODEL").or_else(|| vision_model.clone());

        let timeout_ms = parse_or(
            get("REQUEST_TIMEOUT_MS"),
            "REQUEST_TIMEOUT_MS",
            DEFAULT_TIMEOUT_MS,
        )?;
        if timeout_ms == 0 {
            return Err(Error::Config(
                "REQUEST_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }

        let image_bounds = ImageBounds::new(
            parse_or(get("MIN_IMAGES"), "MIN_IMAGES", DEFAULT_MIN_IMAGES)?,
            parse_or(get("MAX_IMAGES"), "MAX_IMAGES", DEFAULT_MAX_IMAGES)?,
        )?;

        let vision_concurrency: usize =
            parse_or(get("VISION_CONCURRENCY"), "VISION_CONCURRENCY", 1)?;
        if vision_concurrency == 0 {
            return Err(Error::Config(
                "VISION_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        let mode = match get("ANALYSIS_MODE") {
            Some(value) => value.parse()?,
            None => AnalysisMode::default(),
        };

        Ok(Self {
            api_key: get("AI_API_KEY"),
            vision_model,
            thinking_model,
            api_base_url: get("MODEL_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            request_timeout: Duration::from_millis(timeout_ms),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            vision_prompt: get("VISION_PROMPT")
                .unwrap_or_else(|| prompts::VISION_DEFAULT.trim().to_string()),
            thinking_prompt: get("THINKING_PROMPT")
                .unwrap_or_else(|| prompts::THINKING_DEFAULT.trim().to_string()),
            mode,
            image_bounds,
            vision_concurrency,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", 3000)?,
            static_dir: get("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
            max_body_bytes: parse_or(
                get("MAX_BODY_BYTES"),
                "MAX_BODY_BYTES",
                DEFAULT_MAX_BODY_BYTES,
            )?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: '{}'", key, raw))),
        None => Ok(default),
    }
}
