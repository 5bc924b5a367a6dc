//! Workflow nodes.
//!
//! Each node is a bag of typed input fields plus a single
//! [`Node::execute`] entry point. Generation nodes take their backend
//! (normally the [`StabilityClient`] produced by [`Authorize`]) as a
//! constructor argument.

use image::DynamicImage;
use std::future::Future;
use std::path::PathBuf;

use crate::artifact::{decode_image, latest_image};
use crate::client::{GenerationBackend, StabilityClient};
use crate::config::{require_key, ApiKey, ClientConfig};
use crate::error::Result;
use crate::image_io::{encode_png, read_image, write_image};
use crate::types::*;

/// Warning raised when a prompt-driven generation is filtered.
pub const FILTERED_PROMPT_WARNING: &str = "Your request activated the API's safety filters and could not be processed. Please modify the prompt and try again.";

/// Warning raised when an upscale is filtered.
pub const FILTERED_IMAGE_WARNING: &str = "Your request activated the API's safety filters and could not be processed. Please submit a different image and try again.";

/// Per-execution state handed to every node.
///
/// Collects non-fatal warnings (such as safety-filter hits) for the host
/// to surface to the user.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    warnings: Vec<String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user-visible warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Warnings recorded so far, oldest first.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Drain the recorded warnings.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

/// A unit of work the host engine can run.
pub trait Node: Send + Sync {
    /// The value written to the node's output port.
    type Output;

    /// Run the node once.
    fn execute(
        &self,
        ctx: &mut ExecutionContext,
    ) -> impl Future<Output = Result<Self::Output>> + Send;

    /// A human-readable name for this node type, used in logging.
    fn node_type(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

fn unpack(
    answers: Vec<Answer>,
    warning: &str,
    ctx: &mut ExecutionContext,
) -> Result<Option<DynamicImage>> {
    latest_image(answers, || ctx.warn(warning))
        .map(|bytes| decode_image(&bytes))
        .transpose()
}

// ── Authorize ───────────────────────────────────────────────────────

/// Builds the authenticated [`StabilityClient`] every generation node needs.
///
/// The key is not checked here; a bad key fails on the first request.
#[derive(Debug, Clone, Default)]
pub struct Authorize {
    pub host: Option<String>,
    pub api_key: Option<ApiKey>,
    /// Prefer `STABILITY_KEY` (and `STABILITY_HOST`) from the environment.
    pub from_env: bool,
}

impl Authorize {
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Read the key from the environment, loading `.env` if present.
    pub fn from_env() -> Self {
        Self {
            from_env: true,
            ..Default::default()
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn api_key(mut self, api_key: impl Into<ApiKey>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Resolve the client configuration from the node's inputs.
    ///
    /// With `from_env`, `STABILITY_KEY` wins over the explicit key and
    /// `STABILITY_HOST` applies only when no host input is set.
    pub fn config(&self) -> Result<ClientConfig> {
        let config = if self.from_env {
            ClientConfig::from_env_or(self.api_key.clone())?
        } else {
            ClientConfig::new(require_key(self.api_key.clone())?)
        };
        Ok(match &self.host {
            Some(host) => config.host(host.clone()),
            None => config,
        })
    }
}

impl Node for Authorize {
    type Output = StabilityClient;

    async fn execute(&self, _ctx: &mut ExecutionContext) -> Result<StabilityClient> {
        let config = self.config()?;
        tracing::info!(node = self.node_type(), host = %config.host, "Stability client ready");
        Ok(StabilityClient::new(config))
    }
}

// ── Text-to-image ───────────────────────────────────────────────────

/// Generates one image from a text prompt.
#[derive(Debug, Clone)]
pub struct GenerateImage<B> {
    client: B,
    pub prompt: String,
    pub seed: Option<u32>,
    pub steps: Option<u32>,
}

impl<B: GenerationBackend> GenerateImage<B> {
    pub fn new(client: B, prompt: impl Into<String>) -> Self {
        Self {
            client,
            prompt: prompt.into(),
            seed: None,
            steps: None,
        }
    }

    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps);
        self
    }

    /// The request this node sends, with defaults filled in.
    pub fn request(&self) -> GenerationRequest {
        GenerationRequest::text(&self.prompt)
            .seed(self.seed.unwrap_or(DEFAULT_SEED))
            .steps(self.steps.unwrap_or(DEFAULT_STEPS))
    }
}

impl<B: GenerationBackend> Node for GenerateImage<B> {
    /// `None` when the safety filter had the last word.
    type Output = Option<DynamicImage>;

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Option<DynamicImage>> {
        tracing::debug!(node = self.node_type(), "generating image");
        let answers = self.client.generate(&self.request()).await?;
        unpack(answers, FILTERED_PROMPT_WARNING, ctx)
    }
}

// ── Image-to-image ──────────────────────────────────────────────────

/// Reworks a source image according to a prompt.
#[derive(Debug, Clone)]
pub struct ModifyImage<B> {
    client: B,
    pub prompt: String,
    pub init_image: DynamicImage,
    pub seed: Option<u32>,
    /// How much of the schedule to skip; higher keeps more of the source.
    pub start_schedule: Option<f32>,
    pub steps: Option<u32>,
    pub sampler: Option<Sampler>,
}

impl<B: GenerationBackend> ModifyImage<B> {
    pub fn new(client: B, prompt: impl Into<String>, init_image: DynamicImage) -> Self {
        Self {
            client,
            prompt: prompt.into(),
            init_image,
            seed: None,
            start_schedule: None,
            steps: None,
            sampler: None,
        }
    }

    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn start_schedule(mut self, start: f32) -> Self {
        self.start_schedule = Some(start);
        self
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// The request this node sends. The source image is re-encoded as PNG.
    pub fn request(&self) -> Result<GenerationRequest> {
        let png = encode_png(&self.init_image)?;
        Ok(GenerationRequest::image(&self.prompt, png)
            .seed(self.seed.unwrap_or(DEFAULT_SEED))
            .start_schedule(self.start_schedule.unwrap_or(DEFAULT_START_SCHEDULE))
            .steps(self.steps.unwrap_or(DEFAULT_STEPS))
            .sampler(self.sampler.unwrap_or_default()))
    }
}

impl<B: GenerationBackend> Node for ModifyImage<B> {
    type Output = Option<DynamicImage>;

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Option<DynamicImage>> {
        let request = self.request()?;
        tracing::debug!(node = self.node_type(), "modifying image");
        let answers = self.client.generate(&request).await?;
        unpack(answers, FILTERED_PROMPT_WARNING, ctx)
    }
}

// ── Upscale ─────────────────────────────────────────────────────────

/// Upscales a source image. Takes no prompt or sampling parameters.
#[derive(Debug, Clone)]
pub struct UpscaleImage<B> {
    client: B,
    pub init_image: DynamicImage,
}

impl<B: GenerationBackend> UpscaleImage<B> {
    pub fn new(client: B, init_image: DynamicImage) -> Self {
        Self { client, init_image }
    }

    pub fn request(&self) -> Result<UpscaleRequest> {
        Ok(UpscaleRequest {
            image: encode_png(&self.init_image)?,
        })
    }
}

impl<B: GenerationBackend> Node for UpscaleImage<B> {
    type Output = Option<DynamicImage>;

    async fn execute(&self, ctx: &mut ExecutionContext) -> Result<Option<DynamicImage>> {
        let request = self.request()?;
        tracing::debug!(node = self.node_type(), "upscaling image");
        let answers = self.client.upscale(&request).await?;
        unpack(answers, FILTERED_IMAGE_WARNING, ctx)
    }
}

// ── File I/O ────────────────────────────────────────────────────────

/// Loads an image from disk.
#[derive(Debug, Clone)]
pub struct ReadImageFile {
    pub file_path: PathBuf,
}

impl ReadImageFile {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }
}

impl Node for ReadImageFile {
    type Output = DynamicImage;

    async fn execute(&self, _ctx: &mut ExecutionContext) -> Result<DynamicImage> {
        tracing::debug!(node = self.node_type(), path = %self.file_path.display(), "reading image");
        read_image(&self.file_path)
    }
}

/// Saves an image to disk in the format named by the extension.
#[derive(Debug, Clone)]
pub struct WriteImage {
    pub image: DynamicImage,
    pub save_path: PathBuf,
}

impl WriteImage {
    pub fn new(image: DynamicImage, save_path: impl Into<PathBuf>) -> Self {
        Self {
            image,
            save_path: save_path.into(),
        }
    }
}

impl Node for WriteImage {
    type Output = ();

    async fn execute(&self, _ctx: &mut ExecutionContext) -> Result<()> {
        tracing::debug!(node = self.node_type(), path = %self.save_path.display(), "writing image");
        write_image(&self.image, &self.save_path)
    }
}
