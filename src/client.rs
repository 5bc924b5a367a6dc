use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use std::future::Future;

use crate::config::ClientConfig;
use crate::error::{Result, StabilityError};
use crate::types::*;

/// The remote operations the image nodes depend on.
///
/// [`StabilityClient`] is the production implementation; anything else that
/// can answer a generate or upscale call (a test double, a proxy) can stand
/// in for it.
pub trait GenerationBackend: Send + Sync {
    /// Run a text-to-image or image-to-image generation.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Vec<Answer>>> + Send;

    /// Upscale an image.
    fn upscale(&self, request: &UpscaleRequest)
        -> impl Future<Output = Result<Vec<Answer>>> + Send;
}

impl<T: GenerationBackend> GenerationBackend for &T {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Vec<Answer>>> + Send {
        (**self).generate(request)
    }

    fn upscale(
        &self,
        request: &UpscaleRequest,
    ) -> impl Future<Output = Result<Vec<Answer>>> + Send {
        (**self).upscale(request)
    }
}

/// Authenticated client for the Stability REST API.
///
/// Cloning is cheap; clones share the underlying connection pool.
///
/// # Example
/// ```no_run
/// use stability_nodes::{ClientConfig, GenerationBackend, GenerationRequest, StabilityClient};
///
/// # async fn example() -> stability_nodes::Result<()> {
/// let client = StabilityClient::new(ClientConfig::new("sk-..."));
/// let answers = client
///     .generate(&GenerationRequest::text("a lighthouse at dusk").steps(30))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StabilityClient {
    http: Client,
    config: ClientConfig,
}

impl StabilityClient {
    /// Create a client from a config. No request is made and the key is
    /// not checked until the first call.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Returns the configured host URL.
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Returns the full configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Endpoints ───────────────────────────────────────────────────

    fn text_to_image_url(&self) -> String {
        format!(
            "{}/v1/generation/{}/text-to-image",
            self.config.host, self.config.engine
        )
    }

    fn image_to_image_url(&self) -> String {
        format!(
            "{}/v1/generation/{}/image-to-image",
            self.config.host, self.config.engine
        )
    }

    fn upscale_url(&self) -> String {
        format!(
            "{}/v1/generation/{}/image-to-image/upscale",
            self.config.host, self.config.upscale_engine
        )
    }

    // ── Generation ──────────────────────────────────────────────────

    async fn text_to_image(&self, request: &GenerationRequest) -> Result<Vec<Answer>> {
        let url = self.text_to_image_url();
        tracing::info!(engine = %self.config.engine, steps = request.steps, "text-to-image request");
        let req = self.http.post(&url).json(&text_to_image_body(request));
        self.send(req, "text-to-image").await
    }

    async fn image_to_image(
        &self,
        request: &GenerationRequest,
        init_image: &[u8],
    ) -> Result<Vec<Answer>> {
        let url = self.image_to_image_url();
        tracing::info!(engine = %self.config.engine, steps = request.steps, "image-to-image request");
        let form = image_to_image_form(request, init_image)?;
        let req = self.http.post(&url).multipart(form);
        self.send(req, "image-to-image").await
    }

    async fn upscale_image(&self, request: &UpscaleRequest) -> Result<Vec<Answer>> {
        let url = self.upscale_url();
        tracing::info!(engine = %self.config.upscale_engine, "upscale request");
        let form = Form::new().part("image", png_part(&request.image)?);
        let req = self.http.post(&url).multipart(form);
        self.send(req, "upscale").await
    }

    async fn send(&self, req: RequestBuilder, operation: &str) -> Result<Vec<Answer>> {
        let resp = req
            .bearer_auth(self.config.api_key.expose())
            .header(ACCEPT, "application/json")
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| StabilityError::Network {
                context: format!(
                    "Cannot reach the Stability API at {} for {}",
                    self.config.host, operation
                ),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StabilityError::Http { status, body });
        }

        let parsed: GenerationResponse = resp.json().await.map_err(|e| StabilityError::Network {
            context: format!("Failed to parse Stability {} response", operation),
            source: e,
        })?;

        Ok(vec![Answer::try_from(parsed)?])
    }
}

impl GenerationBackend for StabilityClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Answer>> {
        match &request.init_image {
            Some(init_image) => self.image_to_image(request, init_image).await,
            None => self.text_to_image(request).await,
        }
    }

    async fn upscale(&self, request: &UpscaleRequest) -> Result<Vec<Answer>> {
        self.upscale_image(request).await
    }
}

fn text_to_image_body(request: &GenerationRequest) -> serde_json::Value {
    let mut body = json!({
        "text_prompts": [{"text": request.prompt}],
        "seed": request.seed,
        "steps": request.steps,
        "samples": 1,
    });
    if let Some(sampler) = request.sampler {
        body["sampler"] = json!(sampler.as_str());
    }
    body
}

fn image_to_image_form(request: &GenerationRequest, init_image: &[u8]) -> Result<Form> {
    let start = request.start_schedule.unwrap_or(DEFAULT_START_SCHEDULE);
    let sampler = request.sampler.unwrap_or_default();
    Ok(Form::new()
        .part("init_image", png_part(init_image)?)
        .text("init_image_mode", "STEP_SCHEDULE")
        .text("step_schedule_start", start.to_string())
        .text("text_prompts[0][text]", request.prompt.clone())
        .text("seed", request.seed.to_string())
        .text("steps", request.steps.to_string())
        .text("sampler", sampler.as_str())
        .text("samples", "1"))
}

fn png_part(bytes: &[u8]) -> Result<Part> {
    Part::bytes(bytes.to_vec())
        .file_name("image.png")
        .mime_str("image/png")
        .map_err(|e| StabilityError::Network {
            context: "Failed to build multipart image field".into(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> StabilityClient {
        StabilityClient::new(ClientConfig::new("sk-test").host("http://localhost:9000/"))
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client();
        assert_eq!(
            client.text_to_image_url(),
            "http://localhost:9000/v1/generation/stable-diffusion-v1-6/text-to-image"
        );
        assert_eq!(
            client.image_to_image_url(),
            "http://localhost:9000/v1/generation/stable-diffusion-v1-6/image-to-image"
        );
        assert_eq!(
            client.upscale_url(),
            "http://localhost:9000/v1/generation/esrgan-v1-x2plus/image-to-image/upscale"
        );
    }

    #[test]
    fn test_custom_engine_in_url() {
        let client = StabilityClient::new(
            ClientConfig::new("sk-test").engine("stable-diffusion-xl-1024-v1-0"),
        );
        assert_eq!(
            client.text_to_image_url(),
            "https://api.stability.ai/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image"
        );
    }

    #[test]
    fn test_text_to_image_body_defaults() {
        let body = text_to_image_body(&GenerationRequest::text("a red fox"));
        assert_eq!(body["text_prompts"][0]["text"], "a red fox");
        assert_eq!(body["seed"], 42);
        assert_eq!(body["steps"], 50);
        assert_eq!(body["samples"], 1);
        assert!(body.get("sampler").is_none());
    }

    #[test]
    fn test_text_to_image_body_with_sampler() {
        let req = GenerationRequest::text("a red fox")
            .seed(7)
            .steps(30)
            .sampler(Sampler::KEulerAncestral);
        let body = text_to_image_body(&req);
        assert_eq!(body["seed"], 7);
        assert_eq!(body["steps"], 30);
        assert_eq!(body["sampler"], "K_EULER_ANCESTRAL");
    }

    #[test]
    fn test_image_to_image_form_builds() {
        let req = GenerationRequest::image("a red fox", vec![0x89, b'P', b'N', b'G']);
        assert!(image_to_image_form(&req, &[0x89, b'P', b'N', b'G']).is_ok());
    }

    #[test]
    fn test_client_debug_hides_key() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("sk-test"));
    }

    #[test]
    fn test_host_accessor() {
        assert_eq!(client().host(), "http://localhost:9000");
    }
}
