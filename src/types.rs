use base64::Engine;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::StabilityError;

/// Seed used when a node leaves it unset.
pub const DEFAULT_SEED: u32 = 42;

/// Step count used when a node leaves it unset.
pub const DEFAULT_STEPS: u32 = 50;

/// Blend-start fraction used when an image-to-image node leaves it unset.
pub const DEFAULT_START_SCHEDULE: f32 = 0.6;

/// Diffusion sampler accepted by the Stability API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sampler {
    #[default]
    Ddim,
    Ddpm,
    KDpmpp2m,
    KDpmpp2sAncestral,
    KDpm2,
    KDpm2Ancestral,
    KEuler,
    KEulerAncestral,
    KHeun,
    KLms,
}

impl Sampler {
    /// Wire name used by the REST API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sampler::Ddim => "DDIM",
            Sampler::Ddpm => "DDPM",
            Sampler::KDpmpp2m => "K_DPMPP_2M",
            Sampler::KDpmpp2sAncestral => "K_DPMPP_2S_ANCESTRAL",
            Sampler::KDpm2 => "K_DPM_2",
            Sampler::KDpm2Ancestral => "K_DPM_2_ANCESTRAL",
            Sampler::KEuler => "K_EULER",
            Sampler::KEulerAncestral => "K_EULER_ANCESTRAL",
            Sampler::KHeun => "K_HEUN",
            Sampler::KLms => "K_LMS",
        }
    }
}

impl fmt::Display for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sampler {
    type Err = StabilityError;

    /// Accepts REST names (`K_EULER`), SDK names (`SAMPLER_K_EULER`), and
    /// any casing of either.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("SAMPLER_").unwrap_or(&upper);
        let sampler = match name {
            "DDIM" => Sampler::Ddim,
            "DDPM" => Sampler::Ddpm,
            "K_DPMPP_2M" => Sampler::KDpmpp2m,
            "K_DPMPP_2S_ANCESTRAL" => Sampler::KDpmpp2sAncestral,
            "K_DPM_2" => Sampler::KDpm2,
            "K_DPM_2_ANCESTRAL" => Sampler::KDpm2Ancestral,
            "K_EULER" => Sampler::KEuler,
            "K_EULER_ANCESTRAL" => Sampler::KEulerAncestral,
            "K_HEUN" => Sampler::KHeun,
            "K_LMS" => Sampler::KLms,
            _ => {
                return Err(StabilityError::InvalidInput(format!(
                    "Unknown sampler: {}",
                    s
                )))
            }
        };
        Ok(sampler)
    }
}

/// A single generation call, with every default already resolved.
///
/// `init_image` switches the call from text-to-image to image-to-image and
/// holds PNG-encoded bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub init_image: Option<Vec<u8>>,
    pub seed: u32,
    pub steps: u32,
    /// `None` lets the API pick its own sampler.
    pub sampler: Option<Sampler>,
    /// Fraction of the schedule skipped in favor of the init image.
    pub start_schedule: Option<f32>,
}

impl GenerationRequest {
    /// Text-to-image request with default seed and steps.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            init_image: None,
            seed: DEFAULT_SEED,
            steps: DEFAULT_STEPS,
            sampler: None,
            start_schedule: None,
        }
    }

    /// Image-to-image request with default seed, steps, sampler and
    /// start schedule.
    pub fn image(prompt: impl Into<String>, init_image_png: Vec<u8>) -> Self {
        Self {
            init_image: Some(init_image_png),
            sampler: Some(Sampler::default()),
            start_schedule: Some(DEFAULT_START_SCHEDULE),
            ..Self::text(prompt)
        }
    }

    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub fn sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn start_schedule(mut self, start: f32) -> Self {
        self.start_schedule = Some(start);
        self
    }
}

/// An upscale call. `image` holds PNG-encoded bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct UpscaleRequest {
    pub image: Vec<u8>,
}

/// One unit of a generation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Encoded image bytes (PNG unless the engine says otherwise).
    Image(Vec<u8>),
    /// The safety filter rejected this result.
    Filtered,
    /// Anything else the API sent back; carries a short description.
    Other(String),
}

/// One response message from a generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Answer {
    pub artifacts: Vec<Artifact>,
}

impl Answer {
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        Self { artifacts }
    }
}

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum FinishReason {
    #[default]
    Success,
    ContentFiltered,
    Error,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawArtifact {
    #[serde(default)]
    pub base64: Option<String>,
    #[serde(default)]
    pub finish_reason: FinishReason,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerationResponse {
    #[serde(default)]
    pub artifacts: Vec<RawArtifact>,
}

impl TryFrom<RawArtifact> for Artifact {
    type Error = StabilityError;

    fn try_from(raw: RawArtifact) -> Result<Self, Self::Error> {
        match (raw.finish_reason, raw.base64) {
            (FinishReason::ContentFiltered, _) => Ok(Artifact::Filtered),
            (FinishReason::Success, Some(b64)) => base64::engine::general_purpose::STANDARD
                .decode(b64.as_bytes())
                .map(Artifact::Image)
                .map_err(|e| {
                    StabilityError::InvalidResponse(format!(
                        "Artifact payload is not valid base64: {}",
                        e
                    ))
                }),
            (FinishReason::Success, None) => Ok(Artifact::Other("empty".into())),
            (FinishReason::Error, _) => Ok(Artifact::Other("error".into())),
            (FinishReason::Unknown, _) => Ok(Artifact::Other("unknown".into())),
        }
    }
}

impl TryFrom<GenerationResponse> for Answer {
    type Error = StabilityError;

    fn try_from(resp: GenerationResponse) -> Result<Self, Self::Error> {
        let artifacts = resp
            .artifacts
            .into_iter()
            .map(Artifact::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Answer { artifacts })
    }
}
