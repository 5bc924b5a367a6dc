//! # stability-nodes
//!
//! Workflow nodes for the [Stability AI](https://platform.stability.ai) image
//! API: text-to-image, image-to-image, upscaling, and image file I/O.
//!
//! Each node reads typed inputs, makes one call through a
//! [`GenerationBackend`], and unpacks the returned artifacts into an
//! [`image::DynamicImage`]. Safety-filtered results are not errors: the node
//! returns `None` and records a warning on the [`ExecutionContext`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use stability_nodes::{
//!     Authorize, ExecutionContext, GenerateImage, ModifyImage, Node, WriteImage,
//! };
//!
//! # async fn example() -> stability_nodes::Result<()> {
//! let mut ctx = ExecutionContext::new();
//!
//! // Build the client once and hand it to every generation node
//! let client = Authorize::from_env().execute(&mut ctx).await?;
//!
//! let generated = GenerateImage::new(&client, "a lighthouse at dusk, oil painting")
//!     .seed(7)
//!     .execute(&mut ctx)
//!     .await?;
//!
//! if let Some(image) = generated {
//!     let snowy = ModifyImage::new(&client, "the same scene in heavy snow", image)
//!         .start_schedule(0.7)
//!         .execute(&mut ctx)
//!         .await?;
//!     if let Some(snowy) = snowy {
//!         WriteImage::new(snowy, "lighthouse.png").execute(&mut ctx).await?;
//!     }
//! }
//!
//! for warning in ctx.warnings() {
//!     eprintln!("warning: {}", warning);
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod client;
pub mod config;
pub mod error;
pub mod image_io;
pub mod nodes;
pub mod types;

pub use artifact::{decode_image, latest_image};
pub use client::{GenerationBackend, StabilityClient};
pub use config::{ApiKey, ClientConfig};
pub use error::{Result, StabilityError};
pub use image_io::{encode_png, read_image, write_image};
pub use nodes::{
    Authorize, ExecutionContext, GenerateImage, ModifyImage, Node, ReadImageFile, UpscaleImage,
    WriteImage, FILTERED_IMAGE_WARNING, FILTERED_PROMPT_WARNING,
};
pub use types::{Answer, Artifact, GenerationRequest, Sampler, UpscaleRequest};
