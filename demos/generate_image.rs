//! Generate a single image from a text prompt.
//!
//! Requires `STABILITY_KEY` in the environment or a `.env` file.
//!
//! ```sh
//! cargo run --example generate_image -- "a lighthouse at dusk" out.png
//! ```

use stability_nodes::{Authorize, ExecutionContext, GenerateImage, Node, WriteImage};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let prompt = args
        .next()
        .unwrap_or_else(|| "a beautiful sunset over mountains".to_string());
    let out = args.next().unwrap_or_else(|| "generated.png".to_string());

    let mut ctx = ExecutionContext::new();
    let client = Authorize::from_env().execute(&mut ctx).await?;
    println!("Using host: {}", client.host());

    let image = GenerateImage::new(&client, prompt)
        .seed(42)
        .steps(30)
        .execute(&mut ctx)
        .await?;

    match image {
        Some(image) => {
            WriteImage::new(image, &out).execute(&mut ctx).await?;
            println!("Saved: {}", out);
        }
        None => eprintln!("No image returned"),
    }

    for warning in ctx.warnings() {
        eprintln!("Warning: {}", warning);
    }

    Ok(())
}
