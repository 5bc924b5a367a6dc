//! Upscale an image file.
//!
//! ```sh
//! cargo run --example upscale_image -- input.png upscaled.png
//! ```

use stability_nodes::{Authorize, ExecutionContext, Node, ReadImageFile, UpscaleImage, WriteImage};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        eprintln!("usage: upscale_image <input> [output]");
        return Ok(());
    };
    let out = args.next().unwrap_or_else(|| "upscaled.png".to_string());

    let mut ctx = ExecutionContext::new();
    let client = Authorize::from_env().execute(&mut ctx).await?;
    let source = ReadImageFile::new(&input).execute(&mut ctx).await?;
    println!("Input: {}x{}", source.width(), source.height());

    match UpscaleImage::new(&client, source).execute(&mut ctx).await? {
        Some(image) => {
            println!("Output: {}x{}", image.width(), image.height());
            WriteImage::new(image, &out).execute(&mut ctx).await?;
            println!("Saved: {}", out);
        }
        None => {
            for warning in ctx.warnings() {
                eprintln!("Warning: {}", warning);
            }
        }
    }

    Ok(())
}
