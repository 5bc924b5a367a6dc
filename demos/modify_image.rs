//! Rework an existing image according to a prompt.
//!
//! ```sh
//! cargo run --example modify_image -- input.png "the same scene in winter" out.png
//! ```

use stability_nodes::{
    Authorize, ExecutionContext, ModifyImage, Node, ReadImageFile, Sampler, WriteImage,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: modify_image <input> <prompt> [output]");
        return Ok(());
    }
    let out = args.get(2).cloned().unwrap_or_else(|| "modified.png".to_string());

    let mut ctx = ExecutionContext::new();
    let client = Authorize::from_env().execute(&mut ctx).await?;
    let source = ReadImageFile::new(&args[0]).execute(&mut ctx).await?;

    let image = ModifyImage::new(&client, args[1].as_str(), source)
        .start_schedule(0.6)
        .sampler(Sampler::KDpmpp2m)
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
