use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use crate::error::{Result, StabilityError};

/// Read and decode an image file. The format is guessed from the path.
pub fn read_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
    image::open(path.as_ref()).map_err(StabilityError::ReadImage)
}

/// Encode and write an image. The format is taken from the file extension.
pub fn write_image(image: &DynamicImage, path: impl AsRef<Path>) -> Result<()> {
    image.save(path.as_ref()).map_err(StabilityError::SaveImage)
}

/// Encode an image as PNG for upload.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(StabilityError::Encode)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn checkerboard() -> DynamicImage {
        let img = RgbaImage::from_fn(4, 4, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 128])
            }
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn test_encode_png_is_lossless() {
        let img = checkerboard();
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.to_rgba8(), img.to_rgba8());
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_image("/definitely/not/here.png").unwrap_err();
        assert!(err.to_string().starts_with("Failed to read image file: "));
    }

    #[test]
    fn test_write_unknown_extension() {
        let dir = std::env::temp_dir();
        let err = write_image(&checkerboard(), dir.join("image.not-a-format")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to save image file: "));
    }
}
