use thiserror::Error;

/// Errors returned by Stability API calls and image nodes.
#[derive(Error, Debug)]
pub enum StabilityError {
    /// The Stability API returned a non-success HTTP status.
    ///
    /// Authentication failures land here too: the key is never checked
    /// until the first request is made.
    #[error("Stability API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response from the Stability API was missing or malformed.
    #[error("{0}")]
    InvalidResponse(String),

    /// A node input could not be interpreted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No API key was supplied and none was found in the environment.
    #[error("No Stability API key provided (set {0} or pass a key)")]
    MissingApiKey(String),

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// An image artifact could not be decoded.
    #[error("Failed to decode generated image: {0}")]
    Decode(#[source] image::ImageError),

    /// A source image could not be encoded for upload.
    #[error("Failed to encode source image: {0}")]
    Encode(#[source] image::ImageError),

    /// Reading an image from disk failed.
    #[error("Failed to read image file: {0}")]
    ReadImage(#[source] image::ImageError),

    /// Writing an image to disk failed.
    #[error("Failed to save image file: {0}")]
    SaveImage(#[source] image::ImageError),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, StabilityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_message() {
        let err = StabilityError::Http {
            status: 401,
            body: "unauthorized".into(),
        };
        assert_eq!(
            err.to_string(),
            "Stability API returned HTTP 401: unauthorized"
        );
    }

    #[test]
    fn test_missing_key_names_variable() {
        let err = StabilityError::MissingApiKey("STABILITY_KEY".into());
        assert!(err.to_string().contains("STABILITY_KEY"));
    }

    #[test]
    fn test_file_errors_carry_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = StabilityError::ReadImage(image::ImageError::IoError(io));
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to read image file: "));
        assert!(msg.contains("no such file"));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = StabilityError::SaveImage(image::ImageError::IoError(io));
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to save image file: "));
        assert!(msg.contains("denied"));
    }
}
