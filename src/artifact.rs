use image::DynamicImage;

use crate::error::{Result, StabilityError};
use crate::types::{Answer, Artifact};

/// Fold a response stream down to the last image payload.
///
/// A filtered artifact clears the current image and calls `on_filtered`;
/// a later image artifact replaces it again. Other artifacts are skipped.
/// The result therefore depends on artifact order: whichever of image or
/// filtered comes last decides the outcome.
pub fn latest_image<I, F>(answers: I, mut on_filtered: F) -> Option<Vec<u8>>
where
    I: IntoIterator<Item = Answer>,
    F: FnMut(),
{
    answers
        .into_iter()
        .flat_map(|answer| answer.artifacts)
        .fold(None, |current, artifact| match artifact {
            Artifact::Image(bytes) => Some(bytes),
            Artifact::Filtered => {
                on_filtered();
                None
            }
            Artifact::Other(kind) => {
                tracing::debug!(kind = %kind, "skipping non-image artifact");
                current
            }
        })
}

/// Decode an image artifact payload.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(StabilityError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(tag: u8) -> Artifact {
        Artifact::Image(vec![tag])
    }

    #[test]
    fn test_last_image_wins() {
        let answers = vec![
            Answer::new(vec![image(1), image(2)]),
            Answer::new(vec![image(3)]),
        ];
        let mut filtered = 0;
        assert_eq!(latest_image(answers, || filtered += 1), Some(vec![3]));
        assert_eq!(filtered, 0);
    }

    #[test]
    fn test_only_filtered() {
        let answers = vec![Answer::new(vec![Artifact::Filtered])];
        let mut filtered = 0;
        assert_eq!(latest_image(answers, || filtered += 1), None);
        assert_eq!(filtered, 1);
    }

    #[test]
    fn test_filtered_then_image_keeps_image() {
        let answers = vec![Answer::new(vec![Artifact::Filtered, image(7)])];
        let mut filtered = 0;
        assert_eq!(latest_image(answers, || filtered += 1), Some(vec![7]));
        assert_eq!(filtered, 1);
    }

    #[test]
    fn test_image_then_filtered_clears_image() {
        // Order-dependent on purpose: the later artifact decides.
        let answers = vec![
            Answer::new(vec![image(7)]),
            Answer::new(vec![Artifact::Filtered]),
        ];
        let mut filtered = 0;
        assert_eq!(latest_image(answers, || filtered += 1), None);
        assert_eq!(filtered, 1);
    }

    #[test]
    fn test_other_artifacts_are_skipped() {
        let answers = vec![Answer::new(vec![
            image(4),
            Artifact::Other("error".into()),
            Artifact::Other("empty".into()),
        ])];
        assert_eq!(latest_image(answers, || {}), Some(vec![4]));
    }

    #[test]
    fn test_empty_stream() {
        assert_eq!(latest_image(Vec::<Answer>::new(), || {}), None);
        assert_eq!(latest_image(vec![Answer::default()], || {}), None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_image(b"definitely not a png").unwrap_err();
        assert!(matches!(err, StabilityError::Decode(_)));
    }
}
