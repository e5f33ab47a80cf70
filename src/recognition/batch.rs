//! Recognition batch construction.

use crate::msg::{Detection, RecognitionBatch};

/// Wrap a detection list and its frame metadata into a publishable batch.
///
/// Returns `None` for an empty list: "nothing to publish", not an error.
/// The batch takes ownership of the list, so no caller-side mutation can
/// alias the detections after construction.
pub fn build_batch(
    detections: Vec<Detection>,
    image_id: u64,
    recognition_id: u64,
) -> Option<RecognitionBatch> {
    if detections.is_empty() {
        return None;
    }
    Some(RecognitionBatch {
        image_id,
        recognition_id,
        detections,
    })
}
