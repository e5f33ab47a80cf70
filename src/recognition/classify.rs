//! Partitioning of detections into person and generic-object lists.

use crate::msg::Detection;

/// Split detections into (people, objects) on exact label equality.
///
/// The partition is stable: relative order within each output list matches
/// the relative order of the matching elements in the input. An empty input
/// yields two empty lists.
pub fn classify(detections: Vec<Detection>, person_label: &str) -> (Vec<Detection>, Vec<Detection>) {
    let mut people = Vec::new();
    let mut objects = Vec::new();
    for detection in detections {
        if detection.label == person_label {
            people.push(detection);
        } else {
            objects.push(detection);
        }
    }
    (people, objects)
}
