//! Wire and domain types for the recognition pipeline.
//!
//! Inbound detector frames arrive as JSON with corner-coordinate boxes
//! (xmin/ymin/xmax/ymax). They are converted once, at the boundary, into
//! [`Detection`] values with origin-plus-extent boxes; everything past that
//! point works on the converted form. All types here are cycle-local: a new
//! set is built for every incoming frame and dropped when the cycle ends.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One raw detection as published by the upstream detector.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDetection {
    /// Class label assigned by the detector (e.g. "person", "chair").
    pub label: String,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

/// One inbound detection-batch message.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionFrame {
    /// Identifier of the source image this batch was detected on.
    pub image_id: u64,
    /// Identifier of the detection batch itself.
    pub batch_id: u64,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// Axis-aligned bounding box, origin plus extent, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub width: f32,
    pub height: f32,
}

/// A detection whose box passed validation. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// A raw detection whose derived box has negative or non-finite extent.
///
/// The upstream detector is expected to emit finite corners with
/// xmin <= xmax and ymin <= ymax; a violation means the frame is carrying
/// malformed geometry.
#[derive(Debug, Error)]
#[error(
    "malformed detection '{label}': corners ({xmin}, {ymin})..({xmax}, {ymax}) \
     yield invalid extent"
)]
pub struct MalformedDetection {
    pub label: String,
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl Detection {
    /// Convert a raw corner-coordinate detection into the domain form.
    ///
    /// Fails with [`MalformedDetection`] when the derived width or height
    /// is negative or non-finite. NaN corners fail every ordering check, so
    /// the finite test has to be explicit.
    pub fn from_raw(raw: &RawDetection) -> Result<Self, MalformedDetection> {
        let width = raw.xmax - raw.xmin;
        let height = raw.ymax - raw.ymin;
        if !(width.is_finite() && height.is_finite()) || width < 0.0 || height < 0.0 {
            return Err(MalformedDetection {
                label: raw.label.clone(),
                xmin: raw.xmin,
                ymin: raw.ymin,
                xmax: raw.xmax,
                ymax: raw.ymax,
            });
        }
        Ok(Self {
            label: raw.label.clone(),
            confidence: raw.confidence,
            bounding_box: BoundingBox {
                min_x: raw.xmin,
                min_y: raw.ymin,
                width,
                height,
            },
        })
    }
}

/// Convert a frame's raw detections, dropping malformed ones.
///
/// Policy for malformed geometry: reject the single detection and keep the
/// rest of the frame. Each drop is logged at warn level; the count of drops
/// is returned so the cycle report can surface it.
pub fn sanitize_detections(raw: Vec<RawDetection>) -> (Vec<Detection>, usize) {
    let mut detections = Vec::with_capacity(raw.len());
    let mut dropped = 0;
    for entry in &raw {
        match Detection::from_raw(entry) {
            Ok(detection) => detections.push(detection),
            Err(e) => {
                log::warn!("Dropping detection: {}", e);
                dropped += 1;
            }
        }
    }
    (detections, dropped)
}

/// An ordered collection of detections sharing image/batch metadata.
///
/// `detections` is always non-empty and its order is significant: it is the
/// correlation key for the image2world response (pose i answers detection i).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionBatch {
    pub image_id: u64,
    pub recognition_id: u64,
    pub detections: Vec<Detection>,
}

/// 3D point in the world frame, meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// World-frame pose returned by the image2world service.
///
/// Never constructed locally; only deserialized from service responses.
/// `covariance` is the row-major 6x6 uncertainty matrix (36 entries) the
/// service reports alongside the position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    #[serde(default)]
    pub covariance: Vec<f64>,
}

/// One object detection paired with the pose the service resolved for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedDetection {
    pub detection: Detection,
    pub pose: Pose,
}

/// Parse an inbound detection-frame JSON payload.
pub fn parse_detection_frame(payload: &[u8]) -> anyhow::Result<DetectionFrame> {
    let frame: DetectionFrame = serde_json::from_slice(payload)
        .map_err(|e| anyhow::anyhow!("invalid detection frame: {}", e))?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(label: &str, corners: (f32, f32, f32, f32)) -> RawDetection {
        RawDetection {
            label: label.to_string(),
            confidence: 0.9,
            xmin: corners.0,
            ymin: corners.1,
            xmax: corners.2,
            ymax: corners.3,
        }
    }

    #[test]
    fn from_raw_derives_extent_from_corners() {
        let detection = Detection::from_raw(&raw("person", (10.0, 10.0, 50.0, 50.0))).unwrap();
        assert_eq!(detection.bounding_box.min_x, 10.0);
        assert_eq!(detection.bounding_box.min_y, 10.0);
        assert_eq!(detection.bounding_box.width, 40.0);
        assert_eq!(detection.bounding_box.height, 40.0);
    }

    #[test]
    fn from_raw_accepts_zero_extent() {
        let detection = Detection::from_raw(&raw("dot", (5.0, 5.0, 5.0, 5.0))).unwrap();
        assert_eq!(detection.bounding_box.width, 0.0);
        assert_eq!(detection.bounding_box.height, 0.0);
    }

    #[test]
    fn from_raw_rejects_negative_extent() {
        let result = Detection::from_raw(&raw("ghost", (50.0, 10.0, 10.0, 50.0)));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("invalid extent"));
    }

    #[test]
    fn from_raw_rejects_nan_corners() {
        let result = Detection::from_raw(&raw("ghost", (f32::NAN, 10.0, 50.0, 50.0)));
        assert!(result.is_err());
    }

    #[test]
    fn from_raw_rejects_infinite_corners() {
        let result = Detection::from_raw(&raw("ghost", (10.0, 10.0, f32::INFINITY, 50.0)));
        assert!(result.is_err());
    }

    #[test]
    fn sanitize_keeps_valid_and_counts_drops() {
        let (detections, dropped) = sanitize_detections(vec![
            raw("person", (10.0, 10.0, 50.0, 50.0)),
            raw("ghost", (50.0, 10.0, 10.0, 50.0)),
            raw("chair", (0.0, 0.0, 20.0, 20.0)),
        ]);
        assert_eq!(detections.len(), 2);
        assert_eq!(dropped, 1);
        assert_eq!(detections[0].label, "person");
        assert_eq!(detections[1].label, "chair");
    }

    #[test]
    fn parse_frame_with_missing_detections_is_empty() {
        let frame = parse_detection_frame(br#"{"image_id": 3, "batch_id": 1}"#).unwrap();
        assert_eq!(frame.image_id, 3);
        assert!(frame.detections.is_empty());
    }

    #[test]
    fn parse_frame_rejects_garbage() {
        assert!(parse_detection_frame(b"not json").is_err());
    }
}
