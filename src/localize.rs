//! image2world client and pose correlation.
//!
//! The localization service maps a batch of 2D object detections to 3D
//! world-frame poses. The call is the one blocking operation in the
//! pipeline, so it is bounded by a configured timeout; any failure mode
//! (transport, timeout, non-success status, undecodable body) surfaces the
//! same way and produces no partial result.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::msg::{CorrelatedDetection, Detection, Pose, RecognitionBatch};

/// Localization service seam.
///
/// The production implementation is [`HttpImage2World`]; tests substitute
/// stubs that return canned poses or fail on demand.
pub trait Image2World {
    /// Resolve world-frame poses for every detection in the batch.
    ///
    /// The response list is positional: pose i answers detection i. The
    /// service is trusted to preserve order; count mismatches are handled
    /// by [`correlate`].
    fn localize(&mut self, batch: &RecognitionBatch) -> Result<Vec<Pose>>;
}

#[derive(Serialize)]
struct Image2WorldRequest<'a> {
    recognitions: &'a RecognitionBatch,
}

#[derive(Deserialize)]
struct Image2WorldResponse {
    #[serde(default)]
    poses: Vec<Pose>,
}

/// HTTP client for the image2world service.
pub struct HttpImage2World {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpImage2World {
    /// Build a client for `endpoint` with an overall request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.into(),
            agent,
        }
    }
}

impl Image2World for HttpImage2World {
    fn localize(&mut self, batch: &RecognitionBatch) -> Result<Vec<Pose>> {
        let response = self
            .agent
            .post(&self.endpoint)
            .send_json(Image2WorldRequest {
                recognitions: batch,
            })
            .with_context(|| format!("image2world request to {}", self.endpoint))?;
        let body: Image2WorldResponse = response
            .into_json()
            .context("decode image2world response")?;
        Ok(body.poses)
    }
}

/// Pair detections with returned poses by list position.
///
/// Pairs index i of both sequences over the overlapping prefix, yielding
/// exactly `min(detections.len(), poses.len())` pairs. A length mismatch
/// means the service broke the positional contract; it is reported as a
/// warn-level anomaly while correlation still proceeds over the prefix.
pub fn correlate(detections: &[Detection], poses: Vec<Pose>) -> Vec<CorrelatedDetection> {
    if poses.len() != detections.len() {
        log::warn!(
            "image2world returned {} poses for {} detections; correlating the common prefix",
            poses.len(),
            detections.len()
        );
    }
    detections
        .iter()
        .cloned()
        .zip(poses)
        .map(|(detection, pose)| CorrelatedDetection { detection, pose })
        .collect()
}
