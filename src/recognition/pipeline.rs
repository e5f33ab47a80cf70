//! One processing cycle: partition, publish, localize, correlate.

use anyhow::Result;
use thiserror::Error;

use crate::localize::{correlate, Image2World};
use crate::msg::{sanitize_detections, CorrelatedDetection, DetectionFrame, RecognitionBatch};
use crate::recognition::{build_batch, classify};

/// Outbound channel a recognition batch is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Objects,
    People,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Objects => write!(f, "objects"),
            Channel::People => write!(f, "people"),
        }
    }
}

/// Recognition batch consumer.
///
/// Implementations emit the batch on the named channel exactly once per
/// call; the pipeline calls this at most once per partition per cycle.
/// There is no retry and no buffering across cycles; a failed publish
/// surfaces as [`CycleError::Publish`] and the cycle ends.
pub trait RecognitionSink {
    fn publish(&mut self, channel: Channel, batch: &RecognitionBatch) -> Result<()>;
}

/// Why a cycle stopped early.
///
/// Both variants are scoped to the single cycle that raised them; batches
/// already published in that cycle stay published (no rollback), and the
/// daemon keeps serving subsequent frames.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to publish {channel} recognition batch")]
    Publish {
        channel: Channel,
        #[source]
        source: anyhow::Error,
    },
    #[error("image2world service call failed")]
    ServiceCall(#[source] anyhow::Error),
}

/// What one completed cycle did.
#[derive(Debug)]
pub struct CycleReport {
    /// Detections published on the objects channel (0 if the partition was empty).
    pub objects_published: usize,
    /// Detections published on the people channel (0 if the partition was empty).
    pub people_published: usize,
    /// Raw detections dropped for malformed geometry.
    pub dropped_malformed: usize,
    /// Object detections paired with their world-frame poses. Empty when the
    /// object partition was empty.
    pub correlated: Vec<CorrelatedDetection>,
}

/// Run one full cycle over an inbound detection frame.
///
/// Order within the cycle: both partition publishes are attempted before the
/// localization request is issued, so a localization failure never affects
/// what was emitted on the channels. The object list is threaded straight
/// from the batch into the localization call; no field survives the cycle.
pub fn process_frame<S: RecognitionSink, L: Image2World>(
    frame: DetectionFrame,
    person_label: &str,
    sink: &mut S,
    localizer: &mut L,
) -> Result<CycleReport, CycleError> {
    let (detections, dropped_malformed) = sanitize_detections(frame.detections);
    let (people, objects) = classify(detections, person_label);

    let objects_batch = build_batch(objects, frame.image_id, frame.batch_id);
    let people_batch = build_batch(people, frame.image_id, frame.batch_id);

    if let Some(batch) = &objects_batch {
        sink.publish(Channel::Objects, batch)
            .map_err(|source| CycleError::Publish {
                channel: Channel::Objects,
                source,
            })?;
    }
    if let Some(batch) = &people_batch {
        sink.publish(Channel::People, batch)
            .map_err(|source| CycleError::Publish {
                channel: Channel::People,
                source,
            })?;
    }

    let correlated = match &objects_batch {
        Some(batch) => {
            let poses = localizer.localize(batch).map_err(CycleError::ServiceCall)?;
            correlate(&batch.detections, poses)
        }
        None => Vec::new(),
    };

    Ok(CycleReport {
        objects_published: objects_batch.map_or(0, |b| b.detections.len()),
        people_published: people_batch.map_or(0, |b| b.detections.len()),
        dropped_malformed,
        correlated,
    })
}
