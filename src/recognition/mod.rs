//! The classify → batch → publish → localize pipeline.
//!
//! Each inbound detection frame runs one full cycle: the frame's detections
//! are partitioned into person and generic-object lists, each non-empty
//! partition is wrapped into a recognition batch and published, and the
//! object batch is sent to the image2world service for world-frame poses.
//! Every list involved lives and dies inside the cycle; nothing is cached
//! across frames.

mod batch;
mod classify;
mod pipeline;

pub use batch::build_batch;
pub use classify::classify;
pub use pipeline::{process_frame, Channel, CycleError, CycleReport, RecognitionSink};
