//! Object recognition bridge.
//!
//! Consumes 2D object-detection batches from an upstream detector, splits
//! each batch into person and generic-object partitions, republishes each
//! non-empty partition as a recognition batch, and resolves world-frame
//! poses for the object partition through the external image2world service.
//!
//! # Module structure
//!
//! - `msg`: wire and domain types (detections, batches, poses)
//! - `recognition`: the classify → batch → publish → localize cycle
//! - `localize`: image2world HTTP client and pose correlation
//! - `transport`: MQTT endpoint parsing and the publishing sink
//! - `config`: daemon configuration (file, environment, defaults)
//!
//! The pipeline is stateless across cycles: every list is derived from the
//! cycle's own input frame and dropped when the cycle ends.

pub mod config;
pub mod localize;
pub mod msg;
pub mod recognition;
pub mod transport;

pub use config::{Image2WorldSettings, RecognitiondConfig, TopicSettings};
pub use localize::{correlate, HttpImage2World, Image2World};
pub use msg::{
    parse_detection_frame, sanitize_detections, BoundingBox, CorrelatedDetection, Detection,
    DetectionFrame, MalformedDetection, Pose, Position, RawDetection, RecognitionBatch,
};
pub use recognition::{
    build_batch, classify, process_frame, Channel, CycleError, CycleReport, RecognitionSink,
};
pub use transport::{
    parse_mqtt_endpoint, validate_loopback_addr, MqttEndpoint, MqttRecognitionSink,
};
