//! MQTT transport plumbing for the recognition bridge.
//!
//! Endpoint parsing and loopback validation for the broker address, plus
//! the MQTT-backed recognition sink the daemon publishes batches through.

mod endpoint;
mod sink;

pub use endpoint::{parse_mqtt_endpoint, validate_loopback_addr, MqttEndpoint};
pub use sink::MqttRecognitionSink;
