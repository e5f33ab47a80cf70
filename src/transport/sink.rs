//! MQTT-backed recognition sink.

use anyhow::{Context, Result};
use rumqttc::v5::{mqttbytes::QoS, Client};

use crate::msg::RecognitionBatch;
use crate::recognition::{Channel, RecognitionSink};

/// Publishes recognition batches as JSON on the configured topics.
///
/// Each batch goes out exactly once with QoS 1; delivery beyond that is the
/// broker's concern. A publish failure surfaces to the cycle, which ends;
/// there is no retry here.
pub struct MqttRecognitionSink {
    client: Client,
    objects_topic: String,
    people_topic: String,
}

impl MqttRecognitionSink {
    pub fn new(
        client: Client,
        objects_topic: impl Into<String>,
        people_topic: impl Into<String>,
    ) -> Self {
        Self {
            client,
            objects_topic: objects_topic.into(),
            people_topic: people_topic.into(),
        }
    }
}

impl RecognitionSink for MqttRecognitionSink {
    fn publish(&mut self, channel: Channel, batch: &RecognitionBatch) -> Result<()> {
        let topic = match channel {
            Channel::Objects => self.objects_topic.as_str(),
            Channel::People => self.people_topic.as_str(),
        };
        let payload = serde_json::to_vec(batch).context("encode recognition batch")?;
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .with_context(|| format!("publish recognition batch to {}", topic))?;
        Ok(())
    }
}
