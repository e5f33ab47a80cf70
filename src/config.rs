use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_DETECTIONS_TOPIC: &str = "vision/darknet/bounding_boxes";
const DEFAULT_OBJECTS_TOPIC: &str = "vision/recognition/objects";
const DEFAULT_PEOPLE_TOPIC: &str = "vision/recognition/people";
const DEFAULT_IMAGE2WORLD_ENDPOINT: &str = "http://127.0.0.1:8750/image2world";
const DEFAULT_IMAGE2WORLD_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PERSON_LABEL: &str = "person";
const DEFAULT_QUEUE_SIZE: usize = 1;

#[derive(Debug, Deserialize, Default)]
struct RecognitiondConfigFile {
    subscribers: Option<SubscribersFile>,
    publishers: Option<PublishersFile>,
    image2world: Option<Image2WorldFile>,
    person: Option<PersonFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SubscribersFile {
    bounding_boxes: Option<TopicFile>,
}

#[derive(Debug, Deserialize, Default)]
struct PublishersFile {
    object_recognition: Option<TopicFile>,
    people_detection: Option<TopicFile>,
}

#[derive(Debug, Deserialize, Default)]
struct TopicFile {
    topic: Option<String>,
    queue_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct Image2WorldFile {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct PersonFile {
    identifier: Option<String>,
}

/// Runtime configuration for the recognition daemon.
#[derive(Debug, Clone)]
pub struct RecognitiondConfig {
    pub detections: TopicSettings,
    pub objects: TopicSettings,
    pub people: TopicSettings,
    pub image2world: Image2WorldSettings,
    pub person_label: String,
}

#[derive(Debug, Clone)]
pub struct TopicSettings {
    pub topic: String,
    pub queue_size: usize,
}

#[derive(Debug, Clone)]
pub struct Image2WorldSettings {
    pub endpoint: String,
    pub timeout: Duration,
}

impl RecognitiondConfig {
    /// Load from the file named by RECOGNITION_CONFIG (if set), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("RECOGNITION_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit config file path (environment still applies).
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RecognitiondConfigFile) -> Self {
        let bounding_boxes = file.subscribers.unwrap_or_default().bounding_boxes;
        let publishers = file.publishers.unwrap_or_default();
        let image2world = file.image2world.unwrap_or_default();
        Self {
            detections: topic_settings(bounding_boxes, DEFAULT_DETECTIONS_TOPIC),
            objects: topic_settings(publishers.object_recognition, DEFAULT_OBJECTS_TOPIC),
            people: topic_settings(publishers.people_detection, DEFAULT_PEOPLE_TOPIC),
            image2world: Image2WorldSettings {
                endpoint: image2world
                    .endpoint
                    .unwrap_or_else(|| DEFAULT_IMAGE2WORLD_ENDPOINT.to_string()),
                timeout: Duration::from_secs(
                    image2world
                        .timeout_secs
                        .unwrap_or(DEFAULT_IMAGE2WORLD_TIMEOUT_SECS),
                ),
            },
            person_label: file
                .person
                .and_then(|person| person.identifier)
                .unwrap_or_else(|| DEFAULT_PERSON_LABEL.to_string()),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(topic) = std::env::var("RECOGNITION_DETECTIONS_TOPIC") {
            if !topic.trim().is_empty() {
                self.detections.topic = topic;
            }
        }
        if let Ok(topic) = std::env::var("RECOGNITION_OBJECTS_TOPIC") {
            if !topic.trim().is_empty() {
                self.objects.topic = topic;
            }
        }
        if let Ok(topic) = std::env::var("RECOGNITION_PEOPLE_TOPIC") {
            if !topic.trim().is_empty() {
                self.people.topic = topic;
            }
        }
        if let Ok(endpoint) = std::env::var("RECOGNITION_IMAGE2WORLD_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.image2world.endpoint = endpoint;
            }
        }
        if let Ok(label) = std::env::var("RECOGNITION_PERSON_LABEL") {
            if !label.trim().is_empty() {
                self.person_label = label;
            }
        }
        if let Ok(timeout) = std::env::var("RECOGNITION_IMAGE2WORLD_TIMEOUT_SECS") {
            let seconds: u64 = timeout.parse().map_err(|_| {
                anyhow!("RECOGNITION_IMAGE2WORLD_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.image2world.timeout = Duration::from_secs(seconds);
        }
        Ok(())
    }

    /// Capacity of the MQTT client's bounded request channel.
    ///
    /// Outbound publishes are what that channel queues, so it is sized from
    /// the two outbound queue depths; the inbound queue depth is broker-side
    /// subscription policy and is not applied here.
    pub fn outbound_capacity(&self) -> usize {
        self.objects.queue_size + self.people.queue_size
    }

    fn validate(&self) -> Result<()> {
        for (name, settings) in [
            ("detections", &self.detections),
            ("objects", &self.objects),
            ("people", &self.people),
        ] {
            if settings.topic.trim().is_empty() {
                return Err(anyhow!("{} topic must not be empty", name));
            }
            if settings.queue_size == 0 {
                return Err(anyhow!("{} queue_size must be at least 1", name));
            }
        }
        if self.objects.topic == self.people.topic {
            return Err(anyhow!(
                "objects and people topics must differ: {}",
                self.objects.topic
            ));
        }
        if self.person_label.trim().is_empty() {
            return Err(anyhow!("person label must not be empty"));
        }
        if self.image2world.timeout.as_secs() == 0 {
            return Err(anyhow!("image2world timeout must be greater than zero"));
        }
        Ok(())
    }
}

fn topic_settings(file: Option<TopicFile>, default_topic: &str) -> TopicSettings {
    let file = file.unwrap_or_default();
    TopicSettings {
        topic: file.topic.unwrap_or_else(|| default_topic.to_string()),
        queue_size: file.queue_size.unwrap_or(DEFAULT_QUEUE_SIZE),
    }
}

fn read_config_file(path: &Path) -> Result<RecognitiondConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_when_no_config_file() {
        let cfg = RecognitiondConfig::from_file(RecognitiondConfigFile::default());
        assert_eq!(cfg.detections.topic, DEFAULT_DETECTIONS_TOPIC);
        assert_eq!(cfg.detections.queue_size, 1);
        assert_eq!(cfg.objects.topic, DEFAULT_OBJECTS_TOPIC);
        assert_eq!(cfg.people.topic, DEFAULT_PEOPLE_TOPIC);
        assert_eq!(cfg.person_label, "person");
        assert_eq!(cfg.image2world.timeout, Duration::from_secs(5));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "subscribers": {{
                    "bounding_boxes": {{"topic": "detector/boxes", "queue_size": 4}}
                }},
                "publishers": {{
                    "object_recognition": {{"topic": "rec/objects"}},
                    "people_detection": {{"topic": "rec/people"}}
                }},
                "image2world": {{"endpoint": "http://127.0.0.1:9000/i2w", "timeout_secs": 2}},
                "person": {{"identifier": "human"}}
            }}"#
        )
        .unwrap();
        let parsed = read_config_file(file.path()).unwrap();
        let cfg = RecognitiondConfig::from_file(parsed);
        assert_eq!(cfg.detections.topic, "detector/boxes");
        assert_eq!(cfg.detections.queue_size, 4);
        assert_eq!(cfg.objects.topic, "rec/objects");
        assert_eq!(cfg.people.topic, "rec/people");
        assert_eq!(cfg.image2world.endpoint, "http://127.0.0.1:9000/i2w");
        assert_eq!(cfg.image2world.timeout, Duration::from_secs(2));
        assert_eq!(cfg.person_label, "human");
    }

    #[test]
    fn outbound_capacity_sums_publisher_queue_sizes() {
        let mut cfg = RecognitiondConfig::from_file(RecognitiondConfigFile::default());
        assert_eq!(cfg.outbound_capacity(), 2);
        cfg.objects.queue_size = 5;
        cfg.people.queue_size = 3;
        assert_eq!(cfg.outbound_capacity(), 8);
    }

    #[test]
    fn validate_rejects_identical_outbound_topics() {
        let mut cfg = RecognitiondConfig::from_file(RecognitiondConfigFile::default());
        cfg.people.topic = cfg.objects.topic.clone();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_queue_size() {
        let mut cfg = RecognitiondConfig::from_file(RecognitiondConfigFile::default());
        cfg.detections.queue_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut cfg = RecognitiondConfig::from_file(RecognitiondConfigFile::default());
        cfg.image2world.timeout = Duration::from_secs(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn read_config_file_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(read_config_file(file.path()).is_err());
    }
}
