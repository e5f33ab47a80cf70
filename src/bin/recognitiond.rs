//! recognitiond - object recognition bridge daemon.
//!
//! This daemon:
//! 1. Subscribes to the detector's bounding-box topic over MQTT
//! 2. Partitions each detection frame into people and generic objects
//! 3. Publishes each non-empty partition as a recognition batch
//! 4. Resolves world-frame poses for the object partition via image2world
//! 5. Logs each correlated `<label, x, y, z>` pair

use anyhow::{Context, Result};
use clap::Parser;
use rumqttc::v5::{mqttbytes::QoS, Client, Connection, Event, Incoming, MqttOptions};
use rumqttc::Transport;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use object_recognition::{
    parse_detection_frame, parse_mqtt_endpoint, process_frame, validate_loopback_addr,
    HttpImage2World, MqttEndpoint, MqttRecognitionSink, RecognitiondConfig,
};

const DAEMON_NAME: &str = "recognitiond";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Bridge detector bounding boxes to recognition batches and world poses"
)]
struct Args {
    /// Path to the daemon config file (JSON).
    #[arg(long, env = "RECOGNITION_CONFIG")]
    config: Option<PathBuf>,

    /// MQTT broker address.
    /// By default, only loopback addresses are allowed for security.
    #[arg(long, env = "MQTT_BROKER_ADDR", default_value = "127.0.0.1:1883")]
    mqtt_broker_addr: String,

    /// Allow non-loopback MQTT connections.
    /// Use in trusted environments where the broker runs on another host.
    #[arg(long, env = "ALLOW_REMOTE_MQTT")]
    allow_remote_mqtt: bool,

    /// MQTT username for authentication.
    #[arg(long, env = "MQTT_USERNAME")]
    mqtt_username: Option<String>,

    /// MQTT password for authentication.
    #[arg(long, env = "MQTT_PASSWORD")]
    mqtt_password: Option<String>,

    /// Enable TLS for MQTT (required for mqtts:// brokers).
    #[arg(long, env = "MQTT_USE_TLS")]
    mqtt_use_tls: bool,

    /// MQTT client identifier.
    #[arg(long, env = "MQTT_CLIENT_ID", default_value = DAEMON_NAME)]
    mqtt_client_id: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => RecognitiondConfig::from_path(path)?,
        None => RecognitiondConfig::load()?,
    };

    let mqtt_endpoint = parse_mqtt_endpoint(&args.mqtt_broker_addr, args.mqtt_use_tls)?;
    if !args.allow_remote_mqtt {
        validate_loopback_addr(&mqtt_endpoint, &args.mqtt_broker_addr)?;
    } else {
        log::warn!("Remote MQTT enabled - ensure broker is in a trusted network");
    }

    log::info!("Recognition bridge starting");
    log::info!(
        "  MQTT broker: {}:{} (TLS: {})",
        mqtt_endpoint.host,
        mqtt_endpoint.port,
        mqtt_endpoint.use_tls
    );
    log::info!(
        "  Detections topic: {} (queue {}, broker-side)",
        cfg.detections.topic,
        cfg.detections.queue_size
    );
    log::info!(
        "  Objects topic: {} (queue {})",
        cfg.objects.topic,
        cfg.objects.queue_size
    );
    log::info!(
        "  People topic: {} (queue {})",
        cfg.people.topic,
        cfg.people.queue_size
    );
    log::info!(
        "  image2world endpoint: {} (timeout {}s)",
        cfg.image2world.endpoint,
        cfg.image2world.timeout.as_secs()
    );
    log::info!("  Person label: {}", cfg.person_label);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("install shutdown handler")?;
    }

    let mut localizer = HttpImage2World::new(&cfg.image2world.endpoint, cfg.image2world.timeout);

    // Main loop - reconnect on broker loss until shutdown.
    while running.load(Ordering::SeqCst) {
        let (client, mut connection) = connect_mqtt(
            &mqtt_endpoint,
            &args.mqtt_client_id,
            args.mqtt_username.as_deref(),
            args.mqtt_password.as_deref(),
            cfg.outbound_capacity(),
        )?;
        client.subscribe(&cfg.detections.topic, QoS::AtMostOnce)?;
        log::info!("Subscribed to {}", cfg.detections.topic);

        let mut sink =
            MqttRecognitionSink::new(client.clone(), &cfg.objects.topic, &cfg.people.topic);

        for event in connection.iter() {
            if !running.load(Ordering::SeqCst) {
                let _ = client.disconnect();
                break;
            }
            match event {
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    if let Err(e) =
                        process_message(&publish.payload, &cfg, &mut sink, &mut localizer)
                    {
                        log::warn!("Failed to process detection frame: {:#}", e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("MQTT connection error: {}. Reconnecting...", e);
                    break;
                }
            }
        }

        if running.load(Ordering::SeqCst) {
            log::warn!("MQTT connection closed. Reconnecting...");
            std::thread::sleep(RECONNECT_DELAY);
        }
    }

    log::info!("Recognition bridge shutting down");
    Ok(())
}

fn process_message(
    payload: &[u8],
    cfg: &RecognitiondConfig,
    sink: &mut MqttRecognitionSink,
    localizer: &mut HttpImage2World,
) -> Result<()> {
    let frame = parse_detection_frame(payload)?;
    log::info!("Image ID: {}", frame.image_id);

    let report = process_frame(frame, &cfg.person_label, sink, localizer)?;
    log::debug!(
        "published {} object and {} person detections ({} malformed dropped)",
        report.objects_published,
        report.people_published,
        report.dropped_malformed
    );
    for pair in &report.correlated {
        log::info!(
            "<{}, {}, {}, {}>",
            pair.detection.label,
            pair.pose.position.x,
            pair.pose.position.y,
            pair.pose.position.z
        );
    }
    Ok(())
}

fn connect_mqtt(
    endpoint: &MqttEndpoint,
    client_id: &str,
    username: Option<&str>,
    password: Option<&str>,
    capacity: usize,
) -> Result<(Client, Connection)> {
    let mut options = MqttOptions::new(client_id, &endpoint.host, endpoint.port);
    options.set_keep_alive(Duration::from_secs(60));
    options.set_clean_start(true);
    if let Some(user) = username {
        options.set_credentials(user, password.unwrap_or_default());
    }
    if endpoint.use_tls {
        options.set_transport(Transport::tls_with_default_config());
    }

    let (client, connection) = Client::new(options, capacity.max(1));
    log::info!(
        "Connected to MQTT broker (TLS: {}, auth: {})",
        endpoint.use_tls,
        username.is_some()
    );
    Ok((client, connection))
}
