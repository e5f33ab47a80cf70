//! Broker address parsing and the loopback-only guard.

use anyhow::{anyhow, bail, Result};

/// Broker endpoint the daemon connects to.
#[derive(Clone, Debug)]
pub struct MqttEndpoint {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

/// Parse a broker address into host, port, and TLS mode.
///
/// Accepted forms: bare `host:port`, or a `mqtt://`, `tcp://`, `mqtts://`,
/// or `ssl://` URL. `force_tls` turns TLS on even for plain forms, for
/// brokers that terminate TLS on an unannotated address.
pub fn parse_mqtt_endpoint(addr: &str, force_tls: bool) -> Result<MqttEndpoint> {
    let trimmed = addr.trim();
    let (rest, scheme_tls) = match trimmed.split_once("://") {
        None => (trimmed, false),
        Some(("mqtt", rest)) | Some(("tcp", rest)) => (rest, false),
        Some(("mqtts", rest)) | Some(("ssl", rest)) => (rest, true),
        Some((scheme, _)) => {
            bail!("unsupported scheme '{}' in MQTT broker address {}", scheme, addr)
        }
    };

    let (host, port) = host_and_port(rest, addr)?;
    Ok(MqttEndpoint {
        host,
        port,
        use_tls: force_tls || scheme_tls,
    })
}

fn host_and_port(rest: &str, addr: &str) -> Result<(String, u16)> {
    // A bracketed IPv6 host carries its own colons, so the port separator
    // is whatever follows the closing bracket.
    let (host, port_text) = match rest.strip_prefix('[') {
        Some(bracketed) => {
            let (host, tail) = bracketed
                .split_once(']')
                .ok_or_else(|| anyhow!("unterminated '[' in MQTT broker address {}", addr))?;
            let port = tail.strip_prefix(':').ok_or_else(|| {
                anyhow!("no port after IPv6 host in MQTT broker address {}", addr)
            })?;
            (host, port)
        }
        None => rest
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("MQTT broker address must be host:port, got {}", addr))?,
    };
    let port = port_text
        .parse::<u16>()
        .map_err(|_| anyhow!("bad port '{}' in MQTT broker address {}", port_text, addr))?;
    Ok((host.to_string(), port))
}

/// Refuse a non-loopback broker unless the operator opted in.
pub fn validate_loopback_addr(endpoint: &MqttEndpoint, original: &str) -> Result<()> {
    let loopback = match endpoint.host.as_str() {
        "localhost" => true,
        host => host
            .parse::<std::net::IpAddr>()
            .map_or(false, |ip| ip.is_loopback()),
    };
    if loopback {
        return Ok(());
    }
    Err(anyhow!(
        "refusing non-loopback MQTT broker {}; pass --allow-remote-mqtt for a trusted network",
        original
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(host: &str) -> MqttEndpoint {
        MqttEndpoint {
            host: host.to_string(),
            port: 1883,
            use_tls: false,
        }
    }

    #[test]
    fn parses_default_broker_address() {
        // The daemon's --mqtt-broker-addr default.
        let ep = parse_mqtt_endpoint("127.0.0.1:1883", false).unwrap();
        assert_eq!(ep.host, "127.0.0.1");
        assert_eq!(ep.port, 1883);
        assert!(!ep.use_tls);
    }

    #[test]
    fn mqtt_scheme_stays_plain() {
        let ep = parse_mqtt_endpoint("mqtt://127.0.0.1:1883", false).unwrap();
        assert_eq!(ep.host, "127.0.0.1");
        assert!(!ep.use_tls);
    }

    #[test]
    fn mqtts_scheme_enables_tls() {
        let ep = parse_mqtt_endpoint("mqtts://mqtt.internal:8883", false).unwrap();
        assert_eq!(ep.host, "mqtt.internal");
        assert_eq!(ep.port, 8883);
        assert!(ep.use_tls);
    }

    #[test]
    fn force_tls_flag_overrides_plain_form() {
        let ep = parse_mqtt_endpoint("localhost:8883", true).unwrap();
        assert!(ep.use_tls);
    }

    #[test]
    fn bracketed_ipv6_host_keeps_its_colons() {
        let ep = parse_mqtt_endpoint("[fe80::1]:1883", false).unwrap();
        assert_eq!(ep.host, "fe80::1");
        assert_eq!(ep.port, 1883);
    }

    #[test]
    fn rejects_http_scheme() {
        let err = parse_mqtt_endpoint("http://127.0.0.1:1883", false).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn rejects_address_without_port() {
        assert!(parse_mqtt_endpoint("localhost", false).is_err());
    }

    #[test]
    fn rejects_non_numeric_port() {
        let err = parse_mqtt_endpoint("localhost:mqtt", false).unwrap_err();
        assert!(err.to_string().contains("bad port"));
    }

    #[test]
    fn loopback_hosts_pass_the_guard() {
        for host in ["localhost", "127.0.0.1", "::1"] {
            assert!(validate_loopback_addr(&endpoint(host), host).is_ok());
        }
    }

    #[test]
    fn remote_host_is_refused_with_the_escape_hatch_named() {
        let err = validate_loopback_addr(&endpoint("10.0.0.8"), "10.0.0.8:1883").unwrap_err();
        assert!(err.to_string().contains("--allow-remote-mqtt"));
    }

    #[test]
    fn hostname_that_is_not_an_ip_is_refused() {
        assert!(validate_loopback_addr(&endpoint("mqtt.internal"), "mqtt.internal:1883").is_err());
    }
}
