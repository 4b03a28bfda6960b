use std::fmt;
use std::str::FromStr;

use crate::error::PublisherError;

pub const DEFAULT_PORT: u16 = 1883;

/// Host and port of an MQTT broker, parsed from `tcp://host:port` style URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl FromStr for BrokerAddress {
    type Err = PublisherError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| PublisherError::InvalidBroker {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let rest = match address.trim().split_once("://") {
            Some(("tcp", rest)) | Some(("mqtt", rest)) => rest,
            Some((scheme, _)) => {
                return Err(invalid(&format!("unsupported scheme '{}'", scheme)));
            }
            None => address.trim(),
        };
        let rest = rest.trim_end_matches('/');

        let parse_port = |port: &str| port.parse::<u16>().map_err(|_| invalid("invalid port"));

        // IPv6 literals must be bracketed, as in `tcp://[::1]:1883`.
        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, tail) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid("unterminated '[' in IPv6 address"))?;
            let port = match tail {
                "" => DEFAULT_PORT,
                _ => parse_port(
                    tail.strip_prefix(':')
                        .ok_or_else(|| invalid("expected ':' after IPv6 address"))?,
                )?,
            };
            (host, port)
        } else {
            match rest.rsplit_once(':') {
                Some((host, _)) if host.contains(':') => {
                    return Err(invalid("IPv6 addresses must be enclosed in '[' and ']'"));
                }
                Some((host, port)) => (host, parse_port(port)?),
                None => (rest, DEFAULT_PORT),
            }
        };

        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "tcp://[{}]:{}", self.host, self.port)
        } else {
            write!(f, "tcp://{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp_url() {
        let addr: BrokerAddress = "tcp://localhost:1883".parse().unwrap();
        assert_eq!(addr.host, "localhost");
        assert_eq!(addr.port, 1883);
        assert_eq!(addr.to_string(), "tcp://localhost:1883");
    }

    #[test]
    fn test_parse_without_scheme_or_port() {
        let addr: BrokerAddress = "broker.local".parse().unwrap();
        assert_eq!(addr.host, "broker.local");
        assert_eq!(addr.port, DEFAULT_PORT);

        let addr: BrokerAddress = "10.0.0.5:1884".parse().unwrap();
        assert_eq!(addr.host, "10.0.0.5");
        assert_eq!(addr.port, 1884);

        let addr: BrokerAddress = "mqtt://example.com:8883/".parse().unwrap();
        assert_eq!(addr.port, 8883);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            "ws://localhost:1883".parse::<BrokerAddress>(),
            Err(PublisherError::InvalidBroker { .. })
        ));
        assert!("tcp://localhost:notaport".parse::<BrokerAddress>().is_err());
        assert!("tcp://localhost:70000".parse::<BrokerAddress>().is_err());
        assert!("tcp://:1883".parse::<BrokerAddress>().is_err());
    }

    #[test]
    fn test_parse_bracketed_ipv6() {
        let addr: BrokerAddress = "tcp://[::1]:1884".parse().unwrap();
        assert_eq!(addr.host, "::1");
        assert_eq!(addr.port, 1884);
        assert_eq!(addr.to_string(), "tcp://[::1]:1884");

        let addr: BrokerAddress = "[fe80::1]".parse().unwrap();
        assert_eq!(addr.host, "fe80::1");
        assert_eq!(addr.port, DEFAULT_PORT);
    }

    #[test]
    fn test_parse_rejects_unbracketed_ipv6() {
        assert!(matches!(
            "::1".parse::<BrokerAddress>(),
            Err(PublisherError::InvalidBroker { .. })
        ));
        assert!("tcp://::1:1883".parse::<BrokerAddress>().is_err());
        assert!("tcp://[::1".parse::<BrokerAddress>().is_err());
        assert!("tcp://[::1]1883".parse::<BrokerAddress>().is_err());
        assert!("tcp://[]:1883".parse::<BrokerAddress>().is_err());
    }
}
