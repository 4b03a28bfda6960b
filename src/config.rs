use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use anyhow::Result;
use rumqttc::QoS;

use crate::error::PublisherError;
use crate::mqtt::BrokerAddress;

const CONFIG_ENV_VAR: &str = "IOT_PUBLISHER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./config.toml";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub publisher: PublisherConfig,
    pub device: DeviceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MqttConfig {
    pub broker: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Text,
    Json,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PublisherConfig {
    pub topic: String,
    pub payload: PayloadKind,
    pub qos: u8,
    pub retain: bool,
    pub interval_ms: u64,
    /// Stop after this many publishes. Unset publishes forever.
    pub max_messages: Option<u64>,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
    pub text_messages: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    pub temperature_base: f64,
    pub temperature_offset: f64,
    pub humidity_base: f64,
    pub humidity_offset: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Log to this file (truncated on startup) instead of stdout.
    pub file: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "tcp://localhost:1883".to_string(),
            client_id: "go-mqtt-client".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic: "iot-messages".to_string(),
            payload: PayloadKind::Json,
            qos: 0,
            retain: false,
            interval_ms: 1000,
            max_messages: None,
            seed: None,
            text_messages: vec![
                "Hello from the greenhouse".to_string(),
                "Sensor online".to_string(),
                "Readings nominal".to_string(),
                "Heartbeat".to_string(),
            ],
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: "043e5af81c".to_string(),
            name: "Greenhouse".to_string(),
            temperature_base: 76.3,
            temperature_offset: 2.5,
            humidity_base: 52.9,
            humidity_offset: 1.3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();

        let config = if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            // Save default config to file
            let toml_content = toml::to_string_pretty(&config)?;
            fs::write(config_path, toml_content)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PublisherError> {
        self.mqtt.broker_address()?;
        self.publisher.qos()?;

        if self.publisher.topic.is_empty() {
            return Err(PublisherError::InvalidConfig("publisher.topic must not be empty".into()));
        }
        if self.publisher.interval_ms == 0 {
            return Err(PublisherError::InvalidConfig("publisher.interval_ms must be positive".into()));
        }
        if self.publisher.payload == PayloadKind::Text && self.publisher.text_messages.is_empty() {
            return Err(PublisherError::InvalidConfig(
                "publisher.text_messages must not be empty for text payloads".into(),
            ));
        }

        let device = &self.device;
        for (name, value) in [
            ("temperature_base", device.temperature_base),
            ("humidity_base", device.humidity_base),
        ] {
            if !value.is_finite() {
                return Err(PublisherError::InvalidConfig(format!("device.{} must be finite", name)));
            }
        }
        for (name, value) in [
            ("temperature_offset", device.temperature_offset),
            ("humidity_offset", device.humidity_offset),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PublisherError::InvalidConfig(format!(
                    "device.{} must be a non-negative number",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl MqttConfig {
    pub fn broker_address(&self) -> Result<BrokerAddress, PublisherError> {
        self.broker.parse()
    }
}

impl PublisherConfig {
    pub fn qos(&self) -> Result<QoS, PublisherError> {
        match self.qos {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            other => Err(PublisherError::InvalidQos(other)),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "iot_mqtt_publisher_{}_{}.toml",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_defaults_match_fixed_endpoint() {
        let config = Config::default();
        assert_eq!(config.mqtt.broker, "tcp://localhost:1883");
        assert_eq!(config.mqtt.client_id, "go-mqtt-client");
        assert_eq!(config.publisher.topic, "iot-messages");
        assert_eq!(config.publisher.qos().unwrap(), QoS::AtMostOnce);
        assert!(!config.publisher.retain);
        assert_eq!(config.publisher.interval(), Duration::from_secs(1));
        assert_eq!(config.publisher.max_messages, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [publisher]
            payload = "text"
            interval_ms = 250

            [device]
            name = "Nursery"
            "#,
        )
        .unwrap();

        assert_eq!(config.publisher.payload, PayloadKind::Text);
        assert_eq!(config.publisher.interval_ms, 250);
        assert_eq!(config.publisher.topic, "iot-messages");
        assert_eq!(config.device.name, "Nursery");
        assert_eq!(config.device.id, "043e5af81c");
        assert_eq!(config.mqtt.client_id, "go-mqtt-client");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.publisher.qos = 3;
        assert!(matches!(config.validate(), Err(PublisherError::InvalidQos(3))));

        let mut config = Config::default();
        config.mqtt.broker = "http://localhost".to_string();
        assert!(matches!(config.validate(), Err(PublisherError::InvalidBroker { .. })));

        let mut config = Config::default();
        config.publisher.interval_ms = 0;
        assert!(matches!(config.validate(), Err(PublisherError::InvalidConfig(_))));

        let mut config = Config::default();
        config.publisher.payload = PayloadKind::Text;
        config.publisher.text_messages.clear();
        assert!(matches!(config.validate(), Err(PublisherError::InvalidConfig(_))));

        let mut config = Config::default();
        config.device.humidity_offset = -1.0;
        assert!(matches!(config.validate(), Err(PublisherError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_from_writes_default_when_missing() {
        let path = temp_config_path("missing");
        let _ = fs::remove_file(&path);

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.publisher.topic, "iot-messages");
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.mqtt.broker, config.mqtt.broker);
        assert_eq!(reloaded.device.temperature_base, config.device.temperature_base);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_from_rejects_invalid_file() {
        let path = temp_config_path("invalid");
        fs::write(&path, "[publisher]\nqos = 7\n").unwrap();

        assert!(Config::load_from(&path).is_err());

        let _ = fs::remove_file(&path);
    }
}
