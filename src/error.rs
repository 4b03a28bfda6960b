use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("invalid broker address '{address}': {reason}")]
    InvalidBroker { address: String, reason: String },

    #[error("unsupported QoS level {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to connect to MQTT broker: {0}")]
    Connect(#[from] rumqttc::ConnectionError),

    #[error("MQTT broker refused connection: {0:?}")]
    Refused(rumqttc::ConnectReturnCode),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to queue publish: {0}")]
    Publish(#[from] rumqttc::ClientError),

    #[error("MQTT event loop stopped before delivery was confirmed")]
    EventLoopClosed,
}
