pub mod broker;
pub mod client;
pub mod publisher;

pub use broker::BrokerAddress;
pub use client::MqttClient;
pub use publisher::PublishLoop;
