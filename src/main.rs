mod config;
mod error;
mod generator;
mod models;
mod mqtt;

use anyhow::Result;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

use config::{Config, LoggingConfig};
use generator::SampleGenerator;
use mqtt::{MqttClient, PublishLoop};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;
    init_logging(&config.logging)?;

    info!("Starting IoT MQTT publisher");
    info!(
        "Broker: {}, client ID: {}, topic: {}, payload: {:?}",
        config.mqtt.broker, config.mqtt.client_id, config.publisher.topic, config.publisher.payload
    );

    // Connection failure is fatal, no retry
    let client = MqttClient::connect(&config.mqtt, &config.publisher).await?;

    let generator = SampleGenerator::from_config(&config);
    let mut publish_loop = PublishLoop::new(client, generator, &config.publisher);

    let loop_result = tokio::select! {
        result = publish_loop.run(config.publisher.max_messages) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received");
            Ok(())
        }
    };

    // Cleanup
    info!("Shutting down after {} messages...", publish_loop.published());
    let client = publish_loop.into_transport();
    if let Err(e) = client.disconnect().await {
        error!("Error disconnecting MQTT client: {}", e);
    }

    match loop_result {
        Ok(()) => {
            info!("Publisher shutdown completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Publisher error: {}", e);
            Err(e.into())
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))?;

    match &logging.file {
        Some(path) => {
            // Clear existing log on startup
            let log_file = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(log_file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}
