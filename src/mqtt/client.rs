use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn, error, debug};
use std::time::Duration;

use crate::config::{MqttConfig, PublisherConfig};
use crate::error::PublisherError;
use super::publisher::Transport;

const REQUEST_CAPACITY: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishing side of an MQTT connection.
///
/// The rumqttc event loop runs on a background task once connected. It reports
/// the packet id of each confirmed delivery back over `confirmations`, and
/// exits once the DISCONNECT packet has been written.
pub struct MqttClient {
    client: AsyncClient,
    qos: QoS,
    retain: bool,
    confirmations: mpsc::UnboundedReceiver<u16>,
    event_loop: JoinHandle<()>,
}

impl MqttClient {
    /// Connects and waits for the broker's ConnAck. There is no retry, so an
    /// unreachable broker fails on the first attempt.
    pub async fn connect(
        config: &MqttConfig,
        publisher: &PublisherConfig,
    ) -> Result<Self, PublisherError> {
        let broker = config.broker_address()?;
        let qos = publisher.qos()?;

        let mut mqtt_options = MqttOptions::new(&config.client_id, &broker.host, broker.port);

        // Set authentication if provided
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            mqtt_options.set_credentials(username, password);
        }

        mqtt_options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        mqtt_options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);

        info!("Connecting to MQTT broker at {} as '{}'", broker, config.client_id);
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                    if connack.code != ConnectReturnCode::Success {
                        return Err(PublisherError::Refused(connack.code));
                    }
                    info!("Connected to MQTT Broker");
                    break;
                }
                Ok(event) => debug!("MQTT event while connecting: {:?}", event),
                Err(ConnectionError::ConnectionRefused(code)) => {
                    return Err(PublisherError::Refused(code));
                }
                Err(e) => return Err(e.into()),
            }
        }

        let (confirm_sender, confirmations) = mpsc::unbounded_channel();
        let event_loop = tokio::spawn(drive_event_loop(eventloop, qos, confirm_sender));

        Ok(Self {
            client,
            qos,
            retain: publisher.retain,
            confirmations,
            event_loop,
        })
    }

    /// Queues a DISCONNECT and waits until the event loop has written it.
    pub async fn disconnect(self) -> Result<(), PublisherError> {
        info!("Disconnecting from MQTT broker...");
        self.client.disconnect().await?;

        let mut event_loop = self.event_loop;
        match tokio::time::timeout(DISCONNECT_TIMEOUT, &mut event_loop).await {
            Ok(Ok(())) => info!("Disconnected from MQTT broker"),
            Ok(Err(e)) => error!("MQTT event loop task failed: {}", e),
            Err(_) => {
                warn!("DISCONNECT not sent within {:?}, abandoning connection", DISCONNECT_TIMEOUT);
                event_loop.abort();
            }
        }
        Ok(())
    }
}

impl Transport for MqttClient {
    async fn send(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), PublisherError> {
        self.client.publish(topic, self.qos, self.retain, payload).await?;

        let pkid = self
            .confirmations
            .recv()
            .await
            .ok_or(PublisherError::EventLoopClosed)?;
        debug!("Delivery confirmed for packet ID: {}", pkid);
        Ok(())
    }
}

async fn drive_event_loop(
    mut eventloop: EventLoop,
    qos: QoS,
    confirmations: mpsc::UnboundedSender<u16>,
) {
    loop {
        match eventloop.poll().await {
            Ok(event) => {
                if let Some(pkid) = delivery_confirmation(&event, qos) {
                    if confirmations.send(pkid).is_err() {
                        debug!("Publisher dropped, stopping MQTT event loop");
                        break;
                    }
                    continue;
                }

                match event {
                    Event::Outgoing(Outgoing::Disconnect) => {
                        debug!("DISCONNECT written, stopping MQTT event loop");
                        break;
                    }
                    Event::Incoming(Packet::ConnAck(connack)) => {
                        info!("Connected to MQTT Broker ({:?})", connack.code);
                    }
                    Event::Incoming(Packet::Disconnect) => {
                        error!("Connection lost: broker sent DISCONNECT");
                    }
                    other => debug!("MQTT event: {:?}", other),
                }
            }
            Err(ConnectionError::RequestsDone) => {
                debug!("All MQTT clients dropped, stopping event loop");
                break;
            }
            Err(e) => {
                // rumqttc reconnects on the next poll.
                error!("Connection lost: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// The event that marks a publish at `qos` as delivered, if `event` is one.
fn delivery_confirmation(event: &Event, qos: QoS) -> Option<u16> {
    match (qos, event) {
        (QoS::AtMostOnce, Event::Outgoing(Outgoing::Publish(pkid))) => Some(*pkid),
        (QoS::AtLeastOnce, Event::Incoming(Packet::PubAck(ack))) => Some(ack.pkid),
        (QoS::ExactlyOnce, Event::Incoming(Packet::PubComp(comp))) => Some(comp.pkid),
        _ => None,
    }
}
