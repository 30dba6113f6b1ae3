// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! MQTT transport for Frigate events and alerts

use anyhow::{anyhow, Result};
use rumqttc::{AsyncClient, Event, LastWill, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use super::Publisher;
use crate::config::MqttConfig;

const ONLINE: &str = "online";
const OFFLINE: &str = "offline";

/// Message received from the broker
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Topic the message was published on
    pub topic: String,
    /// Raw message body
    pub payload: Vec<u8>,
}

/// Connection to the broker shared by the inbound and outbound paths.
///
/// The rumqttc event loop runs on its own task: it re-subscribes and
/// announces `online` on every (re)connect, and forwards publishes in
/// arrival order to the receiver returned by [`MqttBridge::start`].
pub struct MqttBridge {
    client: AsyncClient,
    config: MqttConfig,
    connected: Arc<AtomicBool>,
}

impl MqttBridge {
    /// Connect to the broker and spawn the event loop.
    ///
    /// The loop stops when `shutdown` fires. Returns the bridge, used as the
    /// alert [`Publisher`], and the inbound message stream.
    pub fn start(
        config: &MqttConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(Arc<Self>, mpsc::Receiver<InboundMessage>)> {
        let client_id = if config.client_id.is_empty() {
            format!("frigate-alerts-{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
        } else {
            config.client_id.clone()
        };

        let mut options = MqttOptions::new(client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs.max(5)));
        options.set_last_will(LastWill::new(
            config.status_topic(),
            OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 100);
        let (tx, rx) = mpsc::channel(1024);
        let connected = Arc::new(AtomicBool::new(false));

        let bridge = Arc::new(Self {
            client: client.clone(),
            config: config.clone(),
            connected: Arc::clone(&connected),
        });

        let listen_topic = config.listen_topic.clone();
        let status_topic = config.status_topic();
        info!("Connecting to broker {}:{}", config.host, config.port);

        tokio::spawn(async move {
            loop {
                let polled = tokio::select! {
                    polled = eventloop.poll() => polled,
                    _ = shutdown.recv() => break,
                };

                match polled {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!("MQTT session is connected: {:?}", ack.code);
                        connected.store(true, Ordering::SeqCst);
                        if let Err(e) = client.try_subscribe(&listen_topic, QoS::AtLeastOnce) {
                            error!("MQTT subscribe to {} failed: {}", listen_topic, e);
                        } else {
                            info!("Subscribing to topic {}", listen_topic);
                        }
                        if let Err(e) = client.try_publish(&status_topic, QoS::AtLeastOnce, true, ONLINE) {
                            warn!("MQTT status publish failed: {}", e);
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        debug!("MQTT received: {}", msg.topic);
                        let inbound = InboundMessage {
                            topic: msg.topic.clone(),
                            payload: msg.payload.to_vec(),
                        };
                        if tx.send(inbound).await.is_err() {
                            debug!("Inbound consumer gone, stopping MQTT event loop");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        connected.store(false, Ordering::SeqCst);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if connected.swap(false, Ordering::SeqCst) {
                            warn!("MQTT session is disconnected: {:?}", e);
                        } else {
                            warn!("MQTT error: {:?}", e);
                        }
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
            debug!("MQTT event loop stopped");
        });

        Ok((bridge, rx))
    }

    /// Whether the last broker round trip succeeded
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Announce `offline` and close the session
    pub async fn disconnect(&self) -> Result<()> {
        self.client
            .publish(self.config.status_topic(), QoS::AtLeastOnce, true, OFFLINE)
            .await
            .map_err(|e| anyhow!("MQTT publish failed: {}", e))?;

        self.client
            .disconnect()
            .await
            .map_err(|e| anyhow!("MQTT disconnect failed: {}", e))?;

        self.connected.store(false, Ordering::SeqCst);
        info!("Disconnected from {}:{}", self.config.host, self.config.port);
        Ok(())
    }
}

impl Publisher for MqttBridge {
    fn publish(&self, topic: &str, payload: Vec<u8>) {
        if let Err(e) = self.client.try_publish(topic, QoS::AtMostOnce, false, payload) {
            warn!("MQTT publish to {} failed: {}", topic, e);
        }
    }
}
