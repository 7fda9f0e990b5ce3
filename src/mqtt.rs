// mqtt.rs

use esp_idf_svc::mqtt::client::{
    EspAsyncMqttClient, EspAsyncMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};
use tokio::sync::{mpsc, Mutex};

use crate::*;

const MQTT_RETRY_DELAY: u64 = 10;

/// Shared handle to the broker client; empty until the network is up.
pub struct MqttLink {
    client: Mutex<Option<EspAsyncMqttClient>>,
}

impl MqttLink {
    pub fn new() -> Self {
        Self {
            client: Mutex::new(None),
        }
    }

    async fn subscribe(&self, topic: &str) {
        let mut client = self.client.lock().await;
        let Some(client) = client.as_mut() else {
            return;
        };
        match client.subscribe(topic, QoS::AtMostOnce).await {
            Ok(_) => info!("MQTT subscribed to {topic}"),
            Err(e) => error!("MQTT subscribe to {topic} failed: {e:?}"),
        }
    }
}

impl Default for MqttLink {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher for MqttLink {
    async fn publish(&self, topic: &str, payload: &[u8]) -> anyhow::Result<bool> {
        let mut client = self.client.lock().await;
        let Some(client) = client.as_mut() else {
            return Ok(false);
        };
        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await?;
        Ok(true)
    }
}

/// Starts the broker client once an IP address is acquired and pumps its events
/// into `handler`. The client is recreated if its connection ever closes.
#[allow(unreachable_code)]
pub async fn run_mqtt<H: BusHandler>(
    state: Arc<Pin<Box<MyState>>>,
    link: &MqttLink,
    mut handler: H,
) -> anyhow::Result<()> {
    loop {
        if *state.wifi_up.read().await {
            break;
        }
        sleep(Duration::from_secs(1)).await;
    }
    let ip = *state.ip_addr.read().await;
    dispatch_event(&mut handler, &BusEvent::IpAcquired(ip));

    let myid = state.myid.read().await.clone();
    let (username, password) = state.config.mqtt_credentials();

    loop {
        info!("MQTT connecting to {}...", state.config.mqtt_url);
        let (client, conn) = match EspAsyncMqttClient::new(
            &state.config.mqtt_url,
            &MqttClientConfiguration {
                client_id: Some(&myid),
                username,
                password,
                keep_alive_interval: Some(Duration::from_secs(state.config.mqtt_keepalive)),
                ..Default::default()
            },
        ) {
            Ok(c) => c,
            Err(e) => {
                error!("MQTT client init failed: {e:?}");
                sleep(Duration::from_secs(MQTT_RETRY_DELAY)).await;
                continue;
            }
        };
        *link.client.lock().await = Some(client);
        info!("MQTT client started.");

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::join!(
            Box::pin(event_pump(conn, tx)),
            Box::pin(dispatcher(link, &mut handler, rx))
        );

        *link.client.lock().await = None;
        error!("MQTT connection closed.");
        sleep(Duration::from_secs(MQTT_RETRY_DELAY)).await;
    }
    Ok(())
}

async fn event_pump(mut conn: EspAsyncMqttConnection, tx: mpsc::UnboundedSender<BusEvent>) {
    while let Ok(event) = Box::pin(conn.next()).await {
        let ev = match event.payload() {
            EventPayload::Connected(_) => BusEvent::Connected,
            EventPayload::Disconnected => BusEvent::Disconnected,
            EventPayload::Received { topic, data, .. } => BusEvent::Message {
                topic: topic.unwrap_or_default().to_string(),
                payload: data.to_vec(),
            },
            EventPayload::Error(e) => BusEvent::Error(format!("{e:?}")),
            _ => continue,
        };
        if tx.send(ev).is_err() {
            break;
        }
    }
}

async fn dispatcher<H: BusHandler>(
    link: &MqttLink,
    handler: &mut H,
    mut rx: mpsc::UnboundedReceiver<BusEvent>,
) {
    while let Some(ev) = rx.recv().await {
        for topic in dispatch_event(handler, &ev) {
            link.subscribe(&topic).await;
        }
    }
}

// EOF
