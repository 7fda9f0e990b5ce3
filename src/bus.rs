// bus.rs

use crate::*;

/// Outbound side of the message bus. Telemetry goes out at-least-once, never retained.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    /// `Ok(false)` means no client exists yet and the message was dropped.
    async fn publish(&self, topic: &str, payload: &[u8]) -> anyhow::Result<bool>;
}

/// Closed set of lifecycle events delivered from the network and bus layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    IpAcquired(std::net::Ipv4Addr),
    Connected,
    Disconnected,
    Message { topic: String, payload: Vec<u8> },
    Error(String),
}

/// Inbound side: what a firmware variant does with bus events.
pub trait BusHandler {
    /// Topics (re)subscribed after every connect.
    fn subscriptions(&self) -> Vec<String> {
        Vec::new()
    }

    fn on_message(&mut self, topic: &str, payload: &[u8]);
}

/// Display station only publishes.
pub struct PublishOnly;

impl BusHandler for PublishOnly {
    fn on_message(&mut self, topic: &str, _payload: &[u8]) {
        debug!("Ignoring message on {topic}");
    }
}

/// Logs lifecycle events and hands messages to the handler.
/// Returns the topics to subscribe to, if any.
pub fn dispatch_event<H: BusHandler>(handler: &mut H, event: &BusEvent) -> Vec<String> {
    match event {
        BusEvent::IpAcquired(ip) => {
            info!("Got IP address {ip}");
            Vec::new()
        }
        BusEvent::Connected => {
            info!("MQTT connected.");
            handler.subscriptions()
        }
        BusEvent::Disconnected => {
            warn!("MQTT disconnected.");
            Vec::new()
        }
        BusEvent::Message { topic, payload } => {
            info!("MQTT received on {topic}: {} bytes", payload.len());
            handler.on_message(topic, payload);
            Vec::new()
        }
        BusEvent::Error(e) => {
            error!("MQTT error: {e}");
            Vec::new()
        }
    }
}


// EOF
