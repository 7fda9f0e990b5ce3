// config.rs

use std::fmt;

const DEFAULT_STATION_DELAY: u64 = 5;
const DEFAULT_CLIMATE_DELAY: u64 = 3;
const DEFAULT_MQTT_KEEPALIVE: u64 = 25;

pub const TOPIC_STATION_DATA: &str = "/ifpe/ads/embarcados/esp32/station/data";
pub const TOPIC_CLIMATE: &str = "/ifpe/ads/embarcados/esp32/dht11";
pub const TOPIC_COMMAND: &str = "/ifpe/ads/embarcados/esp32/led";

#[derive(Clone)]
pub struct MyConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,

    pub mqtt_url: String,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub mqtt_keepalive: u64,

    pub data_topic: String,
    pub climate_topic: String,
    pub command_topic: String,

    /// seconds between station cycles (display variant)
    pub station_delay: u64,
    /// seconds between DHT11 cycles (actuator variant)
    pub climate_delay: u64,
}

impl Default for MyConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: option_env!("WIFI_SSID").unwrap_or("internet").into(),
            wifi_pass: option_env!("WIFI_PASS").unwrap_or("password").into(),

            mqtt_url: option_env!("MQTT_URL")
                .unwrap_or("mqtt://mqtt.local:1883")
                .into(),
            mqtt_user: option_env!("MQTT_USER").unwrap_or("").into(),
            mqtt_pass: option_env!("MQTT_PASS").unwrap_or("").into(),
            mqtt_keepalive: DEFAULT_MQTT_KEEPALIVE,

            data_topic: TOPIC_STATION_DATA.into(),
            climate_topic: TOPIC_CLIMATE.into(),
            command_topic: TOPIC_COMMAND.into(),

            station_delay: DEFAULT_STATION_DELAY,
            climate_delay: DEFAULT_CLIMATE_DELAY,
        }
    }
}

impl MyConfig {
    /// Empty strings mean "no credential" for the broker.
    pub fn mqtt_credentials(&self) -> (Option<&str>, Option<&str>) {
        (non_empty(&self.mqtt_user), non_empty(&self.mqtt_pass))
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

// passwords stay out of the boot log
impl fmt::Debug for MyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MyConfig")
            .field("wifi_ssid", &self.wifi_ssid)
            .field("wifi_pass", &"***")
            .field("mqtt_url", &self.mqtt_url)
            .field("mqtt_user", &self.mqtt_user)
            .field("mqtt_pass", &"***")
            .field("mqtt_keepalive", &self.mqtt_keepalive)
            .field("data_topic", &self.data_topic)
            .field("climate_topic", &self.climate_topic)
            .field("command_topic", &self.command_topic)
            .field("station_delay", &self.station_delay)
            .field("climate_delay", &self.climate_delay)
            .finish()
    }
}


// EOF
