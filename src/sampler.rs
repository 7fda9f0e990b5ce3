// sampler.rs

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};
use serde::Serialize;

use crate::*;

pub trait ClimateSensor {
    fn read_climate(&mut self) -> anyhow::Result<Climate>;
}

impl<P, D> ClimateSensor for Dht11<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn read_climate(&mut self) -> anyhow::Result<Climate> {
        Ok(self.read()?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalogChannel {
    Light,
    Rain,
    Gas,
}

/// 12-bit one-shot ADC channels.
pub trait AnalogSensors {
    fn read_raw(&mut self, channel: AnalogChannel) -> anyhow::Result<u16>;
}

pub trait Renderer {
    fn render(&mut self, reading: &SensorReading);
}

/// All sensor reads of one station cycle. Never fails: a bad DHT11 read becomes
/// the -1 sentinel, a bad ADC read becomes raw code 0.
pub fn sample_station<C, A>(climate: &mut C, analog: &mut A) -> SensorReading
where
    C: ClimateSensor,
    A: AnalogSensors,
{
    let dht = match climate.read_climate() {
        Ok(c) => c,
        Err(e) => {
            error!("DHT11 read failed: {e}");
            Climate::FAILED
        }
    };

    let mut raw = |ch: AnalogChannel| match analog.read_raw(ch) {
        Ok(v) => v,
        Err(e) => {
            error!("ADC read failed on {ch:?}: {e}");
            0
        }
    };
    let light = raw(AnalogChannel::Light);
    let rain = raw(AnalogChannel::Rain);
    let gas = raw(AnalogChannel::Gas);

    SensorReading::from_raw(dht, light, rain, gas)
}

async fn publish_json<P, T>(publisher: &P, topic: &str, payload: &T)
where
    P: Publisher,
    T: Serialize,
{
    let json = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    match publisher.publish(topic, json.as_bytes()).await {
        Ok(true) => info!("MQTT sent {topic}: {json}"),
        Ok(false) => debug!("MQTT client not up, dropped {topic}"),
        Err(e) => error!("MQTT send error: {e}"),
    }
}

/// Read everything, publish, then render.
pub async fn station_cycle<C, A, P, R>(
    climate: &mut C,
    analog: &mut A,
    publisher: &P,
    topic: &str,
    display: Option<&mut R>,
) -> SensorReading
where
    C: ClimateSensor,
    A: AnalogSensors,
    P: Publisher,
    R: Renderer,
{
    let reading = sample_station(climate, analog);
    publish_json(publisher, topic, &StationPayload::from(&reading)).await;

    if let Some(display) = display {
        display.render(&reading);
    }

    let c = reading.climate;
    info!(
        "Temperature:{:.1} | Humidity:{:.1} | Rain:{}% | KY028:{} | Light:{}%",
        c.temperature, c.humidity, reading.rain_percent, reading.gas_raw, reading.light_percent
    );
    reading
}

/// Free-running station loop of the display variant.
pub async fn run_station<C, A, P, R>(
    state: Arc<Pin<Box<MyState>>>,
    mut climate: C,
    mut analog: A,
    publisher: &P,
    mut display: Option<R>,
) -> anyhow::Result<()>
where
    C: ClimateSensor,
    A: AnalogSensors,
    P: Publisher,
    R: Renderer,
{
    let delay = Duration::from_secs(state.config.station_delay);
    let topic = state.config.data_topic.clone();
    info!("Station sampler running every {delay:?}");

    loop {
        Box::pin(station_cycle(
            &mut climate,
            &mut analog,
            publisher,
            &topic,
            display.as_mut(),
        ))
        .await;
        sleep(delay).await;
    }
}

/// One DHT11 cycle of the actuator variant. On failure the shared pair keeps its
/// previous value and nothing is published.
pub async fn climate_cycle<C, P>(
    sensor: &mut C,
    cell: &ClimateCell,
    publisher: &P,
    topic: &str,
) -> Option<Climate>
where
    C: ClimateSensor,
    P: Publisher,
{
    match sensor.read_climate() {
        Ok(c) => {
            cell.store(c);
            info!(
                "DHT11: humidity={:.1}%, temperature={:.1}C",
                c.humidity, c.temperature
            );
            publish_json(publisher, topic, &ClimatePayload::from(c)).await;
            Some(c)
        }
        Err(e) => {
            error!("DHT11 read failed: {e}");
            None
        }
    }
}

/// Waits for the first "on" command, then samples forever.
pub async fn run_climate_sampler<C, P>(
    state: Arc<Pin<Box<MyState>>>,
    mut sensor: C,
    publisher: &P,
) -> anyhow::Result<()>
where
    C: ClimateSensor,
    P: Publisher,
{
    if state.sampler.state() == SamplerState::NotStarted {
        info!("DHT11 sampler waiting for the first ON command");
    }
    state.sampler.started().await;

    let delay = Duration::from_secs(state.config.climate_delay);
    let topic = state.config.climate_topic.clone();
    info!("DHT11 sampler running every {delay:?}");

    loop {
        Box::pin(climate_cycle(&mut sensor, &state.climate, publisher, &topic)).await;
        sleep(delay).await;
    }
}


// EOF
