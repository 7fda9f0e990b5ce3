// reading.rs

use serde::{Serialize, Serializer};

/// Full scale of the 12-bit ADC.
pub const ADC_MAX: u16 = 4095;

/// Published in place of temperature/humidity when the DHT11 read failed.
pub const FAILED_READ: f32 = -1.0;

/// Held by the shared climate pair until the first good read.
pub const UNKNOWN_READ: f32 = -100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Climate {
    pub temperature: f32,
    pub humidity: f32,
}

impl Climate {
    pub const FAILED: Climate = Climate {
        temperature: FAILED_READ,
        humidity: FAILED_READ,
    };

    pub const UNKNOWN: Climate = Climate {
        temperature: UNKNOWN_READ,
        humidity: UNKNOWN_READ,
    };

    pub fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    #[cfg(test)]
    pub fn is_failed(&self) -> bool {
        *self == Self::FAILED
    }
}

/// One poll cycle of the display station.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorReading {
    pub climate: Climate,
    pub rain_percent: u8,
    pub light_percent: u8,
    pub gas_raw: u16,
}

impl SensorReading {
    /// Light and rain sensors pull the line lower under stronger stimulus,
    /// hence the inverted scale.
    pub fn from_raw(climate: Climate, light_raw: u16, rain_raw: u16, gas_raw: u16) -> Self {
        Self {
            climate,
            rain_percent: adc_percent(rain_raw),
            light_percent: adc_percent(light_raw),
            gas_raw,
        }
    }
}

/// `round((4095 - raw) / 4095 * 100)`; codes above full scale count as full scale.
pub fn adc_percent(raw: u16) -> u8 {
    let inv = ADC_MAX.saturating_sub(raw) as f32;
    (inv / ADC_MAX as f32 * 100.0).round() as u8
}

fn one_decimal<S: Serializer>(v: &f32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*v as f64 * 10.0).round() / 10.0)
}

/// DHT11 telemetry of the actuator variant.
#[derive(Clone, Debug, Serialize)]
pub struct ClimatePayload {
    #[serde(rename = "temperatura", serialize_with = "one_decimal")]
    pub temperature: f32,
    #[serde(rename = "umidade", serialize_with = "one_decimal")]
    pub humidity: f32,
}

impl From<Climate> for ClimatePayload {
    fn from(c: Climate) -> Self {
        Self {
            temperature: c.temperature,
            humidity: c.humidity,
        }
    }
}

/// Combined telemetry of the display station, field order is part of the wire format.
#[derive(Clone, Debug, Serialize)]
pub struct StationPayload {
    #[serde(rename = "temperatura", serialize_with = "one_decimal")]
    pub temperature: f32,
    #[serde(rename = "umidade", serialize_with = "one_decimal")]
    pub humidity: f32,
    #[serde(rename = "chuva")]
    pub rain: u8,
    #[serde(rename = "ky028")]
    pub gas: u16,
    #[serde(rename = "luminosidade")]
    pub light: u8,
}

impl From<&SensorReading> for StationPayload {
    fn from(r: &SensorReading) -> Self {
        Self {
            temperature: r.climate.temperature,
            humidity: r.climate.humidity,
            rain: r.rain_percent,
            gas: r.gas_raw,
            light: r.light_percent,
        }
    }
}


// EOF
