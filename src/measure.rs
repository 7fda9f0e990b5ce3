// measure.rs

use std::fmt;

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
};

use crate::Climate;

const START_LOW_MS: u32 = 20;
const RESPONSE_WAIT_US: u32 = 40;
const RESPONSE_PHASE_US: u32 = 88;
const BIT_LOW_US: u32 = 65;
const BIT_HIGH_US: u32 = 75;
const FRAME_BITS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dht11Error {
    Pin,
    Timeout,
    Checksum,
}

impl fmt::Display for Dht11Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dht11Error::Pin => write!(f, "DHT11 pin I/O error"),
            Dht11Error::Timeout => write!(f, "DHT11 did not respond in time"),
            Dht11Error::Checksum => write!(f, "DHT11 frame checksum mismatch"),
        }
    }
}

impl std::error::Error for Dht11Error {}

/// DHT11 on a single open-drain line with an external pull-up.
pub struct Dht11<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> Dht11<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(mut pin: P, delay: D) -> Self {
        // idle state is released (pulled high)
        pin.set_high().ok();
        Self { pin, delay }
    }

    pub fn read(&mut self) -> Result<Climate, Dht11Error> {
        self.start_signal()?;
        let frame = self.receive_frame()?;
        decode_frame(&frame)
    }

    /// Host start pulse: hold the line low, then release it.
    pub fn start_signal(&mut self) -> Result<(), Dht11Error> {
        self.pin.set_low().map_err(|_| Dht11Error::Pin)?;
        self.delay.delay_ms(START_LOW_MS);
        self.pin.set_high().map_err(|_| Dht11Error::Pin)
    }

    /// Timing-critical part, must follow `start_signal` immediately.
    pub fn receive_frame(&mut self) -> Result<[u8; 5], Dht11Error> {
        // sensor answers with ~80us low, ~80us high
        self.wait_while(true, RESPONSE_WAIT_US)?;
        self.wait_while(false, RESPONSE_PHASE_US)?;
        self.wait_while(true, RESPONSE_PHASE_US)?;

        let mut frame = [0u8; 5];
        for bit in 0..FRAME_BITS {
            let low = self.wait_while(false, BIT_LOW_US)?;
            let high = self.wait_while(true, BIT_HIGH_US)?;
            // a one is a high pulse longer than the low preamble
            if high > low {
                frame[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
        Ok(frame)
    }

    /// Microseconds the line stayed at the given level.
    fn wait_while(&mut self, high: bool, timeout_us: u32) -> Result<u32, Dht11Error> {
        let mut us = 0;
        while self.pin.is_high().map_err(|_| Dht11Error::Pin)? == high {
            if us >= timeout_us {
                return Err(Dht11Error::Timeout);
            }
            self.delay.delay_us(1);
            us += 1;
        }
        Ok(us)
    }
}

/// DHT11 with the bit stream received under masked interrupts.
#[cfg(target_os = "espidf")]
pub struct MaskedDht11<P>(pub Dht11<P, esp_idf_hal::delay::Ets>);

#[cfg(target_os = "espidf")]
impl<P> crate::ClimateSensor for MaskedDht11<P>
where
    P: InputPin + OutputPin,
{
    fn read_climate(&mut self) -> anyhow::Result<Climate> {
        self.0.start_signal()?;
        let frame = esp_idf_hal::interrupt::free(|| self.0.receive_frame())?;
        Ok(decode_frame(&frame)?)
    }
}

/// Frame: humidity int, humidity dec, temperature int, temperature dec, checksum.
/// Bit 7 of the temperature decimal byte is the sign.
pub fn decode_frame(frame: &[u8; 5]) -> Result<Climate, Dht11Error> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(Dht11Error::Checksum);
    }

    let humidity = frame[0] as f32 + frame[1] as f32 / 10.0;
    let mut temperature = frame[2] as f32 + (frame[3] & 0x7f) as f32 / 10.0;
    if frame[3] & 0x80 != 0 {
        temperature = -temperature;
    }
    Ok(Climate::new(temperature, humidity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, convert::Infallible, rc::Rc};

    /// Simulated sensor: level is a function of time since the host released the line.
    struct FakeLine {
        now_ns: Rc<Cell<u64>>,
        released_at: Option<u64>,
        // (high, duration_us) after release; stays high afterwards
        wave: Vec<(bool, u64)>,
    }

    impl embedded_hal::digital::ErrorType for FakeLine {
        type Error = Infallible;
    }

    impl OutputPin for FakeLine {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.released_at = None;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.released_at = Some(self.now_ns.get());
            Ok(())
        }
    }

    impl InputPin for FakeLine {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            let Some(t0) = self.released_at else {
                return Ok(false);
            };
            let mut t = (self.now_ns.get() - t0) / 1000;
            for (high, dur) in &self.wave {
                if t < *dur {
                    return Ok(*high);
                }
                t -= dur;
            }
            Ok(true)
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|h| !h)
        }
    }

    struct FakeDelay(Rc<Cell<u64>>);

    impl DelayNs for FakeDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.set(self.0.get() + ns as u64);
        }
    }

    fn waveform(frame: [u8; 5]) -> Vec<(bool, u64)> {
        let mut wave = vec![(true, 30), (false, 80), (true, 80)];
        for byte in frame {
            for i in 0..8 {
                let one = byte & (0x80 >> i) != 0;
                wave.push((false, 50));
                wave.push((true, if one { 70 } else { 26 }));
            }
        }
        wave.push((false, 50));
        wave
    }

    fn sensor(wave: Vec<(bool, u64)>) -> Dht11<FakeLine, FakeDelay> {
        let clock = Rc::new(Cell::new(0));
        let line = FakeLine {
            now_ns: clock.clone(),
            released_at: None,
            wave,
        };
        Dht11::new(line, FakeDelay(clock))
    }

    #[test]
    fn reads_simulated_frame() {
        let frame = [55, 0, 24, 3, 82];
        let mut dht = sensor(waveform(frame));
        let c = dht.read().unwrap();
        assert_eq!(c.humidity, 55.0);
        assert!((c.temperature - 24.3).abs() < 1e-4);
    }

    #[test]
    fn silent_line_times_out() {
        let mut dht = sensor(Vec::new());
        assert_eq!(dht.read(), Err(Dht11Error::Timeout));
    }

    #[test]
    fn corrupted_frame_fails_checksum() {
        let mut dht = sensor(waveform([55, 0, 24, 3, 0]));
        assert_eq!(dht.read(), Err(Dht11Error::Checksum));
    }

    #[test]
    fn decode_negative_and_wrapping_sum() {
        let c = decode_frame(&[90, 0, 5, 0x82, 0xe1]).unwrap();
        assert_eq!(c.humidity, 90.0);
        assert!((c.temperature + 5.2).abs() < 1e-4);

        // 200 + 100 = 300 -> 44 after wrap
        let c = decode_frame(&[200, 0, 100, 0, 44]).unwrap();
        assert_eq!(c, Climate::new(100.0, 200.0));
    }
}

// EOF
