// bin/station.rs
//
// Weather station: DHT11 plus light, rain and KY-028 analog sensors,
// published over MQTT and shown on an ST7735S panel.

#![warn(clippy::large_futures)]

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::main()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("{} runs on ESP-IDF targets only.", env!("CARGO_BIN_NAME"));
}

#[cfg(target_os = "espidf")]
mod firmware {
    use esp32station::*;
    use esp_idf_hal::{
        adc::{
            attenuation::DB_11,
            oneshot::{config::AdcChannelConfig, AdcChannelDriver, AdcDriver},
            ADC1,
        },
        delay::{Ets, FreeRtos},
        gpio::{AnyIOPin, Gpio32, Gpio34, Gpio35, IOPin, PinDriver, Pull},
        peripherals::Peripherals,
        spi::{config, SpiDeviceDriver, SpiDriver, SpiDriverConfig},
        units::FromValueType,
    };
    use esp_idf_svc::{
        eventloop::EspSystemEventLoop, nvs, timer::EspTaskTimerService, wifi::WifiDriver,
    };

    esp_idf_sys::esp_app_desc!();

    const LCD_FRAME_BYTES: usize = LCD_WIDTH as usize * LCD_HEIGHT as usize * 2 + 8;

    type Channel<'a, P> = AdcChannelDriver<'a, P, &'a AdcDriver<'a, ADC1>>;

    struct StationAdc<'a> {
        light: Channel<'a, Gpio32>,
        rain: Channel<'a, Gpio34>,
        gas: Channel<'a, Gpio35>,
    }

    impl AnalogSensors for StationAdc<'_> {
        fn read_raw(&mut self, channel: AnalogChannel) -> anyhow::Result<u16> {
            let raw = match channel {
                AnalogChannel::Light => self.light.read_raw()?,
                AnalogChannel::Rain => self.rain.read_raw()?,
                AnalogChannel::Gas => self.gas.read_raw()?,
            };
            Ok(raw)
        }
    }

    pub fn main() -> anyhow::Result<()> {
        esp_idf_sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();

        info!("Hello.");
        info!("esp32station display station v{FW_VERSION} starting up.");

        let config = MyConfig::default();
        info!("My config:\n{config:#?}");

        let sysloop = EspSystemEventLoop::take()?;
        let timer = EspTaskTimerService::new()?;
        let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        let wifidriver = WifiDriver::new(
            peripherals.modem,
            sysloop.clone(),
            Some(nvs_default_partition),
        )?;
        info!("WiFi driver initialized. Waiting for connection...");

        let spi = SpiDriver::new(
            peripherals.spi2,
            pins.gpio18,
            pins.gpio23,
            None::<AnyIOPin>,
            &SpiDriverConfig::new().dma(esp_idf_hal::spi::Dma::Auto(LCD_FRAME_BYTES)),
        )?;
        let spi = SpiDeviceDriver::new(
            spi,
            Some(pins.gpio5),
            &config::Config::new().baudrate(26.MHz().into()),
        )?;
        let dc = PinDriver::output(pins.gpio2)?;
        let mut rst = PinDriver::output(pins.gpio21)?;

        let mut lcd = St7735::new(SpiDisplayBus::new(spi, dc));
        lcd.init(&mut rst, &mut FreeRtos);
        lcd.fill_screen(COLOR_BLACK);

        let adc = AdcDriver::new(peripherals.adc1)?;
        let adc_config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        let analog = StationAdc {
            light: AdcChannelDriver::new(&adc, pins.gpio32, &adc_config)?,
            rain: AdcChannelDriver::new(&adc, pins.gpio34, &adc_config)?,
            gas: AdcChannelDriver::new(&adc, pins.gpio35, &adc_config)?,
        };

        let mut dht_pin = PinDriver::input_output_od(pins.gpio4.downgrade())?;
        dht_pin.set_pull(Pull::Up)?;
        let dht = MaskedDht11(Dht11::new(dht_pin, Ets));

        let shared_state = Arc::new(Box::pin(MyState::new(config)));

        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?
            .block_on(Box::pin(async move {
                let link = MqttLink::new();
                let wifi_loop = WifiLoop {
                    state: shared_state.clone(),
                    wifi: None,
                };

                info!("Entering main loop...");
                tokio::select! {
                    _ = Box::pin(wifi_loop.run(wifidriver, sysloop, timer)) => { error!("wifi_loop.run() ended."); }
                    _ = Box::pin(run_mqtt(shared_state.clone(), &link, PublishOnly)) => { error!("run_mqtt() ended."); }
                    _ = Box::pin(run_station(shared_state.clone(), dht, analog, &link, Some(lcd))) => { error!("run_station() ended."); }
                };
            }));

        // not actually returning from main() but we reboot instead
        info!("main() finished, reboot.");
        FreeRtos::delay_ms(3000);
        esp_idf_hal::reset::restart();
    }
}

// EOF
