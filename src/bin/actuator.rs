// bin/actuator.rs
//
// Indicator LED switched over MQTT; the first "on" also starts DHT11 telemetry.

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
        delay::{Ets, FreeRtos},
        gpio::{IOPin, PinDriver, Pull},
        peripherals::Peripherals,
    };
    use esp_idf_svc::{
        eventloop::EspSystemEventLoop, nvs, timer::EspTaskTimerService, wifi::WifiDriver,
    };

    esp_idf_sys::esp_app_desc!();

    pub fn main() -> anyhow::Result<()> {
        esp_idf_sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();

        info!("Hello.");
        info!("esp32station actuator v{FW_VERSION} starting up.");

        let config = MyConfig::default();
        info!("My config:\n{config:#?}");

        let sysloop = EspSystemEventLoop::take()?;
        let timer = EspTaskTimerService::new()?;
        let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

        let peripherals = Peripherals::take()?;
        let pins = peripherals.pins;

        let led = PinDriver::output(pins.gpio2)?;
        let mut dht_pin = PinDriver::input_output_od(pins.gpio4.downgrade())?;
        dht_pin.set_pull(Pull::Up)?;
        let dht = MaskedDht11(Dht11::new(dht_pin, Ets));

        let wifidriver = WifiDriver::new(
            peripherals.modem,
            sysloop.clone(),
            Some(nvs_default_partition),
        )?;

        let shared_state = Arc::new(Box::pin(MyState::new(config)));
        let handler = CommandHandler::new(shared_state.clone(), led);

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
                    _ = Box::pin(run_mqtt(shared_state.clone(), &link, handler)) => { error!("run_mqtt() ended."); }
                    _ = Box::pin(run_climate_sampler(shared_state.clone(), dht, &link)) => { error!("run_climate_sampler() ended."); }
                };
            }));

        // not actually returning from main() but we reboot instead
        info!("main() finished, reboot.");
        FreeRtos::delay_ms(3000);
        esp_idf_hal::reset::restart();
    }
}

// EOF
