// wifi.rs

use embedded_svc::wifi::{ClientConfiguration, Configuration};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    netif::{self, EspNetif},
    timer::EspTaskTimerService,
    wifi::{AsyncWifi, EspWifi, WifiDriver},
};

use crate::*;

const CONNECT_TIMEOUT: u64 = 30;

pub struct WifiLoop<'a> {
    pub state: Arc<Pin<Box<MyState>>>,
    pub wifi: Option<AsyncWifi<EspWifi<'a>>>,
}

impl<'a> WifiLoop<'a> {
    pub async fn run(
        mut self,
        wifidriver: WifiDriver<'a>,
        sysloop: EspSystemEventLoop,
        timer: EspTaskTimerService,
    ) -> anyhow::Result<()> {
        info!("Initializing Wi-Fi...");

        let net_if = EspNetif::new(netif::NetifStack::Sta)?;
        let mac = net_if.get_mac()?;
        *self.state.myid.write().await = format!(
            "esp32station-{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            mac[0], mac[1], mac[2], mac[3], mac[4], mac[5],
        );

        let espwifi = EspWifi::wrap_all(wifidriver, net_if, EspNetif::new(netif::NetifStack::Ap)?)?;
        self.wifi = Some(AsyncWifi::wrap(espwifi, sysloop, timer)?);

        Box::pin(self.configure()).await?;

        if let Err(e) = Box::pin(self.connect(Some(Duration::from_secs(CONNECT_TIMEOUT)))).await {
            error!("WiFi connection failed: {e:?}");
            error!("Resetting...");
            sleep(Duration::from_secs(5)).await;
            esp_idf_hal::reset::restart();
        }

        self.stay_connected().await
    }

    pub async fn configure(&mut self) -> anyhow::Result<()> {
        info!("WiFi setting credentials...");
        let Some(wifi) = self.wifi.as_mut() else {
            bail!("WiFi not initialized");
        };
        let ssid = self.state.config.wifi_ssid.as_str();
        let pass = self.state.config.wifi_pass.as_str();
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: ssid
                .try_into()
                .map_err(|_| anyhow::anyhow!("WiFi SSID too long: {ssid}"))?,
            password: pass
                .try_into()
                .map_err(|_| anyhow::anyhow!("WiFi password too long"))?,
            ..Default::default()
        }))?;

        info!("WiFi driver starting...");
        Ok(Box::pin(wifi.start()).await?)
    }

    /// Associates and waits for DHCP. Publishes the address and raises `wifi_up`.
    async fn connect(&mut self, timeout: Option<Duration>) -> anyhow::Result<()> {
        let Some(wifi) = self.wifi.as_mut() else {
            bail!("WiFi not initialized");
        };

        info!("WiFi connecting...");
        Box::pin(wifi.connect()).await.ok();

        info!("WiFi waiting for IP address...");
        Box::pin(wifi.ip_wait_while(|w| w.is_up().map(|s| !s), timeout)).await?;

        let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
        info!("WiFi connected, IP {}", ip_info.ip);
        *self.state.ip_addr.write().await = ip_info.ip;
        *self.state.wifi_up.write().await = true;
        Ok(())
    }

    /// Reconnects unconditionally whenever the link drops.
    async fn stay_connected(mut self) -> anyhow::Result<()> {
        loop {
            if let Some(wifi) = self.wifi.as_ref() {
                // blocks while the link is up
                Box::pin(wifi.wifi_wait(|w| w.is_up(), None)).await.ok();
            }
            warn!("WiFi disconnected. Reconnecting...");
            *self.state.wifi_up.write().await = false;

            if let Err(e) = Box::pin(self.connect(Some(Duration::from_secs(CONNECT_TIMEOUT)))).await {
                error!("WiFi error: {e:?}");
                sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

// EOF
