//! WiFi station bring-up.
//!
//! The probe joins a fixed lab network at boot and retries until it gets
//! there — without the link the command endpoint is unreachable anyway.
//! Credentials come from the build environment so images for different
//! sites need no code change.

/// Station SSID (`SONOPROBE_WIFI_SSID` at build time).
pub const WIFI_SSID: &str = match option_env!("SONOPROBE_WIFI_SSID") {
    Some(ssid) => ssid,
    None => "sonoprobe-lab",
};

/// Station passphrase (`SONOPROBE_WIFI_PASS` at build time).
pub const WIFI_PASS: &str = match option_env!("SONOPROBE_WIFI_PASS") {
    Some(pass) => pass,
    None => "sonoprobe",
};

#[cfg(target_os = "espidf")]
pub use espidf::connect;

#[cfg(target_os = "espidf")]
mod espidf {
    use esp_idf_hal::modem::Modem;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{info, warn};

    use crate::error::Error;

    /// Bring the station up and block until the netif has an address.
    ///
    /// Association retries forever, one attempt per second, matching the
    /// probe's headless deployment: there is no fallback interface.
    pub fn connect(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<BlockingWifi<EspWifi<'static>>, Error> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))
            .map_err(|_| Error::Init("wifi driver"))?;
        let mut wifi =
            BlockingWifi::wrap(esp_wifi, sysloop).map_err(|_| Error::Init("wifi event loop"))?;

        let config = Configuration::Client(ClientConfiguration {
            ssid: super::WIFI_SSID
                .try_into()
                .map_err(|()| Error::Init("SSID too long"))?,
            password: super::WIFI_PASS
                .try_into()
                .map_err(|()| Error::Init("passphrase too long"))?,
            ..Default::default()
        });
        wifi.set_configuration(&config)
            .map_err(|_| Error::Init("wifi configuration"))?;

        wifi.start().map_err(|_| Error::Init("wifi start"))?;

        loop {
            match wifi.connect() {
                Ok(()) => break,
                Err(e) => {
                    warn!("WiFi association failed ({e}), retrying in 1s...");
                    std::thread::sleep(std::time::Duration::from_secs(1));
                }
            }
        }

        wifi.wait_netif_up().map_err(|_| Error::Init("wifi netif"))?;
        info!("WiFi up, SSID '{}'", super::WIFI_SSID);

        Ok(wifi)
    }
}
