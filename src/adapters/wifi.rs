//! WiFi station-mode adapter.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi`, driven
//!   non-blocking so the dispatch loop never stalls on association.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! [`WifiAdapter::poll`] is called once a second.  After a failed or lost
//! association the adapter waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) before retrying.  The MQTT client reconnects on
//! its own once the link is back.

use core::fmt;
use log::{info, warn};

use super::utils::is_printable_ascii;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    InitFailed,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
            Self::InitFailed => write!(f, "WiFi driver init failed"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    /// Association requested; `polls` seconds spent waiting so far.
    Connecting { polls: u32 },
    Connected,
    /// Waiting `wait` more seconds before retrying.
    Backoff { wait: u32 },
}

const INITIAL_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;
/// Give up on one association attempt after this many seconds.
const CONNECT_TIMEOUT_SECS: u32 = 15;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_secs: u32,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    /// Simulation: remaining connect attempts that fail.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, ConnectivityError> {
        let wifi = EspWifi::new(modem, sysloop, nvs).map_err(|e| {
            warn!("WiFi: driver init failed: {}", e);
            ConnectivityError::InitFailed
        })?;
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: INITIAL_BACKOFF_SECS,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: INITIAL_BACKOFF_SECS,
            sim_failures: 0,
            sim_link_up: false,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Start associating.  Returns once the request is issued; progress is
    /// tracked by [`poll`](Self::poll).
    pub fn connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connecting { polls: 0 };
                Ok(())
            }
            Err(e) => {
                warn!("WiFi: connect request failed: {}", e);
                self.enter_backoff();
                Err(e)
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    /// Advance the connection state machine by one second.
    pub fn poll(&mut self) {
        let link = self.platform_is_connected();
        self.state = match self.state {
            WifiState::Disconnected => WifiState::Disconnected,
            WifiState::Connecting { .. } | WifiState::Backoff { .. } if link => {
                info!("WiFi: associated with '{}'", self.ssid);
                self.backoff_secs = INITIAL_BACKOFF_SECS;
                WifiState::Connected
            }
            WifiState::Connecting { polls } if polls + 1 >= CONNECT_TIMEOUT_SECS => {
                warn!("WiFi: association timed out");
                self.next_backoff()
            }
            WifiState::Connecting { polls } => WifiState::Connecting { polls: polls + 1 },
            WifiState::Connected if !link => {
                warn!("WiFi: link lost, backing off {}s", self.backoff_secs);
                self.next_backoff()
            }
            WifiState::Connected => WifiState::Connected,
            WifiState::Backoff { wait } if wait > 1 => WifiState::Backoff { wait: wait - 1 },
            WifiState::Backoff { .. } => {
                info!("WiFi: retrying '{}'", self.ssid);
                match self.platform_connect() {
                    Ok(()) => WifiState::Connecting { polls: 0 },
                    Err(_) => self.next_backoff(),
                }
            }
        };
    }

    fn enter_backoff(&mut self) {
        self.state = self.next_backoff();
    }

    /// Current backoff, doubling the next one.
    fn next_backoff(&mut self) -> WifiState {
        let wait = self.backoff_secs;
        self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
        WifiState::Backoff { wait }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        self.wifi
            .set_configuration(&config)
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|_| ConnectivityError::ConnectionFailed)?;
        }
        self.wifi.connect().map_err(|_| ConnectivityError::ConnectionFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            return Err(ConnectivityError::ConnectionFailed);
        }
        self.sim_link_up = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_link_up
    }

    /// Simulation: make the next `n` connect attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures = n;
    }

    /// Simulation: drop the link as if the AP vanished.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim_link_up = false;
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
