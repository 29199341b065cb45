//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DimmerService (domain)
//! ```
//!
//! Driven adapters (PWM outputs, NVS, MQTT, OTA, thermometer) implement
//! these traits.  The [`DimmerService`](super::service::DimmerService)
//! consumes them via generics, so the domain core never touches hardware
//! directly and every dispatch path is unit-testable on the host.

use crate::config::SystemConfig;
use crate::error::{ActuatorError, SensorError};

// ───────────────────────────────────────────────────────────────
// Output port (driven adapter: domain → PWM hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the dimmer outputs.
///
/// Writes are assumed non-blocking.  A failed write leaves the output in
/// an unknown state; callers treat it as fatal.
pub trait OutputPort {
    /// Write `duty` (already mapped and clamped) to `channel`.
    fn apply(&mut self, channel: usize, duty: u16) -> Result<(), ActuatorError>;

    /// Number of physical outputs wired.
    fn channel_count(&self) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / MQTT)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, MQTT
/// status topics).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Flat key-value store of signed 16-bit integers.
///
/// A missing key is `Ok(None)`, never an error.
pub trait KvStore {
    fn get_i16(&self, key: &str) -> Result<Option<i16>, StorageError>;

    fn set_i16(&mut self, key: &str, value: i16) -> Result<(), StorageError>;

    /// Flush pending writes to flash.
    fn commit(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST run [`SystemConfig::validate`] before persisting.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns `Err(ConfigError::NotFound)` on first boot.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Firmware update port
// ───────────────────────────────────────────────────────────────

/// Pulls a firmware image into the inactive OTA slot.
///
/// On `Ok` the new image is marked bootable; the caller decides when to
/// restart.  `on_chunk` runs after each chunk is written, so a download
/// longer than the watchdog timeout can keep the watchdog fed.
pub trait OtaPort {
    fn update(&mut self, url: &str, on_chunk: &mut dyn FnMut()) -> Result<(), OtaError>;
}

// ───────────────────────────────────────────────────────────────
// Temperature port
// ───────────────────────────────────────────────────────────────

/// One-shot thermometer read, in °C.
pub trait TemperaturePort {
    fn sample(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`KvStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Storage partition is full.
    Full,
    /// Stored value has the wrong type or size.
    TypeMismatch,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`OtaPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    /// No firmware URL configured.
    NoUrl,
    /// HTTP connection or request failed.
    Connect,
    /// Server answered with a non-200 status.
    HttpStatus(u16),
    /// No inactive partition or it could not be opened.
    BeginFailed,
    /// Writing a chunk to flash failed.
    WriteFailed,
    /// Image verification or boot-partition switch failed.
    FinalizeFailed,
    /// OTA is not available on this target.
    Unsupported,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Full => write!(f, "storage full"),
            Self::TypeMismatch => write!(f, "stored value has wrong type"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for StorageError {}

impl core::fmt::Display for OtaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoUrl => write!(f, "no firmware URL configured"),
            Self::Connect => write!(f, "HTTP request failed"),
            Self::HttpStatus(code) => write!(f, "HTTP status {}", code),
            Self::BeginFailed => write!(f, "OTA begin failed"),
            Self::WriteFailed => write!(f, "OTA write failed"),
            Self::FinalizeFailed => write!(f, "OTA finalize failed"),
            Self::Unsupported => write!(f, "OTA unsupported on this target"),
        }
    }
}

impl std::error::Error for OtaError {}
