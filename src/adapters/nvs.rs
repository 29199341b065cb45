//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`KvStore`] over one namespace,
//! `fishtank`:
//!
//! | key      | type          | contents                      |
//! |----------|---------------|-------------------------------|
//! | `syscfg` | blob          | postcard-encoded SystemConfig |
//! | `bri/<n>`| i16           | channel brightness            |
//! | `pow/<n>`| i16           | channel power (0 / 1)         |
//!
//! On target the namespace is an `EspNvs` handle on the default
//! partition.  Elsewhere a `RefCell<HashMap>` stands in, with i16 values
//! stored as two little-endian bytes so type mismatches behave as they
//! do on flash.

use log::info;

use crate::app::ports::{ConfigError, ConfigPort, KvStore, StorageError};
use crate::config::SystemConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
#[cfg(target_os = "espidf")]
use log::warn;

pub const NAMESPACE: &str = "fishtank";
const CONFIG_KEY: &str = "syscfg";

/// Upper bound on the encoded config blob.
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    nvs: EspNvs<NvsDefault>,
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

#[cfg(target_os = "espidf")]
impl NvsAdapter {
    /// Open the `fishtank` namespace read-write on the default partition.
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, ConfigError> {
        let nvs = EspNvs::new(partition, NAMESPACE, true).map_err(|e| {
            warn!("NvsAdapter: open {} failed: {}", NAMESPACE, e);
            ConfigError::IoError
        })?;
        info!("NvsAdapter: ESP-IDF NVS namespace '{}' open", NAMESPACE);
        Ok(Self { nvs })
    }
}

#[cfg(not(target_os = "espidf"))]
impl NvsAdapter {
    pub fn new() -> Self {
        info!("NvsAdapter: simulation backend");
        Self {
            store: std::cell::RefCell::new(HashMap::new()),
        }
    }

    /// Raw write, bypassing the type tagging.  Lets tests plant corrupt
    /// or mistyped entries.
    pub fn put_raw(&self, key: &str, bytes: &[u8]) {
        self.store.borrow_mut().insert(key.to_owned(), bytes.to_vec());
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ── KvStore ───────────────────────────────────────────────────

impl KvStore for NvsAdapter {
    fn get_i16(&self, key: &str) -> Result<Option<i16>, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.borrow().get(key) {
                None => Ok(None),
                Some(bytes) => {
                    let raw: [u8; 2] = bytes
                        .as_slice()
                        .try_into()
                        .map_err(|_| StorageError::TypeMismatch)?;
                    Ok(Some(i16::from_le_bytes(raw)))
                }
            }
        }

        #[cfg(target_os = "espidf")]
        {
            self.nvs.get_i16(key).map_err(|e| {
                warn!("NvsAdapter: get_i16 {} failed: {}", key, e);
                StorageError::IoError
            })
        }
    }

    fn set_i16(&mut self, key: &str, value: i16) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(key.to_owned(), value.to_le_bytes().to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            self.nvs.set_i16(key, value).map_err(|e| {
                warn!("NvsAdapter: set_i16 {} failed: {}", key, e);
                StorageError::IoError
            })
        }
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        // EspNvs commits inside every set; the sim store is always durable.
        Ok(())
    }
}

// ── ConfigPort ────────────────────────────────────────────────

impl NvsAdapter {
    fn read_config_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            Ok(self.store.borrow().get(CONFIG_KEY).cloned())
        }

        #[cfg(target_os = "espidf")]
        {
            let mut buf = [0u8; MAX_BLOB_SIZE];
            match self.nvs.get_blob(CONFIG_KEY, &mut buf) {
                Ok(found) => Ok(found.map(<[u8]>::to_vec)),
                Err(e) => {
                    warn!("NvsAdapter: config read error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let Some(bytes) = self.read_config_blob()? else {
            info!("NvsAdapter: no stored config, using defaults");
            return Ok(SystemConfig::default());
        };
        let cfg: SystemConfig = postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
        Ok(cfg)
    }

    fn save(&mut self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::IoError);
        }

        #[cfg(not(target_os = "espidf"))]
        self.store.borrow_mut().insert(CONFIG_KEY.to_owned(), bytes.clone());

        #[cfg(target_os = "espidf")]
        self.nvs.set_blob(CONFIG_KEY, &bytes).map_err(|e| {
            warn!("NvsAdapter: config write error {}", e);
            ConfigError::IoError
        })?;

        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}
