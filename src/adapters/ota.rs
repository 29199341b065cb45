//! Pull-style OTA firmware update: backed by the `esp-ota` crate.
//!
//! Flow: GET `<ota_url>` → begin → N × chunk → finalize → caller restarts
//!
//! [`OtaSession`] tracks the byte accounting on every target; the flash
//! writes behind it exist only on ESP-IDF.  [`HttpOta`] streams the image
//! over `esp_idf_svc`'s HTTP client into the session.

use log::{info, warn};

use crate::app::ports::{OtaError, OtaPort};

/// Largest image the inactive app partition can hold.
pub const MAX_FIRMWARE_SIZE: usize = 1920 * 1024;

/// HTTP read chunk.
const CHUNK_SIZE: usize = 4096;

// ── Session ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Receiving { bytes_written: usize },
    ReadyToReboot,
}

pub struct OtaSession {
    state: OtaState,
    #[cfg(target_os = "espidf")]
    update: Option<esp_ota::OtaUpdate>,
}

impl Default for OtaSession {
    fn default() -> Self {
        Self::new()
    }
}

impl OtaSession {
    pub fn new() -> Self {
        Self {
            state: OtaState::Idle,
            #[cfg(target_os = "espidf")]
            update: None,
        }
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    /// Open the inactive partition.  Any session in progress is dropped.
    pub fn begin(&mut self) -> Result<(), OtaError> {
        self.abort();

        #[cfg(target_os = "espidf")]
        {
            let update = esp_ota::OtaUpdate::begin().map_err(|e| {
                warn!("esp-ota begin failed: {:?}", e);
                OtaError::BeginFailed
            })?;
            self.update = Some(update);
        }

        self.state = OtaState::Receiving { bytes_written: 0 };
        Ok(())
    }

    /// Append a chunk.  Returns total bytes written.
    pub fn write_chunk(&mut self, data: &[u8]) -> Result<usize, OtaError> {
        let OtaState::Receiving { bytes_written } = self.state else {
            return Err(OtaError::BeginFailed);
        };
        let total = bytes_written + data.len();
        if total > MAX_FIRMWARE_SIZE {
            self.abort();
            return Err(OtaError::WriteFailed);
        }

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.update.as_mut() else {
                return Err(OtaError::BeginFailed);
            };
            if let Err(e) = update.write(data) {
                warn!("esp-ota write failed: {:?}", e);
                self.abort();
                return Err(OtaError::WriteFailed);
            }
        }

        self.state = OtaState::Receiving { bytes_written: total };
        Ok(total)
    }

    /// Verify the image and make it the next boot partition.
    pub fn finalize(&mut self) -> Result<(), OtaError> {
        match self.state {
            OtaState::Receiving { bytes_written } if bytes_written > 0 => {}
            _ => {
                self.abort();
                return Err(OtaError::FinalizeFailed);
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.update.take() else {
                self.abort();
                return Err(OtaError::FinalizeFailed);
            };
            let mut completed = update.finalize().map_err(|e| {
                warn!("esp-ota finalize failed: {:?}", e);
                OtaError::FinalizeFailed
            })?;
            completed.set_as_boot_partition().map_err(|e| {
                warn!("esp-ota set_as_boot_partition failed: {:?}", e);
                OtaError::FinalizeFailed
            })?;
        }

        self.state = OtaState::ReadyToReboot;
        info!("OTA: image finalized");
        Ok(())
    }

    /// Drop any partial image.
    pub fn abort(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            // Dropping OtaUpdate aborts the write.
            self.update.take();
        }
        if self.state != OtaState::Idle {
            warn!("OTA: session aborted");
        }
        self.state = OtaState::Idle;
    }
}

// ── HTTP pull adapter ─────────────────────────────────────────

/// Downloads the image at a URL into an [`OtaSession`].
#[derive(Default)]
pub struct HttpOta {
    session: OtaSession,
}

impl HttpOta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> OtaState {
        self.session.state()
    }

    #[cfg(target_os = "espidf")]
    fn download(&mut self, url: &str, on_chunk: &mut dyn FnMut()) -> Result<(), OtaError> {
        use esp_idf_svc::http::Method;
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

        let config = Configuration {
            buffer_size: Some(CHUNK_SIZE),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let mut conn = EspHttpConnection::new(&config).map_err(|_| OtaError::Connect)?;
        conn.initiate_request(Method::Get, url, &[])
            .map_err(|_| OtaError::Connect)?;
        conn.initiate_response().map_err(|_| OtaError::Connect)?;
        let status = conn.status();
        if status != 200 {
            return Err(OtaError::HttpStatus(status));
        }

        let total = stream_image(
            &mut self.session,
            |buf| conn.read(buf).map_err(|_| OtaError::Connect),
            on_chunk,
        )?;
        info!("OTA: {} bytes received", total);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn download(&mut self, url: &str, _on_chunk: &mut dyn FnMut()) -> Result<(), OtaError> {
        warn!("OTA(sim): no HTTP client, ignoring {}", url);
        Err(OtaError::Unsupported)
    }
}

impl OtaPort for HttpOta {
    fn update(&mut self, url: &str, on_chunk: &mut dyn FnMut()) -> Result<(), OtaError> {
        if url.is_empty() {
            return Err(OtaError::NoUrl);
        }
        info!("OTA: fetching {}", url);
        self.download(url, on_chunk)
    }
}

/// Copy an image from `read` into a fresh session and finalize it.
///
/// `read` fills the buffer and returns the byte count, 0 at end of stream.
/// `on_chunk` runs after every chunk lands in flash; the dispatch loop
/// feeds the watchdog from it.  Returns the image size.
pub fn stream_image(
    session: &mut OtaSession,
    mut read: impl FnMut(&mut [u8]) -> Result<usize, OtaError>,
    on_chunk: &mut dyn FnMut(),
) -> Result<usize, OtaError> {
    session.begin()?;
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0;
    loop {
        let n = match read(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                session.abort();
                return Err(e);
            }
        };
        if n == 0 {
            break;
        }
        total = session.write_chunk(&buf[..n])?;
        on_chunk();
    }
    session.finalize()?;
    Ok(total)
}

// ── Boot validation ───────────────────────────────────────────

/// Mark the running image valid so the bootloader cancels rollback.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    esp_ota::mark_app_valid();
    info!("OTA: firmware marked valid (rollback cancelled)");
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    info!("OTA rollback check (simulation): skipped");
}

// ── Tests ─────────────────────────────────────────────────────
