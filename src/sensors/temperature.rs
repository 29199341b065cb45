//! DS18B20 tank thermometer on a 1-Wire bus.
//!
//! One sensor on the bus, so ROM addressing is skipped.  A read is:
//!
//! ```text
//! reset → SKIP ROM → CONVERT T → poll until done
//! reset → SKIP ROM → READ SCRATCHPAD (9 bytes, CRC-8 checked)
//! ```
//!
//! Bus timing is not done here.  On target the slots are generated by the
//! RMT peripheral through esp-idf-hal's `OWDriver` ([`RmtOneWire`]), so
//! interrupts and Wi-Fi activity cannot stretch them.

use crate::app::events::AppEvent;
use crate::app::ports::TemperaturePort;
use crate::error::SensorError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::{delay::FreeRtos, onewire::OWDriver};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::ESP_ERR_NOT_FOUND;

const CMD_SKIP_ROM: u8 = 0xCC;
const CMD_CONVERT_T: u8 = 0x44;
const CMD_READ_SCRATCHPAD: u8 = 0xBE;

/// 12-bit conversion time is 750 ms worst case.
const CONVERT_POLL_MS: u32 = 10;
const CONVERT_TIMEOUT_MS: u32 = 800;

/// Dallas/Maxim CRC-8 (poly x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Validate a scratchpad and convert its temperature to °C.
pub fn decode_scratchpad(sp: &[u8; 9]) -> Result<f32, SensorError> {
    if crc8(&sp[..8]) != sp[8] {
        return Err(SensorError::CrcMismatch);
    }
    let raw = i16::from_le_bytes([sp[0], sp[1]]);
    Ok(f32::from(raw) / 16.0)
}

/// What a thermometer read turns into on the wire.
///
/// A missing sensor publishes the "no reading" sentinel.  A corrupt or
/// failed read publishes nothing; the last good value stands.
pub fn reading_event(result: Result<f32, SensorError>) -> Option<AppEvent> {
    match result {
        Ok(c) => Some(AppEvent::Temperature(Some(c))),
        Err(SensorError::NotPresent) => Some(AppEvent::Temperature(None)),
        Err(e) => {
            log::warn!("TEMP: read failed: {}", e);
            None
        }
    }
}

/// Byte-level 1-Wire master.
pub trait OneWireBus {
    /// Reset pulse.  `Ok(false)` when no device answers with presence.
    fn reset(&mut self) -> Result<bool, SensorError>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), SensorError>;

    fn read(&mut self, buf: &mut [u8]) -> Result<(), SensorError>;

    /// Sleep between conversion polls.
    fn wait_ms(&mut self, ms: u32);
}

/// [`OneWireBus`] over the RMT-backed driver.
#[cfg(target_os = "espidf")]
pub struct RmtOneWire<'d>(pub OWDriver<'d>);

#[cfg(target_os = "espidf")]
impl OneWireBus for RmtOneWire<'_> {
    fn reset(&mut self) -> Result<bool, SensorError> {
        match self.0.reset() {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ESP_ERR_NOT_FOUND as i32 => Ok(false),
            Err(e) => {
                log::warn!("1-Wire: reset failed: {}", e);
                Err(SensorError::Bus)
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), SensorError> {
        self.0.write(bytes).map_err(|_| SensorError::Bus)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
        self.0.read(buf).map_err(|_| SensorError::Bus)
    }

    fn wait_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}

pub struct Ds18b20<B> {
    bus: B,
}

impl<B: OneWireBus> Ds18b20<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    fn command(&mut self, cmd: u8) -> Result<(), SensorError> {
        if !self.bus.reset()? {
            return Err(SensorError::NotPresent);
        }
        self.bus.write(&[CMD_SKIP_ROM, cmd])
    }

    /// Start a conversion and wait for it.  The sensor answers read slots
    /// with zeros while converting.
    fn convert(&mut self) -> Result<(), SensorError> {
        self.command(CMD_CONVERT_T)?;
        let mut waited = 0;
        loop {
            let mut busy = [0u8; 1];
            self.bus.read(&mut busy)?;
            if busy[0] != 0 {
                return Ok(());
            }
            if waited >= CONVERT_TIMEOUT_MS {
                return Err(SensorError::NotPresent);
            }
            self.bus.wait_ms(CONVERT_POLL_MS);
            waited += CONVERT_POLL_MS;
        }
    }

    /// One full measurement, in °C.
    pub fn measure(&mut self) -> Result<f32, SensorError> {
        self.convert()?;
        self.command(CMD_READ_SCRATCHPAD)?;
        let mut sp = [0u8; 9];
        self.bus.read(&mut sp)?;
        // A floating bus reads all ones; that is "no sensor", not a bad CRC.
        if sp.iter().all(|&b| b == 0xFF) {
            return Err(SensorError::NotPresent);
        }
        decode_scratchpad(&sp)
    }
}

impl<B: OneWireBus> TemperaturePort for Ds18b20<B> {
    fn sample(&mut self) -> Result<f32, SensorError> {
        self.measure()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Scripted bus: answers resets with `present` and reads from a queue.
    /// An empty queue reads as a released line (all ones).
    struct ScriptedBus {
        present: bool,
        reads: VecDeque<u8>,
        written: Vec<u8>,
        waited_ms: u32,
    }

    impl ScriptedBus {
        fn new(present: bool, reads: &[u8]) -> Self {
            Self {
                present,
                reads: reads.iter().copied().collect(),
                written: Vec::new(),
                waited_ms: 0,
            }
        }
    }

    impl OneWireBus for ScriptedBus {
        fn reset(&mut self) -> Result<bool, SensorError> {
            Ok(self.present)
        }
        fn write(&mut self, bytes: &[u8]) -> Result<(), SensorError> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }
        fn read(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
            for b in buf {
                *b = self.reads.pop_front().unwrap_or(0xFF);
            }
            Ok(())
        }
        fn wait_ms(&mut self, ms: u32) {
            self.waited_ms += ms;
        }
    }

    // Datasheet example scratchpad for +25.0625 °C.
    const SP_25C: [u8; 8] = [0x91, 0x01, 0x4B, 0x46, 0x7F, 0xFF, 0x0F, 0x10];

    fn with_crc(body: [u8; 8]) -> [u8; 9] {
        let mut sp = [0u8; 9];
        sp[..8].copy_from_slice(&body);
        sp[8] = crc8(&body);
        sp
    }

    #[test]
    fn crc_of_empty_is_zero() {
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn crc_over_data_and_crc_is_zero() {
        let sp = with_crc(SP_25C);
        assert_eq!(crc8(&sp), 0);
    }

    #[test]
    fn decodes_positive_temperature() {
        let t = decode_scratchpad(&with_crc(SP_25C)).unwrap();
        assert!((t - 25.0625).abs() < 1e-4);
    }

    #[test]
    fn decodes_negative_temperature() {
        // -10.125 °C = 0xFF5E
        let t = decode_scratchpad(&with_crc([0x5E, 0xFF, 0, 0, 0x7F, 0xFF, 0x0C, 0x10])).unwrap();
        assert!((t + 10.125).abs() < 1e-4);
    }

    #[test]
    fn rejects_bad_crc() {
        let mut sp = with_crc(SP_25C);
        sp[0] ^= 0x01;
        assert_eq!(decode_scratchpad(&sp), Err(SensorError::CrcMismatch));
    }

    #[test]
    fn measures_after_conversion_completes() {
        // Two busy polls, then done, then the scratchpad.
        let mut reads = vec![0x00, 0x00, 0xFF];
        reads.extend_from_slice(&with_crc(SP_25C));
        let mut sensor = Ds18b20::new(ScriptedBus::new(true, &reads));
        let t = sensor.sample().unwrap();
        assert!((t - 25.0625).abs() < 1e-4);
        assert_eq!(sensor.bus.written, [CMD_SKIP_ROM, CMD_CONVERT_T, CMD_SKIP_ROM, CMD_READ_SCRATCHPAD]);
        assert_eq!(sensor.bus.waited_ms, 2 * CONVERT_POLL_MS);
    }

    #[test]
    fn no_presence_pulse_reports_no_sensor() {
        let mut sensor = Ds18b20::new(ScriptedBus::new(false, &[]));
        assert_eq!(sensor.sample(), Err(SensorError::NotPresent));
    }

    #[test]
    fn empty_bus_reports_no_sensor() {
        // Presence glitch but nothing drives the line: all ones.
        let mut sensor = Ds18b20::new(ScriptedBus::new(true, &[]));
        assert_eq!(sensor.sample(), Err(SensorError::NotPresent));
    }

    #[test]
    fn stuck_conversion_times_out() {
        let reads = vec![0x00; 200];
        let mut sensor = Ds18b20::new(ScriptedBus::new(true, &reads));
        assert_eq!(sensor.sample(), Err(SensorError::NotPresent));
        assert_eq!(sensor.bus.waited_ms, CONVERT_TIMEOUT_MS);
    }

    #[test]
    fn only_missing_sensor_publishes_sentinel() {
        assert_eq!(reading_event(Ok(24.5)), Some(AppEvent::Temperature(Some(24.5))));
        assert_eq!(reading_event(Err(SensorError::NotPresent)), Some(AppEvent::Temperature(None)));
        assert_eq!(reading_event(Err(SensorError::CrcMismatch)), None);
        assert_eq!(reading_event(Err(SensorError::Bus)), None);
    }
}
