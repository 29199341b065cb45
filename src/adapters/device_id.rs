//! Device identity derived from the ESP32 factory MAC address.
//!
//! The last three MAC bytes give a stable suffix, `xxyyzz`, used as the
//! MQTT client id and Wi-Fi hostname (`fishtank-xxyyzz`).  Two dimmers on
//! one broker therefore never kick each other off.

use core::fmt::Write;

/// `fishtank-xxyyzz` (15 chars).
pub type ClientIdString = heapless::String<24>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the eFuse read writes exactly six bytes into `mac`.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// MQTT client id / hostname from the last 3 MAC bytes.
pub fn client_id(mac: &MacAddress) -> ClientIdString {
    let mut id = ClientIdString::new();
    let _ = write!(id, "fishtank-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_format() {
        let mac = [0x00, 0x11, 0x22, 0xAA, 0xBB, 0xCC];
        assert_eq!(client_id(&mac).as_str(), "fishtank-aabbcc");
    }

    #[test]
    fn client_id_from_sim_mac() {
        assert_eq!(read_mac(), read_mac());
        assert_eq!(client_id(&read_mac()).as_str(), "fishtank-efcafe");
    }
}
