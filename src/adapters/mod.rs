//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                 |
//! |-------------|--------------------|-----------------------------|
//! | `outputs`   | OutputPort         | LEDC PWM channels           |
//! | `nvs`       | KvStore            | NVS / in-memory store       |
//! |             | ConfigPort         |                             |
//! | `mqtt`      | EventSink          | MQTT broker (status, temp)  |
//! | `log_sink`  | EventSink          | Serial log output           |
//! | `ota`       | OtaPort            | HTTP(S) + OTA partitions    |
//! | `wifi`      |:                  | ESP-IDF WiFi STA            |
//! | `device_id` |:                  | eFuse MAC                   |

pub mod device_id;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod ota;
pub mod outputs;
pub(super) mod utils;
pub mod wifi;
