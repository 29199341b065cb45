//! Sensor drivers.  Only the tank thermometer for now; it is sampled on
//! demand from the command path, never on the tick.

pub mod temperature;
