use std::fmt;
use std::str::FromStr;

use nucleolink_frame::RESERVED_KEY;
use serde::{Deserialize, Serialize};

/// Kind of sensor attached to a polling slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SensorType {
    VoltageAndCurrent = 0,
    Temperature = 1,
    Flood = 2,
    Ph = 3,
    Depth = 4,
}

impl SensorType {
    pub const ALL: [SensorType; 5] = [
        SensorType::VoltageAndCurrent,
        SensorType::Temperature,
        SensorType::Flood,
        SensorType::Ph,
        SensorType::Depth,
    ];

    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            SensorType::VoltageAndCurrent => "voltage_and_current",
            SensorType::Temperature => "temperature",
            SensorType::Flood => "flood",
            SensorType::Ph => "ph",
            SensorType::Depth => "depth",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorType {
    type Err = String;

    /// Accepts the snake-case name or the numeric type code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u8>() {
            return SensorType::ALL
                .into_iter()
                .find(|t| t.as_byte() == code)
                .ok_or_else(|| format!("unknown sensor type code {code}"));
        }
        SensorType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown sensor type '{s}'"))
    }
}

/// One polling slot on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Key the device files readings under. Must not be the reserved key.
    pub id: u8,
    /// Bus address of the sensor peripheral.
    pub peripheral_address: u8,
    /// Device-side polling interval key.
    pub interval_key: u8,
    pub sensor_type: SensorType,
}

impl SensorConfig {
    /// The two command values of a registration:
    /// `[(id << 8) | peripheral_address, (interval_key << 8) | type]`.
    pub fn encode(&self) -> [u16; 2] {
        [
            u16::from_be_bytes([self.id, self.peripheral_address]),
            u16::from_be_bytes([self.interval_key, self.sensor_type.as_byte()]),
        ]
    }

    pub fn is_reserved(&self) -> bool {
        self.id == RESERVED_KEY
    }
}

impl FromStr for SensorConfig {
    type Err = String;

    /// Parses `id:address:interval:type`. Numbers may be decimal or `0x` hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [id, address, interval, kind] = parts.as_slice() else {
            return Err(format!(
                "expected id:address:interval:type, got '{s}'"
            ));
        };
        Ok(Self {
            id: parse_byte(id)?,
            peripheral_address: parse_byte(address)?,
            interval_key: parse_byte(interval)?,
            sensor_type: kind.parse()?,
        })
    }
}

pub(crate) fn parse_byte(s: &str) -> Result<u8, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| format!("invalid byte value '{s}'"))
}
