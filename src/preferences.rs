use core::time::Duration;
use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::aht20::AHT20_DEFAULT_ADDRESS;
use crate::battery::Thresholds;
use crate::error::MonitorError;
use crate::ina219::{calibration_for, INA219_DEFAULT_ADDRESS};
use crate::lcd1602::LCD_DEFAULT_ADDRESS;

/// Preferences defines every tunable of the monitor.
/// page_delay_ms: Time each page stays on screen, which is also the sampling period
/// shunt_resistance_ohms: Shunt fitted to the INA219, used for its calibration register
/// battery: Voltage thresholds for status and state of charge
/// bus: I2C device and peripheral addresses
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub page_delay_ms: u64,
    pub shunt_resistance_ohms: f64,
    pub battery: Thresholds,
    pub bus: BusPreferences,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BusPreferences {
    pub path: String,
    pub power_sensor: u8,
    pub climate_sensor: u8,
    pub display: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            page_delay_ms: 5000,
            shunt_resistance_ohms: 0.1,
            battery: Thresholds::default(),
            bus: BusPreferences::default(),
        }
    }
}

impl Default for BusPreferences {
    fn default() -> Self {
        BusPreferences {
            path: "/dev/i2c-1".into(),
            power_sensor: INA219_DEFAULT_ADDRESS,
            climate_sensor: AHT20_DEFAULT_ADDRESS,
            display: LCD_DEFAULT_ADDRESS,
        }
    }
}

impl Preferences {
    /// Parses preferences from TOML; missing keys keep their defaults
    pub fn from_toml(contents: &str) -> Result<Self, MonitorError> {
        let preferences: Preferences = toml::from_str(contents)?;
        preferences.validate()?;
        Ok(preferences)
    }

    /// Loads preferences from a file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let Some(path) = path else {
            info!("No preferences file given, using defaults");
            return Ok(Self::default());
        };

        let contents = fs::read_to_string(path).map_err(|source| MonitorError::PreferencesIo {
            path: path.to_path_buf(),
            source,
        })?;
        let preferences = Self::from_toml(&contents)?;
        info!("Loaded preferences from {:?}", path);
        Ok(preferences)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Rejects settings that would make the metrics meaningless
    pub fn validate(&self) -> Result<(), MonitorError> {
        let invalid = |msg: String| Err(MonitorError::InvalidPreferences(msg));
        let b = &self.battery;

        if self.page_delay_ms == 0 {
            return invalid("page_delay_ms must be greater than zero".into());
        }
        if calibration_for(self.shunt_resistance_ohms).is_none() {
            return invalid(format!(
                "shunt_resistance_ohms {} is outside what the INA219 can calibrate",
                self.shunt_resistance_ohms
            ));
        }
        let voltages = [b.voltage_healthy, b.voltage_moderate, b.max_voltage, b.min_voltage];
        if voltages.iter().any(|v| !v.is_finite()) {
            return invalid("battery voltages must be finite".into());
        }
        if b.min_voltage >= b.max_voltage {
            return invalid(format!(
                "min_voltage ({}) must be below max_voltage ({})",
                b.min_voltage, b.max_voltage
            ));
        }
        if b.voltage_moderate > b.voltage_healthy {
            return invalid(format!(
                "voltage_moderate ({}) must not exceed voltage_healthy ({})",
                b.voltage_moderate, b.voltage_healthy
            ));
        }
        for (name, address) in [
            ("power_sensor", self.bus.power_sensor),
            ("climate_sensor", self.bus.climate_sensor),
            ("display", self.bus.display),
        ] {
            if address > 0x7F {
                return invalid(format!("bus.{name} address {address:#04x} is not 7 bit"));
            }
        }
        Ok(())
    }
}
