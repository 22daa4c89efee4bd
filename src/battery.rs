use core::fmt;

use serde::Deserialize;

use crate::sensors::SensorSample;

/// Currents at or below this magnitude (amps) are treated as zero for impedance.
pub const CURRENT_DEADBAND_A: f64 = 0.0001;

/// Voltage bounds used to classify and interpolate the battery state.
/// voltage_healthy: at or above this the battery is Healthy
/// voltage_moderate: at or above this (and below healthy) the battery is Moderate
/// max_voltage: fully charged voltage (100% SOC)
/// min_voltage: fully discharged voltage (0% SOC)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub voltage_healthy: f64,
    pub voltage_moderate: f64,
    pub max_voltage: f64,
    pub min_voltage: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            voltage_healthy: 11.5,
            voltage_moderate: 10.5,
            max_voltage: 12.6,
            min_voltage: 9.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryStatus {
    Healthy,
    Moderate,
    Critical,
}

impl BatteryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatteryStatus::Healthy => "Healthy",
            BatteryStatus::Moderate => "Moderate",
            BatteryStatus::Critical => "Critical",
        }
    }
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so width/alignment specifiers apply
        f.pad(self.as_str())
    }
}

/// Classifies a bus voltage into a battery status
/// param voltage: bus voltage in volts
/// param thresholds: voltage bounds
pub fn status(voltage: f64, thresholds: &Thresholds) -> BatteryStatus {
    if voltage >= thresholds.voltage_healthy {
        BatteryStatus::Healthy
    } else if voltage >= thresholds.voltage_moderate {
        BatteryStatus::Moderate
    } else {
        BatteryStatus::Critical
    }
}

/// State of charge in percent, linearly interpolated between min and max voltage
/// and clamped to [0, 100]
pub fn state_of_charge(voltage: f64, thresholds: &Thresholds) -> f64 {
    let span = thresholds.max_voltage - thresholds.min_voltage;
    ((voltage - thresholds.min_voltage) / span * 100.0).clamp(0.0, 100.0)
}

/// Depth of discharge, the complement of the state of charge
pub fn depth_of_discharge(soc: f64) -> f64 {
    100.0 - soc
}

/// Coarse V/I impedance estimate in ohms; 0 inside the current deadband
/// param voltage: bus voltage in volts
/// param current_ma: current in milliamps
pub fn impedance(voltage: f64, current_ma: f64) -> f64 {
    let current_a = current_ma / 1000.0;
    if current_a.abs() > CURRENT_DEADBAND_A {
        voltage / current_a
    } else {
        0.0
    }
}

/// Metrics derived from one sensor sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub status: BatteryStatus,
    pub soc_pct: f64,
    pub dod_pct: f64,
    pub impedance_ohms: f64,
}

impl DerivedMetrics {
    pub fn from_sample(sample: &SensorSample, thresholds: &Thresholds) -> Self {
        let soc_pct = state_of_charge(sample.bus_voltage_v, thresholds);
        DerivedMetrics {
            status: status(sample.bus_voltage_v, thresholds),
            soc_pct,
            dod_pct: depth_of_discharge(soc_pct),
            impedance_ohms: impedance(sample.bus_voltage_v, sample.current_ma),
        }
    }
}
