//! # battery-monitor
//! ## A battery and enclosure monitor for Linux single-board computers
//!
//! Features:
//! - Bus voltage and current from an INA219
//! - Temperature and humidity from an AHT20
//! - Battery status, state of charge, depth of discharge and a V/I impedance estimate
//! - Four rotating status pages on a 16x2 LCD behind a PCF8574 backpack
//! - Runs unattended under systemd, which restarts it after a fault

pub mod aht20;
pub mod battery;
pub mod error;
pub mod ina219;
pub mod lcd1602;
pub mod monitor;
pub mod preferences;
pub mod rendering;
pub mod sensors;
pub mod timer;

#[cfg(test)]
mod testing;
