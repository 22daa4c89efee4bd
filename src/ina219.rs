//! INA219 high-side bus voltage / current monitor.
//!
//! Configured for the 32V / 2A range with a 0.1mA current LSB. The calibration
//! register is derived from the shunt resistance, so any shunt can be used as
//! long as the register value fits in 16 bits.

use embedded_hal::i2c::I2c;
use log::debug;
use thiserror::Error;

use crate::sensors::PowerSensor;

pub const INA219_DEFAULT_ADDRESS: u8 = 0x40;

const REG_CONFIG: u8 = 0x00;
const REG_SHUNT_VOLTAGE: u8 = 0x01;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_CURRENT: u8 = 0x04;
const REG_CALIBRATION: u8 = 0x05;

// 32V bus range, /8 gain (320mV), 12 bit bus and shunt ADC, shunt+bus continuous
const CONFIG_32V_2A: u16 = 0x2000 | 0x1800 | 0x0180 | 0x0018 | 0x0007;

const CURRENT_LSB_MA: f64 = 0.1;
const BUS_VOLTAGE_LSB_V: f64 = 0.004;
const SHUNT_VOLTAGE_LSB_MV: f64 = 0.01;
// Fixed scaling constant from the datasheet calibration equation
const CALIBRATION_SCALE: f64 = 0.04096;

#[derive(Error, Debug)]
pub enum Ina219Error<E> {
    #[error("i2c transaction failed: {0:?}")]
    I2c(E),

    #[error("shunt resistance {0} ohm gives no usable calibration")]
    InvalidShunt(f64),
}

/// Calibration register value for the given shunt
/// param shunt_ohms: shunt resistance in ohms
/// returns None if the value does not fit the register
pub fn calibration_for(shunt_ohms: f64) -> Option<u16> {
    if !shunt_ohms.is_finite() || shunt_ohms <= 0.0 {
        return None;
    }
    let current_lsb_a = CURRENT_LSB_MA / 1000.0;
    // Rounded rather than truncated: 0.04096 / 1e-5 lands a hair under 4096 in f64
    let cal = (CALIBRATION_SCALE / (current_lsb_a * shunt_ohms)).round();
    // bit 0 is read-only
    if cal < 1.0 || cal > f64::from(u16::MAX - 1) {
        None
    } else {
        Some(cal as u16 & !1)
    }
}

pub struct Ina219<I> {
    i2c: I,
    address: u8,
    calibration: u16,
}

impl<I: I2c> Ina219<I> {
    /// Configures the chip and writes the calibration register
    /// param i2c: bus handle
    /// param address: 7-bit device address
    /// param shunt_ohms: shunt resistance fitted on the board
    pub fn new(i2c: I, address: u8, shunt_ohms: f64) -> Result<Self, Ina219Error<I::Error>> {
        let calibration = calibration_for(shunt_ohms).ok_or(Ina219Error::InvalidShunt(shunt_ohms))?;
        let mut ina = Ina219 {
            i2c,
            address,
            calibration,
        };
        ina.write_register(REG_CONFIG, CONFIG_32V_2A)?;
        ina.write_register(REG_CALIBRATION, calibration)?;
        debug!("INA219 at {address:#04x} calibrated to {calibration}");
        Ok(ina)
    }

    pub fn calibration(&self) -> u16 {
        self.calibration
    }

    fn write_register(&mut self, register: u8, value: u16) -> Result<(), Ina219Error<I::Error>> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[register, hi, lo])
            .map_err(Ina219Error::I2c)
    }

    fn read_register(&mut self, register: u8) -> Result<u16, Ina219Error<I::Error>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(Ina219Error::I2c)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Bus voltage in volts
    pub fn bus_voltage(&mut self) -> Result<f64, Ina219Error<I::Error>> {
        let raw = self.read_register(REG_BUS_VOLTAGE)?;
        // Low three bits are status flags
        Ok(f64::from(raw >> 3) * BUS_VOLTAGE_LSB_V)
    }

    /// Shunt voltage in millivolts
    pub fn shunt_voltage_mv(&mut self) -> Result<f64, Ina219Error<I::Error>> {
        let raw = self.read_register(REG_SHUNT_VOLTAGE)? as i16;
        Ok(f64::from(raw) * SHUNT_VOLTAGE_LSB_MV)
    }

    /// Current in milliamps
    pub fn current_ma(&mut self) -> Result<f64, Ina219Error<I::Error>> {
        // A load spike can reset the chip and clear calibration, which reads as 0mA
        self.write_register(REG_CALIBRATION, self.calibration)?;
        let raw = self.read_register(REG_CURRENT)? as i16;
        Ok(f64::from(raw) * CURRENT_LSB_MA)
    }
}

impl<I: I2c> PowerSensor for Ina219<I> {
    type Error = Ina219Error<I::Error>;

    const NAME: &'static str = "INA219";

    fn bus_voltage(&mut self) -> Result<f64, Self::Error> {
        Ina219::bus_voltage(self)
    }

    fn current_ma(&mut self) -> Result<f64, Self::Error> {
        Ina219::current_ma(self)
    }
}
