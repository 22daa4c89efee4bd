use core::fmt::Display;

use log::debug;

use crate::error::MonitorError;

/// One fresh reading from both sensors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub bus_voltage_v: f64,
    pub current_ma: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

/// A bus voltage / current monitor (INA219)
pub trait PowerSensor {
    type Error: Display;

    /// Device name used in error messages
    const NAME: &'static str;

    /// Bus voltage in volts
    fn bus_voltage(&mut self) -> Result<f64, Self::Error>;

    /// Current in milliamps, negative when flowing backwards through the shunt
    fn current_ma(&mut self) -> Result<f64, Self::Error>;
}

/// A temperature / humidity sensor (AHT20)
pub trait ClimateSensor {
    type Error: Display;

    const NAME: &'static str;

    fn measure(&mut self) -> Result<ClimateReading, Self::Error>;
}

fn read_error<E: Display>(device: &'static str) -> impl FnOnce(E) -> MonitorError {
    move |err| MonitorError::SensorRead {
        device,
        detail: err.to_string(),
    }
}

/// Gets a full sample: voltage and current first, then temperature and humidity
/// param power: voltage/current sensor
/// param climate: temperature/humidity sensor
/// returns the sample, or the first read error
pub fn read_sample<P, C>(power: &mut P, climate: &mut C) -> Result<SensorSample, MonitorError>
where
    P: PowerSensor,
    C: ClimateSensor,
{
    let bus_voltage_v = power.bus_voltage().map_err(read_error(P::NAME))?;
    let current_ma = power.current_ma().map_err(read_error(P::NAME))?;
    let climate = climate.measure().map_err(read_error(C::NAME))?;

    let sample = SensorSample {
        bus_voltage_v,
        current_ma,
        temperature_c: climate.temperature_c,
        humidity_pct: climate.humidity_pct,
    };
    debug!("sample: {sample:?}");
    Ok(sample)
}
