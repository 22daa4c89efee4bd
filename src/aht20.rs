//! AHT20 temperature and relative humidity sensor.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::debug;
use thiserror::Error;

use crate::sensors::{ClimateReading, ClimateSensor};

pub const AHT20_DEFAULT_ADDRESS: u8 = 0x38;

const CMD_SOFT_RESET: u8 = 0xBA;
const CMD_CALIBRATE: [u8; 3] = [0xBE, 0x08, 0x00];
const CMD_TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];

const STATUS_BUSY: u8 = 0x80;
const STATUS_CALIBRATED: u8 = 0x08;

const RESET_DELAY_MS: u32 = 20;
const MEASUREMENT_DELAY_MS: u32 = 80;
const POLL_DELAY_MS: u32 = 10;
const MAX_POLLS: u8 = 10;

// 2^20, full scale of the 20 bit readings
const FULL_SCALE: f64 = 1_048_576.0;

#[derive(Error, Debug)]
pub enum Aht20Error<E> {
    #[error("i2c transaction failed: {0:?}")]
    I2c(E),

    #[error("sensor did not report calibration")]
    Uncalibrated,

    #[error("sensor stayed busy for {0} polls")]
    Timeout(u8),
}

/// Converts a raw six byte frame into engineering units
/// param frame: status byte followed by 20 bit humidity and 20 bit temperature
pub fn decode_measurement(frame: &[u8; 6]) -> ClimateReading {
    let humidity_raw =
        (u32::from(frame[1]) << 12) | (u32::from(frame[2]) << 4) | (u32::from(frame[3]) >> 4);
    let temperature_raw =
        (u32::from(frame[3] & 0x0F) << 16) | (u32::from(frame[4]) << 8) | u32::from(frame[5]);

    ClimateReading {
        temperature_c: f64::from(temperature_raw) * 200.0 / FULL_SCALE - 50.0,
        humidity_pct: f64::from(humidity_raw) * 100.0 / FULL_SCALE,
    }
}

pub struct Aht20<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2c, D: DelayNs> Aht20<I, D> {
    /// Resets the sensor and loads its calibration
    pub fn new(i2c: I, delay: D, address: u8) -> Result<Self, Aht20Error<I::Error>> {
        let mut aht = Aht20 {
            i2c,
            delay,
            address,
        };
        aht.soft_reset()?;
        aht.calibrate()?;
        debug!("AHT20 at {address:#04x} calibrated");
        Ok(aht)
    }

    pub fn soft_reset(&mut self) -> Result<(), Aht20Error<I::Error>> {
        self.i2c
            .write(self.address, &[CMD_SOFT_RESET])
            .map_err(Aht20Error::I2c)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        Ok(())
    }

    fn calibrate(&mut self) -> Result<(), Aht20Error<I::Error>> {
        self.i2c
            .write(self.address, &CMD_CALIBRATE)
            .map_err(Aht20Error::I2c)?;
        let status = self.wait_until_idle()?;
        if status & STATUS_CALIBRATED == 0 {
            return Err(Aht20Error::Uncalibrated);
        }
        Ok(())
    }

    fn status(&mut self) -> Result<u8, Aht20Error<I::Error>> {
        let mut buf = [0u8; 1];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(Aht20Error::I2c)?;
        Ok(buf[0])
    }

    fn wait_until_idle(&mut self) -> Result<u8, Aht20Error<I::Error>> {
        for _ in 0..MAX_POLLS {
            let status = self.status()?;
            if status & STATUS_BUSY == 0 {
                return Ok(status);
            }
            self.delay.delay_ms(POLL_DELAY_MS);
        }
        Err(Aht20Error::Timeout(MAX_POLLS))
    }

    /// Triggers a conversion and waits for the result
    pub fn measure(&mut self) -> Result<ClimateReading, Aht20Error<I::Error>> {
        self.i2c
            .write(self.address, &CMD_TRIGGER)
            .map_err(Aht20Error::I2c)?;
        self.delay.delay_ms(MEASUREMENT_DELAY_MS);

        let mut frame = [0u8; 6];
        for _ in 0..MAX_POLLS {
            self.i2c
                .read(self.address, &mut frame)
                .map_err(Aht20Error::I2c)?;
            if frame[0] & STATUS_BUSY == 0 {
                return Ok(decode_measurement(&frame));
            }
            self.delay.delay_ms(POLL_DELAY_MS);
        }
        Err(Aht20Error::Timeout(MAX_POLLS))
    }
}

impl<I: I2c, D: DelayNs> ClimateSensor for Aht20<I, D> {
    type Error = Aht20Error<I::Error>;

    const NAME: &'static str = "AHT20";

    fn measure(&mut self) -> Result<ClimateReading, Self::Error> {
        Aht20::measure(self)
    }
}
