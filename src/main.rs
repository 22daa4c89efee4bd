use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;

use clap::Parser;
use env_logger::Env;
use linux_embedded_hal::{Delay, I2cdev};
use log::{error, info};

use battery_monitor::aht20::Aht20;
use battery_monitor::error::MonitorError;
use battery_monitor::ina219::Ina219;
use battery_monitor::lcd1602::Lcd1602;
use battery_monitor::monitor::{report_shutdown, Monitor, Shutdown, FAULT_EXIT_CODE};
use battery_monitor::preferences::Preferences;
use battery_monitor::timer::PageTimer;

type Display16x2 = Lcd1602<I2cdev, Delay>;

/// Battery monitor for an INA219, an AHT20 and a 16x2 I2C LCD
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML preferences file; compiled-in defaults are used without one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// I2C bus device, overrides the preferences file
    #[arg(short, long)]
    bus: Option<String>,
}

fn open_bus(path: &str, device: &'static str) -> Result<I2cdev, MonitorError> {
    I2cdev::new(path).map_err(|err| MonitorError::BusOpen {
        device,
        path: path.to_string(),
        detail: err.to_string(),
    })
}

fn init_error<E: Display>(device: &'static str) -> impl FnOnce(E) -> MonitorError {
    move |err| MonitorError::DeviceInit {
        device,
        detail: err.to_string(),
    }
}

fn open_display(preferences: &Preferences) -> Result<Display16x2, MonitorError> {
    let bus = open_bus(&preferences.bus.path, "LCD1602")?;
    Lcd1602::new(bus, Delay, preferences.bus.display).map_err(init_error("LCD1602"))
}

fn open_sensors(
    preferences: &Preferences,
) -> Result<(Ina219<I2cdev>, Aht20<I2cdev, Delay>), MonitorError> {
    let path = &preferences.bus.path;
    let power = Ina219::new(
        open_bus(path, "INA219")?,
        preferences.bus.power_sensor,
        preferences.shunt_resistance_ohms,
    )
    .map_err(init_error("INA219"))?;
    let climate = Aht20::new(open_bus(path, "AHT20")?, Delay, preferences.bus.climate_sensor)
        .map_err(init_error("AHT20"))?;
    Ok((power, climate))
}

/// Runs until interrupted or faulted
/// returns the process exit status
fn run(preferences: Preferences, mut display: Display16x2) -> u8 {
    let (stop_tx, stop_rx) = mpsc::channel();
    let sensors = ctrlc::set_handler(move || {
        // Only fails once the loop is gone, at which point nobody is listening
        let _ = stop_tx.send(());
    })
    .map_err(MonitorError::from)
    .and_then(|()| open_sensors(&preferences));

    let (power, climate) = match sensors {
        Ok(sensors) => sensors,
        Err(err) => return report_shutdown(&Shutdown::Fault(err), &mut display),
    };

    let mut timer = PageTimer::new(preferences.page_delay(), stop_rx);
    info!(
        "Polling {} every {:?}",
        preferences.bus.path,
        timer.interval()
    );
    let mut monitor = Monitor::new(power, climate, display, preferences);
    let shutdown = monitor.run(&mut timer);
    monitor.shut_down(&shutdown)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut preferences = match Preferences::load(args.config.as_deref()) {
        Ok(preferences) => preferences,
        Err(err) => {
            error!("Error: {err}");
            return ExitCode::from(FAULT_EXIT_CODE);
        }
    };
    if let Some(bus) = args.bus {
        preferences.bus.path = bus;
    }

    // Without a display there is nowhere to show the fault; the log has to do
    let display = match open_display(&preferences) {
        Ok(display) => display,
        Err(err) => {
            error!("Error: {err}");
            return ExitCode::from(FAULT_EXIT_CODE);
        }
    };

    ExitCode::from(run(preferences, display))
}
