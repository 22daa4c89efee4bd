//! The polling loop: sample, derive, render, rotate, wait.

use log::{error, info};

use crate::battery::DerivedMetrics;
use crate::error::MonitorError;
use crate::preferences::Preferences;
use crate::rendering::{
    render_message, render_page, render_screen, CharacterDisplay, Page, PageLines,
};
use crate::sensors::{read_sample, ClimateSensor, PowerSensor};
use crate::timer::{PageTimer, Tick};

pub const STOPPED_MESSAGE: &str = "System Stopped";
pub const FAULT_MESSAGE: &str = "Error Occurred";

/// Exit status when the loop ends with a fault; any non-zero value makes
/// systemd apply its restart policy
pub const FAULT_EXIT_CODE: u8 = 1;

/// Why the loop ended
#[derive(Debug)]
pub enum Shutdown {
    /// SIGINT or SIGTERM
    Interrupted,
    Fault(MonitorError),
}

impl Shutdown {
    pub fn exit_code(&self) -> u8 {
        match self {
            Shutdown::Interrupted => 0,
            Shutdown::Fault(_) => FAULT_EXIT_CODE,
        }
    }
}

/// Shows the final message for a shutdown and logs it
/// returns the process exit status
pub fn report_shutdown<D: CharacterDisplay>(shutdown: &Shutdown, display: &mut D) -> u8 {
    let message = match shutdown {
        Shutdown::Interrupted => {
            info!("Battery monitoring stopped by user");
            STOPPED_MESSAGE
        }
        Shutdown::Fault(err) => {
            error!("Error: {err}");
            FAULT_MESSAGE
        }
    };
    if let Err(err) = render_message(message, display) {
        error!("could not show shutdown message: {err}");
    }
    shutdown.exit_code()
}

pub struct Monitor<P, C, D> {
    power: P,
    climate: C,
    display: D,
    preferences: Preferences,
    page: Page,
}

impl<P, C, D> Monitor<P, C, D>
where
    P: PowerSensor,
    C: ClimateSensor,
    D: CharacterDisplay,
{
    pub fn new(power: P, climate: C, display: D, preferences: Preferences) -> Self {
        Monitor {
            power,
            climate,
            display,
            preferences,
            page: Page::default(),
        }
    }

    /// Page the next cycle will show
    pub fn page(&self) -> Page {
        self.page
    }

    /// One full cycle. The page only advances when the display was written.
    /// returns the rows that were shown
    pub fn run_cycle(&mut self) -> Result<PageLines, MonitorError> {
        let sample = read_sample(&mut self.power, &mut self.climate)?;
        let metrics = DerivedMetrics::from_sample(&sample, &self.preferences.battery);
        let lines = render_page(self.page, &sample, &metrics);
        render_screen(&lines, &mut self.display)?;
        self.page = self.page.next();
        Ok(lines)
    }

    /// Cycles until stopped or until the first error
    pub fn run(&mut self, timer: &mut PageTimer) -> Shutdown {
        info!("Battery monitoring system started...");
        loop {
            if let Err(err) = self.run_cycle() {
                return Shutdown::Fault(err);
            }
            if timer.wait() == Tick::Stopped {
                return Shutdown::Interrupted;
            }
        }
    }

    /// Writes the final message and returns the exit status
    pub fn shut_down(&mut self, shutdown: &Shutdown) -> u8 {
        report_shutdown(shutdown, &mut self.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::ClimateReading;
    use std::sync::mpsc;
    use std::time::Duration;

    struct FakePower {
        voltage: f64,
        current_ma: f64,
        reads: usize,
        fail: bool,
    }

    impl FakePower {
        fn new(voltage: f64, current_ma: f64) -> Self {
            FakePower {
                voltage,
                current_ma,
                reads: 0,
                fail: false,
            }
        }
    }

    impl PowerSensor for FakePower {
        type Error = &'static str;

        const NAME: &'static str = "INA219";

        fn bus_voltage(&mut self) -> Result<f64, Self::Error> {
            self.reads += 1;
            if self.fail {
                return Err("bus timeout");
            }
            Ok(self.voltage)
        }

        fn current_ma(&mut self) -> Result<f64, Self::Error> {
            Ok(self.current_ma)
        }
    }

    struct FakeClimate {
        reading: ClimateReading,
        fail: bool,
    }

    impl ClimateSensor for FakeClimate {
        type Error = &'static str;

        const NAME: &'static str = "AHT20";

        fn measure(&mut self) -> Result<ClimateReading, Self::Error> {
            if self.fail {
                return Err("still busy");
            }
            Ok(self.reading)
        }
    }

    #[derive(Default)]
    struct Screen {
        rows: [String; 2],
        clears: usize,
        history: Vec<String>,
        fail: bool,
    }

    impl CharacterDisplay for Screen {
        type Error = &'static str;

        fn clear(&mut self) -> Result<(), Self::Error> {
            if self.fail {
                return Err("nack");
            }
            self.clears += 1;
            self.rows = Default::default();
            Ok(())
        }

        fn write_line(&mut self, row: u8, text: &str) -> Result<(), Self::Error> {
            self.rows[usize::from(row)] = text.to_string();
            self.history.push(text.to_string());
            Ok(())
        }
    }

    fn monitor(voltage: f64, current_ma: f64) -> Monitor<FakePower, FakeClimate, Screen> {
        Monitor::new(
            FakePower::new(voltage, current_ma),
            FakeClimate {
                reading: ClimateReading {
                    temperature_c: 25.3,
                    humidity_pct: 40.0,
                },
                fail: false,
            },
            Screen::default(),
            Preferences::default(),
        )
    }

    #[test]
    fn first_cycle_shows_electrical_page() {
        let mut m = monitor(11.6, 500.0);
        m.run_cycle().unwrap();
        assert_eq!(m.display.rows, ["Battery:Healthy", "V:11.60 I:500mA"]);
        assert_eq!(m.page(), Page::Climate);
    }

    #[test]
    fn pages_rotate_and_repeat_after_four_cycles() {
        let mut m = monitor(11.6, 500.0);
        let first: Vec<PageLines> = (0..4).map(|_| m.run_cycle().unwrap()).collect();
        let second: Vec<PageLines> = (0..4).map(|_| m.run_cycle().unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(first[1].bottom.as_str(), "T:25.3 H:40%");
        assert_eq!(first[2].top.as_str(), "SVM:OFF");
        assert_eq!(m.display.clears, 8);
        assert_eq!(m.page(), Page::Electrical);
    }

    #[test]
    fn charge_page_for_low_voltage() {
        let mut m = monitor(10.2, 500.0);
        m.run_cycle().unwrap();
        m.run_cycle().unwrap();
        m.run_cycle().unwrap();
        assert_eq!(m.display.rows, ["SVM:OFF", "SOC:33% SOH:OFF"]);
    }

    #[test]
    fn sensor_failure_stops_after_one_read() {
        let mut m = monitor(11.6, 500.0);
        m.power.fail = true;
        let (_tx, rx) = mpsc::channel();
        let mut timer = PageTimer::new(Duration::from_millis(1), rx);

        let shutdown = m.run(&mut timer);
        assert!(matches!(
            shutdown,
            Shutdown::Fault(MonitorError::SensorRead { device: "INA219", .. })
        ));
        assert_eq!(m.shut_down(&shutdown), FAULT_EXIT_CODE);
        assert_ne!(FAULT_EXIT_CODE, 0);

        assert_eq!(m.power.reads, 1);
        assert_eq!(m.display.rows[0], FAULT_MESSAGE);
        let shown = m.display.history.iter().filter(|t| *t == FAULT_MESSAGE).count();
        assert_eq!(shown, 1);
    }

    #[test]
    fn climate_failure_is_a_fault_without_a_page() {
        let mut m = monitor(11.6, 500.0);
        m.climate.fail = true;
        let (_tx, rx) = mpsc::channel();
        let mut timer = PageTimer::new(Duration::from_millis(1), rx);

        let shutdown = m.run(&mut timer);
        match &shutdown {
            Shutdown::Fault(MonitorError::SensorRead { device, detail }) => {
                assert_eq!(*device, "AHT20");
                assert_eq!(detail, "still busy");
            }
            other => panic!("unexpected shutdown: {other:?}"),
        }
        assert_eq!(m.shut_down(&shutdown), FAULT_EXIT_CODE);

        assert_eq!(m.display.history, vec![FAULT_MESSAGE.to_string()]);
        assert_eq!(m.page(), Page::Electrical);
    }

    #[test]
    fn display_failure_is_a_fault_and_page_does_not_advance() {
        let mut m = monitor(11.6, 500.0);
        m.display.fail = true;
        let err = m.run_cycle().unwrap_err();
        assert!(matches!(err, MonitorError::DisplayWrite(_)));
        assert_eq!(m.page(), Page::Electrical);
    }

    #[test]
    fn interrupt_shows_stopped_message_and_exits_cleanly() {
        let mut m = monitor(11.6, 500.0);
        let (tx, rx) = mpsc::channel();
        let mut timer = PageTimer::new(Duration::from_secs(60), rx);
        tx.send(()).unwrap();

        let shutdown = m.run(&mut timer);
        assert!(matches!(shutdown, Shutdown::Interrupted));
        assert_eq!(m.shut_down(&shutdown), 0);
        assert_eq!(m.display.rows[0], STOPPED_MESSAGE);
        // exactly one page went out before the stop
        assert_eq!(m.page(), Page::Climate);
    }

    #[test]
    fn shutdown_message_failure_keeps_exit_code() {
        let mut screen = Screen {
            fail: true,
            ..Default::default()
        };
        let shutdown = Shutdown::Fault(MonitorError::DisplayWrite("nack".into()));
        assert_eq!(report_shutdown(&shutdown, &mut screen), FAULT_EXIT_CODE);
        assert_eq!(report_shutdown(&Shutdown::Interrupted, &mut screen), 0);
    }
}
