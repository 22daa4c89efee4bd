use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Outcome of waiting out one page interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Elapsed,
    Stopped,
}

/// Sleeps between pages, waking early when a stop request arrives
pub struct PageTimer {
    interval: Duration,
    stop: Receiver<()>,
}

impl PageTimer {
    pub fn new(interval: Duration, stop: Receiver<()>) -> PageTimer {
        Self { interval, stop }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn wait(&mut self) -> Tick {
        match self.stop.recv_timeout(self.interval) {
            Ok(()) => Tick::Stopped,
            Err(RecvTimeoutError::Timeout) => Tick::Elapsed,
            // Nobody can ask us to stop any more; plain sleep
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(self.interval);
                Tick::Elapsed
            }
        }
    }
}
