//! In-memory bus and delay used by the driver tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

/// Records every write and answers reads from a queue
#[derive(Default)]
pub struct FakeBus {
    pub writes: Vec<(u8, Vec<u8>)>,
    pub reads: VecDeque<Vec<u8>>,
    pub fail: bool,
}

impl FakeBus {
    pub fn with_reads(reads: &[&[u8]]) -> Self {
        FakeBus {
            reads: reads.iter().map(|r| r.to_vec()).collect(),
            ..Default::default()
        }
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(ErrorKind::Other);
        }
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buf) => {
                    let data = self.reads.pop_front().ok_or(ErrorKind::Other)?;
                    let n = buf.len();
                    buf.copy_from_slice(&data[..n]);
                }
            }
        }
        Ok(())
    }
}

/// Bus handle that can be inspected after a driver has taken ownership of it
#[derive(Default, Clone)]
pub struct SharedBus(pub Rc<RefCell<FakeBus>>);

impl ErrorType for SharedBus {
    type Error = ErrorKind;
}

impl I2c for SharedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.0.borrow_mut().transaction(address, operations)
    }
}

/// Delay that returns immediately and counts the nanoseconds requested
#[derive(Default)]
pub struct NoDelay {
    pub total_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
