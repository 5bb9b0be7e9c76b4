//! Simulated UART ports with test-side RX injection and TX capture.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use std::sync::Mutex;

use crate::error::{HalError, HalResult};
use crate::uart::UartDriver;

const SIM_UART_PORTS: usize = 3;

#[derive(Default)]
struct Port {
    up: bool,
    baud: u32,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

pub struct SimUart {
    ports: Mutex<[Port; SIM_UART_PORTS]>,
}

impl SimUart {
    pub fn new() -> Self {
        Self {
            ports: Mutex::new(Default::default()),
        }
    }

    /// Test side: bytes "received" by the port.
    pub fn push_rx(&self, port: u8, data: &[u8]) {
        let mut ports = self.ports.lock().unwrap();
        ports[port as usize].rx.extend(data.iter().copied());
    }

    /// Test side: everything the shell transmitted so far.
    pub fn tx_bytes(&self, port: u8) -> Vec<u8> {
        self.ports.lock().unwrap()[port as usize].tx.clone()
    }

    fn with_port<R>(&self, port: u8, f: impl FnOnce(&mut Port) -> HalResult<R>) -> HalResult<R> {
        let mut ports = self.ports.lock().unwrap();
        let p = ports.get_mut(port as usize).ok_or(HalError::InvalidArg)?;
        f(p)
    }
}

impl Default for SimUart {
    fn default() -> Self {
        Self::new()
    }
}

impl UartDriver for SimUart {
    fn port_count(&self) -> u8 {
        SIM_UART_PORTS as u8
    }

    fn up(&self, port: u8, baud: u32) -> HalResult<()> {
        self.with_port(port, |p| {
            p.up = true;
            p.baud = baud;
            Ok(())
        })
    }

    fn down(&self, port: u8) -> HalResult<()> {
        self.with_port(port, |p| {
            p.up = false;
            Ok(())
        })
    }

    fn is_up(&self, port: u8) -> bool {
        self.ports
            .lock()
            .unwrap()
            .get(port as usize)
            .is_some_and(|p| p.up)
    }

    fn set_baud(&self, port: u8, baud: u32) -> HalResult<()> {
        self.with_port(port, |p| {
            if !p.up {
                return Err(HalError::NotReady);
            }
            p.baud = baud;
            Ok(())
        })
    }

    fn baud(&self, port: u8) -> u32 {
        self.ports
            .lock()
            .unwrap()
            .get(port as usize)
            .map_or(0, |p| p.baud)
    }

    fn write(&self, port: u8, data: &[u8]) -> HalResult<usize> {
        self.with_port(port, |p| {
            if !p.up {
                return Err(HalError::NotReady);
            }
            p.tx.extend_from_slice(data);
            Ok(data.len())
        })
    }

    fn read(&self, port: u8, buf: &mut [u8]) -> HalResult<usize> {
        self.with_port(port, |p| {
            if !p.up {
                return Err(HalError::NotReady);
            }
            let mut n = 0;
            while n < buf.len() {
                match p.rx.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        })
    }
}
