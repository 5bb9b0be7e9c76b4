//! UART collaborator interface (the peripheral side, not the console).

use crate::error::HalResult;

pub const UART_DEF_BAUDRATE: u32 = 115_200;

pub trait UartDriver: Send + Sync {
    fn port_count(&self) -> u8;

    /// Install the driver on `port` at the given baudrate.
    fn up(&self, port: u8, baud: u32) -> HalResult<()>;
    fn down(&self, port: u8) -> HalResult<()>;
    fn is_up(&self, port: u8) -> bool;

    fn set_baud(&self, port: u8, baud: u32) -> HalResult<()>;
    fn baud(&self, port: u8) -> u32;

    fn write(&self, port: u8, data: &[u8]) -> HalResult<usize>;

    /// Non-blocking read of whatever is pending.
    fn read(&self, port: u8, buf: &mut [u8]) -> HalResult<usize>;
}
