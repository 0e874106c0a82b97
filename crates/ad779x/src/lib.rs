//! Provides a driver for the Analog Devices AD7794/AD7799 family of 24-bit delta-sigma ADCs.
//!
//! The driver keeps a shadow copy of the mode and configuration registers, rebuilds the
//! configuration register whenever the active channel or its settings change, and runs the
//! select/convert/wait/read sequence over any [`Transport`]. [`HalTransport`] plugs an
//! `embedded-hal` SPI bus, chip-select pin and delay into that seam.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod channel;
pub mod conversion;
pub mod driver;
pub mod error;
pub mod profile;
pub mod registers;
pub mod transport;
pub mod wait;

#[cfg(test)]
pub(crate) mod mock;

pub use channel::{ChannelBank, ChannelConfig, ChannelId};
pub use driver::{Ad779x, ConversionMode};
pub use error::{Error, ErrorKind};
pub use profile::DeviceProfile;
pub use registers::UpdateRate;
pub use transport::{HalError, HalTransport, Transport};
pub use wait::{FixedDelay, RateDelay, ReadyPin, SettleWait};
