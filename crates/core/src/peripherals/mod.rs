//! Bus peripheral emulators.
//!
//! One module per emulated bus, each driven independently by the
//! transport layer:
//!
//! - [`I2cDevice`] — I2C/SMBus register device (register bank, sticky
//!   register, SMBus size dispatch)
//! - [`SpiBus`] — SPI full-duplex echo buffer
//! - [`PwmChip`] — PWM channel state recorder with change reporting

mod i2c;
mod spi;
mod pwm;

pub use i2c::{BusMessage, Functionality, I2cDevice, SmbusData, SmbusSize};
pub use pwm::{Polarity, PwmChange, PwmChip, PwmState};
pub use spi::SpiBus;
