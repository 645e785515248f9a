//! # mockbus-core
//!
//! In-memory bus peripheral emulators (v0.3.0) for exercising hardware
//! I/O drivers without physical hardware.
//!
//! Three independent emulators reproduce the addressing, framing, and
//! state-transition semantics of their bus protocols closely enough
//! that a client driver cannot tell them from silicon:
//!
//! - **I2C/SMBus** — a register device behind an adapter: fixed-capacity
//!   register bank with lazily allocated 1 KB buffers, a sticky
//!   last-accessed register for register-less follow-up reads, and
//!   SMBus transactions dispatched by declared size
//!   (quick/byte/word/block).
//! - **SPI** — a full-duplex echo buffer: send+receive echoes the
//!   outbound bytes back and keeps them, receive-only replays the last
//!   send, send-only overwrites.
//! - **PWM** — a channel state recorder that reports exactly the fields
//!   that changed between successive applies.
//!
//! ## Architecture
//!
//! - [`MockBus`] — Transport shim wiring one I2C device per bus address,
//!   one SPI bus, and one PWM chip behind the bus-operation interface
//! - [`RegisterBank`] — Fixed-capacity register table (I2C backing store)
//! - [`peripherals`] — The three emulators
//! - [`snapshot`] — Whole-bus state capture/restore for test fixtures
//! - [`hex`] — Hex dump formatting for the traffic logs
//!
//! All traffic is traced through the `log` facade at debug level in the
//! reference driver's `dev_info` style. No emulator panics, retries, or
//! blocks: every error is a typed [`BusError`] returned to the caller,
//! surfaced by the transport like a real controller's NACK/EINVAL.
//!
//! Emulators are single-threaded by design — the bus protocols they
//! model are serialized per controller. Wrap a [`MockBus`] in one mutex
//! if it must be shared.

pub mod hex;
pub mod peripherals;
pub mod register_bank;
pub mod snapshot;

use std::collections::HashMap;

use thiserror::Error;

pub use peripherals::{
    BusMessage, Functionality, I2cDevice, Polarity, PwmChange, PwmChip, PwmState, SmbusData,
    SmbusSize, SpiBus,
};
pub use register_bank::RegisterBank;

/// Registers one I2C device can hold before new addresses are rejected.
pub const BANK_CAPACITY: usize = 10;
/// Size of each register buffer: 1 KB.
pub const REG_BUF_SIZE: usize = 1024;
/// Initial SPI echo buffer size (zero-filled until the first send).
pub const SPI_BUF_SIZE: usize = 1024;
/// Longest SPI transfer the emulated controller accepts.
pub const SPI_TRANSFER_MAX: usize = 1024;
/// SMBus block transfer payload limit.
pub const SMBUS_BLOCK_MAX: usize = 32;
/// PWM channels per chip.
pub const PWM_CHANNELS: usize = 3;

/// Bus-level failure, reported to the caller the way a real controller
/// would report a NACK, timeout, or EINVAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// No free register slot for a new address.
    #[error("register bank full, no buffer available for new register")]
    RegisterBankFull,
    /// Zero messages, a malformed payload, or an SMBus size outside the
    /// supported set.
    #[error("unsupported transaction shape")]
    UnsupportedTransactionShape,
    /// Transfer length exceeds the controller's fixed buffer capacity.
    #[error("transfer of {0} bytes exceeds controller buffer capacity")]
    BufferOverrun(usize),
    /// PWM channel index beyond the chip's channel count.
    #[error("no such PWM channel {0}")]
    NoSuchChannel(u32),
}

/// Transport shim over the three emulators.
///
/// Receives bus operations from the device under test, forwards each to
/// the matching emulator instance, and returns the result unchanged.
/// I2C devices are created on first use, one per bus address, so sticky
/// register state is never shared between addresses.
pub struct MockBus {
    i2c: HashMap<u16, I2cDevice>,
    spi: SpiBus,
    pwm: PwmChip,
}

impl MockBus {
    pub fn new() -> Self {
        MockBus {
            i2c: HashMap::new(),
            spi: SpiBus::new(),
            pwm: PwmChip::new(),
        }
    }

    /// The emulated device at `address`, created on first access.
    pub fn i2c_device(&mut self, address: u16) -> &mut I2cDevice {
        self.i2c.entry(address).or_insert_with(|| I2cDevice::new(address))
    }

    /// Run one raw I2C transaction against the device at `address`.
    /// Returns the number of messages handled.
    pub fn i2c_transfer(
        &mut self,
        address: u16,
        msgs: &mut [BusMessage],
    ) -> Result<usize, BusError> {
        self.i2c_device(address).transfer(msgs)
    }

    /// Run one SMBus transaction against the device at `address`.
    pub fn smbus_transfer(
        &mut self,
        address: u16,
        command: u8,
        read: bool,
        size: SmbusSize,
        data: &mut SmbusData,
    ) -> Result<(), BusError> {
        self.i2c_device(address).smbus_transfer(command, read, size, data)
    }

    /// Run one SPI transfer. See [`SpiBus::transfer`].
    pub fn spi_transfer(
        &mut self,
        tx: Option<&[u8]>,
        rx_len: Option<usize>,
    ) -> Result<Option<Vec<u8>>, BusError> {
        self.spi.transfer(tx, rx_len)
    }

    /// Current recorded state of a PWM channel.
    pub fn pwm_get_state(&mut self, channel: u32) -> Result<PwmState, BusError> {
        self.pwm.get_state(channel)
    }

    /// Apply a PWM state; returns the per-field changes.
    pub fn pwm_apply(&mut self, channel: u32, state: PwmState) -> Result<Vec<PwmChange>, BusError> {
        self.pwm.apply(channel, state)
    }

    /// Claim a PWM channel.
    pub fn pwm_export(&mut self, channel: u32) -> Result<(), BusError> {
        self.pwm.export(channel)
    }

    /// Release a PWM channel.
    pub fn pwm_unexport(&mut self, channel: u32) -> Result<(), BusError> {
        self.pwm.unexport(channel)
    }

    /// Capture the whole bus state as a bincode blob.
    pub fn snapshot(&self) -> Result<Vec<u8>, String> {
        let mut i2c: Vec<_> = self.i2c.values().map(|d| d.save_state()).collect();
        i2c.sort_by_key(|d| d.address);
        snapshot::encode(&snapshot::BusSnapshot {
            i2c,
            spi: self.spi.save_state(),
            pwm: self.pwm.save_state(),
        })
    }

    /// Restore the bus to a previously captured state.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), String> {
        let snap = snapshot::decode(bytes)?;
        self.i2c.clear();
        for dev_state in snap.i2c {
            let dev = self.i2c_device(dev_state.address);
            dev.load_state(dev_state);
        }
        self.spi.load_state(snap.spi);
        self.pwm.load_state(snap.pwm);
        Ok(())
    }

    /// Drop all emulator state, as if every device was power-cycled.
    pub fn reset(&mut self) {
        self.i2c.clear();
        self.spi.reset();
        self.pwm.reset();
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}
