//! I2C/SMBus device emulation.
//!
//! Emulates one addressable register device behind an I2C adapter. The
//! device keeps a [`RegisterBank`] of register buffers plus a single
//! shared register-less buffer, and tracks the last accessed register
//! so a register-less read can pick up where the previous transaction
//! left off (the "sticky register" convention real register devices
//! follow: write the register pointer once, then keep reading).
//!
//! Two entry points:
//!
//! - [`I2cDevice::transfer`] — raw message transactions (ioctl-xfer /
//!   file read-write style), single- or multi-message.
//! - [`I2cDevice::smbus_transfer`] — SMBus transactions dispatched by
//!   declared size (quick/byte/word/block).

use bitflags::bitflags;
use log::{debug, warn};

use crate::hex::fmt_hex;
use crate::register_bank::RegisterBank;
use crate::{BusError, REG_BUF_SIZE, SMBUS_BLOCK_MAX};

bitflags! {
    /// Adapter capability bits, in the Linux `I2C_FUNC_*` layout.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Functionality: u32 {
        const I2C             = 0x0000_0001;
        const SMBUS_QUICK     = 0x0001_0000;
        const SMBUS_BYTE      = 0x0006_0000;
        const SMBUS_BYTE_DATA = 0x0018_0000;
        const SMBUS_WORD_DATA = 0x0060_0000;
        const SMBUS_BLOCK_DATA = 0x0300_0000;
        const SMBUS_I2C_BLOCK = 0x0C00_0000;
    }
}

/// One phase of a raw I2C transaction.
pub struct BusMessage {
    /// Direction: true = device-to-host.
    pub read: bool,
    /// Write: outgoing payload. Read: caller buffer, its length is the
    /// requested read length.
    pub buf: Vec<u8>,
}

impl BusMessage {
    pub fn write(data: &[u8]) -> Self {
        BusMessage { read: false, buf: data.to_vec() }
    }

    pub fn read(len: usize) -> Self {
        BusMessage { read: true, buf: vec![0u8; len] }
    }
}

/// SMBus transaction size, as declared by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmbusSize {
    Quick,
    Byte,
    ByteData,
    WordData,
    ProcCall,
    BlockData,
    I2cBlock,
    BlockProcCall,
}

/// SMBus data payload, in or out depending on direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmbusData {
    None,
    Byte(u8),
    Word(u16),
    Block(Vec<u8>),
}

/// How a single-message transaction resolves its target buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SingleAccess {
    /// Register-less read: reuse the sticky register, keep it set.
    StickyRead(u16),
    /// Write whose first byte names the register; becomes the new sticky.
    RegisterWrite(u16),
    /// No distinguishable register byte: shared buffer, sticky cleared.
    Bare,
}

/// Decide where a lone message lands. `last_reg` is the sticky register
/// (0 = none). Register 0 cannot be addressed this way; a write whose
/// first byte is 0 is a bare write.
fn classify(msg: &BusMessage, last_reg: u16) -> SingleAccess {
    if msg.read && last_reg != 0 {
        SingleAccess::StickyRead(last_reg)
    } else if !msg.read && msg.buf.len() > 1 && msg.buf[0] != 0 {
        SingleAccess::RegisterWrite(msg.buf[0] as u16)
    } else {
        SingleAccess::Bare
    }
}

/// Move one message's bytes against a resolved target buffer.
///
/// Reads copy `min(requested, buffer)` bytes out from offset 0. Writes
/// into a register buffer strip the leading register-address byte
/// (`register_addressed`); bare writes copy the whole payload. Writes
/// clamp to the buffer, they never fail.
fn apply_message(address: u16, msg: &mut BusMessage, target: &mut [u8], register_addressed: bool) {
    if msg.read {
        let n = msg.buf.len().min(target.len());
        msg.buf[..n].copy_from_slice(&target[..n]);
        debug!("i2c[{:02X}]   read data: {}", address, fmt_hex(&msg.buf[..n]));
    } else {
        let start = if register_addressed { 1 } else { 0 };
        let payload = &msg.buf[start.min(msg.buf.len())..];
        let n = payload.len().min(target.len());
        target[..n].copy_from_slice(&payload[..n]);
        debug!("i2c[{:02X}]   write data: {}", address, fmt_hex(&payload[..n]));
    }
}

/// One emulated I2C/SMBus device.
pub struct I2cDevice {
    /// Bus address, used only for log lines.
    address: u16,
    bank: RegisterBank,
    /// Shared register-less buffer (bare transfers, SMBus quick/byte).
    bare_buf: Vec<u8>,
    /// Sticky register: last register addressed, 0 = none.
    last_reg: u16,
}

impl I2cDevice {
    pub fn new(address: u16) -> Self {
        I2cDevice {
            address,
            bank: RegisterBank::new(),
            bare_buf: vec![0u8; REG_BUF_SIZE],
            last_reg: 0,
        }
    }

    /// Capabilities the emulated adapter advertises. Matches the
    /// reference adapter, which lists I2C block transfers even though
    /// its size dispatch rejects them.
    pub fn capabilities(&self) -> Functionality {
        Functionality::I2C
            | Functionality::SMBUS_BYTE
            | Functionality::SMBUS_BYTE_DATA
            | Functionality::SMBUS_WORD_DATA
            | Functionality::SMBUS_BLOCK_DATA
            | Functionality::SMBUS_I2C_BLOCK
    }

    /// Last register addressed (0 = none). Exposed for inspection in tests.
    pub fn sticky_register(&self) -> u16 {
        self.last_reg
    }

    pub fn reset(&mut self) {
        self.bank.reset();
        self.bare_buf = vec![0u8; REG_BUF_SIZE];
        self.last_reg = 0;
    }

    /// Run one raw transaction. Returns the number of messages handled.
    ///
    /// Single-message transactions go through the [`SingleAccess`]
    /// decision; multi-message transactions take their register from the
    /// first message's first byte and apply every following message to
    /// that register's buffer.
    pub fn transfer(&mut self, msgs: &mut [BusMessage]) -> Result<usize, BusError> {
        match msgs.len() {
            0 => {
                warn!("i2c[{:02X}] empty transaction", self.address);
                Err(BusError::UnsupportedTransactionShape)
            }
            1 => {
                let msg = &mut msgs[0];
                match classify(msg, self.last_reg) {
                    SingleAccess::StickyRead(reg) => {
                        debug!(
                            "i2c[{:02X}] access with last register {:02X}",
                            self.address, reg
                        );
                        let buf = self
                            .bank
                            .find_or_create(reg)
                            .ok_or(BusError::RegisterBankFull)?;
                        apply_message(self.address, msg, buf, true);
                    }
                    SingleAccess::RegisterWrite(reg) => {
                        debug!("i2c[{:02X}] access with register {:02X}", self.address, reg);
                        let buf = self
                            .bank
                            .find_or_create(reg)
                            .ok_or(BusError::RegisterBankFull)?;
                        apply_message(self.address, msg, buf, true);
                        self.last_reg = reg;
                    }
                    SingleAccess::Bare => {
                        debug!("i2c[{:02X}] access without register", self.address);
                        self.last_reg = 0;
                        apply_message(self.address, msg, &mut self.bare_buf, false);
                    }
                }
                Ok(1)
            }
            n => {
                // Address phase + data phases: first byte of the first
                // message is the register, the rest of that message is
                // ignored as payload.
                let reg = *msgs[0]
                    .buf
                    .first()
                    .ok_or(BusError::UnsupportedTransactionShape)? as u16;
                debug!("i2c[{:02X}] access with register {:02X}", self.address, reg);
                let buf = self
                    .bank
                    .find_or_create(reg)
                    .ok_or(BusError::RegisterBankFull)?;
                for msg in &mut msgs[1..] {
                    apply_message(self.address, msg, buf, true);
                }
                Ok(n)
            }
        }
    }

    /// Run one SMBus transaction against the register named by `command`.
    ///
    /// The register resolves up front regardless of size, so a full bank
    /// fails even the register-less quick/byte sizes. Quick and byte
    /// operate on the shared register-less buffer: a write stores the
    /// command byte itself (byte writes carry their value in the command
    /// field), a read returns the buffer's first byte.
    pub fn smbus_transfer(
        &mut self,
        command: u8,
        read: bool,
        size: SmbusSize,
        data: &mut SmbusData,
    ) -> Result<(), BusError> {
        debug!(
            "smbus[{:02X}] access with register {:02X} ({:?})",
            self.address, command, size
        );
        let buf = self
            .bank
            .find_or_create(command as u16)
            .ok_or(BusError::RegisterBankFull)?;
        match size {
            SmbusSize::Quick | SmbusSize::Byte => {
                if read {
                    *data = SmbusData::Byte(self.bare_buf[0]);
                } else {
                    self.bare_buf[0] = command;
                }
                debug!(
                    "smbus[{:02X}]   {} byte: {}",
                    self.address,
                    if read { "read" } else { "write" },
                    fmt_hex(&self.bare_buf[..1])
                );
            }
            SmbusSize::ByteData => {
                if read {
                    *data = SmbusData::Byte(buf[0]);
                } else {
                    match *data {
                        SmbusData::Byte(v) => buf[0] = v,
                        _ => return Err(BusError::UnsupportedTransactionShape),
                    }
                }
                debug!("smbus[{:02X}]   byte data: {}", self.address, fmt_hex(&buf[..1]));
            }
            SmbusSize::WordData => {
                // Big-endian in the register buffer, both directions
                if read {
                    *data = SmbusData::Word(((buf[0] as u16) << 8) | buf[1] as u16);
                } else {
                    match *data {
                        SmbusData::Word(w) => {
                            buf[0] = (w >> 8) as u8;
                            buf[1] = w as u8;
                        }
                        _ => return Err(BusError::UnsupportedTransactionShape),
                    }
                }
                debug!("smbus[{:02X}]   word data: {}", self.address, fmt_hex(&buf[..2]));
            }
            SmbusSize::BlockData => {
                if read {
                    *data = SmbusData::Block(buf[..SMBUS_BLOCK_MAX].to_vec());
                    debug!(
                        "smbus[{:02X}]   read block: {}",
                        self.address,
                        fmt_hex(&buf[..SMBUS_BLOCK_MAX])
                    );
                } else {
                    match data {
                        SmbusData::Block(b) => {
                            let n = b.len().min(SMBUS_BLOCK_MAX);
                            buf[..n].copy_from_slice(&b[..n]);
                            debug!(
                                "smbus[{:02X}]   write block: {}",
                                self.address,
                                fmt_hex(&buf[..n])
                            );
                        }
                        _ => return Err(BusError::UnsupportedTransactionShape),
                    }
                }
            }
            _ => {
                warn!(
                    "smbus[{:02X}] unsupported transaction size {:?}",
                    self.address, size
                );
                return Err(BusError::UnsupportedTransactionShape);
            }
        }
        Ok(())
    }

    /// Capture device state for a snapshot.
    pub fn save_state(&self) -> crate::snapshot::I2cDeviceState {
        crate::snapshot::I2cDeviceState {
            address: self.address,
            registers: self.bank.entries().map(|(a, b)| (a, b.to_vec())).collect(),
            bare: self.bare_buf.clone(),
            last_reg: self.last_reg,
        }
    }

    /// Restore device state from a snapshot.
    pub fn load_state(&mut self, s: crate::snapshot::I2cDeviceState) {
        self.bank.reset();
        for (addr, data) in s.registers {
            if let Some(buf) = self.bank.find_or_create(addr) {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
            }
        }
        self.bare_buf = s.bare;
        self.bare_buf.resize(REG_BUF_SIZE, 0);
        self.last_reg = s.last_reg;
    }
}
