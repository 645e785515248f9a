//! Bus state snapshots.
//!
//! Captures the full state of a [`MockBus`](crate::MockBus) — every
//! I2C device's registers, the SPI echo buffer, the PWM channel
//! records — into a bincode blob, and restores it later. Used to pin a
//! test fixture to a known point and replay scenarios from it. State
//! lives only for the process; nothing is written to disk.

use serde::{Deserialize, Serialize};

use crate::peripherals::PwmState;

/// Serialized state of one I2C device.
#[derive(Serialize, Deserialize)]
pub struct I2cDeviceState {
    pub address: u16,
    /// Bound registers and their contents, in slot order.
    pub registers: Vec<(u16, Vec<u8>)>,
    /// Shared register-less buffer.
    pub bare: Vec<u8>,
    /// Sticky register (0 = none).
    pub last_reg: u16,
}

/// Serialized state of the SPI echo buffer.
#[derive(Serialize, Deserialize)]
pub struct SpiState {
    pub buf: Vec<u8>,
}

/// Serialized state of one PWM channel.
#[derive(Serialize, Deserialize)]
pub struct PwmChannelState {
    pub state: PwmState,
    pub exported: bool,
}

/// Serialized state of the PWM chip.
#[derive(Serialize, Deserialize)]
pub struct PwmChipState {
    pub channels: Vec<PwmChannelState>,
}

/// Everything a [`MockBus`](crate::MockBus) holds.
#[derive(Serialize, Deserialize)]
pub struct BusSnapshot {
    pub i2c: Vec<I2cDeviceState>,
    pub spi: SpiState,
    pub pwm: PwmChipState,
}

/// Encode a snapshot to bytes.
pub fn encode(snap: &BusSnapshot) -> Result<Vec<u8>, String> {
    bincode::serialize(snap).map_err(|e| format!("Snapshot encoding failed: {}", e))
}

/// Decode a snapshot from bytes.
pub fn decode(bytes: &[u8]) -> Result<BusSnapshot, String> {
    bincode::deserialize(bytes).map_err(|e| format!("Invalid snapshot: {}", e))
}
