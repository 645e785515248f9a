//! Register storage for the I2C/SMBus device emulator.
//!
//! A bank is a fixed-capacity table mapping a register address to a
//! 1 KB byte buffer. Buffers are allocated lazily, on the first access
//! that actually touches them. Lookups are a linear scan — the bank
//! holds at most [`BANK_CAPACITY`] registers, so anything fancier
//! would be wasted.
//!
//! Once every slot is bound to an address, an unseen address cannot be
//! admitted; the caller reports the transaction as failed rather than
//! evicting anything.

use crate::{BANK_CAPACITY, REG_BUF_SIZE};

/// One addressable register: a bound address plus its lazily allocated buffer.
struct RegisterSlot {
    address: u16,
    buf: Option<Vec<u8>>,
}

/// Fixed-capacity table of register buffers.
pub struct RegisterBank {
    slots: Vec<RegisterSlot>,
}

impl RegisterBank {
    pub fn new() -> Self {
        RegisterBank { slots: Vec::with_capacity(BANK_CAPACITY) }
    }

    /// Look up the buffer for `address`, binding a fresh slot if the
    /// address has not been seen before. Returns `None` when the bank
    /// is full and `address` is new.
    pub fn find_or_create(&mut self, address: u16) -> Option<&mut [u8]> {
        let idx = match self.slots.iter().position(|s| s.address == address) {
            Some(i) => i,
            None => {
                if self.slots.len() >= BANK_CAPACITY {
                    return None;
                }
                self.slots.push(RegisterSlot { address, buf: None });
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[idx];
        Some(slot.buf.get_or_insert_with(|| vec![0u8; REG_BUF_SIZE]).as_mut_slice())
    }

    /// Number of addresses currently bound to a slot.
    pub fn occupied(&self) -> usize {
        self.slots.len()
    }

    /// Iterate bound registers and their contents (unallocated buffers
    /// read as empty). Used for state capture.
    pub fn entries(&self) -> impl Iterator<Item = (u16, &[u8])> {
        self.slots.iter().map(|s| {
            (s.address, s.buf.as_deref().unwrap_or(&[]))
        })
    }

    /// Drop every slot, returning the bank to its fresh state.
    pub fn reset(&mut self) {
        self.slots.clear();
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}
