//! SPI bus emulation.
//!
//! Models a full-duplex controller with a single rolling transfer
//! buffer. A simultaneous send+receive echoes the outbound bytes back
//! as the inbound payload and keeps them; a receive-only transfer
//! replays whatever the buffer holds from the last send (zero-filled
//! before any send happened); a send-only transfer overwrites it.
//!
//! Every transfer completes atomically; partial transfers are not
//! modeled.

use log::debug;

use crate::hex::fmt_hex;
use crate::{BusError, SPI_BUF_SIZE, SPI_TRANSFER_MAX};

/// One emulated SPI bus with its echo buffer.
pub struct SpiBus {
    buf: Vec<u8>,
}

impl SpiBus {
    pub fn new() -> Self {
        SpiBus { buf: vec![0u8; SPI_BUF_SIZE] }
    }

    pub fn reset(&mut self) {
        self.buf = vec![0u8; SPI_BUF_SIZE];
    }

    /// Run one transfer.
    ///
    /// - `tx` and `rx_len` both present: full-duplex echo. The internal
    ///   buffer is replaced by the outbound bytes (exact length, no
    ///   padding) and the same bytes come back as the inbound payload.
    /// - Only `rx_len`: receive-only, returns up to `rx_len` bytes of
    ///   the buffer without touching it.
    /// - Only `tx`: send-only, replaces the buffer, returns nothing.
    ///
    /// Sends longer than [`SPI_TRANSFER_MAX`] fail with
    /// [`BusError::BufferOverrun`]: an echo cannot be truncated, so the
    /// controller limit is reported instead of clamped.
    pub fn transfer(
        &mut self,
        tx: Option<&[u8]>,
        rx_len: Option<usize>,
    ) -> Result<Option<Vec<u8>>, BusError> {
        if let Some(tx) = tx {
            if tx.len() > SPI_TRANSFER_MAX {
                return Err(BusError::BufferOverrun(tx.len()));
            }
        }
        match (tx, rx_len) {
            (Some(tx), Some(rx_len)) => {
                self.buf = tx.to_vec();
                let rx = self.buf[..rx_len.min(self.buf.len())].to_vec();
                debug!("spi transfer tx and rx (echo): {}", fmt_hex(&rx));
                Ok(Some(rx))
            }
            (None, Some(rx_len)) => {
                let rx = self.buf[..rx_len.min(self.buf.len())].to_vec();
                debug!("spi reading, rx: {}", fmt_hex(&rx));
                Ok(Some(rx))
            }
            (Some(tx), None) => {
                self.buf = tx.to_vec();
                debug!("spi writing, tx: {}", fmt_hex(&self.buf));
                Ok(None)
            }
            (None, None) => Err(BusError::UnsupportedTransactionShape),
        }
    }

    /// Capture buffer contents for a snapshot.
    pub fn save_state(&self) -> crate::snapshot::SpiState {
        crate::snapshot::SpiState { buf: self.buf.clone() }
    }

    /// Restore buffer contents from a snapshot.
    pub fn load_state(&mut self, s: crate::snapshot::SpiState) {
        self.buf = s.buf;
    }
}

impl Default for SpiBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_duplex_echo() {
        let mut spi = SpiBus::new();
        let rx = spi.transfer(Some(&[1, 2, 3]), Some(3)).unwrap();
        assert_eq!(rx, Some(vec![1, 2, 3]));

        // The echo persists for a later receive-only transfer
        let rx = spi.transfer(None, Some(3)).unwrap();
        assert_eq!(rx, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_receive_before_any_send_reads_zeros() {
        let mut spi = SpiBus::new();
        let rx = spi.transfer(None, Some(4)).unwrap();
        assert_eq!(rx, Some(vec![0, 0, 0, 0]));
    }

    #[test]
    fn test_send_only_overwrites() {
        let mut spi = SpiBus::new();
        spi.transfer(Some(&[0xAA, 0xBB]), None).unwrap();
        // Buffer now holds exactly two bytes: a larger receive clamps
        let rx = spi.transfer(None, Some(10)).unwrap();
        assert_eq!(rx, Some(vec![0xAA, 0xBB]));
    }

    #[test]
    fn test_receive_clamps_to_requested_len() {
        let mut spi = SpiBus::new();
        spi.transfer(Some(&[1, 2, 3, 4]), None).unwrap();
        let rx = spi.transfer(None, Some(2)).unwrap();
        assert_eq!(rx, Some(vec![1, 2]));
    }

    #[test]
    fn test_oversized_send_rejected() {
        let mut spi = SpiBus::new();
        let big = vec![0u8; SPI_TRANSFER_MAX + 1];
        assert_eq!(
            spi.transfer(Some(&big), None),
            Err(BusError::BufferOverrun(SPI_TRANSFER_MAX + 1))
        );
        // Buffer untouched by the failed transfer
        let rx = spi.transfer(None, Some(1)).unwrap();
        assert_eq!(rx, Some(vec![0]));
    }

    #[test]
    fn test_empty_shape_rejected() {
        let mut spi = SpiBus::new();
        assert_eq!(
            spi.transfer(None, None),
            Err(BusError::UnsupportedTransactionShape)
        );
    }
}
