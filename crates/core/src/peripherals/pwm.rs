//! PWM chip emulation.
//!
//! One [`PwmChip`] owns a fixed number of channels. Each channel
//! records the last applied [`PwmState`]; `apply` diffs the incoming
//! state against that record field by field and reports exactly the
//! fields that changed, then overwrites the record wholesale. No field
//! is validated — the emulator trusts its caller, like the hardware
//! would.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{BusError, PWM_CHANNELS};

/// PWM output polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Polarity {
    #[default]
    Normal,
    Inversed,
}

/// Full configurable state of one PWM channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PwmState {
    /// Period in nanoseconds.
    pub period: u64,
    /// Active time in nanoseconds.
    pub duty_cycle: u64,
    pub polarity: Polarity,
    pub enabled: bool,
}

/// One field-level difference reported by [`PwmChip::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmChange {
    Period(u64),
    DutyCycle(u64),
    Polarity(Polarity),
    Enabled(bool),
}

struct Channel {
    state: PwmState,
    exported: bool,
}

/// Emulated PWM chip with [`PWM_CHANNELS`] independent channels.
pub struct PwmChip {
    channels: Vec<Channel>,
}

impl PwmChip {
    pub fn new() -> Self {
        Self::with_channels(PWM_CHANNELS)
    }

    pub fn with_channels(n: usize) -> Self {
        let mut channels = Vec::with_capacity(n);
        for _ in 0..n {
            channels.push(Channel { state: PwmState::default(), exported: false });
        }
        PwmChip { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn channel_mut(&mut self, channel: u32) -> Result<&mut Channel, BusError> {
        self.channels
            .get_mut(channel as usize)
            .ok_or(BusError::NoSuchChannel(channel))
    }

    /// Claim a channel for use (sysfs "export").
    pub fn export(&mut self, channel: u32) -> Result<(), BusError> {
        self.channel_mut(channel)?.exported = true;
        debug!("pwm{}: export channel", channel);
        Ok(())
    }

    /// Release a channel (sysfs "unexport").
    pub fn unexport(&mut self, channel: u32) -> Result<(), BusError> {
        self.channel_mut(channel)?.exported = false;
        debug!("pwm{}: unexport channel", channel);
        Ok(())
    }

    pub fn is_exported(&self, channel: u32) -> bool {
        self.channels
            .get(channel as usize)
            .map(|c| c.exported)
            .unwrap_or(false)
    }

    /// Current recorded state of a channel. The first query establishes
    /// the record that later `apply` calls diff against.
    pub fn get_state(&mut self, channel: u32) -> Result<PwmState, BusError> {
        let ch = self.channel_mut(channel)?;
        let state = ch.state;
        debug!(
            "pwm{}: get state: period={}, duty_cycle={}, polarity={:?}, enabled={}",
            channel, state.period, state.duty_cycle, state.polarity, state.enabled
        );
        Ok(state)
    }

    /// Apply a new state to a channel. Returns one [`PwmChange`] per
    /// field that differs from the previous record, then replaces the
    /// record with `new` as a whole.
    pub fn apply(&mut self, channel: u32, new: PwmState) -> Result<Vec<PwmChange>, BusError> {
        let ch = self.channel_mut(channel)?;
        let mut changes = Vec::new();
        if ch.state.period != new.period {
            debug!("pwm{}: set period: {}", channel, new.period);
            changes.push(PwmChange::Period(new.period));
        }
        if ch.state.duty_cycle != new.duty_cycle {
            debug!("pwm{}: set duty_cycle: {}", channel, new.duty_cycle);
            changes.push(PwmChange::DutyCycle(new.duty_cycle));
        }
        if ch.state.polarity != new.polarity {
            debug!("pwm{}: set polarity: {:?}", channel, new.polarity);
            changes.push(PwmChange::Polarity(new.polarity));
        }
        if ch.state.enabled != new.enabled {
            debug!("pwm{}: set enabled: {}", channel, new.enabled);
            changes.push(PwmChange::Enabled(new.enabled));
        }
        ch.state = new;
        Ok(changes)
    }

    pub fn reset(&mut self) {
        for ch in &mut self.channels {
            ch.state = PwmState::default();
            ch.exported = false;
        }
    }

    /// Capture chip state for a snapshot.
    pub fn save_state(&self) -> crate::snapshot::PwmChipState {
        crate::snapshot::PwmChipState {
            channels: self
                .channels
                .iter()
                .map(|c| crate::snapshot::PwmChannelState {
                    state: c.state,
                    exported: c.exported,
                })
                .collect(),
        }
    }

    /// Restore chip state from a snapshot.
    pub fn load_state(&mut self, s: crate::snapshot::PwmChipState) {
        self.channels = s
            .channels
            .into_iter()
            .map(|c| Channel { state: c.state, exported: c.exported })
            .collect();
    }
}

impl Default for PwmChip {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_reports_only_changed_fields() {
        let mut chip = PwmChip::new();
        let base = PwmState { period: 50, duty_cycle: 10, ..Default::default() };
        chip.apply(0, base).unwrap();

        let changes = chip.apply(0, PwmState { period: 100, ..base }).unwrap();
        assert_eq!(changes, vec![PwmChange::Period(100)]);

        // Identical state: nothing to report
        let changes = chip.apply(0, PwmState { period: 100, ..base }).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_apply_reports_every_field() {
        let mut chip = PwmChip::new();
        let new = PwmState {
            period: 100,
            duty_cycle: 30,
            polarity: Polarity::Inversed,
            enabled: true,
        };
        let changes = chip.apply(1, new).unwrap();
        assert_eq!(
            changes,
            vec![
                PwmChange::Period(100),
                PwmChange::DutyCycle(30),
                PwmChange::Polarity(Polarity::Inversed),
                PwmChange::Enabled(true),
            ]
        );
        assert_eq!(chip.get_state(1).unwrap(), new);
    }

    #[test]
    fn test_channels_are_independent() {
        let mut chip = PwmChip::new();
        chip.apply(0, PwmState { period: 7, ..Default::default() }).unwrap();
        assert_eq!(chip.get_state(1).unwrap(), PwmState::default());
    }

    #[test]
    fn test_no_such_channel() {
        let mut chip = PwmChip::new();
        let n = chip.channel_count() as u32;
        assert_eq!(
            chip.apply(n, PwmState::default()),
            Err(BusError::NoSuchChannel(n))
        );
        assert_eq!(chip.get_state(n), Err(BusError::NoSuchChannel(n)));
        assert_eq!(chip.export(n), Err(BusError::NoSuchChannel(n)));
    }

    #[test]
    fn test_export_unexport() {
        let mut chip = PwmChip::new();
        assert!(!chip.is_exported(2));
        chip.export(2).unwrap();
        assert!(chip.is_exported(2));
        chip.unexport(2).unwrap();
        assert!(!chip.is_exported(2));
    }
}
