//! Fixed-tick brightness ramp integrator.
//!
//! A ramp spreads `delta` brightness steps over `ticks` ticks with a
//! Bresenham-style accumulator: every tick adds `delta` to the
//! accumulator, and every whole `ticks` worth drained from it moves the
//! brightness by one unit.  Only integer add/sub is used, so there is no
//! long-run drift and the per-tick movement never differs from the ideal
//! rate by more than one step.
//!
//! ```text
//!   tick:     1    2    3    4    5        delta = 3, ticks = 5
//!   acc:      3    1    4    2    0
//!   steps:    0    1    0    1    1   →  3 steps after exactly 5 ticks
//! ```

use heapless::Vec;

use crate::channel::{ChannelBank, MAX_CHANNELS};

/// Sign of a pending brightness change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Ramp bookkeeping carried by each channel.
///
/// Invariant: `remaining_ticks == 0` exactly when the owning channel's
/// brightness equals `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ramp {
    target: u16,
    remaining_ticks: u32,
    accumulator: u32,
    step_numerator: u32,
    step_denominator: u32,
    direction: Direction,
}

impl Ramp {
    /// A finished ramp resting at `brightness`.
    pub const fn idle(brightness: u16) -> Self {
        Self {
            target: brightness,
            remaining_ticks: 0,
            accumulator: 0,
            step_numerator: 0,
            step_denominator: 1,
            direction: Direction::Up,
        }
    }

    /// Arm a ramp from `current` to `target` over `duration_ticks`.
    ///
    /// Returns `None` when the request degenerates to an immediate set
    /// (zero duration or nothing to do).
    pub fn arm(current: u16, target: u16, duration_ticks: u32) -> Option<Self> {
        if duration_ticks == 0 || current == target {
            return None;
        }
        let (direction, delta) = if target > current {
            (Direction::Up, target - current)
        } else {
            (Direction::Down, current - target)
        };
        Some(Self {
            target,
            remaining_ticks: duration_ticks,
            accumulator: 0,
            step_numerator: u32::from(delta),
            step_denominator: duration_ticks,
            direction,
        })
    }

    pub fn is_active(&self) -> bool {
        self.remaining_ticks > 0
    }

    pub fn target(&self) -> u16 {
        self.target
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    pub fn accumulator(&self) -> u32 {
        self.accumulator
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// `(numerator, denominator)` of the per-tick rate.
    pub fn rate(&self) -> (u32, u32) {
        (self.step_numerator, self.step_denominator)
    }

    /// Advance one tick, moving `brightness` toward the target.
    ///
    /// Returns `true` if `brightness` changed.  Reaching (or passing) the
    /// target finishes the ramp regardless of the tick countdown, so the
    /// value can never overshoot.
    pub fn advance(&mut self, brightness: &mut u16) -> bool {
        if self.remaining_ticks == 0 {
            return false;
        }
        let before = *brightness;

        self.accumulator += self.step_numerator;
        while self.accumulator >= self.step_denominator {
            self.accumulator -= self.step_denominator;
            *brightness = match self.direction {
                Direction::Up => brightness.saturating_add(1),
                Direction::Down => brightness.saturating_sub(1),
            };
        }
        self.remaining_ticks -= 1;

        let reached = match self.direction {
            Direction::Up => *brightness >= self.target,
            Direction::Down => *brightness <= self.target,
        };
        if reached || self.remaining_ticks == 0 {
            *self = Self::idle(self.target);
            *brightness = self.target;
        }

        *brightness != before
    }
}

/// Run one engine tick over every channel.
///
/// Returns the indices whose brightness moved; those need their duty
/// re-applied.
pub fn advance_all(bank: &mut ChannelBank) -> Vec<usize, MAX_CHANNELS> {
    let mut changed = Vec::new();
    for (idx, ch) in bank.iter_mut().enumerate() {
        if ch.advance_ramp() {
            // Capacity equals the bank's capacity; push cannot fail.
            let _ = changed.push(idx);
        }
    }
    changed
}
