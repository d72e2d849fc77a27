//! Bypass controller
//!
//! Follows the host's bypass flag and logs each change once. Switching is
//! immediate; there is no crossfade between the wet and dry paths.

use std::fmt;

use log::info;

/// Signal path selected for a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassState {
    /// Model, post filter and gain ramp are applied
    Active,
    /// Input is copied to the output untouched
    Passthrough,
}

impl fmt::Display for BypassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BypassState::Active => write!(f, "active"),
            BypassState::Passthrough => write!(f, "passthrough"),
        }
    }
}

/// Remembers the last bypass flag so changes are logged exactly once
#[derive(Debug, Clone, Default)]
pub struct BypassController {
    bypass_old: bool,
    transitions: u64,
}

impl BypassController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this block's flag and pick the signal path
    pub fn gate(&mut self, bypass: bool) -> BypassState {
        if bypass != self.bypass_old {
            self.bypass_old = bypass;
            self.transitions += 1;
            info!("Bypass status changed to: {}", bypass);
        }
        self.state()
    }

    pub fn state(&self) -> BypassState {
        if self.bypass_old {
            BypassState::Passthrough
        } else {
            BypassState::Active
        }
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass_old
    }

    /// Number of flag changes seen so far
    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_active() {
        let controller = BypassController::new();
        assert_eq!(controller.state(), BypassState::Active);
        assert!(!controller.is_bypassed());
        assert_eq!(controller.transitions(), 0);
    }

    #[test]
    fn test_repeated_flag_counts_once() {
        let mut controller = BypassController::new();
        for _ in 0..5 {
            assert_eq!(controller.gate(true), BypassState::Passthrough);
        }
        assert_eq!(controller.transitions(), 1);

        controller.gate(false);
        controller.gate(false);
        assert_eq!(controller.transitions(), 2);
        assert_eq!(controller.state(), BypassState::Active);
    }

    #[test]
    fn test_display() {
        assert_eq!(BypassState::Active.to_string(), "active");
        assert_eq!(BypassState::Passthrough.to_string(), "passthrough");
    }
}
