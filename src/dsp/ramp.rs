//! Gain ramp
//!
//! Master gain changes are spread linearly across one block so a sudden
//! control move never produces a step in the output.

// ============================================================================
// Helper Functions
// ============================================================================

/// Value of a linear ramp from `start` towards `end` at sample `index`
///
/// The ramp covers `len` steps, so `index = 0` yields exactly `start` and
/// the last sample of a block lands one step short of `end`.
#[inline]
pub fn ramp_value(start: f32, end: f32, len: usize, index: usize) -> f32 {
    if len == 0 {
        return end;
    }
    start + ((end - start) / len as f32) * index as f32
}

/// Multiply `buffer` by a ramp running from `start` to `end`
pub fn apply_gain_ramp(buffer: &mut [f32], start: f32, end: f32) {
    let len = buffer.len();
    if start == end {
        if start != 1.0 {
            buffer.iter_mut().for_each(|s| *s *= start);
        }
        return;
    }
    for (i, sample) in buffer.iter_mut().enumerate() {
        *sample *= ramp_value(start, end, len, i);
    }
}

// ============================================================================
// Gain Smoother
// ============================================================================

/// Tracks the master gain applied at the end of the previous block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSmoother {
    previous: f32,
}

impl GainSmoother {
    pub fn new(initial: f32) -> Self {
        Self { previous: initial }
    }

    /// Start and end values for this block's ramp
    ///
    /// Records `target` as the new previous value. Called every block,
    /// bypassed or not, so the ramp always starts from the latest control.
    pub fn advance(&mut self, target: f32) -> (f32, f32) {
        let start = self.previous;
        self.previous = target;
        (start, target)
    }

    pub fn previous(&self) -> f32 {
        self.previous
    }
}

impl Default for GainSmoother {
    fn default() -> Self {
        Self::new(0.0)
    }
}
