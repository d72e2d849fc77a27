//! Post filter
//!
//! First-order high-pass sections designed with the bilinear transform
//! (cutoff prewarped). Used as a fixed DC blocker behind the model: the
//! network output can carry a bias that the high-pass removes.

use std::f64::consts::PI;

/// Highest number of cascaded first-order sections
pub const MAX_SLOPE: usize = 4;

/// Filter settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    /// Cutoff frequency in Hz
    pub frequency: f32,
    /// Linear passband gain
    pub gain: f32,
    /// Number of cascaded first-order sections (6 dB/oct each)
    pub slope: usize,
}

impl FilterParams {
    /// DC blocker at `frequency`: unity gain, one section
    pub fn dc_blocker(frequency: f32) -> Self {
        Self {
            frequency,
            gain: 1.0,
            slope: 1,
        }
    }
}

/// Filter capability used by the processor
pub trait Filter: Send {
    /// Compute coefficients; the only call that may allocate
    fn configure(&mut self, params: &FilterParams, sample_rate: f64);

    /// Filter `buffer` in place, continuing from the previous call's state
    fn process(&mut self, buffer: &mut [f32]);

    /// Clear the delay memory
    fn reset(&mut self);
}

/// First-order section coefficients, normalised so `a0 = 1`
/// Transfer function: H(z) = (b0 + b1*z^-1) / (1 + a1*z^-1)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct OnePoleCoeffs {
    b0: f64,
    b1: f64,
    a1: f64,
}

impl OnePoleCoeffs {
    /// Pass-through section
    const IDENTITY: Self = OnePoleCoeffs {
        b0: 1.0,
        b1: 0.0,
        a1: 0.0,
    };

    /// Bilinear transform of H(s) = s / (s + wc)
    ///
    /// A sample rate that is not finite and positive yields [`Self::IDENTITY`].
    fn high_pass(sample_rate: f64, frequency: f64) -> Self {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Self::IDENTITY;
        }
        let upper = sample_rate * 0.5 * 0.99;
        let freq = frequency.clamp(upper.min(1e-3), upper);
        let k = (PI * freq / sample_rate).tan();
        let norm = 1.0 / (1.0 + k);

        OnePoleCoeffs {
            b0: norm,
            b1: -norm,
            a1: (k - 1.0) * norm,
        }
    }
}

/// Delay memory of one section
#[derive(Debug, Clone, Copy, Default)]
struct OnePoleState {
    x1: f64,
    y1: f64,
}

impl OnePoleState {
    #[inline]
    fn process(&mut self, input: f64, coeffs: &OnePoleCoeffs) -> f64 {
        let mut output = coeffs.b0 * input + coeffs.b1 * self.x1 - coeffs.a1 * self.y1;
        // Flush denormals
        if output.abs() < 1e-30 {
            output = 0.0;
        }
        self.x1 = input;
        self.y1 = output;
        output
    }
}

/// Cascade of identical first-order high-pass sections
#[derive(Debug, Clone)]
pub struct HighPassFilter {
    coeffs: OnePoleCoeffs,
    sections: Vec<OnePoleState>,
    gain: f64,
}

impl HighPassFilter {
    /// Create and configure a filter
    pub fn new(params: &FilterParams, sample_rate: f64) -> Self {
        let mut filter = Self {
            coeffs: OnePoleCoeffs::default(),
            sections: Vec::new(),
            gain: 1.0,
        };
        filter.configure(params, sample_rate);
        filter
    }

    /// Number of active sections
    pub fn slope(&self) -> usize {
        self.sections.len()
    }
}

impl Filter for HighPassFilter {
    fn configure(&mut self, params: &FilterParams, sample_rate: f64) {
        self.coeffs = OnePoleCoeffs::high_pass(sample_rate, params.frequency as f64);
        self.gain = params.gain as f64;
        self.sections = vec![OnePoleState::default(); params.slope.clamp(1, MAX_SLOPE)];
    }

    fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            let mut value = *sample as f64;
            for section in &mut self.sections {
                value = section.process(value, &self.coeffs);
            }
            *sample = (value * self.gain) as f32;
        }
    }

    fn reset(&mut self) {
        for section in &mut self.sections {
            *section = OnePoleState::default();
        }
    }
}
