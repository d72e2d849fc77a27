//! Mock sequence models
//!
//! Small deterministic models for exercising the signal path without a
//! trained network.

use std::sync::{Arc, Mutex};

use super::model::SequenceModel;

/// Shared log of every frame a [`RecordingModel`] received
pub type FrameLog = Arc<Mutex<Vec<Vec<f32>>>>;

/// Records each input frame and returns the sum of its elements
pub struct RecordingModel {
    input_size: usize,
    frames: FrameLog,
}

impl RecordingModel {
    pub fn new(input_size: usize) -> (Self, FrameLog) {
        let frames: FrameLog = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                input_size,
                frames: Arc::clone(&frames),
            },
            frames,
        )
    }
}

impl SequenceModel for RecordingModel {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn reset(&mut self) {}

    fn forward(&mut self, input: &[f32]) -> f32 {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push(input.to_vec());
        }
        input.iter().sum()
    }
}

/// One-pole accumulator over the first input: `y = 0.5 * y + x`
///
/// Stateful, so it shows whether state carries over between blocks and
/// whether `reset` clears it.
#[derive(Debug, Clone)]
pub struct RunningSumModel {
    input_size: usize,
    state: f32,
}

impl RunningSumModel {
    pub fn new(input_size: usize) -> Self {
        Self {
            input_size,
            state: 0.0,
        }
    }
}

impl SequenceModel for RunningSumModel {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn reset(&mut self) {
        self.state = 0.0;
    }

    fn forward(&mut self, input: &[f32]) -> f32 {
        self.state = 0.5 * self.state + input[0];
        self.state
    }
}

/// Outputs a constant regardless of input, like a biased network
#[derive(Debug, Clone)]
pub struct ConstantModel {
    input_size: usize,
    value: f32,
}

impl ConstantModel {
    pub fn new(input_size: usize, value: f32) -> Self {
        Self { input_size, value }
    }
}

impl SequenceModel for ConstantModel {
    fn input_size(&self) -> usize {
        self.input_size
    }

    fn reset(&mut self) {}

    fn forward(&mut self, _input: &[f32]) -> f32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_model() {
        let (mut model, frames) = RecordingModel::new(2);
        assert_eq!(model.forward(&[0.25, 0.5]), 0.75);
        assert_eq!(*frames.lock().unwrap(), vec![vec![0.25f32, 0.5]]);
    }

    #[test]
    fn test_running_sum_model() {
        let mut model = RunningSumModel::new(1);
        assert_eq!(model.forward(&[1.0]), 1.0);
        assert_eq!(model.forward(&[1.0]), 1.5);
        model.reset();
        assert_eq!(model.forward(&[0.0]), 0.0);
    }
}
