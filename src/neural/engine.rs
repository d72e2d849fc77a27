//! Inference engine adapter
//!
//! Wraps a [`SequenceModel`] together with the input arity it was loaded
//! with, and owns the reset / pre-roll protocol that has to run before the
//! first real block.

use std::fmt;

use log::debug;

use super::model::SequenceModel;
use crate::error::LoadError;

/// Largest input frame a model can take
pub const MAX_INPUT_ARITY: usize = 3;

/// Number of scalar inputs per time step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputArity {
    /// Audio sample only (snapshot model)
    Mono,
    /// Audio sample plus one control parameter
    Conditioned,
    /// Audio sample plus two control parameters
    DualConditioned,
}

impl InputArity {
    /// Map an input width to an arity, rejecting anything outside 1..=3
    pub fn from_size(size: usize) -> Result<Self, LoadError> {
        match size {
            1 => Ok(InputArity::Mono),
            2 => Ok(InputArity::Conditioned),
            3 => Ok(InputArity::DualConditioned),
            other => Err(LoadError::UnsupportedArity { arity: other }),
        }
    }

    /// Frame width for this arity
    pub fn size(self) -> usize {
        match self {
            InputArity::Mono => 1,
            InputArity::Conditioned => 2,
            InputArity::DualConditioned => 3,
        }
    }
}

impl fmt::Display for InputArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.size())
    }
}

/// Owns a model and drives it one frame at a time
pub struct InferenceEngine {
    model: Box<dyn SequenceModel>,
    arity: InputArity,
}

impl InferenceEngine {
    /// Pair a model with the arity its descriptor declared
    pub fn new(model: Box<dyn SequenceModel>, arity: InputArity) -> Result<Self, LoadError> {
        if model.input_size() != arity.size() {
            return Err(LoadError::ShapeMismatch {
                index: 0,
                expected: arity.size(),
                found: model.input_size(),
            });
        }
        Ok(Self { model, arity })
    }

    pub fn arity(&self) -> InputArity {
        self.arity
    }

    /// Clear the model state
    pub fn reset(&mut self) {
        self.model.reset();
    }

    /// Drive `samples` all-zero frames through the model
    ///
    /// Lets running statistics settle before real audio arrives. Runs once
    /// after `reset`, never per block.
    pub fn preroll(&mut self, samples: usize) {
        let frame = [0.0f32; MAX_INPUT_ARITY];
        let width = self.arity.size();
        for _ in 0..samples {
            self.model.forward(&frame[..width]);
        }
        debug!("Pre-rolled model with {} zero samples", samples);
    }

    /// Reset followed by pre-roll
    pub fn warm_up(&mut self, preroll_samples: usize) {
        self.reset();
        self.preroll(preroll_samples);
    }

    /// Advance by exactly one sample
    #[inline]
    pub fn forward(&mut self, frame: &[f32]) -> f32 {
        debug_assert_eq!(frame.len(), self.arity.size());
        self.model.forward(frame)
    }
}
