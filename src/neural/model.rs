//! Sequence model capability
//!
//! Defines the interface every inference backend implements. The processor
//! only ever talks to a model through this trait, so any numerical backend
//! with per-sample state can be dropped in.

/// A stateful model that consumes one input frame per sample
pub trait SequenceModel: Send {
    /// Number of scalars expected in every frame
    fn input_size(&self) -> usize;

    /// Clear all internal recurrent/convolutional memory to zero
    fn reset(&mut self);

    /// Advance the internal state by one sample and return the output
    ///
    /// Must not allocate; called from the real-time path.
    fn forward(&mut self, input: &[f32]) -> f32;
}
