//! Block dispatcher
//!
//! Builds one input frame per sample according to the model's arity, runs
//! the engine and mixes in the optional residual skip.

use crate::neural::{InferenceEngine, InputArity, ModelDescriptor};

/// Per-block model driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockDispatcher {
    skip_gain: f32,
}

impl BlockDispatcher {
    pub fn new(descriptor: &ModelDescriptor) -> Self {
        Self {
            skip_gain: descriptor.skip_gain(),
        }
    }

    /// 1.0 when the model predicts a residual, else 0.0
    pub fn skip_gain(&self) -> f32 {
        self.skip_gain
    }

    /// Run the model over `input`, writing one output sample per input sample
    ///
    /// Frames are laid out for the engine's arity. Control values are held constant for the whole block. Processes
    /// `min(input.len(), output.len())` samples and leaves the rest of
    /// `output` alone.
    pub fn process_block(
        &self,
        engine: &mut InferenceEngine,
        input: &[f32],
        output: &mut [f32],
        param1: f32,
        param2: f32,
    ) {
        let skip = self.skip_gain;
        let pairs = input.iter().zip(output.iter_mut());

        match engine.arity() {
            InputArity::Mono => {
                for (&x, y) in pairs {
                    *y = engine.forward(&[x]) + x * skip;
                }
            }
            InputArity::Conditioned => {
                for (&x, y) in pairs {
                    *y = engine.forward(&[x, param1]) + x * skip;
                }
            }
            InputArity::DualConditioned => {
                for (&x, y) in pairs {
                    *y = engine.forward(&[x, param1, param2]) + x * skip;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::{ConstantModel, RecordingModel, SequenceModel};

    fn engine_for(descriptor: &ModelDescriptor, model: Box<dyn SequenceModel>) -> InferenceEngine {
        InferenceEngine::new(model, descriptor.input_arity()).unwrap()
    }

    #[test]
    fn test_mono_frames() {
        let descriptor = ModelDescriptor::from_parts(1, InputArity::Mono, 8, false, "dense");
        let (model, frames) = RecordingModel::new(1);
        let mut engine = engine_for(&descriptor, Box::new(model));
        let dispatcher = BlockDispatcher::new(&descriptor);

        let input = [0.1f32, 0.2, 0.3];
        let mut output = [0.0f32; 3];
        dispatcher.process_block(&mut engine, &input, &mut output, 0.7, 0.9);

        assert_eq!(output, input);
        assert_eq!(
            *frames.lock().unwrap(),
            vec![vec![0.1f32], vec![0.2], vec![0.3]]
        );
    }

    #[test]
    fn test_conditioned_frames_hold_params() {
        let descriptor = ModelDescriptor::from_parts(1, InputArity::Conditioned, 8, false, "dense");
        let (model, frames) = RecordingModel::new(2);
        let mut engine = engine_for(&descriptor, Box::new(model));
        let dispatcher = BlockDispatcher::new(&descriptor);

        let mut output = [0.0f32; 2];
        dispatcher.process_block(&mut engine, &[0.5, -0.5], &mut output, 0.25, 0.9);

        assert_eq!(
            *frames.lock().unwrap(),
            vec![vec![0.5f32, 0.25], vec![-0.5, 0.25]]
        );
    }

    #[test]
    fn test_dual_conditioned_frames() {
        let descriptor =
            ModelDescriptor::from_parts(1, InputArity::DualConditioned, 8, false, "dense");
        let (model, frames) = RecordingModel::new(3);
        let mut engine = engine_for(&descriptor, Box::new(model));
        let dispatcher = BlockDispatcher::new(&descriptor);

        let mut output = [0.0f32; 1];
        dispatcher.process_block(&mut engine, &[1.0], &mut output, 0.5, 0.75);

        assert_eq!(*frames.lock().unwrap(), vec![vec![1.0f32, 0.5, 0.75]]);
    }

    #[test]
    fn test_skip_adds_input() {
        let descriptor = ModelDescriptor::from_parts(2, InputArity::Mono, 8, true, "dense");
        let mut engine = engine_for(&descriptor, Box::new(ConstantModel::new(1, 0.25)));
        let dispatcher = BlockDispatcher::new(&descriptor);
        assert_eq!(dispatcher.skip_gain(), 1.0);

        let mut output = [0.0f32; 2];
        dispatcher.process_block(&mut engine, &[0.5, -1.0], &mut output, 0.0, 0.0);
        assert_eq!(output, [0.75, -0.75]);
    }

    #[test]
    fn test_shorter_output_leaves_tail() {
        let descriptor = ModelDescriptor::from_parts(1, InputArity::Mono, 8, false, "dense");
        let mut engine = engine_for(&descriptor, Box::new(ConstantModel::new(1, 0.5)));
        let dispatcher = BlockDispatcher::new(&descriptor);

        let mut output = [9.0f32; 4];
        dispatcher.process_block(&mut engine, &[0.0, 0.0], &mut output, 0.0, 0.0);
        assert_eq!(output, [0.5, 0.5, 9.0, 9.0]);
    }

    #[test]
    fn test_empty_block_runs_nothing() {
        let descriptor = ModelDescriptor::from_parts(1, InputArity::Mono, 8, true, "dense");
        let (model, frames) = RecordingModel::new(1);
        let mut engine = engine_for(&descriptor, Box::new(model));
        let dispatcher = BlockDispatcher::new(&descriptor);

        let mut output: [f32; 0] = [];
        dispatcher.process_block(&mut engine, &[], &mut output, 0.0, 0.0);
        assert!(frames.lock().unwrap().is_empty());
    }
}
