//! Real-time processor
//!
//! Owns everything one plugin instance needs: the loaded model (or the
//! reason it failed to load), the DC blocker, the master gain smoother and
//! the bypass switch. Only instantiation touches the filesystem or
//! allocates; [`NeuralProcessor::run`] is safe to call from an audio thread.
//!
//! # Block flow
//!
//! ```text
//! gain.advance -> bypass.gate -+-> Passthrough: output = input
//!                              |
//!                              +-> Active, loaded:   dispatch -> DC blocker -> gain ramp
//!                              +-> Active, unloaded: silence | passthrough
//! ```

use std::fmt;
use std::path::Path;

use log::{error, info, warn};

use crate::config::{EngineConfig, UnloadedPolicy};
use crate::dsp::{
    apply_gain_ramp, BlockDispatcher, BypassController, BypassState, Filter, FilterParams,
    GainSmoother, HighPassFilter,
};
use crate::error::LoadError;
use crate::neural::{
    log_load_result, log_loading, InferenceEngine, ModelDescriptor, ModelDocument, Network,
    SequenceModel,
};

/// Rate the post filter is designed at when the host rate is unusable
const FALLBACK_SAMPLE_RATE: f64 = 48000.0;

// ============================================================================
// Per-block inputs
// ============================================================================

/// Control values sampled once per block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    /// First conditioning input, used by models with 2 or 3 inputs
    pub param1: f32,
    /// Second conditioning input, used by models with 3 inputs
    pub param2: f32,
    /// Linear master gain
    pub master: f32,
    /// Route input straight to output
    pub bypass: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            param1: 0.0,
            param2: 0.0,
            master: 1.0,
            bypass: false,
        }
    }
}

/// Input and controls for a single `run` call
#[derive(Debug, Clone, Copy)]
pub struct BlockContext<'a> {
    pub input: &'a [f32],
    pub controls: Controls,
}

impl<'a> BlockContext<'a> {
    pub fn new(input: &'a [f32], controls: Controls) -> Self {
        Self { input, controls }
    }
}

// ============================================================================
// Model slot
// ============================================================================

enum ModelSlot {
    Loaded {
        descriptor: ModelDescriptor,
        engine: InferenceEngine,
        dispatcher: BlockDispatcher,
    },
    Unloaded {
        reason: LoadError,
    },
}

impl ModelSlot {
    fn loaded(descriptor: ModelDescriptor, mut engine: InferenceEngine, preroll: usize) -> Self {
        engine.warm_up(preroll);
        ModelSlot::Loaded {
            dispatcher: BlockDispatcher::new(&descriptor),
            descriptor,
            engine,
        }
    }
}

// ============================================================================
// Processor
// ============================================================================

/// One single-channel processing instance
pub struct NeuralProcessor {
    sample_rate: f64,
    config: EngineConfig,
    slot: ModelSlot,
    dc_blocker: HighPassFilter,
    gain: GainSmoother,
    bypass: BypassController,
}

impl NeuralProcessor {
    /// Create a processor with the default configuration
    ///
    /// Looks for `model.json` inside `bundle_path`. Never fails: if the model
    /// cannot be loaded the processor runs unloaded, see [`UnloadedPolicy`].
    pub fn instantiate(sample_rate: f64, bundle_path: &Path) -> Self {
        Self::with_config(sample_rate, bundle_path, EngineConfig::default())
    }

    /// Create a processor with an explicit configuration
    ///
    /// A sample rate that is not finite and positive leaves the processor
    /// unloaded with [`LoadError::InvalidSampleRate`].
    pub fn with_config(sample_rate: f64, bundle_path: &Path, config: EngineConfig) -> Self {
        if let Err(reason) = check_sample_rate(sample_rate) {
            error!("Refusing to load a model: {}", reason);
            return Self::assemble(FALLBACK_SAMPLE_RATE, config, ModelSlot::Unloaded { reason });
        }

        let model_path = bundle_path.join(&config.model_file_name);
        log_loading(&model_path);

        let result = load_model(&model_path);
        log_load_result(&model_path, result.as_ref().map(|(descriptor, _)| descriptor));

        let slot = match result {
            Ok((descriptor, engine)) => {
                ModelSlot::loaded(descriptor, engine, config.preroll_samples)
            }
            Err(reason) => {
                warn!("Processor running unloaded ({:?} policy)", config.unloaded_policy);
                ModelSlot::Unloaded { reason }
            }
        };

        Self::assemble(sample_rate, config, slot)
    }

    /// Create a processor around a model that was built elsewhere
    ///
    /// The model's input size must match the descriptor's arity and the
    /// sample rate must be finite and positive.
    pub fn from_model(
        sample_rate: f64,
        descriptor: ModelDescriptor,
        model: Box<dyn SequenceModel>,
        config: EngineConfig,
    ) -> Result<Self, LoadError> {
        check_sample_rate(sample_rate)?;
        let engine = InferenceEngine::new(model, descriptor.input_arity())?;
        let slot = ModelSlot::loaded(descriptor, engine, config.preroll_samples);
        Ok(Self::assemble(sample_rate, config, slot))
    }

    fn assemble(sample_rate: f64, config: EngineConfig, slot: ModelSlot) -> Self {
        let dc_blocker =
            HighPassFilter::new(&FilterParams::dc_blocker(config.dc_cutoff_hz), sample_rate);

        Self {
            sample_rate,
            config,
            slot,
            dc_blocker,
            gain: GainSmoother::default(),
            bypass: BypassController::new(),
        }
    }

    /// Hand back the load failure, consuming the processor
    pub fn into_load_error(self) -> Option<LoadError> {
        match self.slot {
            ModelSlot::Loaded { .. } => None,
            ModelSlot::Unloaded { reason } => Some(reason),
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        matches!(self.slot, ModelSlot::Loaded { .. })
    }

    /// Descriptor of the loaded model, `None` while unloaded
    pub fn descriptor(&self) -> Option<&ModelDescriptor> {
        match &self.slot {
            ModelSlot::Loaded { descriptor, .. } => Some(descriptor),
            ModelSlot::Unloaded { .. } => None,
        }
    }

    /// Why loading failed, `None` when a model is loaded
    pub fn load_error(&self) -> Option<&LoadError> {
        match &self.slot {
            ModelSlot::Loaded { .. } => None,
            ModelSlot::Unloaded { reason } => Some(reason),
        }
    }

    pub fn bypass_state(&self) -> BypassState {
        self.bypass.state()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process one block
    ///
    /// Writes `min(input.len(), output.len())` samples; anything past that
    /// in `output` is left as it was. An empty block changes no state.
    pub fn run(&mut self, context: &BlockContext<'_>, output: &mut [f32]) {
        let n = context.input.len().min(output.len());
        if n == 0 {
            return;
        }
        let input = &context.input[..n];
        let output = &mut output[..n];
        let controls = context.controls;

        let (gain_start, gain_end) = self.gain.advance(controls.master);

        if self.bypass.gate(controls.bypass) == BypassState::Passthrough {
            output.copy_from_slice(input);
            return;
        }

        match &mut self.slot {
            ModelSlot::Loaded {
                engine, dispatcher, ..
            } => {
                dispatcher.process_block(engine, input, output, controls.param1, controls.param2);
                self.dc_blocker.process(output);
                apply_gain_ramp(output, gain_start, gain_end);
            }
            ModelSlot::Unloaded { .. } => match self.config.unloaded_policy {
                UnloadedPolicy::Silence => output.fill(0.0),
                UnloadedPolicy::Passthrough => output.copy_from_slice(input),
            },
        }
    }

    /// Shorthand for [`run`](Self::run) without building a context
    pub fn process(&mut self, input: &[f32], output: &mut [f32], controls: Controls) {
        self.run(&BlockContext::new(input, controls), output);
    }

    /// Offline helper: process a whole signal in fixed-size blocks
    ///
    /// Allocates the output, so not for use on an audio thread.
    pub fn render(&mut self, input: &[f32], block_size: usize, controls: Controls) -> Vec<f32> {
        let mut output = vec![0.0; input.len()];
        let block_size = block_size.max(1);
        for (src, dst) in input.chunks(block_size).zip(output.chunks_mut(block_size)) {
            self.process(src, dst, controls);
        }
        output
    }

    /// Tear down the instance
    pub fn shutdown(self) {
        info!(
            "Shutting down processor ({} bypass transitions)",
            self.bypass.transitions()
        );
    }
}

impl fmt::Debug for NeuralProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeuralProcessor")
            .field("sample_rate", &self.sample_rate)
            .field("loaded", &self.is_model_loaded())
            .field("descriptor", &self.descriptor())
            .field("bypass", &self.bypass.state())
            .finish()
    }
}

fn check_sample_rate(sample_rate: f64) -> Result<(), LoadError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(LoadError::InvalidSampleRate { sample_rate })
    }
}

/// Read the document once and build both the descriptor and the network
fn load_model(path: &Path) -> Result<(ModelDescriptor, InferenceEngine), LoadError> {
    let document = ModelDocument::from_path(path)?;
    let descriptor = ModelDescriptor::from_document(&document)?;
    let network = Network::from_document(&document)?;
    let engine = InferenceEngine::new(Box::new(network), descriptor.input_arity())?;
    Ok((descriptor, engine))
}
