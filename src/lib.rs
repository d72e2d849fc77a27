//! neuralfx - real-time neural audio effect processor
//!
//! Runs a learned sequence model (amp, pedal or effect capture) over a
//! single-channel signal one sample at a time.
//!
//! # Architecture
//!
//! - `neural`: model documents, the layer-stack network and the inference
//!   engine adapter
//! - `dsp`: block dispatch, DC-blocking post filter, master gain ramp and
//!   bypass
//! - `engine`: the per-instance `NeuralProcessor` plus WAV file I/O
//! - `cli`: offline rendering and model inspection commands

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod neural;

pub use config::{EngineConfig, UnloadedPolicy};
pub use engine::{BlockContext, Controls, NeuralProcessor};
pub use error::{LoadError, NeuralFxError, Result};
pub use neural::{InputArity, ModelDescriptor, SequenceModel};
