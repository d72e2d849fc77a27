//! Neural model loading and inference
//!
//! This module provides:
//! - `ModelDescriptor` loading and validation from a model document
//! - `SequenceModel` trait for per-sample inference backends
//! - `Network`, the built-in layer-stack backend
//! - `InferenceEngine`, which pairs a model with its input arity
//! - Mock implementations for testing

mod descriptor;
mod engine;
mod layers;
mod mock;
mod model;
mod network;

pub(crate) use descriptor::{log_load_result, log_loading};
pub use descriptor::{LayerSpec, ModelDescriptor, ModelDocument};
pub use engine::{InferenceEngine, InputArity, MAX_INPUT_ARITY};
pub use layers::{
    build_layer, Activation, ActivationLayer, BatchNorm, Conv1d, Dense, Gru, Layer, Lstm,
};
pub use mock::*;
pub use model::SequenceModel;
pub use network::Network;
