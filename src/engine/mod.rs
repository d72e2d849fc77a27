//! Processing engine
//!
//! - `NeuralProcessor`, the per-instance real-time signal path
//! - Mono WAV import/export for offline rendering

pub mod io;
pub mod processor;

pub use io::{export_mono, generate_test_tone, import_mono, BitDepth, MonoAudio};
pub use processor::{BlockContext, Controls, NeuralProcessor};
