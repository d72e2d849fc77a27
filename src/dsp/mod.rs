//! Signal-path building blocks
//!
//! Everything that runs after or around the model inside one block:
//! frame dispatch, the DC-blocking post filter, the master gain ramp and
//! the bypass switch.

mod bypass;
mod dispatch;
mod filter;
mod ramp;

pub use bypass::{BypassController, BypassState};
pub use dispatch::BlockDispatcher;
pub use filter::{Filter, FilterParams, HighPassFilter, MAX_SLOPE};
pub use ramp::{apply_gain_ramp, ramp_value, GainSmoother};
