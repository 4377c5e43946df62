//! Friction synthesis: external candidates plus sensor context in,
//! normalized friction records out.

pub mod context;
pub mod synthesizer;

pub use context::base_context;
pub use synthesizer::{FrictionSynthesizer, SynthesisInputs};
