//! Filter module.
//!
//! Contains the effects a job can apply and their convolution kernels.

pub mod effect;

pub use effect::{Effect, Kernel};
