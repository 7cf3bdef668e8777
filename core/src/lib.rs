//! Transaction fraud-risk scoring.
//!
//! One submitted transaction becomes a probability, a risk label and an
//! audit row. See `engine` for the pipeline order.

pub mod audit;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod fraud_flag;
pub mod input;
pub mod model;
pub mod policy;
pub mod rng;
pub mod store;
pub mod types;
