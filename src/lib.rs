//! Engine for vinworth - VIN valuation lookup with AI vehicle imagery
//!
//! This crate validates Vehicle Identification Numbers, resolves them to
//! valuation records (deterministic mock catalog or a remote valuation
//! endpoint), and drives an asynchronous image-generation job to completion
//! for display alongside the valuation.

pub mod error;
pub mod generation;
pub mod models;
pub mod prompts;
pub mod session;
pub mod valuation;
pub mod vin;

pub use error::{Error, Result};
