//! Image generation service integration
//!
//! Submits prompts to an asynchronous prediction endpoint and checks job
//! status. The polling loop that drives a job to its terminal state lives
//! in [`poll`] and is owned by the caller, not the client.

pub mod client;
pub mod mock;
pub mod poll;

pub use client::GenerationClient;
pub use mock::MockGenerationClient;
pub use poll::{cancellation, poll_until_terminal, CancelHandle, CancelSignal, PollOutcome};

use crate::models::GenerationJob;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Submit a new generation job for a short vehicle description.
    async fn submit(&self, vehicle: &str) -> Result<GenerationJob>;

    /// Fetch the current state of a previously submitted job.
    async fn check_status(&self, job: &GenerationJob) -> Result<GenerationJob>;
}
