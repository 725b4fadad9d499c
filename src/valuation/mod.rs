//! Vehicle valuation resolution
//!
//! Maps a validated VIN to a valuation record, either from the
//! deterministic in-process catalog or from a remote valuation endpoint.
//! Both backends sit behind [`ValuationService`] so the session can swap
//! them by configuration.

pub mod client;
pub mod mock;

pub use client::RemoteValuationClient;
pub use mock::MockValuationClient;

use crate::models::ValuationRecord;
use crate::vin::Vin;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ValuationService: Send + Sync {
    async fn resolve(&self, vin: &Vin) -> Result<ValuationRecord>;
}
