use super::ValuationService;
use crate::models::ValuationRecord;
use crate::vin::Vin;
use crate::{Error, Result};
use async_trait::async_trait;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Latency window applied to every resolution, matching what a real
/// valuation round-trip looks like to the caller's loading state.
const DEFAULT_LATENCY_MS: RangeInclusive<u64> = 500..=1500;

/// VINs pinned to a specific catalog entry, ahead of the checksum rule.
const GOLDEN_VINS: [(&str, usize); 3] = [
    ("5YJ3E1EA1PF123456", 0),
    ("7SAYGDEF9PF789012", 1),
    ("5YJSA1E47PF456789", 2),
];

fn catalog() -> Vec<ValuationRecord> {
    vec![
        ValuationRecord {
            make: "Tesla".to_string(),
            model: "Model 3".to_string(),
            year: 2023,
            trim: "Long Range".to_string(),
            estimated_value: 45500,
            trade_in_value: Some(42000),
            retail_value: Some(47500),
            cpo_value: None,
        },
        ValuationRecord {
            make: "Tesla".to_string(),
            model: "Model Y".to_string(),
            year: 2023,
            trim: "Performance".to_string(),
            estimated_value: 55800,
            trade_in_value: Some(52500),
            retail_value: Some(58500),
            cpo_value: None,
        },
        ValuationRecord {
            make: "Tesla".to_string(),
            model: "Model S".to_string(),
            year: 2023,
            trim: "Plaid".to_string(),
            estimated_value: 105000,
            trade_in_value: Some(98000),
            retail_value: Some(109500),
            cpo_value: None,
        },
    ]
}

/// Deterministic valuation backend.
///
/// The same VIN always resolves to the same catalog entry: golden VINs map
/// to their pinned entry, anything else hashes by summing the VIN's byte
/// values modulo the catalog size. VINs ending in `X` or `Z` inject the
/// not-found and rate-limited faults.
pub struct MockValuationClient {
    latency_ms: RangeInclusive<u64>,
}

impl MockValuationClient {
    pub fn new() -> Self {
        Self {
            latency_ms: DEFAULT_LATENCY_MS,
        }
    }

    pub fn with_latency_ms(mut self, latency_ms: RangeInclusive<u64>) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    fn catalog_index(vin: &Vin) -> usize {
        if let Some((_, index)) = GOLDEN_VINS.iter().find(|(golden, _)| *golden == vin.as_str()) {
            return *index;
        }
        let checksum: u32 = vin.as_str().bytes().map(u32::from).sum();
        checksum as usize % catalog().len()
    }

    async fn simulate_latency(&self) {
        let delay_ms = rand::thread_rng().gen_range(self.latency_ms.clone());
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

impl Default for MockValuationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ValuationService for MockValuationClient {
    async fn resolve(&self, vin: &Vin) -> Result<ValuationRecord> {
        self.simulate_latency().await;

        match vin.last_char() {
            'X' => Err(Error::NotFound(
                "No vehicle matches this VIN. Check the VIN and try again.".to_string(),
            )),
            'Z' => Err(Error::RateLimited(
                "Valuation API rate limit exceeded. Try again later.".to_string(),
            )),
            _ => {
                let record = catalog()
                    .into_iter()
                    .nth(Self::catalog_index(vin))
                    .expect("catalog index is always in range");
                tracing::debug!("Resolved {} to {}", vin, record.description());
                Ok(record)
            }
        }
    }
}
