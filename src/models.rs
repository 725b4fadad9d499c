//! Data models and structures
//!
//! Defines the core data structures for valuation records, generation
//! jobs, the recent-lookup log, and API interactions with the valuation
//! and image-generation services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vin::Vin;

/// A resolved vehicle valuation. Field names on the wire match the
/// valuation endpoint's camelCase JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRecord {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub trim: String,
    pub estimated_value: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_in_value: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retail_value: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpo_value: Option<u32>,
}

impl ValuationRecord {
    /// Short human-readable description, e.g. "2023 Tesla Model 3 Long Range".
    ///
    /// Used as the seed text for image-generation prompts and log lines.
    pub fn description(&self) -> String {
        let base = format!("{} {} {}", self.year, self.make, self.model);
        if self.trim.is_empty() {
            base
        } else {
            format!("{} {}", base, self.trim)
        }
    }
}

/// Format a whole-dollar amount with thousands separators, e.g. `$45,500`.
pub fn format_currency(amount: u32) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("${}", out)
}

/// Lifecycle states of an image-generation job. Terminal states are
/// `Succeeded` and `Failed`; no transitions occur after either.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobUrls {
    pub get: String,
    pub cancel: String,
}

/// Handle to an asynchronous image-generation job, as returned by the
/// prediction endpoint. `output` is present only once the job succeeds;
/// `error` only once it fails.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationJob {
    pub id: String,
    pub urls: JobUrls,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationJob {
    /// The image URL to display once the job has succeeded.
    pub fn first_output(&self) -> Option<&str> {
        self.output
            .as_deref()
            .and_then(|urls| urls.first())
            .map(String::as_str)
    }
}

// Prediction endpoint request models
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    pub version: String,
    pub input: GenerationInput,
}

#[derive(Debug, Serialize)]
pub struct GenerationInput {
    pub prompt: String,
    pub negative_prompt: String,
    pub num_outputs: u32,
    pub guidance_scale: f64,
    pub num_inference_steps: u32,
}

/// One entry in the session's recent-lookup log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentLookup {
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub looked_up_at: DateTime<Utc>,
}

impl RecentLookup {
    pub fn new(vin: &Vin, record: &ValuationRecord) -> Self {
        Self {
            vin: vin.as_str().to_string(),
            make: record.make.clone(),
            model: record.model.clone(),
            year: record.year,
            looked_up_at: Utc::now(),
        }
    }
}

/// Bounded, de-duplicated, most-recent-first log of successful lookups.
///
/// Held in session memory only; no two entries share a VIN, and the log
/// never grows past [`RecentLookups::CAPACITY`] entries.
#[derive(Debug, Clone, Default)]
pub struct RecentLookups {
    entries: Vec<RecentLookup>,
}

impl RecentLookups {
    pub const CAPACITY: usize = 5;

    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend an entry, dropping any older entry for the same VIN and
    /// truncating to capacity.
    pub fn record(&mut self, entry: RecentLookup) {
        self.entries.retain(|existing| existing.vin != entry.vin);
        self.entries.insert(0, entry);
        self.entries.truncate(Self::CAPACITY);
    }

    pub fn entries(&self) -> &[RecentLookup] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which valuation backend the session should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuationProvider {
    Mock,
    Remote,
}

impl ValuationProvider {
    fn parse(value: &str) -> crate::Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "remote" => Ok(Self::Remote),
            other => Err(crate::Error::Config(format!(
                "Unknown VALUATION_PROVIDER '{}' (expected 'mock' or 'remote')",
                other
            ))),
        }
    }
}

/// Pinned image model version submitted with every generation request.
pub const DEFAULT_MODEL_VERSION: &str =
    "39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b";

const DEFAULT_GENERATION_BASE_URL: &str = "https://api.replicate.com";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub valuation_provider: ValuationProvider,
    pub valuation_base_url: Option<String>,
    pub valuation_api_token: Option<String>,
    pub generation_base_url: String,
    pub generation_api_token: String,
    pub model_version: String,
    pub poll_interval_ms: u64,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let valuation_provider = match std::env::var("VALUATION_PROVIDER") {
            Ok(value) => ValuationProvider::parse(&value)?,
            Err(_) => ValuationProvider::Mock,
        };

        let valuation_base_url = std::env::var("VALUATION_BASE_URL").ok();
        let valuation_api_token = std::env::var("VALUATION_API_TOKEN").ok();

        if valuation_provider == ValuationProvider::Remote {
            if valuation_base_url.is_none() {
                return Err(crate::Error::Config(
                    "VALUATION_BASE_URL not set (required when VALUATION_PROVIDER=remote)"
                        .to_string(),
                ));
            }
            if valuation_api_token.is_none() {
                return Err(crate::Error::Config(
                    "VALUATION_API_TOKEN not set (required when VALUATION_PROVIDER=remote)"
                        .to_string(),
                ));
            }
        }

        let poll_interval_ms = match std::env::var("POLL_INTERVAL_MS") {
            Ok(value) => value.parse::<u64>().map_err(|_| {
                crate::Error::Config(format!("Invalid POLL_INTERVAL_MS '{}'", value))
            })?,
            Err(_) => DEFAULT_POLL_INTERVAL_MS,
        };

        Ok(Self {
            valuation_provider,
            valuation_base_url,
            valuation_api_token,
            generation_base_url: std::env::var("REPLICATE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GENERATION_BASE_URL.to_string()),
            generation_api_token: std::env::var("REPLICATE_API_TOKEN")
                .map_err(|_| crate::Error::Config("REPLICATE_API_TOKEN not set".to_string()))?,
            model_version: std::env::var("GENERATION_MODEL_VERSION")
                .unwrap_or_else(|_| DEFAULT_MODEL_VERSION.to_string()),
            poll_interval_ms,
        })
    }
}
