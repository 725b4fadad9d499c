//! Session orchestration for VIN lookup and vehicle image generation.

use crate::generation::{
    cancellation, poll_until_terminal, GenerationClient, GenerationService, PollOutcome,
};
use crate::generation::poll::CancelHandle;
use crate::models::{
    Config, JobStatus, RecentLookup, RecentLookups, ValuationProvider, ValuationRecord,
};
use crate::valuation::{MockValuationClient, RemoteValuationClient, ValuationService};
use crate::vin::Vin;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Injectable service bundle used to construct [`Session`] in
/// tests/harnesses.
pub struct SessionServices {
    pub valuation: Box<dyn ValuationService>,
    pub generation: Arc<dyn GenerationService>,
}

/// Owns the per-session state that the lookup flow reads and mutates:
/// the recent-lookup log, the lookup counter, and the cancellation handle
/// of the active generation poll.
pub struct Session {
    valuation: Box<dyn ValuationService>,
    generation: Arc<dyn GenerationService>,
    recent: RecentLookups,
    poll_interval: Duration,
    active_poll: Option<CancelHandle>,
    request_seq: u64,
}

/// A generation poll running in the background. Await [`GenerationTask::wait`]
/// for the outcome; starting a new lookup or generation on the session
/// cancels it instead.
pub struct GenerationTask {
    inner: JoinHandle<Result<PollOutcome>>,
}

impl GenerationTask {
    /// Resolve to the generated image URL, `None` if the poll was
    /// cancelled, or the job's failure as an error.
    pub async fn wait(self) -> Result<Option<String>> {
        let outcome = self
            .inner
            .await
            .map_err(|e| Error::Unknown(format!("Generation poll task failed: {}", e)))??;

        match outcome {
            PollOutcome::Cancelled => Ok(None),
            PollOutcome::Finished(job) => {
                if job.status == JobStatus::Failed {
                    return Err(Error::Upstream(
                        job.error
                            .unwrap_or_else(|| "Image generation failed".to_string()),
                    ));
                }
                let url = job.first_output().ok_or_else(|| {
                    Error::Upstream("Generation succeeded without an output image".to_string())
                })?;
                Ok(Some(url.to_string()))
            }
        }
    }
}

impl Session {
    /// Build a session from concrete service dependencies.
    pub fn with_services(services: SessionServices, poll_interval: Duration) -> Self {
        Self {
            valuation: services.valuation,
            generation: services.generation,
            recent: RecentLookups::new(),
            poll_interval,
            active_poll: None,
            request_seq: 0,
        }
    }

    /// Construct a session from environment configuration
    /// (`Config::from_env`).
    pub fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        // Reuse one HTTP connection pool across both clients.
        let http_client = reqwest::Client::new();

        let valuation: Box<dyn ValuationService> = match config.valuation_provider {
            ValuationProvider::Mock => {
                info!("Valuation provider: deterministic mock catalog");
                Box::new(MockValuationClient::new())
            }
            ValuationProvider::Remote => {
                let base_url = config
                    .valuation_base_url
                    .clone()
                    .expect("VALUATION_BASE_URL validated in Config::from_env");
                info!("Valuation provider: remote ({})", base_url);
                Box::new(RemoteValuationClient::new_with_client(
                    base_url,
                    config
                        .valuation_api_token
                        .clone()
                        .expect("VALUATION_API_TOKEN validated in Config::from_env"),
                    http_client.clone(),
                ))
            }
        };

        let generation = Arc::new(GenerationClient::new_with_client(
            config.generation_base_url.clone(),
            config.generation_api_token.clone(),
            config.model_version.clone(),
            http_client,
        ));

        Ok(Self::with_services(
            SessionServices {
                valuation,
                generation,
            },
            Duration::from_millis(config.poll_interval_ms),
        ))
    }

    /// Validate a raw VIN string, resolve its valuation, and record the
    /// result in the recent-lookup log.
    ///
    /// A lookup supersedes any generation still polling for the previous
    /// vehicle, so that poll is cancelled first.
    pub async fn lookup(&mut self, candidate: &str) -> Result<ValuationRecord> {
        self.abort_generation();

        self.request_seq += 1;
        let request = self.request_seq;

        let vin = Vin::parse(candidate)?;
        info!(request, "Looking up valuation for {}", vin);

        let record = self.valuation.resolve(&vin).await?;
        info!(request, "Resolved {} to {}", vin, record.description());

        self.recent.record(RecentLookup::new(&vin, &record));
        Ok(record)
    }

    /// Submit a generation job for the record's vehicle and start polling
    /// it in the background. Any previous poll is cancelled first.
    pub async fn begin_generation(&mut self, record: &ValuationRecord) -> Result<GenerationTask> {
        self.abort_generation();

        let job = self.generation.submit(&record.description()).await?;
        info!("Submitted generation job {} for {}", job.id, record.description());

        let (handle, signal) = cancellation();
        self.active_poll = Some(handle);

        let service = Arc::clone(&self.generation);
        let interval = self.poll_interval;
        let inner = tokio::spawn(async move {
            poll_until_terminal(service.as_ref(), job, interval, signal).await
        });

        Ok(GenerationTask { inner })
    }

    /// Generate a vehicle image and wait for it: the submitted job's first
    /// output URL on success, `None` if the poll was cancelled.
    pub async fn generate_image(&mut self, record: &ValuationRecord) -> Result<Option<String>> {
        let task = self.begin_generation(record).await?;
        let result = task.wait().await;
        self.active_poll = None;
        result
    }

    /// Cancel the active generation poll, if any. Safe to call at any
    /// time, including teardown.
    pub fn abort_generation(&mut self) {
        if let Some(handle) = self.active_poll.take() {
            handle.cancel();
        }
    }

    pub fn recent_lookups(&self) -> &[RecentLookup] {
        self.recent.entries()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.abort_generation();
    }
}
