//! Caller-driven polling for generation jobs
//!
//! One status check per tick on a fixed interval, until the job reaches a
//! terminal state, a status check errors, or the caller cancels. The
//! cancellation signal is checked before every tick, so no request is ever
//! issued after cancellation.

use super::GenerationService;
use crate::models::GenerationJob;
use crate::Result;
use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Cancels an in-flight poll loop. Cancelling is infallible and
/// idempotent; dropping the handle without cancelling leaves the loop
/// running to its terminal state.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

#[derive(Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the handle fires. Never resolves if the handle was
    /// dropped without cancelling.
    async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Create a linked cancel handle/signal pair.
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

#[derive(Debug)]
pub enum PollOutcome {
    /// The job reached `succeeded` or `failed`.
    Finished(GenerationJob),
    /// The caller cancelled before the job reached a terminal state.
    Cancelled,
}

/// Drive `job` to a terminal state with one status check per `interval`.
///
/// A job that is already terminal finishes immediately without issuing any
/// request. A status-check error propagates and ends the loop; polling
/// never continues past an error.
pub async fn poll_until_terminal(
    service: &dyn GenerationService,
    job: GenerationJob,
    interval: Duration,
    mut cancel: CancelSignal,
) -> Result<PollOutcome> {
    let mut current = job;

    loop {
        if current.status.is_terminal() {
            tracing::info!(
                "Generation job {} finished with status {:?}",
                current.id,
                current.status
            );
            return Ok(PollOutcome::Finished(current));
        }
        if cancel.is_cancelled() {
            tracing::info!("Polling for generation job {} cancelled", current.id);
            return Ok(PollOutcome::Cancelled);
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Polling for generation job {} cancelled", current.id);
                return Ok(PollOutcome::Cancelled);
            }
            _ = tokio::time::sleep(interval) => {}
        }

        // Re-check after the tick so a cancellation that raced the timer
        // never turns into another request.
        if cancel.is_cancelled() {
            tracing::info!("Polling for generation job {} cancelled", current.id);
            return Ok(PollOutcome::Cancelled);
        }

        current = service.check_status(&current).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockGenerationClient;
    use crate::models::JobStatus;
    use crate::Error;
    use tokio::time::Instant;

    fn succeeded_with_output(id: &str, url: &str) -> GenerationJob {
        let mut job = MockGenerationClient::job(id, JobStatus::Succeeded);
        job.output = Some(vec![url.to_string()]);
        job
    }

    fn failed_with_error(id: &str, message: &str) -> GenerationJob {
        let mut job = MockGenerationClient::job(id, JobStatus::Failed);
        job.error = Some(message.to_string());
        job
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_succeeded_then_stops() {
        let client = MockGenerationClient::new()
            .with_status_response(MockGenerationClient::job("p1", JobStatus::Processing))
            .with_status_response(MockGenerationClient::job("p1", JobStatus::Processing))
            .with_status_response(succeeded_with_output("p1", "http://img"));

        let job = client.submit("a car").await.unwrap();
        let (_handle, signal) = cancellation();

        let outcome = poll_until_terminal(&client, job, DEFAULT_POLL_INTERVAL, signal)
            .await
            .unwrap();

        match outcome {
            PollOutcome::Finished(finished) => {
                assert_eq!(finished.status, JobStatus::Succeeded);
                assert_eq!(finished.first_output(), Some("http://img"));
            }
            PollOutcome::Cancelled => panic!("poll was not cancelled"),
        }
        // Exactly one check per tick, none after the terminal response.
        assert_eq!(client.get_status_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_spaced_by_the_interval() {
        let client = MockGenerationClient::new()
            .with_status_response(MockGenerationClient::job("p1", JobStatus::Processing))
            .with_status_response(MockGenerationClient::job("p1", JobStatus::Processing))
            .with_status_response(succeeded_with_output("p1", "http://img"));

        let job = client.submit("a car").await.unwrap();
        let (_handle, signal) = cancellation();
        let start = Instant::now();

        poll_until_terminal(&client, job, DEFAULT_POLL_INTERVAL, signal)
            .await
            .unwrap();

        assert_eq!(start.elapsed(), DEFAULT_POLL_INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_surfaces_error_message_after_one_check() {
        let client = MockGenerationClient::new()
            .with_status_response(failed_with_error("p1", "boom"));

        let job = client.submit("a car").await.unwrap();
        let (_handle, signal) = cancellation();

        let outcome = poll_until_terminal(&client, job, DEFAULT_POLL_INTERVAL, signal)
            .await
            .unwrap();

        match outcome {
            PollOutcome::Finished(finished) => {
                assert_eq!(finished.status, JobStatus::Failed);
                assert_eq!(finished.error.as_deref(), Some("boom"));
            }
            PollOutcome::Cancelled => panic!("poll was not cancelled"),
        }
        assert_eq!(client.get_status_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_terminal_job_finishes_without_any_request() {
        let client = MockGenerationClient::new();
        let job = succeeded_with_output("p1", "http://img");
        let (_handle, signal) = cancellation();

        let outcome = poll_until_terminal(&client, job, DEFAULT_POLL_INTERVAL, signal)
            .await
            .unwrap();

        assert!(matches!(outcome, PollOutcome::Finished(_)));
        assert_eq!(client.get_status_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_error_stops_polling_and_propagates() {
        let client = MockGenerationClient::new()
            .with_status_error("connection reset")
            .with_status_response(succeeded_with_output("p1", "http://img"));

        let job = client.submit("a car").await.unwrap();
        let (_handle, signal) = cancellation();

        let err = poll_until_terminal(&client, job, DEFAULT_POLL_INTERVAL, signal)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Upstream(msg) if msg == "connection reset"));
        assert_eq!(client.get_status_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_tick_issues_no_requests() {
        let client = MockGenerationClient::new()
            .with_status_response(MockGenerationClient::job("p1", JobStatus::Processing));

        let job = client.submit("a car").await.unwrap();
        let (handle, signal) = cancellation();
        handle.cancel();

        let outcome = poll_until_terminal(&client, job, DEFAULT_POLL_INTERVAL, signal)
            .await
            .unwrap();

        assert!(matches!(outcome, PollOutcome::Cancelled));
        assert_eq!(client.get_status_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_poll_stops_further_requests() {
        let client = MockGenerationClient::new()
            .with_status_response(MockGenerationClient::job("p1", JobStatus::Processing))
            .with_status_response(MockGenerationClient::job("p1", JobStatus::Processing));

        let job = client.submit("a car").await.unwrap();
        let (handle, signal) = cancellation();
        let poller = {
            let client = client.clone();
            tokio::spawn(async move {
                poll_until_terminal(&client, job, DEFAULT_POLL_INTERVAL, signal).await
            })
        };

        // Let two ticks land, then cancel.
        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 2 + Duration::from_millis(100)).await;
        handle.cancel();

        let outcome = poller.await.unwrap().unwrap();
        assert!(matches!(outcome, PollOutcome::Cancelled));
        assert_eq!(client.get_status_count(), 2);

        // Nothing fires after cancellation.
        tokio::time::sleep(DEFAULT_POLL_INTERVAL * 3).await;
        assert_eq!(client.get_status_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let (handle, signal) = cancellation();
        handle.cancel();
        handle.cancel();
        assert!(signal.is_cancelled());
    }
}
