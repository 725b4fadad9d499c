use super::GenerationService;
use crate::models::{GenerationJob, JobStatus, JobUrls};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum ScriptedStatus {
    Job(GenerationJob),
    Error(String),
}

/// Scripted generation backend for tests and harnesses.
///
/// Status responses are consumed in order; once the script runs out,
/// `check_status` echoes the job back unchanged.
#[derive(Clone, Default)]
pub struct MockGenerationClient {
    submit_response: Arc<Mutex<Option<GenerationJob>>>,
    status_script: Arc<Mutex<VecDeque<ScriptedStatus>>>,
    submit_count: Arc<Mutex<usize>>,
    status_count: Arc<Mutex<usize>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a job handle with placeholder URLs, for scripting responses.
    pub fn job(id: &str, status: JobStatus) -> GenerationJob {
        GenerationJob {
            id: id.to_string(),
            urls: JobUrls {
                get: format!("https://mock.generation.test/v1/predictions/{}", id),
                cancel: format!("https://mock.generation.test/v1/predictions/{}/cancel", id),
            },
            status,
            output: None,
            error: None,
        }
    }

    pub fn with_submit_response(self, job: GenerationJob) -> Self {
        *self.submit_response.lock().unwrap() = Some(job);
        self
    }

    pub fn with_status_response(self, job: GenerationJob) -> Self {
        self.status_script
            .lock()
            .unwrap()
            .push_back(ScriptedStatus::Job(job));
        self
    }

    pub fn with_status_error(self, message: &str) -> Self {
        self.status_script
            .lock()
            .unwrap()
            .push_back(ScriptedStatus::Error(message.to_string()));
        self
    }

    pub fn get_submit_count(&self) -> usize {
        *self.submit_count.lock().unwrap()
    }

    pub fn get_status_count(&self) -> usize {
        *self.status_count.lock().unwrap()
    }
}

#[async_trait]
impl GenerationService for MockGenerationClient {
    async fn submit(&self, _vehicle: &str) -> Result<GenerationJob> {
        *self.submit_count.lock().unwrap() += 1;

        let scripted = self.submit_response.lock().unwrap().clone();
        Ok(scripted.unwrap_or_else(|| Self::job("mock-prediction-1", JobStatus::Starting)))
    }

    async fn check_status(&self, job: &GenerationJob) -> Result<GenerationJob> {
        *self.status_count.lock().unwrap() += 1;

        match self.status_script.lock().unwrap().pop_front() {
            Some(ScriptedStatus::Job(next)) => Ok(next),
            Some(ScriptedStatus::Error(message)) => Err(Error::Upstream(message)),
            None => Ok(job.clone()),
        }
    }
}
