use super::GenerationService;
use crate::models::{GenerationInput, GenerationJob, GenerationRequest};
use crate::{prompts, Error, Result};
use async_trait::async_trait;
use reqwest::Client;

const NUM_OUTPUTS: u32 = 1;
const GUIDANCE_SCALE: f64 = 7.5;
const NUM_INFERENCE_STEPS: u32 = 50;

/// Some relays append a stray `:` or `:/` to the status URL they hand back.
fn normalize_status_url(url: &str) -> &str {
    url.strip_suffix(":/")
        .or_else(|| url.strip_suffix(':'))
        .unwrap_or(url)
}

/// HTTP client for the prediction endpoint.
///
/// The API token comes from server-side configuration only; it is sent on
/// every request and never appears in anything returned to a caller.
pub struct GenerationClient {
    client: Client,
    base_url: String,
    api_token: String,
    model_version: String,
}

impl GenerationClient {
    pub fn new(base_url: String, api_token: String, model_version: String) -> Self {
        Self::new_with_client(base_url, api_token, model_version, Client::new())
    }

    pub fn new_with_client(
        base_url: String,
        api_token: String,
        model_version: String,
        client: Client,
    ) -> Self {
        Self {
            client,
            base_url,
            api_token,
            model_version,
        }
    }

    async fn parse_job(&self, response: reqwest::Response, context: &str) -> Result<GenerationJob> {
        let status = response.status();
        if status.as_u16() == 402 {
            return Err(Error::BillingRequired(
                "Billing setup required for the image generation API".to_string(),
            ));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("{} error (status {}): {}", context, status, error_text);
            return Err(Error::Upstream(format!(
                "{} error (status {}): {}",
                context, status, error_text
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse {} response: {}\nBody: {}", context, e, body);
            Error::Upstream(format!("Failed to parse {} response: {}", context, e))
        })
    }
}

#[async_trait]
impl GenerationService for GenerationClient {
    async fn submit(&self, vehicle: &str) -> Result<GenerationJob> {
        let request = GenerationRequest {
            version: self.model_version.clone(),
            input: GenerationInput {
                prompt: prompts::render(prompts::VEHICLE_PHOTO, &[("vehicle", vehicle)]),
                negative_prompt: prompts::NEGATIVE.to_string(),
                num_outputs: NUM_OUTPUTS,
                guidance_scale: GUIDANCE_SCALE,
                num_inference_steps: NUM_INFERENCE_STEPS,
            },
        };

        let url = format!("{}/v1/predictions", self.base_url);
        tracing::debug!("Submitting generation job for '{}'", vehicle);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_token))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send generation request: {}", e);
                e
            })?;

        self.parse_job(response, "Generation submit").await
    }

    async fn check_status(&self, job: &GenerationJob) -> Result<GenerationJob> {
        let url = normalize_status_url(&job.urls.get);
        tracing::debug!("Checking status of generation job {}", job.id);

        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Token {}", self.api_token))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send status request: {}", e);
                e
            })?;

        self.parse_job(response, "Generation status").await
    }
}
