use super::ValuationService;
use crate::models::ValuationRecord;
use crate::vin::Vin;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ValuationQuery<'a> {
    vin: &'a str,
}

/// Response body with every field optional, so a partial payload can be
/// rejected with the name of the first missing required field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawValuation {
    make: Option<String>,
    model: Option<String>,
    year: Option<i32>,
    trim: Option<String>,
    estimated_value: Option<u32>,
    trade_in_value: Option<u32>,
    retail_value: Option<u32>,
    cpo_value: Option<u32>,
}

impl RawValuation {
    fn into_record(self) -> Result<ValuationRecord> {
        Ok(ValuationRecord {
            make: self.make.ok_or_else(|| Error::IncompleteData("make".to_string()))?,
            model: self
                .model
                .ok_or_else(|| Error::IncompleteData("model".to_string()))?,
            year: self.year.ok_or_else(|| Error::IncompleteData("year".to_string()))?,
            trim: self.trim.unwrap_or_default(),
            estimated_value: self
                .estimated_value
                .ok_or_else(|| Error::IncompleteData("estimatedValue".to_string()))?,
            trade_in_value: self.trade_in_value,
            retail_value: self.retail_value,
            cpo_value: self.cpo_value,
        })
    }
}

/// Valuation backend that defers to a remote endpoint over HTTP.
pub struct RemoteValuationClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl RemoteValuationClient {
    pub fn new(base_url: String, api_token: String) -> Self {
        Self::new_with_client(base_url, api_token, Client::new())
    }

    pub fn new_with_client(base_url: String, api_token: String, client: Client) -> Self {
        Self {
            client,
            base_url,
            api_token,
        }
    }
}

#[async_trait]
impl ValuationService for RemoteValuationClient {
    async fn resolve(&self, vin: &Vin) -> Result<ValuationRecord> {
        let url = format!("{}/valuations", self.base_url);
        tracing::debug!("Requesting valuation for {} from {}", vin, url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&ValuationQuery { vin: vin.as_str() })
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send valuation request: {}", e);
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Valuation API error (status {}): {}", status, error_text);
            return Err(match status.as_u16() {
                401 => Error::Auth("Valuation API rejected the configured token".to_string()),
                404 => Error::NotFound(
                    "No vehicle matches this VIN. Check the VIN and try again.".to_string(),
                ),
                429 => Error::RateLimited(
                    "Valuation API rate limit exceeded. Try again later.".to_string(),
                ),
                _ => Error::Upstream(format!(
                    "Valuation API error (status {}): {}",
                    status, error_text
                )),
            });
        }

        let body = response.text().await?;
        let raw: RawValuation = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse valuation response: {}\nBody: {}", e, body);
            Error::Upstream(format!("Failed to parse valuation response: {}", e))
        })?;

        raw.into_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn vin(s: &str) -> Vin {
        Vin::parse(s).unwrap()
    }

    fn client_for(server: &MockServer) -> RemoteValuationClient {
        RemoteValuationClient::new(server.uri(), "test-token".to_string())
    }

    #[tokio::test]
    async fn test_resolve_parses_full_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/valuations"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({ "vin": "5YJ3E1EA1PF123456" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "make": "Tesla",
                "model": "Model 3",
                "year": 2023,
                "trim": "Long Range",
                "estimatedValue": 45500,
                "tradeInValue": 42000,
                "retailValue": 47500,
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let record = client.resolve(&vin("5YJ3E1EA1PF123456")).await.unwrap();

        assert_eq!(record.make, "Tesla");
        assert_eq!(record.estimated_value, 45500);
        assert_eq!(record.trade_in_value, Some(42000));
        assert_eq!(record.cpo_value, None);
    }

    #[tokio::test]
    async fn test_resolve_tolerates_missing_trim() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/valuations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "make": "Toyota",
                "model": "Camry",
                "year": 2020,
                "estimatedValue": 22500,
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let record = client.resolve(&vin("4T1B11HK5KU123456")).await.unwrap();
        assert_eq!(record.trim, "");
        assert_eq!(record.description(), "2020 Toyota Camry");
    }

    #[tokio::test]
    async fn test_resolve_rejects_incomplete_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/valuations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "make": "Tesla",
                "model": "Model 3",
                "year": 2023,
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.resolve(&vin("5YJ3E1EA1PF123456")).await.unwrap_err();
        assert!(matches!(err, Error::IncompleteData(field) if field == "estimatedValue"));
    }

    #[tokio::test]
    async fn test_resolve_maps_auth_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/valuations"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.resolve(&vin("5YJ3E1EA1PF123456")).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[tokio::test]
    async fn test_resolve_maps_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/valuations"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.resolve(&vin("5YJ3E1EA1PF123456")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_maps_rate_limit() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/valuations"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.resolve(&vin("5YJ3E1EA1PF123456")).await.unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_resolve_maps_other_statuses_to_upstream() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/valuations"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.resolve(&vin("5YJ3E1EA1PF123456")).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_resolve_rejects_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/valuations"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.resolve(&vin("5YJ3E1EA1PF123456")).await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }
}
